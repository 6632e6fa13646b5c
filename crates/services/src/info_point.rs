//! Information point describing a user for policy conditions.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use iam_auth::{InfoPoint, PolicyContext};
use iam_core::{Context, ErrorKind, IamResult, UserUrn};
use iam_infra::MembershipRepository;

use crate::user::UserService;

/// Exposes `<prefix>.username`, `<prefix>.groups` and `<prefix>.attrs.<key>`.
///
/// A URN that does not name a stored user (unknown, or a collection such as
/// `urn:iam::user/`) yields an empty context, leaving the decision to the
/// policies alone.
pub struct UserInfoPoint {
    prefix: String,
    users: Arc<UserService>,
    members: Arc<dyn MembershipRepository>,
}

impl UserInfoPoint {
    pub fn new(
        prefix: impl Into<String>,
        users: Arc<UserService>,
        members: Arc<dyn MembershipRepository>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            users,
            members,
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}.{name}", self.prefix)
    }
}

#[async_trait]
impl InfoPoint for UserInfoPoint {
    async fn context(&self, ctx: &Context, urn: &str) -> IamResult<PolicyContext> {
        let urn = UserUrn::parse(urn);
        let user = match self.users.load_user(ctx, &urn).await {
            Ok(user) => user,
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::InvalidArgument) => {
                return Ok(PolicyContext::new());
            }
            Err(err) => return Err(err),
        };
        let groups = self.members.memberships(ctx, &urn).await?;

        let mut out = PolicyContext::new();
        out.insert(self.key("username"), Value::String(user.username));
        out.insert(
            self.key("groups"),
            Value::Array(groups.into_iter().map(|g| Value::String(g.into())).collect()),
        );
        for (name, value) in user.attributes.unwrap_or_default() {
            out.insert(self.key(&format!("attrs.{name}")), value);
        }
        Ok(out)
    }
}
