//! Decision-point policy source backed by the policy repository.

use std::sync::Arc;

use async_trait::async_trait;

use iam_auth::PolicySource;
use iam_core::{Context, IamResult, Policy};

use crate::repository::PolicyRepository;

/// Reads the full stored policy set on every decision, so policy writes take
/// effect on the next request.
#[derive(Clone)]
pub struct PolicyCatalog {
    repo: Arc<PolicyRepository>,
}

impl PolicyCatalog {
    pub fn new(repo: Arc<PolicyRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl PolicySource for PolicyCatalog {
    async fn policies(&self, ctx: &Context) -> IamResult<Vec<Policy>> {
        self.repo.get(ctx).await
    }
}
