//! Group service and the membership consistency rules around it.

use std::sync::Arc;

use iam_core::{Context, Group, GroupUrn, IamError, IamResult, UserUrn};
use iam_events::{SubscriberId, callback};
use iam_infra::{GroupRepository, MembershipRepository};

use crate::gate::ServiceGate;
use crate::user::UserService;

pub struct GroupService {
    gate: ServiceGate,
    groups: Arc<GroupRepository>,
    members: Arc<dyn MembershipRepository>,
    users: Arc<UserService>,
    subscription: SubscriberId,
}

fn require_valid(urn: &GroupUrn) -> IamResult<()> {
    if urn.local_name().is_empty() {
        return Err(IamError::invalid(format!("invalid group urn {:?}", urn.as_str())));
    }
    Ok(())
}

impl GroupService {
    /// Wires the service and registers the user-deletion reconciliation.
    pub fn new(
        groups: Arc<GroupRepository>,
        members: Arc<dyn MembershipRepository>,
        users: Arc<UserService>,
    ) -> Self {
        Self::with_gate(groups, members, users, ServiceGate::new())
    }

    pub fn with_gate(
        groups: Arc<GroupRepository>,
        members: Arc<dyn MembershipRepository>,
        users: Arc<UserService>,
        gate: ServiceGate,
    ) -> Self {
        let subscription = users.on_delete(reconciliation(gate.clone(), members.clone()));
        Self {
            gate,
            groups,
            members,
            users,
            subscription,
        }
    }

    pub async fn get(&self, ctx: &Context) -> IamResult<Vec<Group>> {
        let _guard = self.gate.enter(ctx).await?;
        self.groups.get(ctx).await
    }

    /// Create an empty group named `name`.
    pub async fn create(&self, ctx: &Context, name: &str, comment: Option<String>) -> IamResult<GroupUrn> {
        if name.is_empty() {
            return Err(IamError::invalid("group name is required"));
        }
        let group = Group::new(name, comment);
        if group.id.local_name() != name {
            return Err(IamError::invalid(format!("invalid group name {name:?}")));
        }
        let _guard = self.gate.enter(ctx).await?;

        match self.groups.load(ctx, &group.id).await {
            Ok(_) => return Err(IamError::conflict("group")),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
        self.groups.store(ctx, &group).await?;

        tracing::debug!(group = %group.id, "group created");
        Ok(group.id)
    }

    /// Retract every membership of the group in one atomic step, then remove
    /// the group record.
    pub async fn delete(&self, ctx: &Context, urn: &GroupUrn) -> IamResult<()> {
        require_valid(urn)?;
        let _guard = self.gate.enter(ctx).await?;

        self.groups.load(ctx, urn).await?;
        let removed = self.members.remove_group(ctx, urn).await?;
        self.groups.delete(ctx, urn).await?;

        tracing::debug!(group = %urn, members = removed.len(), "group deleted");
        Ok(())
    }

    pub async fn load(&self, ctx: &Context, urn: &GroupUrn) -> IamResult<Group> {
        require_valid(urn)?;
        let _guard = self.gate.enter(ctx).await?;
        self.groups.load(ctx, urn).await
    }

    pub async fn update_comment(&self, ctx: &Context, urn: &GroupUrn, comment: Option<String>) -> IamResult<()> {
        require_valid(urn)?;
        let _guard = self.gate.enter(ctx).await?;

        let mut group = self.groups.load(ctx, urn).await?;
        group.comment = comment;
        self.groups.store(ctx, &group).await
    }

    /// Add `user` to `group`. Both must exist; the user is checked through
    /// the user service. Re-adding is a no-op.
    pub async fn add_member(&self, ctx: &Context, group: &GroupUrn, user: &UserUrn) -> IamResult<()> {
        require_valid(group)?;
        let _guard = self.gate.enter(ctx).await?;

        self.groups.load(ctx, group).await?;
        self.users.load_user(ctx, user).await?;
        self.members.add_member(ctx, user, group).await
    }

    pub async fn delete_member(&self, ctx: &Context, group: &GroupUrn, user: &UserUrn) -> IamResult<()> {
        require_valid(group)?;
        let _guard = self.gate.enter(ctx).await?;

        self.groups.load(ctx, group).await?;
        self.members.delete_member(ctx, user, group).await
    }

    pub async fn members(&self, ctx: &Context, group: &GroupUrn) -> IamResult<Vec<UserUrn>> {
        require_valid(group)?;
        let _guard = self.gate.enter(ctx).await?;

        self.groups.load(ctx, group).await?;
        self.members.members(ctx, group).await
    }

    pub async fn memberships(&self, ctx: &Context, user: &UserUrn) -> IamResult<Vec<GroupUrn>> {
        let _guard = self.gate.enter(ctx).await?;
        self.members.memberships(ctx, user).await
    }
}

impl Drop for GroupService {
    fn drop(&mut self) {
        self.users.remove_on_delete(self.subscription);
    }
}

/// Deletion callback: drop the deleted user from every group it belonged to.
/// Runs behind the group gate; per-group failures are logged and skipped.
fn reconciliation(
    gate: ServiceGate,
    members: Arc<dyn MembershipRepository>,
) -> iam_events::Callback<UserUrn> {
    callback(move |user: UserUrn| {
        let gate = gate.clone();
        let members = members.clone();
        async move {
            let ctx = Context::new();
            let Ok(_guard) = gate.enter(&ctx).await else {
                return;
            };

            let groups = match members.memberships(&ctx, &user).await {
                Ok(groups) => groups,
                Err(err) => {
                    tracing::error!(user = %user, error = %err, "failed to load memberships of deleted user");
                    return;
                }
            };

            for group in groups {
                if let Err(err) = members.delete_member(&ctx, &user, &group).await {
                    tracing::error!(
                        user = %user,
                        group = %group,
                        error = %err,
                        "failed to retract membership of deleted user"
                    );
                }
            }
        }
    })
}
