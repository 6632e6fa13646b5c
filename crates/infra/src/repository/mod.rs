//! Repository contracts.
//!
//! Every backend implements the same contracts and must pass the shared
//! behavioral suite in `tests/repository_contract.rs`.
//!
//! - `store` overwrites unconditionally; uniqueness is a service concern
//! - `load` and `delete` of a missing key fail with `NotFound(<kind>)`
//! - membership mutations update both index sides in one atomic unit

use std::sync::Arc;

use async_trait::async_trait;

use iam_core::{Context, Entity, Group, GroupUrn, IamResult, Policy, User, UserUrn};

pub mod embedded;
pub mod in_memory;
pub mod kv;

pub use embedded::{KvMembershipRepository, KvRepository};
pub use in_memory::{InMemoryMembershipRepository, InMemoryRepository};
pub use kv::KvStore;

/// Keyed storage of one entity type.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn store(&self, ctx: &Context, entity: &E) -> IamResult<()>;
    async fn delete(&self, ctx: &Context, id: &E::Id) -> IamResult<()>;
    async fn load(&self, ctx: &Context, id: &E::Id) -> IamResult<E>;
    /// All records, ordered by key.
    async fn get(&self, ctx: &Context) -> IamResult<Vec<E>>;
}

#[async_trait]
impl<E, R> Repository<E> for Arc<R>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    async fn store(&self, ctx: &Context, entity: &E) -> IamResult<()> {
        (**self).store(ctx, entity).await
    }

    async fn delete(&self, ctx: &Context, id: &E::Id) -> IamResult<()> {
        (**self).delete(ctx, id).await
    }

    async fn load(&self, ctx: &Context, id: &E::Id) -> IamResult<E> {
        (**self).load(ctx, id).await
    }

    async fn get(&self, ctx: &Context) -> IamResult<Vec<E>> {
        (**self).get(ctx).await
    }
}

pub type UserRepository = dyn Repository<User>;
pub type GroupRepository = dyn Repository<Group>;
pub type PolicyRepository = dyn Repository<Policy>;

/// Bidirectional user ↔ group relation.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Idempotent.
    async fn add_member(&self, ctx: &Context, user: &UserUrn, group: &GroupUrn) -> IamResult<()>;

    /// `NotFound("user membership")` when the pair is absent.
    async fn delete_member(&self, ctx: &Context, user: &UserUrn, group: &GroupUrn) -> IamResult<()>;

    async fn memberships(&self, ctx: &Context, user: &UserUrn) -> IamResult<Vec<GroupUrn>>;

    async fn members(&self, ctx: &Context, group: &GroupUrn) -> IamResult<Vec<UserUrn>>;

    /// Retract every membership of `group` in one atomic unit and return the
    /// users that were removed.
    async fn remove_group(&self, ctx: &Context, group: &GroupUrn) -> IamResult<Vec<UserUrn>>;
}

#[async_trait]
impl<R> MembershipRepository for Arc<R>
where
    R: MembershipRepository + ?Sized,
{
    async fn add_member(&self, ctx: &Context, user: &UserUrn, group: &GroupUrn) -> IamResult<()> {
        (**self).add_member(ctx, user, group).await
    }

    async fn delete_member(&self, ctx: &Context, user: &UserUrn, group: &GroupUrn) -> IamResult<()> {
        (**self).delete_member(ctx, user, group).await
    }

    async fn memberships(&self, ctx: &Context, user: &UserUrn) -> IamResult<Vec<GroupUrn>> {
        (**self).memberships(ctx, user).await
    }

    async fn members(&self, ctx: &Context, group: &GroupUrn) -> IamResult<Vec<UserUrn>> {
        (**self).members(ctx, group).await
    }

    async fn remove_group(&self, ctx: &Context, group: &GroupUrn) -> IamResult<Vec<UserUrn>> {
        (**self).remove_group(ctx, group).await
    }
}

pub(crate) const MEMBERSHIP_KIND: &str = "user membership";
