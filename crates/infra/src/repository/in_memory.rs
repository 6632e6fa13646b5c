//! In-memory repositories for tests/dev.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use iam_core::{Context, Entity, GroupUrn, IamError, IamResult, UserUrn};

use super::{MEMBERSHIP_KIND, MembershipRepository, Repository};

fn poisoned() -> IamError {
    IamError::internal("repository lock poisoned")
}

/// In-memory keyed store for any [`Entity`].
#[derive(Debug)]
pub struct InMemoryRepository<E: Entity> {
    inner: RwLock<BTreeMap<E::Id, E>>,
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn store(&self, ctx: &Context, entity: &E) -> IamResult<()> {
        ctx.ensure_active()?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(entity.id().clone(), entity.clone());
        Ok(())
    }

    async fn delete(&self, ctx: &Context, id: &E::Id) -> IamResult<()> {
        ctx.ensure_active()?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(id)
            .map(|_| ())
            .ok_or_else(|| IamError::not_found(E::KIND))
    }

    async fn load(&self, ctx: &Context, id: &E::Id) -> IamResult<E> {
        ctx.ensure_active()?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        map.get(id).cloned().ok_or_else(|| IamError::not_found(E::KIND))
    }

    async fn get(&self, ctx: &Context) -> IamResult<Vec<E>> {
        ctx.ensure_active()?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .iter()
            .map(|(key, entity)| {
                let mut entity = entity.clone();
                entity.assign_key(key);
                entity
            })
            .collect())
    }
}

#[derive(Debug, Default)]
struct MembershipIndex {
    by_user: HashMap<UserUrn, BTreeSet<GroupUrn>>,
    by_group: HashMap<GroupUrn, BTreeSet<UserUrn>>,
}

impl MembershipIndex {
    fn unlink(&mut self, user: &UserUrn, group: &GroupUrn) {
        if let Some(groups) = self.by_user.get_mut(user) {
            groups.remove(group);
            if groups.is_empty() {
                self.by_user.remove(user);
            }
        }
        if let Some(users) = self.by_group.get_mut(group) {
            users.remove(user);
            if users.is_empty() {
                self.by_group.remove(group);
            }
        }
    }
}

/// In-memory membership relation. One lock covers both index sides.
#[derive(Debug, Default)]
pub struct InMemoryMembershipRepository {
    inner: RwLock<MembershipIndex>,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn add_member(&self, ctx: &Context, user: &UserUrn, group: &GroupUrn) -> IamResult<()> {
        ctx.ensure_active()?;
        let mut idx = self.inner.write().map_err(|_| poisoned())?;
        idx.by_user
            .entry(user.clone())
            .or_default()
            .insert(group.clone());
        idx.by_group
            .entry(group.clone())
            .or_default()
            .insert(user.clone());
        Ok(())
    }

    async fn delete_member(&self, ctx: &Context, user: &UserUrn, group: &GroupUrn) -> IamResult<()> {
        ctx.ensure_active()?;
        let mut idx = self.inner.write().map_err(|_| poisoned())?;
        let present = idx
            .by_user
            .get(user)
            .is_some_and(|groups| groups.contains(group));
        if !present {
            return Err(IamError::not_found(MEMBERSHIP_KIND));
        }
        idx.unlink(user, group);
        Ok(())
    }

    async fn memberships(&self, ctx: &Context, user: &UserUrn) -> IamResult<Vec<GroupUrn>> {
        ctx.ensure_active()?;
        let idx = self.inner.read().map_err(|_| poisoned())?;
        Ok(idx
            .by_user
            .get(user)
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn members(&self, ctx: &Context, group: &GroupUrn) -> IamResult<Vec<UserUrn>> {
        ctx.ensure_active()?;
        let idx = self.inner.read().map_err(|_| poisoned())?;
        Ok(idx
            .by_group
            .get(group)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_group(&self, ctx: &Context, group: &GroupUrn) -> IamResult<Vec<UserUrn>> {
        ctx.ensure_active()?;
        let mut idx = self.inner.write().map_err(|_| poisoned())?;
        let users: Vec<UserUrn> = idx
            .by_group
            .remove(group)
            .map(|users| users.into_iter().collect())
            .unwrap_or_default();
        for user in &users {
            idx.unlink(user, group);
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_core::{Policy, PolicyUrn};

    #[tokio::test]
    async fn listing_stamps_storage_key_on_policies() {
        let repo = InMemoryRepository::<Policy>::new();
        let ctx = Context::new();
        repo.store(&ctx, &Policy::allow().with_id(PolicyUrn::from_name("p")))
            .await
            .unwrap();

        let listed = repo.get(&ctx).await.unwrap();
        assert_eq!(listed[0].id.as_str(), "urn:iam::policy/p");
    }

    #[tokio::test]
    async fn cancelled_context_is_refused() {
        let repo = InMemoryMembershipRepository::new();
        let ctx = Context::new();
        ctx.cancel();
        let err = repo
            .add_member(&ctx, &UserUrn::from_account_id(1), &GroupUrn::from_name("g"))
            .await
            .unwrap_err();
        assert_eq!(err, IamError::Cancelled);
    }
}
