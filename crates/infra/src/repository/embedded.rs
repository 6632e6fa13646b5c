//! Repositories over the embedded [`KvStore`].

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use iam_core::{Context, Entity, GroupUrn, IamError, IamResult, UserUrn};

use super::kv::{KvStore, KvTransaction};
use super::{MEMBERSHIP_KIND, MembershipRepository, Repository};

pub const USERS_BUCKET: &str = "iam-v1-users";
pub const GROUPS_BUCKET: &str = "iam-v1-groups";
pub const POLICIES_BUCKET: &str = "iam-v1-policies";
pub const MEMBERSHIP_USERS_BUCKET: &str = "iam-v1-membership-users";
pub const MEMBERSHIP_GROUPS_BUCKET: &str = "iam-v1-membership-groups";

/// JSON-encoded entities in one bucket, keyed by URN.
#[derive(Debug)]
pub struct KvRepository<E> {
    store: Arc<KvStore>,
    bucket: &'static str,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> KvRepository<E> {
    pub fn new(store: Arc<KvStore>, bucket: &'static str) -> Self {
        Self {
            store,
            bucket,
            _entity: PhantomData,
        }
    }
}

impl KvRepository<iam_core::User> {
    pub fn users(store: Arc<KvStore>) -> Self {
        Self::new(store, USERS_BUCKET)
    }
}

impl KvRepository<iam_core::Group> {
    pub fn groups(store: Arc<KvStore>) -> Self {
        Self::new(store, GROUPS_BUCKET)
    }
}

impl KvRepository<iam_core::Policy> {
    pub fn policies(store: Arc<KvStore>) -> Self {
        Self::new(store, POLICIES_BUCKET)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for KvRepository<E> {
    async fn store(&self, ctx: &Context, entity: &E) -> IamResult<()> {
        let value = serde_json::to_string(entity)?;
        ctx.run(self.store.put(self.bucket, entity.id().as_ref(), &value))
            .await
    }

    async fn delete(&self, ctx: &Context, id: &E::Id) -> IamResult<()> {
        let removed = ctx.run(self.store.delete(self.bucket, id.as_ref())).await?;
        if !removed {
            return Err(IamError::not_found(E::KIND));
        }
        Ok(())
    }

    async fn load(&self, ctx: &Context, id: &E::Id) -> IamResult<E> {
        let raw = ctx
            .run(self.store.get(self.bucket, id.as_ref()))
            .await?
            .ok_or_else(|| IamError::not_found(E::KIND))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn get(&self, ctx: &Context) -> IamResult<Vec<E>> {
        let rows = ctx.run(self.store.scan(self.bucket)).await?;
        rows.into_iter()
            .map(|(key, raw)| -> IamResult<E> {
                let mut entity: E = serde_json::from_str(&raw)?;
                let key: E::Id = key.into();
                entity.assign_key(&key);
                Ok(entity)
            })
            .collect()
    }
}

/// Membership relation as two buckets of sorted URN sets:
/// user → groups and group → users.
#[derive(Debug, Clone)]
pub struct KvMembershipRepository {
    store: Arc<KvStore>,
}

impl KvMembershipRepository {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }
}

async fn read_set(tx: &mut KvTransaction, bucket: &str, key: &str) -> IamResult<BTreeSet<String>> {
    match tx.get(bucket, key).await? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(BTreeSet::new()),
    }
}

async fn write_set(
    tx: &mut KvTransaction,
    bucket: &str,
    key: &str,
    set: &BTreeSet<String>,
) -> IamResult<()> {
    if set.is_empty() {
        tx.delete(bucket, key).await?;
        return Ok(());
    }
    tx.put(bucket, key, &serde_json::to_string(set)?).await
}

impl KvMembershipRepository {
    async fn list<T: From<String>>(&self, bucket: &str, key: &str) -> IamResult<Vec<T>> {
        let set: BTreeSet<String> = match self.store.get(bucket, key).await? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => BTreeSet::new(),
        };
        Ok(set.into_iter().map(T::from).collect())
    }

    async fn add(&self, user: &UserUrn, group: &GroupUrn) -> IamResult<()> {
        let mut tx = self.store.begin().await?;

        let mut groups = read_set(&mut tx, MEMBERSHIP_USERS_BUCKET, user.as_str()).await?;
        let mut users = read_set(&mut tx, MEMBERSHIP_GROUPS_BUCKET, group.as_str()).await?;
        let added_group = groups.insert(group.to_string());
        let added_user = users.insert(user.to_string());
        if !added_group && !added_user {
            return Ok(());
        }

        write_set(&mut tx, MEMBERSHIP_USERS_BUCKET, user.as_str(), &groups).await?;
        write_set(&mut tx, MEMBERSHIP_GROUPS_BUCKET, group.as_str(), &users).await?;
        tx.commit().await
    }

    async fn remove(&self, user: &UserUrn, group: &GroupUrn) -> IamResult<()> {
        let mut tx = self.store.begin().await?;

        let mut groups = read_set(&mut tx, MEMBERSHIP_USERS_BUCKET, user.as_str()).await?;
        if !groups.remove(group.as_str()) {
            return Err(IamError::not_found(MEMBERSHIP_KIND));
        }
        let mut users = read_set(&mut tx, MEMBERSHIP_GROUPS_BUCKET, group.as_str()).await?;
        users.remove(user.as_str());

        write_set(&mut tx, MEMBERSHIP_USERS_BUCKET, user.as_str(), &groups).await?;
        write_set(&mut tx, MEMBERSHIP_GROUPS_BUCKET, group.as_str(), &users).await?;
        tx.commit().await
    }

    async fn purge(&self, group: &GroupUrn) -> IamResult<Vec<UserUrn>> {
        let mut tx = self.store.begin().await?;

        let users = read_set(&mut tx, MEMBERSHIP_GROUPS_BUCKET, group.as_str()).await?;
        for user in &users {
            let mut groups = read_set(&mut tx, MEMBERSHIP_USERS_BUCKET, user).await?;
            groups.remove(group.as_str());
            write_set(&mut tx, MEMBERSHIP_USERS_BUCKET, user, &groups).await?;
        }
        tx.delete(MEMBERSHIP_GROUPS_BUCKET, group.as_str()).await?;
        tx.commit().await?;

        Ok(users.into_iter().map(UserUrn::from).collect())
    }
}

#[async_trait]
impl MembershipRepository for KvMembershipRepository {
    async fn add_member(&self, ctx: &Context, user: &UserUrn, group: &GroupUrn) -> IamResult<()> {
        ctx.run(self.add(user, group)).await
    }

    async fn delete_member(&self, ctx: &Context, user: &UserUrn, group: &GroupUrn) -> IamResult<()> {
        ctx.run(self.remove(user, group)).await
    }

    async fn memberships(&self, ctx: &Context, user: &UserUrn) -> IamResult<Vec<GroupUrn>> {
        ctx.run(self.list(MEMBERSHIP_USERS_BUCKET, user.as_str())).await
    }

    async fn members(&self, ctx: &Context, group: &GroupUrn) -> IamResult<Vec<UserUrn>> {
        ctx.run(self.list(MEMBERSHIP_GROUPS_BUCKET, group.as_str())).await
    }

    async fn remove_group(&self, ctx: &Context, group: &GroupUrn) -> IamResult<Vec<UserUrn>> {
        ctx.run(self.purge(group)).await
    }
}
