//! User service: local user records backed by remote accounts.

use std::sync::Arc;

use serde_json::Value;

use iam_core::{Attributes, Context, IamError, IamResult, User, UserUrn};
use iam_events::{Callback, InMemoryNoticeBus, NoticeBus, SubscriberId};
use iam_infra::{AccountBridge, UserRepository};

use crate::gate::ServiceGate;

pub struct UserService {
    gate: ServiceGate,
    users: Arc<UserRepository>,
    accounts: Arc<dyn AccountBridge>,
    deletions: Arc<dyn NoticeBus<UserUrn>>,
}

/// Resolve `urn` to the remote account id it was derived from.
fn account_id(urn: &UserUrn) -> IamResult<i64> {
    let name = urn.local_name();
    if name.is_empty() {
        return Err(IamError::invalid(format!("invalid user urn {:?}", urn.as_str())));
    }
    name.parse()
        .map_err(|_| IamError::invalid(format!("invalid user urn {:?}", urn.as_str())))
}

impl UserService {
    pub fn new(users: Arc<UserRepository>, accounts: Arc<dyn AccountBridge>) -> Self {
        Self {
            gate: ServiceGate::new(),
            users,
            accounts,
            deletions: Arc::new(InMemoryNoticeBus::new()),
        }
    }

    pub fn with_gate(mut self, gate: ServiceGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_notices(mut self, bus: Arc<dyn NoticeBus<UserUrn>>) -> Self {
        self.deletions = bus;
        self
    }

    /// Import a remote account and persist the matching local record.
    ///
    /// Any failure after the import archives the remote account again, best
    /// effort; a failed archive is logged and the original error returned.
    pub async fn create_user(
        &self,
        ctx: &Context,
        username: &str,
        password: &str,
        attrs: Option<Attributes>,
    ) -> IamResult<UserUrn> {
        let _guard = self.gate.enter(ctx).await?;

        let account_id = self
            .accounts
            .import_account(ctx, username, password, false)
            .await?;

        let user = User::new(account_id, username, attrs);
        match self.persist_new(ctx, &user).await {
            Ok(()) => {
                tracing::debug!(user = %user.id, "user created");
                Ok(user.id)
            }
            Err(err) => {
                // The caller's context may be the reason we failed.
                if let Err(archive_err) = self
                    .accounts
                    .archive_account(&Context::new(), account_id)
                    .await
                {
                    tracing::error!(
                        account_id,
                        error = %archive_err,
                        "failed to archive remote account after aborted user creation"
                    );
                }
                Err(err)
            }
        }
    }

    async fn persist_new(&self, ctx: &Context, user: &User) -> IamResult<()> {
        match self.users.load(ctx, &user.id).await {
            Ok(_) => return Err(IamError::conflict("user")),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
        self.users.store(ctx, user).await
    }

    pub async fn load_user(&self, ctx: &Context, urn: &UserUrn) -> IamResult<User> {
        account_id(urn)?;
        let _guard = self.gate.enter(ctx).await?;
        self.load_populated(ctx, urn).await
    }

    pub async fn users(&self, ctx: &Context) -> IamResult<Vec<User>> {
        let _guard = self.gate.enter(ctx).await?;
        let mut users = self.users.get(ctx).await?;
        for user in &mut users {
            self.populate_lock(ctx, user).await?;
        }
        Ok(users)
    }

    /// Archive remotely, delete locally, then notify subscribers.
    ///
    /// Subscribers only hear about deletions that actually happened; they run
    /// concurrently and are not awaited.
    pub async fn delete_user(&self, ctx: &Context, urn: &UserUrn) -> IamResult<()> {
        account_id(urn)?;
        let _guard = self.gate.enter(ctx).await?;

        let user = self.users.load(ctx, urn).await?;
        self.accounts.archive_account(ctx, user.account_id).await?;
        self.users.delete(ctx, urn).await?;

        tracing::debug!(user = %urn, "user deleted");
        self.deletions.publish(urn.clone());
        Ok(())
    }

    pub async fn lock_user(&self, ctx: &Context, urn: &UserUrn, locked: bool) -> IamResult<()> {
        account_id(urn)?;
        let _guard = self.gate.enter(ctx).await?;

        let user = self.users.load(ctx, urn).await?;
        if locked {
            self.accounts.lock_account(ctx, user.account_id).await
        } else {
            self.accounts.unlock_account(ctx, user.account_id).await
        }
    }

    pub async fn unlock_user(&self, ctx: &Context, urn: &UserUrn) -> IamResult<()> {
        self.lock_user(ctx, urn, false).await
    }

    /// Replace the whole attribute map.
    pub async fn update_attrs(&self, ctx: &Context, urn: &UserUrn, attrs: Attributes) -> IamResult<()> {
        self.modify(ctx, urn, |user| user.attributes = Some(attrs)).await
    }

    pub async fn set_attr(&self, ctx: &Context, urn: &UserUrn, key: &str, value: Value) -> IamResult<()> {
        self.modify(ctx, urn, |user| user.set_attr(key, value)).await
    }

    pub async fn delete_attr(&self, ctx: &Context, urn: &UserUrn, key: &str) -> IamResult<()> {
        self.modify(ctx, urn, |user| user.delete_attr(key)).await
    }

    /// Register a callback for every future successful deletion.
    pub fn on_delete(&self, callback: Callback<UserUrn>) -> SubscriberId {
        self.deletions.subscribe(callback)
    }

    /// Unregister a deletion callback. Returns false for unknown ids.
    pub fn remove_on_delete(&self, id: SubscriberId) -> bool {
        self.deletions.unsubscribe(id)
    }

    async fn modify(&self, ctx: &Context, urn: &UserUrn, f: impl FnOnce(&mut User)) -> IamResult<()> {
        account_id(urn)?;
        let _guard = self.gate.enter(ctx).await?;

        let mut user = self.users.load(ctx, urn).await?;
        f(&mut user);
        // Lock state is mirrored from the account store, never persisted.
        user.locked = None;
        self.users.store(ctx, &user).await
    }

    async fn load_populated(&self, ctx: &Context, urn: &UserUrn) -> IamResult<User> {
        let mut user = self.users.load(ctx, urn).await?;
        self.populate_lock(ctx, &mut user).await?;
        Ok(user)
    }

    async fn populate_lock(&self, ctx: &Context, user: &mut User) -> IamResult<()> {
        let account = self.accounts.get_account(ctx, user.account_id).await?;
        user.locked = Some(account.locked);
        Ok(())
    }
}
