//! Account Bridge: the remote authentication server that owns credentials.
//!
//! The IAM service never stores passwords. It imports accounts into the
//! remote store, mirrors lock state from it, archives accounts there, and
//! asks it to verify bearer tokens.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use iam_auth::SubjectExtractor;
use iam_core::{Context, IamResult};

pub mod authn;
pub mod in_memory;

pub use authn::{AuthnClient, AuthnConfig};
pub use in_memory::InMemoryAccountBridge;

/// Remote account as reported by the authentication server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub deleted: bool,
}

#[async_trait]
pub trait AccountBridge: SubjectExtractor {
    /// Create a remote account and return its id.
    async fn import_account(
        &self,
        ctx: &Context,
        username: &str,
        password: &str,
        locked: bool,
    ) -> IamResult<i64>;

    async fn get_account(&self, ctx: &Context, id: i64) -> IamResult<Account>;

    async fn lock_account(&self, ctx: &Context, id: i64) -> IamResult<()>;

    async fn unlock_account(&self, ctx: &Context, id: i64) -> IamResult<()>;

    /// Archive (soft-delete) the account. Its tokens stop verifying.
    async fn archive_account(&self, ctx: &Context, id: i64) -> IamResult<()>;
}

#[async_trait]
impl<B> AccountBridge for Arc<B>
where
    B: AccountBridge + ?Sized,
{
    async fn import_account(
        &self,
        ctx: &Context,
        username: &str,
        password: &str,
        locked: bool,
    ) -> IamResult<i64> {
        (**self).import_account(ctx, username, password, locked).await
    }

    async fn get_account(&self, ctx: &Context, id: i64) -> IamResult<Account> {
        (**self).get_account(ctx, id).await
    }

    async fn lock_account(&self, ctx: &Context, id: i64) -> IamResult<()> {
        (**self).lock_account(ctx, id).await
    }

    async fn unlock_account(&self, ctx: &Context, id: i64) -> IamResult<()> {
        (**self).unlock_account(ctx, id).await
    }

    async fn archive_account(&self, ctx: &Context, id: i64) -> IamResult<()> {
        (**self).archive_account(ctx, id).await
    }
}
