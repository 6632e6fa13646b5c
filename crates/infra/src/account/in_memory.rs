//! In-process account store for tests/dev.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use iam_auth::SubjectExtractor;
use iam_core::{Context, IamError, IamResult};

use super::{Account, AccountBridge};

#[derive(Debug, Clone)]
struct Stored {
    account: Account,
    password: String,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    accounts: BTreeMap<i64, Stored>,
    tokens: HashMap<String, i64>,
}

/// Account bridge that keeps accounts and opaque tokens in memory.
///
/// Tokens are random strings handed out by [`login`](Self::login) or
/// [`issue_token`](Self::issue_token); they stop verifying once the account
/// is locked or archived.
#[derive(Debug, Default)]
pub struct InMemoryAccountBridge {
    state: RwLock<State>,
    fail_archive: AtomicBool,
}

fn poisoned() -> IamError {
    IamError::internal("account store lock poisoned")
}

impl InMemoryAccountBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `archive_account` call fail until reset.
    pub fn fail_archive(&self, fail: bool) {
        self.fail_archive.store(fail, Ordering::SeqCst);
    }

    /// Token for an existing account.
    pub fn issue_token(&self, id: i64) -> IamResult<String> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if !state.accounts.contains_key(&id) {
            return Err(IamError::not_found("account"));
        }
        let token = Uuid::now_v7().simple().to_string();
        state.tokens.insert(token.clone(), id);
        Ok(token)
    }

    /// Password login, returning a fresh token.
    pub fn login(&self, username: &str, password: &str) -> IamResult<String> {
        let id = {
            let state = self.state.read().map_err(|_| poisoned())?;
            state
                .accounts
                .values()
                .find(|s| s.account.username == username && !s.account.deleted)
                .filter(|s| s.password == password)
                .map(|s| s.account.id)
                .ok_or_else(|| IamError::unauthenticated("invalid credentials"))?
        };
        self.issue_token(id)
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.state
            .read()
            .map(|s| s.accounts.values().map(|a| a.account.clone()).collect())
            .unwrap_or_default()
    }

    fn update(&self, id: i64, f: impl FnOnce(&mut Account)) -> IamResult<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        let stored = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| IamError::not_found("account"))?;
        f(&mut stored.account);
        Ok(())
    }
}

#[async_trait]
impl SubjectExtractor for InMemoryAccountBridge {
    async fn extract_subject(&self, ctx: &Context, token: &str) -> IamResult<String> {
        ctx.ensure_active()?;
        let state = self.state.read().map_err(|_| poisoned())?;
        let id = state
            .tokens
            .get(token)
            .ok_or_else(|| IamError::unauthenticated("unknown token"))?;
        match state.accounts.get(id) {
            Some(s) if !s.account.deleted && !s.account.locked => Ok(id.to_string()),
            _ => Err(IamError::unauthenticated("account disabled")),
        }
    }
}

#[async_trait]
impl AccountBridge for InMemoryAccountBridge {
    async fn import_account(
        &self,
        ctx: &Context,
        username: &str,
        password: &str,
        locked: bool,
    ) -> IamResult<i64> {
        ctx.ensure_active()?;
        if username.is_empty() {
            return Err(IamError::invalid("username is required"));
        }

        let mut state = self.state.write().map_err(|_| poisoned())?;
        if state
            .accounts
            .values()
            .any(|s| s.account.username == username && !s.account.deleted)
        {
            return Err(IamError::conflict("account"));
        }

        state.next_id += 1;
        let id = state.next_id;
        state.accounts.insert(
            id,
            Stored {
                account: Account {
                    id,
                    username: username.to_string(),
                    locked,
                    deleted: false,
                },
                password: password.to_string(),
            },
        );
        Ok(id)
    }

    async fn get_account(&self, ctx: &Context, id: i64) -> IamResult<Account> {
        ctx.ensure_active()?;
        let state = self.state.read().map_err(|_| poisoned())?;
        state
            .accounts
            .get(&id)
            .map(|s| s.account.clone())
            .ok_or_else(|| IamError::not_found("account"))
    }

    async fn lock_account(&self, ctx: &Context, id: i64) -> IamResult<()> {
        ctx.ensure_active()?;
        self.update(id, |a| a.locked = true)
    }

    async fn unlock_account(&self, ctx: &Context, id: i64) -> IamResult<()> {
        ctx.ensure_active()?;
        self.update(id, |a| a.locked = false)
    }

    async fn archive_account(&self, ctx: &Context, id: i64) -> IamResult<()> {
        ctx.ensure_active()?;
        if self.fail_archive.load(Ordering::SeqCst) {
            return Err(IamError::internal("archive rejected by account store"));
        }
        self.update(id, |a| a.deleted = true)
    }
}
