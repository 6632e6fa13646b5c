//! Per-service mutual exclusion.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use iam_core::{Context, IamError, IamResult};

/// Serializes the methods of one service instance.
///
/// Cloning shares the gate, which lets background tasks (deletion
/// reconciliation) queue behind callers of the same service. Waiting races
/// the caller's cancellation.
#[derive(Debug, Clone, Default)]
pub struct ServiceGate {
    lock: Arc<Mutex<()>>,
}

impl ServiceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(&self, ctx: &Context) -> IamResult<MutexGuard<'_, ()>> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(IamError::Cancelled),
            guard = self.lock.lock() => Ok(guard),
        }
    }
}
