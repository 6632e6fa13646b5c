//! Per-call cancellation context.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{IamError, IamResult};

/// Carries the caller's cancellation signal through every service,
/// repository and bridge call.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Child context cancelled together with `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn ensure_active(&self) -> IamResult<()> {
        if self.is_cancelled() {
            return Err(IamError::Cancelled);
        }
        Ok(())
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Drive `fut` unless the context is cancelled first.
    pub async fn run<F, T>(&self, fut: F) -> IamResult<T>
    where
        F: Future<Output = IamResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(IamError::Cancelled),
            res = fut => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_completes_when_active() {
        let ctx = Context::new();
        let out = ctx.run(async { Ok::<_, IamError>(5) }).await;
        assert_eq!(out, Ok(5));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let ctx = Context::new();
        let child = ctx.child();
        ctx.cancel();

        assert_eq!(child.ensure_active(), Err(IamError::Cancelled));
        let out = child
            .run(std::future::pending::<IamResult<()>>())
            .await;
        assert_eq!(out, Err(IamError::Cancelled));
    }
}
