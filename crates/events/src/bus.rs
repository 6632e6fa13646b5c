//! Publish/subscribe abstraction for in-process notices.
//!
//! Delivery is fire-and-forget: every subscriber runs in its own task, there
//! is no ordering between subscribers and no acknowledgment back to the
//! publisher. Subscribers must tolerate running concurrently with anything
//! the publisher does next.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinHandle;

/// Boxed future returned by a subscriber.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Subscriber callback, invoked once per published message.
pub type Callback<M> = Arc<dyn Fn(M) -> BoxFuture + Send + Sync>;

/// Handle returned by [`NoticeBus::subscribe`], used to unregister.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl SubscriberId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

pub trait NoticeBus<M>: Send + Sync
where
    M: Clone + Send + 'static,
{
    fn subscribe(&self, callback: Callback<M>) -> SubscriberId;

    /// Returns false when `id` was not registered.
    fn unsubscribe(&self, id: SubscriberId) -> bool;

    /// Spawn every current subscriber with a copy of `message`.
    ///
    /// The handles are returned for callers (tests, shutdown) that want to
    /// wait for delivery; dropping them does not cancel the tasks.
    fn publish(&self, message: M) -> Vec<JoinHandle<()>>;
}

impl<M, S> NoticeBus<M> for Arc<S>
where
    M: Clone + Send + 'static,
    S: NoticeBus<M> + ?Sized,
{
    fn subscribe(&self, callback: Callback<M>) -> SubscriberId {
        (**self).subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriberId) -> bool {
        (**self).unsubscribe(id)
    }

    fn publish(&self, message: M) -> Vec<JoinHandle<()>> {
        (**self).publish(message)
    }
}

/// Wrap an async closure as a [`Callback`].
pub fn callback<M, F, Fut>(f: F) -> Callback<M>
where
    F: Fn(M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |m| Box::pin(f(m)) as BoxFuture)
}
