//! In-process notice bus backed by a subscriber list.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;

use crate::bus::{Callback, NoticeBus, SubscriberId};

/// Fan-out bus that spawns one tokio task per subscriber per message.
///
/// Must be used from within a tokio runtime.
pub struct InMemoryNoticeBus<M> {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriberId, Callback<M>)>>,
}

impl<M> InMemoryNoticeBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryNoticeBus<M> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> std::fmt::Debug for InMemoryNoticeBus<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryNoticeBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<M> NoticeBus<M> for InMemoryNoticeBus<M>
where
    M: Clone + Send + 'static,
{
    fn subscribe(&self, callback: Callback<M>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subs.push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    fn publish(&self, message: M) -> Vec<JoinHandle<()>> {
        // Snapshot so callbacks never run under the lock.
        let snapshot: Vec<Callback<M>> = {
            let subs = self
                .subscribers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            subs.iter().map(|(_, cb)| cb.clone()).collect()
        };

        tracing::debug!(subscribers = snapshot.len(), "publishing notice");

        snapshot
            .into_iter()
            .map(|cb| tokio::spawn(cb(message.clone())))
            .collect()
    }
}
