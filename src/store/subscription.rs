//! Snapshot subscriptions
//!
//! A `Subscription` receives the full result set of its query every time
//! that result set changes. Dropping it unsubscribes.

use tokio::sync::mpsc;

use super::types::QuerySnapshot;

/// Live handle on a query's result set
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<QuerySnapshot>,
    on_drop: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wrap a snapshot channel; `on_drop` deregisters the listener
    pub fn new(
        receiver: mpsc::UnboundedReceiver<QuerySnapshot>,
        on_drop: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            receiver,
            on_drop: Some(Box::new(on_drop)),
        }
    }

    /// Wait for the next snapshot
    ///
    /// Returns `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<QuerySnapshot> {
        self.receiver.recv().await
    }

    /// Take an already delivered snapshot without waiting
    pub fn try_next(&mut self) -> Option<QuerySnapshot> {
        self.receiver.try_recv().ok()
    }

    /// Stop receiving snapshots
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(on_drop) = self.on_drop.take() {
            on_drop();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
