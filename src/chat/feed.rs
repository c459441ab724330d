//! Live message feed
//!
//! Subscribes to the most recent messages and keeps a local list that is
//! replaced wholesale on every snapshot. The list is held in a `watch`
//! channel so renderers can both read it and wait for changes.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::message::{field, Message};
use super::ChatSettings;
use crate::store::{Direction, DocumentStore, Query, QuerySnapshot, StoreResult};

/// The feed query: newest first, bounded
pub fn feed_query(settings: &ChatSettings) -> Query {
    Query::collection(settings.collection.clone())
        .order_by(field::TIMESTAMP, Direction::Descending)
        .limit(settings.feed_limit)
}

fn to_messages(snapshot: &QuerySnapshot) -> Vec<Message> {
    snapshot.iter().map(Message::from_snapshot).collect()
}

/// A mounted feed subscription
pub struct LiveFeed {
    messages: Arc<watch::Sender<Vec<Message>>>,
    task: Option<JoinHandle<()>>,
}

impl LiveFeed {
    /// Subscribe and apply the initial snapshot before returning
    pub async fn mount(store: &dyn DocumentStore, settings: &ChatSettings) -> StoreResult<Self> {
        let mut subscription = store.subscribe(feed_query(settings)).await?;

        let initial = subscription.next().await.map(|s| to_messages(&s));
        let (sender, _) = watch::channel(initial.unwrap_or_default());
        let messages = Arc::new(sender);

        let state = Arc::clone(&messages);
        let collection = settings.collection.clone();
        let task = tokio::spawn(async move {
            while let Some(snapshot) = subscription.next().await {
                let list = to_messages(&snapshot);
                tracing::trace!(collection = %collection, count = list.len(), "Feed snapshot");
                state.send_replace(list);
            }
            tracing::debug!(collection = %collection, "Feed subscription closed by store");
        });

        tracing::debug!(collection = %settings.collection, limit = settings.feed_limit, "Feed mounted");

        Ok(Self {
            messages,
            task: Some(task),
        })
    }

    /// Current list, newest first
    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    /// Receiver that wakes whenever the list is replaced
    pub fn watch(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.task.is_some()
    }

    /// Cancel the subscription; the list keeps its last value
    pub async fn unmount(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancelled is the expected outcome
            let _ = task.await;
            tracing::debug!("Feed unmounted");
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;
    use crate::chat::message::create_payload;
    use crate::store::MemoryStore;

    async fn post(store: &MemoryStore, comment: &str) {
        let author = User::new("u1").display_name("Ada");
        store
            .create("chats", create_payload(comment, &author))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mount_applies_initial_snapshot() {
        let store = MemoryStore::in_memory();
        post(&store, "first").await;

        let feed = LiveFeed::mount(&store, &ChatSettings::default()).await.unwrap();
        let messages = feed.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].comment, "first");
    }

    #[tokio::test]
    async fn test_feed_replaces_list_on_change() {
        let store = MemoryStore::in_memory();
        let feed = LiveFeed::mount(&store, &ChatSettings::default()).await.unwrap();
        let mut rx = feed.watch();

        post(&store, "hello").await;
        rx.changed().await.unwrap();
        assert_eq!(feed.messages()[0].display_line(), "Ada: hello");
    }

    #[tokio::test]
    async fn test_feed_keeps_ten_most_recent() {
        let store = MemoryStore::in_memory();
        for i in 0..10 {
            post(&store, &format!("m{}", i)).await;
        }
        let feed = LiveFeed::mount(&store, &ChatSettings::default()).await.unwrap();
        let mut rx = feed.watch();
        assert_eq!(feed.messages().last().unwrap().comment, "m0");

        post(&store, "m10").await;
        rx.changed().await.unwrap();

        let messages = feed.messages();
        assert_eq!(messages.len(), 10);
        assert_eq!(messages[0].comment, "m10");
        assert_eq!(messages[9].comment, "m1");
    }

    #[tokio::test]
    async fn test_unmount_stops_updates() {
        let store = MemoryStore::in_memory();
        let mut feed = LiveFeed::mount(&store, &ChatSettings::default()).await.unwrap();

        feed.unmount().await;
        assert!(!feed.is_mounted());

        post(&store, "late").await;
        tokio::task::yield_now().await;
        assert!(feed.messages().is_empty());
        assert_eq!(store.listener_count(), 0);
    }
}
