//! In-memory document store
//!
//! Collections live in memory behind one async `RwLock`; writes are
//! serialized, stamped with strictly increasing server time, optionally
//! journaled, and fanned out to every listener whose result set changed.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{mpsc, RwLock};

use super::error::{StoreError, StoreResult};
use super::journal::{Journal, JournalEntry, JournalSyncMode};
use super::subscription::Subscription;
use super::types::{
    validate_collection, DocumentId, DocumentPath, DocumentSnapshot, FieldValue, Fields, Query,
    QuerySnapshot, Timestamp,
};
use super::{DocumentStore, StoreStats};

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for the journal
    pub data_dir: PathBuf,
    /// Persist writes to the journal
    pub journal_enabled: bool,
    /// Journal sync strategy
    pub sync_mode: JournalSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("guestbook_data"),
            journal_enabled: true,
            sync_mode: JournalSyncMode::Batched,
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Get path to the journal file
    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("journal").join("store.journal")
    }
}

type Collection = BTreeMap<DocumentId, Fields>;

/// Document state plus the server clock
#[derive(Default)]
struct StoreState {
    collections: HashMap<String, Collection>,
    last_timestamp: i64,
    writes: u64,
}

impl StoreState {
    /// Next server timestamp, never equal to or below the previous one
    fn next_timestamp(&mut self) -> Timestamp {
        let now = Utc::now().timestamp_micros();
        self.last_timestamp = now.max(self.last_timestamp + 1);
        Timestamp::from_micros(self.last_timestamp)
    }

    fn apply(&mut self, entry: JournalEntry) {
        for value in entry_fields(&entry).values() {
            if let FieldValue::Timestamp(ts) = value {
                self.last_timestamp = self.last_timestamp.max(ts.as_micros());
            }
        }

        match entry {
            JournalEntry::Created { path, fields } => {
                self.collections
                    .entry(path.collection)
                    .or_default()
                    .insert(path.id, fields);
            }
            JournalEntry::Updated { path, fields } => {
                if let Some(doc) = self
                    .collections
                    .get_mut(&path.collection)
                    .and_then(|c| c.get_mut(&path.id))
                {
                    doc.extend(fields);
                }
            }
        }
        self.writes += 1;
    }

    fn evaluate(&self, query: &Query) -> QuerySnapshot {
        match self.collections.get(&query.collection) {
            Some(collection) => query.evaluate(collection.iter()),
            None => QuerySnapshot::default(),
        }
    }
}

fn entry_fields(entry: &JournalEntry) -> &Fields {
    match entry {
        JournalEntry::Created { fields, .. } | JournalEntry::Updated { fields, .. } => fields,
    }
}

/// A registered snapshot listener
struct Listener {
    query: Query,
    sender: mpsc::UnboundedSender<QuerySnapshot>,
    last: QuerySnapshot,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: HashMap<u64, Listener>,
}

impl ListenerRegistry {
    /// Push the new result set to listeners of `collection` whose view changed
    fn notify(&mut self, collection: &str, state: &StoreState) {
        let mut closed = Vec::new();

        for (id, listener) in self.listeners.iter_mut() {
            if listener.query.collection != collection {
                continue;
            }

            let snapshot = state.evaluate(&listener.query);
            if snapshot == listener.last {
                continue;
            }

            if listener.sender.send(snapshot.clone()).is_err() {
                closed.push(*id);
            } else {
                listener.last = snapshot;
            }
        }

        for id in closed {
            self.listeners.remove(&id);
        }
    }
}

/// The embedded document store
pub struct MemoryStore {
    state: RwLock<StoreState>,
    journal: Option<Mutex<Journal>>,
    listeners: Arc<Mutex<ListenerRegistry>>,
}

impl MemoryStore {
    /// Store without persistence
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            journal: None,
            listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
        }
    }

    /// Open a store, replaying its journal if enabled
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        if !config.journal_enabled {
            tracing::info!("Journal disabled, store is memory only");
            return Ok(Self::in_memory());
        }

        let journal = Journal::open(config.journal_path(), config.sync_mode)?;
        let entries = journal.recover()?;

        let mut state = StoreState::default();
        let replayed = entries.len();
        for entry in entries {
            state.apply(entry);
        }

        if replayed > 0 {
            tracing::info!(
                entries = replayed,
                path = %journal.path().display(),
                "Replayed store journal"
            );
        }

        Ok(Self {
            state: RwLock::new(state),
            journal: Some(Mutex::new(journal)),
            listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
        })
    }

    /// Journal an entry, apply it, and notify listeners
    fn commit(&self, state: &mut StoreState, entry: JournalEntry) -> StoreResult<()> {
        if let Some(journal) = &self.journal {
            journal
                .lock()
                .map_err(|_| StoreError::Journal("journal lock poisoned".to_string()))?
                .append(&entry)?;
        }

        let collection = entry.path().collection.clone();
        state.apply(entry);

        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.notify(&collection, state);
        }
        Ok(())
    }

    /// Flush the journal to disk; a no-op without one
    pub fn sync(&self) -> StoreResult<()> {
        match &self.journal {
            Some(journal) => journal
                .lock()
                .map_err(|_| StoreError::Journal("journal lock poisoned".to_string()))?
                .sync(),
            None => Ok(()),
        }
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.listeners.len()).unwrap_or(0)
    }
}

/// Replace every `ServerTimestamp` placeholder with the write's time
fn resolve_server_timestamps(fields: Fields, now: Timestamp) -> Fields {
    fields
        .into_iter()
        .map(|(name, value)| match value {
            FieldValue::ServerTimestamp => (name, FieldValue::Timestamp(now)),
            other => (name, other),
        })
        .collect()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<DocumentId> {
        validate_collection(collection)?;

        let mut state = self.state.write().await;
        let now = state.next_timestamp();
        let id = DocumentId::generate();
        let path = DocumentPath::new(collection, id.clone())?;

        let fields = resolve_server_timestamps(fields, now);
        self.commit(&mut state, JournalEntry::Created { path, fields })?;

        tracing::debug!(collection = %collection, id = %id, "Document created");
        Ok(id)
    }

    async fn update(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()> {
        if fields.is_empty() {
            return Err(StoreError::InvalidPayload("update has no fields".to_string()));
        }

        let mut state = self.state.write().await;
        let exists = state
            .collections
            .get(&path.collection)
            .map(|c| c.contains_key(&path.id))
            .unwrap_or(false);
        if !exists {
            return Err(StoreError::NotFound(path.to_string()));
        }

        let now = state.next_timestamp();
        let fields = resolve_server_timestamps(fields, now);
        self.commit(
            &mut state,
            JournalEntry::Updated {
                path: path.clone(),
                fields,
            },
        )?;

        tracing::debug!(path = %path, "Document updated");
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<DocumentSnapshot>> {
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(&path.collection)
            .and_then(|c| c.get(&path.id))
            .map(|fields| DocumentSnapshot {
                id: path.id.clone(),
                fields: fields.clone(),
            }))
    }

    async fn query(&self, query: &Query) -> StoreResult<QuerySnapshot> {
        validate_collection(&query.collection)?;
        Ok(self.state.read().await.evaluate(query))
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        validate_collection(&query.collection)?;

        // Holding the read lock keeps writes out until the listener is registered
        let state = self.state.read().await;
        let initial = state.evaluate(&query);

        let (sender, receiver) = mpsc::unbounded_channel();
        // The initial result set is always delivered, even when empty
        let _ = sender.send(initial.clone());

        let mut registry = self
            .listeners
            .lock()
            .map_err(|_| StoreError::Journal("listener lock poisoned".to_string()))?;
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(
            id,
            Listener {
                query,
                sender,
                last: initial,
            },
        );
        drop(registry);
        drop(state);

        let weak: Weak<Mutex<ListenerRegistry>> = Arc::downgrade(&self.listeners);
        Ok(Subscription::new(receiver, move || {
            if let Some(registry) = weak.upgrade() {
                if let Ok(mut registry) = registry.lock() {
                    registry.listeners.remove(&id);
                }
            }
        }))
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let state = self.state.read().await;
        let documents = state.collections.values().map(|c| c.len()).sum();
        Ok(StoreStats {
            collections: state.collections.len(),
            documents,
            writes: state.writes,
            listeners: self.listener_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::Direction;
    use tempfile::tempdir;

    fn comment(text: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("comment".to_string(), FieldValue::from(text));
        fields.insert("timestamp".to_string(), FieldValue::ServerTimestamp);
        fields
    }

    fn feed_query() -> Query {
        Query::collection("chats")
            .order_by("timestamp", Direction::Descending)
            .limit(10)
    }

    #[tokio::test]
    async fn test_create_resolves_server_timestamp() {
        let store = MemoryStore::in_memory();
        let id = store.create("chats", comment("hello")).await.unwrap();

        let path = DocumentPath::new("chats", id).unwrap();
        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.get_str("comment"), Some("hello"));
        assert!(matches!(doc.get("timestamp"), Some(FieldValue::Timestamp(_))));
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let store = MemoryStore::in_memory();
        for i in 0..20 {
            store.create("chats", comment(&i.to_string())).await.unwrap();
        }

        let snapshot = store
            .query(&Query::collection("chats").order_by("timestamp", Direction::Ascending))
            .await
            .unwrap();
        let stamps: Vec<_> = snapshot
            .iter()
            .map(|d| d.get("timestamp").and_then(FieldValue::as_timestamp).unwrap())
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(snapshot.docs[0].get_str("comment"), Some("0"));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::in_memory();
        let mut fields = comment("first");
        fields.insert("username".to_string(), FieldValue::from("Ada"));
        let id = store.create("chats", fields).await.unwrap();
        let path = DocumentPath::new("chats", id).unwrap();

        store.update(&path, comment("second")).await.unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.get_str("comment"), Some("second"));
        assert_eq!(doc.get_str("username"), Some("Ada"));
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = MemoryStore::in_memory();
        let path = DocumentPath::parse("chats/missing").unwrap();
        let result = store.update(&path, comment("x")).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(store.stats().await.unwrap().writes, 0);
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_and_changes() {
        let store = MemoryStore::in_memory();
        store.create("chats", comment("before")).await.unwrap();

        let mut sub = store.subscribe(feed_query()).await.unwrap();
        let initial = sub.next().await.unwrap();
        assert_eq!(initial.len(), 1);

        store.create("chats", comment("after")).await.unwrap();
        let changed = sub.next().await.unwrap();
        assert_eq!(changed.len(), 2);
        assert_eq!(changed.docs[0].get_str("comment"), Some("after"));
    }

    #[tokio::test]
    async fn test_unrelated_collection_does_not_notify() {
        let store = MemoryStore::in_memory();
        let mut sub = store.subscribe(feed_query()).await.unwrap();
        let _ = sub.next().await.unwrap();

        store.create("votes", comment("x")).await.unwrap();
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let store = MemoryStore::in_memory();
        let sub = store.subscribe(feed_query()).await.unwrap();
        assert_eq!(store.listener_count(), 1);

        sub.unsubscribe();
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_eleventh_record_evicts_oldest() {
        let store = MemoryStore::in_memory();
        for i in 0..10 {
            store.create("chats", comment(&format!("m{}", i))).await.unwrap();
        }

        let mut sub = store.subscribe(feed_query()).await.unwrap();
        let initial = sub.next().await.unwrap();
        assert_eq!(initial.docs[9].get_str("comment"), Some("m0"));

        store.create("chats", comment("m10")).await.unwrap();
        let changed = sub.next().await.unwrap();
        assert_eq!(changed.len(), 10);
        assert_eq!(changed.docs[0].get_str("comment"), Some("m10"));
        assert!(changed.iter().all(|d| d.get_str("comment") != Some("m0")));
    }

    #[tokio::test]
    async fn test_journal_replay() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path());

        let path = {
            let store = MemoryStore::open(config.clone()).await.unwrap();
            let id = store.create("chats", comment("persisted")).await.unwrap();
            let path = DocumentPath::new("chats", id).unwrap();
            store.update(&path, comment("edited")).await.unwrap();
            path
        };

        let store = MemoryStore::open(config).await.unwrap();
        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.get_str("comment"), Some("edited"));

        // The clock resumes after the replayed timestamps
        let replayed = doc.get("timestamp").and_then(FieldValue::as_timestamp).unwrap();
        let id = store.create("chats", comment("new")).await.unwrap();
        let fresh = store
            .get(&DocumentPath::new("chats", id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(fresh.get("timestamp").and_then(FieldValue::as_timestamp).unwrap() > replayed);
    }

    #[tokio::test]
    async fn test_writes_after_torn_tail_survive_restart() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path());

        {
            let store = MemoryStore::open(config.clone()).await.unwrap();
            store.create("chats", comment("before")).await.unwrap();
            store.sync().unwrap();
        }

        {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(config.journal_path())
                .unwrap();
            file.write_all(&[0x01, 0x02]).unwrap();
        }

        let path = {
            let store = MemoryStore::open(config.clone()).await.unwrap();
            let id = store.create("chats", comment("after")).await.unwrap();
            store.sync().unwrap();
            DocumentPath::new("chats", id).unwrap()
        };

        let store = MemoryStore::open(config).await.unwrap();
        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.get_str("comment"), Some("after"));
        assert_eq!(store.stats().await.unwrap().documents, 2);
    }

    #[tokio::test]
    async fn test_invalid_collection() {
        let store = MemoryStore::in_memory();
        assert!(matches!(
            store.create("a/b", comment("x")).await,
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_sync_with_and_without_journal() {
        assert!(MemoryStore::in_memory().sync().is_ok());

        let dir = tempdir().unwrap();
        let config = StoreConfig {
            sync_mode: JournalSyncMode::None,
            ..StoreConfig::new(dir.path())
        };
        let store = MemoryStore::open(config.clone()).await.unwrap();
        store.create("chats", comment("kept")).await.unwrap();
        store.sync().unwrap();

        assert!(config.journal_path().exists());
    }
}
