//! Guestbook Document Store
//!
//! A document database with named collections, ordered/limited queries and
//! snapshot subscriptions:
//!
//! - **types**: Documents, field values, paths, queries, snapshots
//! - **subscription**: Live handles on a query's result set
//! - **journal**: Append-only journal for durability
//! - **memory**: The embedded store implementation
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   create/update → resolve ServerTimestamp → Journal → Collections → Listeners
//!
//! Read Path:
//!   Query → Collection → Order/Limit → QuerySnapshot
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use guestbook::store::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::open(StoreConfig::new("./data")).await?;
//!
//!     let mut fields = Fields::new();
//!     fields.insert("comment".into(), FieldValue::from("hello"));
//!     fields.insert("timestamp".into(), FieldValue::ServerTimestamp);
//!     store.create("chats", fields).await?;
//!
//!     let query = Query::collection("chats")
//!         .order_by("timestamp", Direction::Descending)
//!         .limit(10);
//!     let mut feed = store.subscribe(query).await?;
//!     while let Some(snapshot) = feed.next().await {
//!         println!("{} messages", snapshot.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod journal;
pub mod memory;
pub mod subscription;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use journal::{Journal, JournalEntry, JournalSyncMode};
pub use memory::{MemoryStore, StoreConfig};
pub use subscription::Subscription;
pub use types::{
    Direction, DocumentId, DocumentPath, DocumentSnapshot, FieldValue, Fields, Query,
    QuerySnapshot, Timestamp,
};

use async_trait::async_trait;
use serde::Serialize;

/// Operations the pages need from a document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Add a document to a collection; the store assigns its id
    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<DocumentId>;

    /// Merge fields into an existing document
    async fn update(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()>;

    /// Read one document
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<DocumentSnapshot>>;

    /// Run a query once
    async fn query(&self, query: &Query) -> StoreResult<QuerySnapshot>;

    /// Receive the query's result set now and after every change to it
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription>;

    /// Counters for health reporting
    async fn stats(&self) -> StoreResult<StoreStats>;
}

/// Store counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub collections: usize,
    pub documents: usize,
    pub writes: u64,
    pub listeners: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} documents in {} collections, {} writes, {} listeners",
            self.documents, self.collections, self.writes, self.listeners
        )
    }
}
