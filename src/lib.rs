//! # Guestbook
//!
//! A live guestbook: signed-in visitors post short messages and everyone
//! sees the ten most recent ones, updated as they are written.
//!
//! ## Features
//!
//! - **Document store**: Embedded collections with server timestamps and live queries
//! - **Durability**: Optional checksummed journal replayed on start
//! - **Chat page**: Validated posting and in-place edits through `?id=..&comment=..` links
//! - **Real-time**: WebSocket push of the feed
//!
//! ## Modules
//!
//! - [`store`]: Document store and live query subscriptions
//! - [`chat`]: Chat page, live feed and message model
//! - [`auth`]: Signed-in user state and bearer sessions
//! - [`routing`]: Navigation and query parameters
//! - [`dashboard`]: Settings page
//! - [`api`]: REST API server with Axum
//! - [`websocket`]: Live feed streaming
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use guestbook::auth::{AuthHandle, User};
//! use guestbook::chat::{ChatPage, ChatSettings, PageContext, TracingNotifier};
//! use guestbook::routing::RouteState;
//! use guestbook::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut page = ChatPage::new(PageContext {
//!         store: Arc::new(MemoryStore::in_memory()),
//!         auth: Arc::new(AuthHandle::signed_in(User::new("u1").display_name("Ada"))),
//!         navigator: Arc::new(RouteState::default()),
//!         notifier: Arc::new(TracingNotifier),
//!         settings: ChatSettings::default(),
//!     });
//!
//!     page.mount().await?;
//!     page.set_comment("hello").await;
//!     page.submit_message().await?;
//!
//!     page.unmount().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod routing;
pub mod store;
pub mod websocket;

// Re-export top-level types for convenience
pub use store::{
    DocumentId, DocumentPath, DocumentStore, FieldValue, MemoryStore, Query, StoreError,
    StoreResult, StoreStats, Timestamp,
};

pub use chat::{
    ChatPage, ChatSettings, LiveFeed, Message, MessageDraft, PageContext, SubmitError,
    SubmitOutcome,
};

pub use auth::{AuthHandle, AuthProvider, AuthState, SessionRegistry, User};

pub use routing::{Navigator, RouteState};

pub use api::{build_router, serve, ApiError, AppState};

pub use websocket::{ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent};

pub use config::{Config, ConfigError, LoggingConfig};
