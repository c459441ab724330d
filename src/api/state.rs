//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::{AuthProvider, SessionRegistry};
use crate::chat::{ChatPage, ChatSettings, LiveFeed, Notifier, PageContext};
use crate::config::{Config, ServerConfig};
use crate::dashboard::DashboardPage;
use crate::routing::Navigator;
use crate::store::{DocumentStore, StoreResult};
use crate::websocket::{spawn_feed_relay, ConnectionHub};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Document store holding the guestbook
    pub store: Arc<dyn DocumentStore>,
    /// Bearer tokens known to the server
    pub sessions: Arc<SessionRegistry>,
    pub settings: ChatSettings,
    /// Server configuration
    pub server: Arc<ServerConfig>,
    /// Feed shared by every request and WebSocket client
    pub feed: Arc<LiveFeed>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// WebSocket connection hub for real-time streaming
    pub ws_hub: Arc<ConnectionHub>,
    pub dashboard: Arc<DashboardPage>,
}

impl AppState {
    /// Mount the shared feed and start relaying it to WebSocket clients
    pub async fn new(store: Arc<dyn DocumentStore>, config: &Config) -> StoreResult<Self> {
        let settings = config.chat_settings();
        let feed = LiveFeed::mount(store.as_ref(), &settings).await?;
        let ws_hub = Arc::new(ConnectionHub::new(config.hub_config()));
        spawn_feed_relay(feed.watch(), Arc::clone(&ws_hub));

        let sessions = SessionRegistry::from_config(&config.auth.sessions);
        tracing::info!(
            collection = %settings.collection,
            sessions = sessions.len(),
            "Application state ready"
        );

        Ok(Self {
            store,
            sessions: Arc::new(sessions),
            settings,
            server: Arc::new(config.server.clone()),
            feed: Arc::new(feed),
            start_time: Instant::now(),
            ws_hub,
            dashboard: Arc::new(DashboardPage::default()),
        })
    }

    /// A chat page for a single request
    pub fn chat_page(
        &self,
        auth: Arc<dyn AuthProvider>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> ChatPage {
        ChatPage::new(PageContext {
            store: Arc::clone(&self.store),
            auth,
            navigator,
            notifier,
            settings: self.settings.clone(),
        })
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}
