//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::auth::SessionUser;
use crate::chat::{ChatSettings, MAX_COMMENT_LEN};
use crate::routing::LOGIN_ROUTE;
use crate::store::{JournalSyncMode, StoreConfig as StoreEngineConfig};
use crate::websocket::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_journal_enabled")]
    pub journal_enabled: bool,

    #[serde(default)]
    pub sync_mode: JournalSyncMode,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("guestbook").to_string_lossy().to_string())
        .unwrap_or_else(|| "./guestbook_data".to_string())
}

fn default_journal_enabled() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            journal_enabled: default_journal_enabled(),
            sync_mode: JournalSyncMode::default(),
        }
    }
}

impl StoreConfig {
    pub fn engine_config(&self) -> StoreEngineConfig {
        StoreEngineConfig {
            data_dir: expand_home(&self.data_dir),
            journal_enabled: self.journal_enabled,
            sync_mode: self.sync_mode,
        }
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Chat page configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,

    #[serde(default = "default_max_comment_len")]
    pub max_comment_len: usize,
}

fn default_collection() -> String {
    "chats".to_string()
}

fn default_feed_limit() -> usize {
    10
}

fn default_max_comment_len() -> usize {
    MAX_COMMENT_LEN
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            feed_limit: default_feed_limit(),
            max_comment_len: default_max_comment_len(),
        }
    }
}

/// Identity provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_login_route")]
    pub login_route: String,

    /// Bearer tokens issued by the identity provider
    #[serde(default)]
    pub sessions: Vec<SessionUser>,
}

fn default_login_route() -> String {
    LOGIN_ROUTE.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_route: default_login_route(),
            sessions: Vec::new(),
        }
    }
}

/// WebSocket hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    1000
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Load from file and apply environment overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("guestbook").join("config.toml")),
            Some(PathBuf::from("/etc/guestbook/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("GUESTBOOK_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("GUESTBOOK_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(data_dir) = std::env::var("GUESTBOOK_DATA_DIR") {
            self.store.data_dir = data_dir;
        }
        if let Ok(journal) = std::env::var("GUESTBOOK_JOURNAL") {
            self.store.journal_enabled = journal.to_lowercase() != "false" && journal != "0";
        }

        if let Ok(collection) = std::env::var("GUESTBOOK_COLLECTION") {
            self.chat.collection = collection;
        }

        if let Ok(level) = std::env::var("GUESTBOOK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("GUESTBOOK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Chat page settings derived from `[chat]` and `[auth]`
    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            collection: self.chat.collection.clone(),
            feed_limit: self.chat.feed_limit,
            max_comment_len: self.chat.max_comment_len,
            login_route: self.auth.login_route.clone(),
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            max_connections: self.websocket.max_connections,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Guestbook Configuration
#
# Environment variables override these settings:
# - GUESTBOOK_HOST
# - GUESTBOOK_PORT
# - GUESTBOOK_DATA_DIR
# - GUESTBOOK_JOURNAL
# - GUESTBOOK_COLLECTION
# - GUESTBOOK_LOG_LEVEL
# - GUESTBOOK_LOG_FORMAT

[server]
# HTTP server host
host = "0.0.0.0"

# HTTP server port
port = 8090

# Allowed CORS origins (empty = permissive)
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 30

[store]
# Directory for the store journal
data_dir = "~/.local/share/guestbook"

# Persist writes so they survive restarts
journal_enabled = true

# Journal sync: every_write, batched, none
sync_mode = "batched"

[chat]
# Collection holding guestbook messages
collection = "chats"

# Number of recent messages in the live feed
feed_limit = 10

# Longest accepted comment
max_comment_len = 1000

[auth]
# Where signed-out visitors are redirected
login_route = "/auth/Login"

# Bearer tokens issued by the identity provider
# [[auth.sessions]]
# token = "change-me"
# uid = "user-1"
# display_name = "Ada"
# photo_url = "https://example.com/ada.png"
# email = "ada@example.com"

[websocket]
# Maximum concurrent WebSocket connections
max_connections = 1000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
