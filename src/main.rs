//! Guestbook Server
//!
//! Run with: cargo run --bin guestbook -- [--config PATH]
//!
//! # Configuration
//!
//! Without `--config` the server looks for `config.toml` in the user config
//! directory, `/etc/guestbook` and the working directory. Environment
//! variables override file values:
//! - `GUESTBOOK_HOST`, `GUESTBOOK_PORT`: Bind address (default: 0.0.0.0:8090)
//! - `GUESTBOOK_DATA_DIR`: Journal location
//! - `GUESTBOOK_JOURNAL`: Set to `false` to keep messages in memory only
//! - `GUESTBOOK_COLLECTION`: Message collection (default: chats)
//! - `GUESTBOOK_LOG_LEVEL`, `GUESTBOOK_LOG_FORMAT`: Logging (`pretty` or `json`)
//! - `RUST_LOG`: Full filter, takes precedence over the log level

use anyhow::Context;
use clap::Parser;
use guestbook::api::{serve, AppState};
use guestbook::config::{Config, LoggingConfig};
use guestbook::store::{DocumentStore, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "guestbook")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Guestbook server with a live message feed")]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("Starting guestbook server v{}", env!("CARGO_PKG_VERSION"));

    let store_config = config.store.engine_config();
    if store_config.journal_enabled {
        tracing::info!("Journal: {:?}", store_config.journal_path());
    } else {
        tracing::info!("Journal disabled, messages are kept in memory only");
    }

    let store = Arc::new(
        MemoryStore::open(store_config)
            .await
            .context("Failed to open document store")?,
    );
    tracing::info!("Document store ready: {}", store.stats().await?);

    let state = AppState::new(store.clone(), &config)
        .await
        .context("Failed to mount the message feed")?;

    serve(state).await.context("API server failed")?;

    store.sync().context("Failed to sync journal")?;
    tracing::info!("Guestbook server stopped");

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("guestbook={},tower_http=info", logging.level).into()
    });

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
