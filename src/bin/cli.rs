//! Guestbook CLI
//!
//! Command-line client for a running guestbook server:
//! - Post and edit messages
//! - Show the feed
//! - Check status
//! - Generate a config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use guestbook::api::dto::{FeedResponse, MessageDto, SubmitRequest, SubmitResponse};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "guestbook-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Post to and read a guestbook server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8090", global = true)]
    pub api_url: String,

    /// Session token sent as `Authorization: Bearer <token>`
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Post a new message
    Post {
        comment: String,
    },

    /// Replace the text of an existing message
    Edit {
        /// Message id
        id: String,
        comment: String,
    },

    /// Show the most recent messages
    Feed,

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Post { ref comment } => {
            let request = SubmitRequest {
                comment: comment.clone(),
                id: None,
            };
            let response = submit(&client, &cli, &request).await?;
            println!("Posted message {}", response.id);
        }

        Commands::Edit { ref id, ref comment } => {
            let request = SubmitRequest {
                comment: comment.clone(),
                id: Some(id.clone()),
            };
            let response = submit(&client, &cli, &request).await?;
            println!("Updated message {}", response.id);
        }

        Commands::Feed => {
            let response = client
                .get(format!("{}/api/v1/chat/messages", cli.api_url))
                .send()
                .await
                .with_context(|| format!("Cannot connect to guestbook API at {}", cli.api_url))?;

            if !response.status().is_success() {
                bail!("Failed to fetch feed: {}", response.status());
            }

            let feed: FeedResponse = response.json().await?;
            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&feed.messages)?),
                _ => print_feed(&feed.messages),
            }
        }

        Commands::Status => {
            let response = client
                .get(format!("{}/health", cli.api_url))
                .send()
                .await
                .with_context(|| format!("Cannot connect to guestbook API at {}", cli.api_url))?;

            if !response.status().is_success() {
                bail!("API returned error: {}", response.status());
            }

            let health: serde_json::Value = response.json().await?;
            println!("Guestbook v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!(
                "API Status: {}",
                health["status"].as_str().unwrap_or("unknown")
            );

            if let Some(store) = health.get("store_stats") {
                println!();
                println!("Store:");
                if let Some(documents) = store["documents"].as_u64() {
                    println!("  Documents: {}", documents);
                }
                if let Some(writes) = store["writes"].as_u64() {
                    println!("  Writes: {}", writes);
                }
            }

            if let Some(connections) = health["websocket_connections"].as_u64() {
                println!("  Live connections: {}", connections);
            }

            if let Some(uptime) = health["uptime_seconds"].as_u64() {
                println!();
                println!("Uptime: {}", format_duration(uptime));
            }
        }

        Commands::Config { output } => {
            let config = guestbook::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

async fn submit(
    client: &reqwest::Client,
    cli: &Cli,
    request: &SubmitRequest,
) -> anyhow::Result<SubmitResponse> {
    let mut builder = client
        .post(format!("{}/api/v1/chat/messages", cli.api_url))
        .json(request);
    if let Some(token) = &cli.token {
        builder = builder.bearer_auth(token);
    }

    let response = builder
        .send()
        .await
        .with_context(|| format!("Cannot connect to guestbook API at {}", cli.api_url))?;

    let status = response.status();
    if !status.is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body["error"]["message"].as_str().unwrap_or("unknown error");
        bail!("Failed ({}): {}", status, message);
    }

    let submitted: SubmitResponse = response.json().await?;
    for notice in &submitted.notices {
        eprintln!("{}", notice.message);
    }
    Ok(submitted)
}

fn print_feed(messages: &[MessageDto]) {
    if messages.is_empty() {
        println!("No messages yet.");
        return;
    }

    println!("{:<20} {:<34} {}", "Posted", "Id", "Message");
    println!("{}", "-".repeat(80));

    for message in messages {
        let posted = message
            .timestamp
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let author = message.username.as_deref().unwrap_or("");

        println!(
            "{:<20} {:<34} {}: {}",
            posted, message.id, author, message.comment
        );
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
