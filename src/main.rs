// ABOUTME: Entry point for the rewind binary.
// ABOUTME: Parses CLI arguments, initializes tracing, and serves the HTTP API or runs an offline query.

mod commands;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rewind_core::ReplayPolicy;
use rewind_server::RewindConfig;

/// rewind - event-sourced audit store with time travel, diff, replay, and restore.
#[derive(Debug, Parser)]
#[command(name = "rewind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQLite database path (overrides REWIND_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Replay policy: `all` or `canonical` (overrides REWIND_REPLAY_POLICY)
    #[arg(long, global = true)]
    replay_policy: Option<ReplayPolicy>,

    /// Output format for query commands
    #[arg(long, global = true, value_enum, default_value_t = Format::Json)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve {
        /// Socket address to bind (overrides REWIND_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Print every change record for an entity, oldest first
    History { entity_type: String, entity_id: i64 },

    /// Reconstruct an entity as it was at a moment
    StateAt {
        entity_type: String,
        entity_id: i64,
        /// RFC 3339, YYYY-MM-DDTHH:MM:SS, or YYYY-MM-DD (UTC)
        timestamp: String,
    },

    /// Compare an entity between two moments
    Diff {
        entity_type: String,
        entity_id: i64,
        from: String,
        to: String,
    },

    /// Replay an entity's history step by step
    Replay {
        entity_type: String,
        entity_id: i64,
        /// Stop after the last record at or before this moment
        #[arg(long)]
        until: Option<String>,
    },

    /// Roll an entity's live row back to its state at a moment
    Restore {
        entity_type: String,
        entity_id: i64,
        to: String,
    },

    /// Show the most recent changes across entities
    Feed {
        #[arg(short, long, default_value_t = 50)]
        limit: u32,

        /// Only include these entity types (repeatable)
        #[arg(short = 't', long = "entity-type")]
        entity_types: Vec<String>,
    },

    /// List audit records, newest first
    Audit {
        #[arg(long)]
        entity_type: Option<String>,

        #[arg(long)]
        entity_id: Option<i64>,

        #[arg(short, long, default_value_t = 100)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Show audit log statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; everything has a default.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rewind=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = RewindConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(policy) = cli.replay_policy {
        config.replay_policy = policy;
    }

    commands::run(cli.command, config, cli.format).await
}
