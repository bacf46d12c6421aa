// ABOUTME: Configuration loading and validation for the rewind server.
// ABOUTME: Reads REWIND_* environment variables and applies defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use rewind_core::ReplayPolicy;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("REWIND_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("REWIND_FEED_MAX_LIMIT must be a positive integer, got {0:?}")]
    InvalidFeedLimit(String),

    #[error("REWIND_REPLAY_POLICY is invalid: {0}")]
    InvalidReplayPolicy(String),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RewindConfig {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub feed_max_limit: u32,
    pub replay_policy: ReplayPolicy,
}

impl RewindConfig {
    pub const DEFAULT_BIND: &'static str = "127.0.0.1:7440";
    pub const DEFAULT_FEED_MAX_LIMIT: u32 = 200;

    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - REWIND_DB: SQLite database path (default: ~/.rewind/rewind.db)
    /// - REWIND_BIND: socket address to bind (default: 127.0.0.1:7440)
    /// - REWIND_FEED_MAX_LIMIT: largest page the feed and audit listing serve (default: 200)
    /// - REWIND_REPLAY_POLICY: `all` or `canonical` (default: all)
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("REWIND_DB")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let bind_str = std::env::var("REWIND_BIND").unwrap_or_else(|_| Self::DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let feed_max_limit = match std::env::var("REWIND_FEED_MAX_LIMIT") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidFeedLimit(raw)),
            },
            Err(_) => Self::DEFAULT_FEED_MAX_LIMIT,
        };

        let replay_policy = match std::env::var("REWIND_REPLAY_POLICY") {
            Ok(raw) => raw
                .parse::<ReplayPolicy>()
                .map_err(ConfigError::InvalidReplayPolicy)?,
            Err(_) => ReplayPolicy::default(),
        };

        Ok(Self {
            db_path,
            bind,
            feed_max_limit,
            replay_policy,
        })
    }
}

fn default_db_path() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".rewind")
        .join("rewind.db")
}
