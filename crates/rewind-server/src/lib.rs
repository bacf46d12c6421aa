// ABOUTME: HTTP server for rewind, exposing history, time travel, diff, replay, restore, and the activity feed.
// ABOUTME: Uses Axum over a shared EventStore; store calls run on the blocking pool.

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod routes;

pub use app_state::{AppState, SharedState};
pub use config::{ConfigError, RewindConfig};
pub use error::ApiError;
pub use routes::create_router;
