// ABOUTME: Shared application state for the rewind HTTP server.
// ABOUTME: Holds the EventStore and page-size cap, and runs store calls on the blocking pool.

use std::sync::Arc;

use rewind_store::{EventStore, StoreError};

use crate::config::RewindConfig;
use crate::error::ApiError;

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub store: Arc<EventStore>,
    /// Largest `limit` the feed and audit listing will serve.
    pub feed_max_limit: u32,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(store: EventStore, feed_max_limit: u32) -> Self {
        Self {
            store: Arc::new(store),
            feed_max_limit,
        }
    }

    /// State with the default page-size cap, for tests and embedding.
    pub fn with_store(store: EventStore) -> Self {
        Self::new(store, RewindConfig::DEFAULT_FEED_MAX_LIMIT)
    }

    /// Run a synchronous store operation without stalling the async runtime.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&EventStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?;
        Ok(result?)
    }
}
