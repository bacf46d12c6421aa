// ABOUTME: Route definitions for the rewind HTTP API.
// ABOUTME: Assembles all API routes into a single Axum Router with shared state and request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::SharedState;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/events", post(api::events::append_event))
        .route("/api/events/feed", get(api::events::activity_feed))
        .route("/api/events/{entity_type}/{entity_id}/history", get(api::events::entity_history))
        .route("/api/events/{entity_type}/{entity_id}/state-at", get(api::events::state_at))
        .route("/api/events/{entity_type}/{entity_id}/diff", get(api::events::diff_states))
        .route("/api/events/{entity_type}/{entity_id}/replay", get(api::events::replay_events))
        .route("/api/events/{entity_type}/{entity_id}/restore", post(api::events::restore_entity))
        .route("/api/audit", get(api::audit::list_audit_logs))
        .route("/api/audit/stats", get(api::audit::audit_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler. Returns 200 OK with a simple JSON body.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
