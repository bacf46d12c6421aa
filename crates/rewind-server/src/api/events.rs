// ABOUTME: Entity event handlers: append, history, state-at, diff, replay, restore, and the activity feed.
// ABOUTME: Timestamps arrive as query strings and are parsed before touching the store.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use rewind_core::{ChangeRecord, EntityState, NewChange, ReplayPolicy, ReplayStep, StateAt, parse_timestamp};
use rewind_store::{FeedEntry, RestoreOutcome, StoreError};
use serde::{Deserialize, Serialize};

use crate::api::page_limit;
use crate::app_state::SharedState;
use crate::error::ApiError;

/// Feed page size when the caller does not ask for one.
pub const DEFAULT_FEED_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<u32>,
    /// Comma-separated entity types, e.g. `task,incident`.
    pub entity_types: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StateAtQuery {
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplayQuery {
    pub until: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RestoreQuery {
    pub to: String,
}

/// Response body for an entity's full history.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub entity_type: String,
    pub entity_id: i64,
    pub event_count: usize,
    pub first_event: DateTime<Utc>,
    pub last_event: DateTime<Utc>,
    pub events: Vec<ChangeRecord>,
}

#[derive(Debug, Serialize)]
pub struct StateAtResponse {
    pub entity_type: String,
    pub entity_id: i64,
    pub requested_timestamp: String,
    #[serde(flatten)]
    pub found: StateAt,
}

#[derive(Debug, Serialize)]
struct ReplayResponse<'a> {
    entity_type: &'a str,
    entity_id: i64,
    policy: ReplayPolicy,
    replayed_events: usize,
    final_state: Option<&'a EntityState>,
    replay: &'a [ReplayStep<'a>],
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: RestoreOutcome,
}

fn split_entity_types(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// POST /api/events - Append a change record.
pub async fn append_event(
    State(state): State<SharedState>,
    Json(change): Json<NewChange>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.run(move |store| store.record(&change)).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// GET /api/events/feed - Most recent changes across entities.
pub async fn activity_feed(
    State(state): State<SharedState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedEntry>>, ApiError> {
    let limit = page_limit(query.limit, DEFAULT_FEED_LIMIT, state.feed_max_limit)?;
    let entity_types = split_entity_types(query.entity_types.as_deref());

    let feed = state
        .run(move |store| store.activity_feed(limit, &entity_types))
        .await?;
    Ok(Json(feed))
}

/// GET /api/events/{entity_type}/{entity_id}/history - Every record for one entity.
pub async fn entity_history(
    State(state): State<SharedState>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let kind = entity_type.clone();
    let events = state.run(move |store| store.history(&kind, entity_id)).await?;

    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return Err(ApiError::NotFound(format!(
            "no history found for {entity_type} #{entity_id}"
        )));
    };
    let (first_event, last_event) = (first.timestamp, last.timestamp);

    Ok(Json(HistoryResponse {
        entity_type,
        entity_id,
        event_count: events.len(),
        first_event,
        last_event,
        events,
    }))
}

/// GET /api/events/{entity_type}/{entity_id}/state-at?timestamp= - Time travel.
pub async fn state_at(
    State(state): State<SharedState>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
    Query(query): Query<StateAtQuery>,
) -> Result<Json<StateAtResponse>, ApiError> {
    let at = parse_timestamp(&query.timestamp)?;

    let kind = entity_type.clone();
    let found = state
        .run(move |store| store.require_state_at(&kind, entity_id, at))
        .await?;

    Ok(Json(StateAtResponse {
        entity_type,
        entity_id,
        requested_timestamp: query.timestamp,
        found,
    }))
}

/// GET /api/events/{entity_type}/{entity_id}/diff?from=&to= - Field changes between two moments.
pub async fn diff_states(
    State(state): State<SharedState>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
    Query(query): Query<DiffQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from = parse_timestamp(&query.from)?;
    let to = parse_timestamp(&query.to)?;

    let diff = state
        .run(move |store| store.diff(&entity_type, entity_id, from, to))
        .await?;
    Ok(Json(diff))
}

/// GET /api/events/{entity_type}/{entity_id}/replay?until= - Step-by-step state evolution.
pub async fn replay_events(
    State(state): State<SharedState>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
    Query(query): Query<ReplayQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let until = query.until.as_deref().map(parse_timestamp).transpose()?;

    let kind = entity_type.clone();
    let replay = state
        .run(move |store| store.replay(&kind, entity_id, until))
        .await?;
    if replay.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no events found for {entity_type} #{entity_id}"
        )));
    }

    let steps: Vec<ReplayStep<'_>> = replay.iter().collect();
    let body = serde_json::to_value(ReplayResponse {
        entity_type: &entity_type,
        entity_id,
        policy: replay.policy(),
        replayed_events: steps.len(),
        final_state: steps.last().map(|step| &step.state_after),
        replay: &steps,
    })
    .map_err(StoreError::from)?;

    Ok(Json(body))
}

/// POST /api/events/{entity_type}/{entity_id}/restore?to= - Roll an entity back.
pub async fn restore_entity(
    State(state): State<SharedState>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
    Query(query): Query<RestoreQuery>,
) -> Result<Json<RestoreResponse>, ApiError> {
    let to = parse_timestamp(&query.to)?;

    let outcome = state
        .run(move |store| store.restore(&entity_type, entity_id, to))
        .await?;
    Ok(Json(RestoreResponse {
        success: true,
        outcome,
    }))
}
