// ABOUTME: Audit log handlers: paged listing with entity filters, and aggregate statistics.

use axum::Json;
use axum::extract::{Query, State};
use rewind_core::ChangeRecord;
use rewind_store::{AuditFilter, AuditStats};
use serde::Deserialize;

use crate::api::page_limit;
use crate::app_state::SharedState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// GET /api/audit - List change records, newest first.
pub async fn list_audit_logs(
    State(state): State<SharedState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<ChangeRecord>>, ApiError> {
    let defaults = AuditFilter::default();
    let filter = AuditFilter {
        limit: page_limit(query.limit, defaults.limit, state.feed_max_limit)?,
        offset: query.offset.unwrap_or(defaults.offset),
        entity_type: query.entity_type.filter(|t| !t.is_empty()),
        entity_id: query.entity_id,
    };

    let records = state.run(move |store| store.audit_logs(&filter)).await?;
    Ok(Json(records))
}

/// GET /api/audit/stats - Totals by action and entity type.
pub async fn audit_stats(State(state): State<SharedState>) -> Result<Json<AuditStats>, ApiError> {
    Ok(Json(state.run(|store| store.audit_stats()).await?))
}
