// ABOUTME: JSON error responses for the rewind HTTP API.
// ABOUTME: Maps store and parsing failures onto status codes with an {"error": ...} body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rewind_core::CoreError;
use rewind_store::StoreError;
use serde_json::json;
use thiserror::Error;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Input(#[from] CoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(err) => match err {
                StoreError::EntityNotFoundAtTime { .. } | StoreError::NeverExisted { .. } => {
                    StatusCode::NOT_FOUND
                }
                StoreError::EntityWasDeleted { .. }
                | StoreError::UnknownEntityType(_)
                | StoreError::EmptyChange => StatusCode::BAD_REQUEST,
                StoreError::StorageUnavailable(_)
                | StoreError::Io(_)
                | StoreError::Serialization(_)
                | StoreError::CorruptRecord { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Input(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = match &self {
            ApiError::Store(StoreError::EntityWasDeleted { last_known_state, .. }) => json!({
                "error": self.to_string(),
                "last_known_state": last_known_state,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn store_errors_map_to_expected_statuses() {
        let not_found = ApiError::from(StoreError::EntityNotFoundAtTime {
            entity_type: "task".into(),
            entity_id: 1,
            at: Utc::now(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let deleted = ApiError::from(StoreError::EntityWasDeleted {
            entity_type: "task".into(),
            entity_id: 1,
            at: Utc::now(),
            last_known_state: Default::default(),
        });
        assert_eq!(deleted.status(), StatusCode::BAD_REQUEST);

        let unknown = ApiError::from(StoreError::UnknownEntityType("widget".into()));
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

        let corrupt = ApiError::from(StoreError::CorruptRecord {
            id: 9,
            reason: "bad json".into(),
        });
        assert_eq!(corrupt.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bad_timestamp_is_a_bad_request() {
        let err = ApiError::from(CoreError::InvalidTimestamp("yesterday".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("yesterday"));
    }
}
