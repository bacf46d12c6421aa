// ABOUTME: API module containing all HTTP handler functions for the rewind REST API.
// ABOUTME: Split into entity event/time-travel handlers and audit-log handlers.

pub mod audit;
pub mod events;

use crate::error::ApiError;

/// Resolve a requested page size against its default and the configured cap.
pub(crate) fn page_limit(requested: Option<u32>, default: u32, max: u32) -> Result<u32, ApiError> {
    match requested {
        None => Ok(default.min(max)),
        Some(0) => Err(ApiError::BadRequest("limit must be at least 1".to_string())),
        Some(n) if n > max => Err(ApiError::BadRequest(format!("limit must be at most {max}"))),
        Some(n) => Ok(n),
    }
}
