// ABOUTME: Error type for the pure core of rewind.
// ABOUTME: Only input parsing can fail here; everything else is infallible folding.

use thiserror::Error;

/// Errors raised while interpreting caller-supplied values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid timestamp {0:?}: expected RFC 3339 or YYYY-MM-DDTHH:MM:SS")]
    InvalidTimestamp(String),
}
