// ABOUTME: Error type for every EventStore operation.
// ABOUTME: Storage failures always surface; lookup and restore refusals are typed so callers can map them.

use chrono::{DateTime, Utc};
use rewind_core::EntityState;
use thiserror::Error;

/// Errors that can occur while reading or writing the change log.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("change record {id} is corrupt: {reason}")]
    CorruptRecord { id: i64, reason: String },

    #[error("a change must carry a before state, an after state, or both")]
    EmptyChange,

    #[error("no state found for {entity_type} #{entity_id} at {at}")]
    EntityNotFoundAtTime {
        entity_type: String,
        entity_id: i64,
        at: DateTime<Utc>,
    },

    #[error("{entity_type} #{entity_id} was deleted as of {at}")]
    EntityWasDeleted {
        entity_type: String,
        entity_id: i64,
        at: DateTime<Utc>,
        last_known_state: EntityState,
    },

    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("{entity_type} #{entity_id} did not exist at either {from} or {to}")]
    NeverExisted {
        entity_type: String,
        entity_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}
