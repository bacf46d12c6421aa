// ABOUTME: Point-in-time state reconstruction and entity history queries.
// ABOUTME: One indexed lookup per call: the nearest record at or before the target carries the full state.

use chrono::{DateTime, Utc};
use rewind_core::{ChangeRecord, StateAt};

use crate::error::StoreError;
use crate::log::ChangeLog;
use crate::store::EventStore;

/// Reconstruct through an already-borrowed log, so restore can do it inside
/// its transaction.
pub(crate) fn state_at_in(
    log: &ChangeLog<'_>,
    entity_type: &str,
    entity_id: i64,
    at: DateTime<Utc>,
) -> Result<Option<StateAt>, StoreError> {
    let record = log.latest_at(entity_type, entity_id, at)?;
    Ok(record.as_ref().and_then(StateAt::from_record))
}

impl EventStore {
    /// Every record for an entity, oldest first.
    pub fn history(&self, entity_type: &str, entity_id: i64) -> Result<Vec<ChangeRecord>, StoreError> {
        let conn = self.connection();
        ChangeLog::new(&conn).history(entity_type, entity_id, None)
    }

    /// The entity as it was at `at`, or `None` if it had no record yet.
    pub fn state_at(
        &self,
        entity_type: &str,
        entity_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<StateAt>, StoreError> {
        let conn = self.connection();
        let found = state_at_in(&ChangeLog::new(&conn), entity_type, entity_id, at)?;
        tracing::debug!(entity_type, entity_id, %at, found = found.is_some(), "reconstructed state");
        Ok(found)
    }

    /// Like [`EventStore::state_at`], but a missing state is an error.
    pub fn require_state_at(
        &self,
        entity_type: &str,
        entity_id: i64,
        at: DateTime<Utc>,
    ) -> Result<StateAt, StoreError> {
        self.state_at(entity_type, entity_id, at)?
            .ok_or_else(|| StoreError::EntityNotFoundAtTime {
                entity_type: entity_type.to_string(),
                entity_id,
                at,
            })
    }
}
