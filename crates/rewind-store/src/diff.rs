// ABOUTME: Field-level comparison of one entity at two moments.
// ABOUTME: Both states are reconstructed under one lock so they come from the same log prefix.

use chrono::{DateTime, Utc};
use rewind_core::{StateDiff, diff_states};

use crate::error::StoreError;
use crate::log::ChangeLog;
use crate::reconstruct::state_at_in;
use crate::store::EventStore;

impl EventStore {
    /// Compare an entity's reconstructed state at `t1` and `t2`.
    ///
    /// If it existed at only one of them, every field shows up as appearing
    /// or disappearing. If it existed at neither, that is an error.
    pub fn diff(
        &self,
        entity_type: &str,
        entity_id: i64,
        t1: DateTime<Utc>,
        t2: DateTime<Utc>,
    ) -> Result<StateDiff, StoreError> {
        let (first, second) = {
            let conn = self.connection();
            let log = ChangeLog::new(&conn);
            (
                state_at_in(&log, entity_type, entity_id, t1)?,
                state_at_in(&log, entity_type, entity_id, t2)?,
            )
        };

        if first.is_none() && second.is_none() {
            return Err(StoreError::NeverExisted {
                entity_type: entity_type.to_string(),
                entity_id,
                from: t1,
                to: t2,
            });
        }

        let state_at_t1 = first.map(|at| at.state);
        let state_at_t2 = second.map(|at| at.state);
        let changes = diff_states(state_at_t1.as_ref(), state_at_t2.as_ref());

        Ok(StateDiff {
            entity_type: entity_type.to_string(),
            entity_id,
            timestamp1: t1,
            timestamp2: t2,
            state_at_t1,
            state_at_t2,
            changes,
        })
    }
}
