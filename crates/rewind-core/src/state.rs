// ABOUTME: Point-in-time reconstruction of an entity from the single nearest change record.
// ABOUTME: Deleted entities reconstruct as tombstones: last live fields plus deletion marker fields.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::action::Action;
use crate::record::{ChangeRecord, EntityState};
use crate::timestamp::format_timestamp;

/// Marker field set on tombstone states.
pub const DELETED_MARKER: &str = "_deleted";
/// Marker field holding the deletion record's timestamp.
pub const DELETED_AT_MARKER: &str = "_deleted_at";

/// An entity's state as of some moment, derived from one change record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateAt {
    pub state: EntityState,
    pub was_deleted: bool,
    pub record_id: i64,
    pub recorded_at: DateTime<Utc>,
}

impl StateAt {
    /// Derive the state established by `record`.
    ///
    /// A delete yields its before-state with the deletion markers added;
    /// anything else yields its after-state verbatim. Returns `None` when
    /// the relevant side of the record is absent, or when a delete carries
    /// an empty before-state (there is no last known state to mark).
    pub fn from_record(record: &ChangeRecord) -> Option<Self> {
        let (state, was_deleted) = match record.action {
            Action::Delete => {
                let mut state = record.before_state.clone().filter(|s| !s.is_empty())?;
                state.insert(DELETED_MARKER.to_string(), Value::Bool(true));
                state.insert(
                    DELETED_AT_MARKER.to_string(),
                    Value::String(format_timestamp(&record.timestamp)),
                );
                (state, true)
            }
            _ => (record.after_state.clone()?, false),
        };

        Some(Self {
            state,
            was_deleted,
            record_id: record.id,
            recorded_at: record.timestamp,
        })
    }
}

/// Drop every internal field (names starting with `_`) from a state.
pub fn strip_markers(state: &EntityState) -> EntityState {
    state
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(action: Action, before: Option<Value>, after: Option<Value>) -> ChangeRecord {
        ChangeRecord {
            id: 11,
            entity_type: "task".to_string(),
            entity_id: 7,
            action,
            before_state: before.map(|v| v.as_object().cloned().unwrap()),
            after_state: after.map(|v| v.as_object().cloned().unwrap()),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn update_kind_records_yield_after_state_verbatim() {
        let rec = record(
            Action::from("move"),
            Some(json!({"title": "A", "column_id": 1})),
            Some(json!({"title": "A", "column_id": 2})),
        );
        let at = StateAt::from_record(&rec).unwrap();
        assert!(!at.was_deleted);
        assert_eq!(at.state, rec.after_state.unwrap());
        assert_eq!(at.record_id, 11);
    }

    #[test]
    fn delete_yields_tombstone_of_before_state() {
        let rec = record(Action::Delete, Some(json!({"title": "B"})), None);
        let at = StateAt::from_record(&rec).unwrap();
        assert!(at.was_deleted);
        assert_eq!(at.state["title"], json!("B"));
        assert_eq!(at.state[DELETED_MARKER], json!(true));
        assert_eq!(at.state[DELETED_AT_MARKER], json!("2024-01-15T12:00:00.000000Z"));
    }

    #[test]
    fn missing_relevant_side_yields_nothing() {
        assert!(StateAt::from_record(&record(Action::Delete, None, Some(json!({})))).is_none());
        assert!(StateAt::from_record(&record(Action::Create, Some(json!({})), None)).is_none());
    }

    #[test]
    fn delete_with_empty_snapshot_yields_nothing() {
        let rec = record(Action::Delete, Some(json!({})), None);
        assert!(StateAt::from_record(&rec).is_none());
    }

    #[test]
    fn strip_markers_removes_underscore_fields_only() {
        let state = json!({"title": "B", "_deleted": true, "_deleted_at": "x", "id": 7})
            .as_object()
            .cloned()
            .unwrap();
        let stripped = strip_markers(&state);
        assert_eq!(stripped.len(), 2);
        assert!(stripped.contains_key("title"));
        assert!(stripped.contains_key("id"));
    }
}
