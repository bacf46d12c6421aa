// ABOUTME: Field-level diff between two reconstructed entity states.
// ABOUTME: Absent fields are distinct from null ones, so appearance and disappearance show up as changes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::record::EntityState;

/// How a single field differs between two states. `None` means absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
}

/// Changed fields keyed by field name.
pub type FieldChanges = BTreeMap<String, FieldChange>;

/// Compare two states over the union of their keys.
///
/// A missing state is treated as an empty one.
pub fn diff_states(from: Option<&EntityState>, to: Option<&EntityState>) -> FieldChanges {
    let empty = EntityState::new();
    let from = from.unwrap_or(&empty);
    let to = to.unwrap_or(&empty);

    let keys: BTreeSet<&String> = from.keys().chain(to.keys()).collect();

    keys.into_iter()
        .filter_map(|key| {
            let before = from.get(key);
            let after = to.get(key);
            (before != after).then(|| {
                (
                    key.clone(),
                    FieldChange {
                        from: before.cloned(),
                        to: after.cloned(),
                    },
                )
            })
        })
        .collect()
}

/// The result of comparing one entity at two moments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDiff {
    pub entity_type: String,
    pub entity_id: i64,
    pub timestamp1: DateTime<Utc>,
    pub timestamp2: DateTime<Utc>,
    pub state_at_t1: Option<EntityState>,
    pub state_at_t2: Option<EntityState>,
    pub changes: FieldChanges,
}
