// ABOUTME: Defines ChangeRecord, the single immutable entry of the audit log, and NewChange, its unsaved form.
// ABOUTME: Before and after states are full entity snapshots stored as opaque JSON maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;

/// A full snapshot of one entity: column name to value.
pub type EntityState = serde_json::Map<String, serde_json::Value>;

/// One immutable entry in the change log.
///
/// Records for a single `(entity_type, entity_id)` ordered by
/// `(timestamp, id)` form the complete history of that entity. Every
/// non-delete `after_state` is the whole entity, never a partial delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: Action,
    pub before_state: Option<EntityState>,
    pub after_state: Option<EntityState>,
    pub timestamp: DateTime<Utc>,
}

/// A change waiting to be appended. The log assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChange {
    pub entity_type: String,
    pub entity_id: i64,
    pub action: Action,
    #[serde(default)]
    pub before: Option<EntityState>,
    #[serde(default)]
    pub after: Option<EntityState>,
}

impl NewChange {
    pub fn new(entity_type: impl Into<String>, entity_id: i64, action: impl Into<Action>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
            action: action.into(),
            before: None,
            after: None,
        }
    }

    pub fn create(entity_type: impl Into<String>, entity_id: i64, after: EntityState) -> Self {
        Self::new(entity_type, entity_id, Action::Create).with_after(after)
    }

    pub fn update(
        entity_type: impl Into<String>,
        entity_id: i64,
        before: EntityState,
        after: EntityState,
    ) -> Self {
        Self::new(entity_type, entity_id, Action::update())
            .with_before(before)
            .with_after(after)
    }

    pub fn delete(entity_type: impl Into<String>, entity_id: i64, before: EntityState) -> Self {
        Self::new(entity_type, entity_id, Action::Delete).with_before(before)
    }

    pub fn with_before(mut self, before: EntityState) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_after(mut self, after: EntityState) -> Self {
        self.after = Some(after);
        self
    }

    /// A change must carry at least one snapshot.
    pub fn has_state(&self) -> bool {
        self.before.is_some() || self.after.is_some()
    }
}
