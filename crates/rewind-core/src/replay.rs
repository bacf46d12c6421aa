// ABOUTME: Step-by-step replay of an entity's history, folding every record from the beginning.
// ABOUTME: A Replay owns the ordered records and lazily yields (record, state after it) on each pass.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;
use crate::record::{ChangeRecord, EntityState};
use crate::state::DELETED_MARKER;

/// Which update-kind records fold into the replayed state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicy {
    /// Every update-kind record (`update`, `move`, `resolve`, `restore`, ...)
    /// merges its after-state, and a `restore` clears the deletion marker.
    #[default]
    AllMutations,
    /// Only the literal `update` label merges; domain labels pass through
    /// without touching the running state.
    CanonicalOnly,
}

impl ReplayPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplayPolicy::AllMutations => "all",
            ReplayPolicy::CanonicalOnly => "canonical",
        }
    }
}

impl fmt::Display for ReplayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all_mutations" => Ok(ReplayPolicy::AllMutations),
            "canonical" | "canonical_only" => Ok(ReplayPolicy::CanonicalOnly),
            other => Err(format!(
                "unknown replay policy {other:?}, expected \"all\" or \"canonical\""
            )),
        }
    }
}

/// The running state of a replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayState {
    state: EntityState,
}

impl ReplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EntityState {
        &self.state
    }

    pub fn into_state(self) -> EntityState {
        self.state
    }

    /// Fold one record into the running state.
    ///
    /// `Create` replaces the state wholesale, update-kind records merge their
    /// after-state field by field, and `Delete` sets the deletion marker
    /// while keeping every field. A merge never clears the marker; only a
    /// `restore` under [`ReplayPolicy::AllMutations`] brings the entity back.
    pub fn apply(&mut self, record: &ChangeRecord, policy: ReplayPolicy) {
        match &record.action {
            Action::Create => {
                self.state = record.after_state.clone().unwrap_or_default();
            }
            Action::Update(_) => {
                if policy == ReplayPolicy::CanonicalOnly && !record.action.is_plain_update() {
                    return;
                }
                if let Some(after) = &record.after_state {
                    for (key, value) in after {
                        self.state.insert(key.clone(), value.clone());
                    }
                }
                if policy == ReplayPolicy::AllMutations && record.action.is_restore() {
                    self.state.remove(DELETED_MARKER);
                }
            }
            Action::Delete => {
                self.state
                    .insert(DELETED_MARKER.to_string(), Value::Bool(true));
            }
        }
    }
}

/// One step of a replay: a record and the state right after folding it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayStep<'a> {
    pub record: &'a ChangeRecord,
    pub state_after: EntityState,
}

/// An entity's ordered history, ready to be replayed any number of times.
#[derive(Debug, Clone)]
pub struct Replay {
    records: Vec<ChangeRecord>,
    policy: ReplayPolicy,
}

impl Replay {
    /// `records` must already be ordered by `(timestamp, id)`.
    pub fn new(records: Vec<ChangeRecord>, policy: ReplayPolicy) -> Self {
        Self { records, policy }
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn policy(&self) -> ReplayPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Start a fresh pass from empty state.
    pub fn iter(&self) -> ReplaySteps<'_> {
        ReplaySteps {
            records: self.records.iter(),
            state: ReplayState::new(),
            policy: self.policy,
        }
    }

    /// The state after the last record, or `None` for an empty history.
    pub fn final_state(&self) -> Option<EntityState> {
        if self.records.is_empty() {
            return None;
        }
        let mut state = ReplayState::new();
        for record in &self.records {
            state.apply(record, self.policy);
        }
        Some(state.into_state())
    }
}

impl<'a> IntoIterator for &'a Replay {
    type Item = ReplayStep<'a>;
    type IntoIter = ReplaySteps<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a replay pass.
#[derive(Debug, Clone)]
pub struct ReplaySteps<'a> {
    records: std::slice::Iter<'a, ChangeRecord>,
    state: ReplayState,
    policy: ReplayPolicy,
}

impl<'a> Iterator for ReplaySteps<'a> {
    type Item = ReplayStep<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.state.apply(record, self.policy);
        Some(ReplayStep {
            record,
            state_after: self.state.state().clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for ReplaySteps<'_> {}
