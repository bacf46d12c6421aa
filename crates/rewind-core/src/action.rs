// ABOUTME: Defines the Action recorded on every change, collapsed to three canonical cases.
// ABOUTME: Domain labels like "move" or "resolve" are updates that keep their original label for display.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a change record did to its entity.
///
/// Reconstruction and replay only ever branch on these three cases. Every
/// label other than `create` and `delete` (`update`, `restore`, `move`,
/// `acknowledge`, ...) is an `Update` carrying the label verbatim, so the
/// log and the activity feed still show exactly what the caller wrote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Create,
    Update(String),
    Delete,
}

impl Action {
    pub const CREATE: &'static str = "create";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";
    pub const RESTORE: &'static str = "restore";

    /// A plain `update`.
    pub fn update() -> Self {
        Action::Update(Self::UPDATE.to_string())
    }

    /// The action appended when an entity is rolled back to a past state.
    pub fn restore() -> Self {
        Action::Update(Self::RESTORE.to_string())
    }

    /// The label as it is stored in the log.
    pub fn as_str(&self) -> &str {
        match self {
            Action::Create => Self::CREATE,
            Action::Update(label) => label,
            Action::Delete => Self::DELETE,
        }
    }

    /// True only for the literal `update` label.
    pub fn is_plain_update(&self) -> bool {
        matches!(self, Action::Update(label) if label == Self::UPDATE)
    }

    pub fn is_restore(&self) -> bool {
        matches!(self, Action::Update(label) if label == Self::RESTORE)
    }
}

impl From<String> for Action {
    fn from(label: String) -> Self {
        match label.as_str() {
            Self::CREATE => Action::Create,
            Self::DELETE => Action::Delete,
            _ => Action::Update(label),
        }
    }
}

impl From<&str> for Action {
    fn from(label: &str) -> Self {
        Action::from(label.to_string())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Update(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_labels_parse_to_their_variants() {
        assert_eq!(Action::from("create"), Action::Create);
        assert_eq!(Action::from("delete"), Action::Delete);
        assert_eq!(Action::from("update"), Action::update());
        assert!(Action::from("update").is_plain_update());
    }

    #[test]
    fn domain_labels_are_updates_that_keep_their_label() {
        let action = Action::from("acknowledge");
        assert_eq!(action, Action::Update("acknowledge".to_string()));
        assert_eq!(action.as_str(), "acknowledge");
        assert!(!action.is_plain_update());
        assert!(Action::from("restore").is_restore());
    }

    #[test]
    fn serializes_as_bare_label() {
        let json = serde_json::to_string(&Action::from("move")).unwrap();
        assert_eq!(json, "\"move\"");

        let back: Action = serde_json::from_str("\"delete\"").unwrap();
        assert_eq!(back, Action::Delete);
    }
}
