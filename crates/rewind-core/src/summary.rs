// ABOUTME: Human-readable one-line summaries of change records for the activity feed.
// ABOUTME: Picks a display name from the snapshot and a past-tense verb from the action label.

use std::borrow::Cow;

use serde_json::Value;

use crate::record::{ChangeRecord, EntityState};

/// Past-tense verb for an action label. Unknown labels are returned verbatim.
pub fn action_verb(label: &str) -> Cow<'_, str> {
    let verb = match label {
        "create" => "created",
        "update" => "updated",
        "delete" => "deleted",
        "move" => "moved",
        "acknowledge" => "acknowledged",
        "resolve" => "resolved",
        "restore" => "restored",
        "archive" => "archived",
        "assign" => "assigned",
        "ai_analyze" => "analyzed by AI",
        "ai_auto_triage" => "auto-triaged by AI",
        other => return Cow::Borrowed(other),
    };
    Cow::Borrowed(verb)
}

fn name_from(state: &EntityState) -> Option<String> {
    ["title", "name"].iter().find_map(|field| match state.get(*field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Null) | Some(Value::String(_)) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

/// The entity's display name: `title`, then `name`, from the after-state
/// (or the before-state when there is no after-state), else `#<id>`.
pub fn display_name(record: &ChangeRecord) -> String {
    record
        .after_state
        .as_ref()
        .or(record.before_state.as_ref())
        .and_then(name_from)
        .unwrap_or_else(|| format!("#{}", record.entity_id))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Task "Fix login" was moved`.
pub fn summarize(record: &ChangeRecord) -> String {
    format!(
        "{} \"{}\" was {}",
        capitalize(&record.entity_type),
        display_name(record),
        action_verb(record.action.as_str())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use chrono::Utc;
    use serde_json::json;

    fn record(entity_type: &str, action: &str, before: Option<Value>, after: Option<Value>) -> ChangeRecord {
        ChangeRecord {
            id: 1,
            entity_type: entity_type.to_string(),
            entity_id: 42,
            action: Action::from(action),
            before_state: before.map(|v| v.as_object().cloned().unwrap()),
            after_state: after.map(|v| v.as_object().cloned().unwrap()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn uses_title_from_after_state() {
        let rec = record("task", "create", None, Some(json!({"title": "Fix login"})));
        assert_eq!(summarize(&rec), "Task \"Fix login\" was created");
    }

    #[test]
    fn falls_back_to_name_then_before_state() {
        let rec = record("monitor", "update", None, Some(json!({"name": "API", "url": "x"})));
        assert_eq!(summarize(&rec), "Monitor \"API\" was updated");

        let deleted = record("column", "delete", Some(json!({"name": "Done"})), None);
        assert_eq!(summarize(&deleted), "Column \"Done\" was deleted");
    }

    #[test]
    fn falls_back_to_entity_id() {
        let rec = record("incident", "acknowledge", None, Some(json!({"title": ""})));
        assert_eq!(summarize(&rec), "Incident \"#42\" was acknowledged");
    }

    #[test]
    fn unknown_labels_are_used_verbatim() {
        let rec = record("incident", "escalate", None, Some(json!({"title": "Outage"})));
        assert_eq!(summarize(&rec), "Incident \"Outage\" was escalate");
        assert_eq!(action_verb("ai_auto_triage"), "auto-triaged by AI");
    }
}
