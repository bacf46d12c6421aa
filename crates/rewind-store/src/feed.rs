// ABOUTME: Cross-entity activity feed: the newest change records with a one-line summary each.
// ABOUTME: Read-only; page size is bounded by the caller.

use chrono::{DateTime, Utc};
use rewind_core::{Action, ChangeRecord, summarize};
use serde::Serialize;

use crate::error::StoreError;
use crate::log::ChangeLog;
use crate::store::EventStore;

/// One line of the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: Action,
    pub timestamp: DateTime<Utc>,
    pub summary: String,
}

impl From<ChangeRecord> for FeedEntry {
    fn from(record: ChangeRecord) -> Self {
        let summary = summarize(&record);
        Self {
            id: record.id,
            entity_type: record.entity_type,
            entity_id: record.entity_id,
            action: record.action,
            timestamp: record.timestamp,
            summary,
        }
    }
}

impl EventStore {
    /// The `limit` most recent changes, newest first. An empty
    /// `entity_types` slice means every type.
    pub fn activity_feed(&self, limit: u32, entity_types: &[String]) -> Result<Vec<FeedEntry>, StoreError> {
        let records = {
            let conn = self.connection();
            ChangeLog::new(&conn).recent(entity_types, limit)?
        };
        Ok(records.into_iter().map(FeedEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rewind_core::{EntityState, ManualClock, NewChange};
    use serde_json::json;
    use std::sync::Arc;

    fn obj(value: serde_json::Value) -> EntityState {
        value.as_object().cloned().unwrap()
    }

    fn seeded() -> EventStore {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()));
        let store = EventStore::open_in_memory().unwrap().with_clock(clock.clone());

        store
            .record(&NewChange::create("task", 1, obj(json!({"title": "Ship it"}))))
            .unwrap();
        clock.advance(Duration::seconds(1));
        store
            .record(&NewChange::create("monitor", 2, obj(json!({"name": "API"}))))
            .unwrap();
        clock.advance(Duration::seconds(1));
        store
            .record(
                &NewChange::new("incident", 3, "acknowledge")
                    .with_before(obj(json!({"status": "open"})))
                    .with_after(obj(json!({"status": "acknowledged"}))),
            )
            .unwrap();
        clock.advance(Duration::seconds(1));
        store
            .record(&NewChange::delete("task", 1, obj(json!({"title": "Ship it"}))))
            .unwrap();
        store
    }

    #[test]
    fn feed_is_newest_first_with_summaries() {
        let store = seeded();
        let feed = store.activity_feed(10, &[]).unwrap();

        let summaries: Vec<_> = feed.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(
            summaries,
            vec![
                "Task \"Ship it\" was deleted",
                "Incident \"#3\" was acknowledged",
                "Monitor \"API\" was created",
                "Task \"Ship it\" was created",
            ]
        );
    }

    #[test]
    fn feed_respects_limit_and_type_filter() {
        let store = seeded();
        assert_eq!(store.activity_feed(2, &[]).unwrap().len(), 2);

        let tasks = store.activity_feed(10, &["task".to_string()]).unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|e| e.entity_type == "task"));
    }

    #[test]
    fn feed_entry_serializes_action_as_label() {
        let store = seeded();
        let entry = &store.activity_feed(1, &["incident".to_string()]).unwrap()[0];
        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["action"], json!("acknowledge"));
        assert_eq!(json["entity_id"], json!(3));
    }
}
