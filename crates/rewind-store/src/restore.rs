// ABOUTME: Disaster recovery: roll a live entity row back to a reconstructed past state.
// ABOUTME: The reconstruction, the live-table write, and the restore record commit as one transaction.

use chrono::{DateTime, Utc};
use rewind_core::{Action, EntityState, NewChange, strip_markers};
use rusqlite::TransactionBehavior;
use serde::Serialize;

use crate::error::StoreError;
use crate::live::{LiveTable, json_to_sql};
use crate::log::ChangeLog;
use crate::reconstruct::state_at_in;
use crate::store::EventStore;

/// What a successful restore did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreOutcome {
    pub entity_type: String,
    pub entity_id: i64,
    pub restored_to: DateTime<Utc>,
    pub restored_state: EntityState,
    /// Id of the `restore` record appended to the log.
    pub record_id: i64,
    /// True when the live row had been deleted and was inserted again.
    pub recreated: bool,
}

impl EventStore {
    /// Make the live row for an entity match its state at `to`.
    ///
    /// Refuses when nothing was recorded by `to` or when the entity was
    /// deleted at that moment. Fields with no matching column in the live
    /// table are left out of the write but kept in the restored state.
    pub fn restore(
        &self,
        entity_type: &str,
        entity_id: i64,
        to: DateTime<Utc>,
    ) -> Result<RestoreOutcome, StoreError> {
        let table = LiveTable::for_entity_type(entity_type)?;

        let mut conn = self.connection();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let log = ChangeLog::new(&tx);

        let target = state_at_in(&log, entity_type, entity_id, to)?.ok_or_else(|| {
            StoreError::EntityNotFoundAtTime {
                entity_type: entity_type.to_string(),
                entity_id,
                at: to,
            }
        })?;

        if target.was_deleted {
            return Err(StoreError::EntityWasDeleted {
                entity_type: entity_type.to_string(),
                entity_id,
                at: to,
                last_known_state: target.state,
            });
        }

        let restored = strip_markers(&target.state);
        let columns = table.column_names(&tx)?;

        let mut fields = Vec::new();
        let mut skipped = Vec::new();
        for (name, value) in &restored {
            if name == "id" {
                continue;
            }
            if columns.contains(name) {
                fields.push((name.clone(), json_to_sql(value)));
            } else {
                skipped.push(name.as_str());
            }
        }
        if !skipped.is_empty() {
            tracing::warn!(
                entity_type,
                entity_id,
                table = table.table_name(),
                ?skipped,
                "restored fields have no live column and were not written"
            );
        }

        let current = table.fetch(&tx, entity_id)?;
        let recreated = current.is_none();
        if recreated {
            tracing::warn!(entity_type, entity_id, "live row is gone, re-inserting it");
            table.insert(&tx, entity_id, &fields)?;
        } else {
            table.update(&tx, entity_id, &fields)?;
        }

        let mut change =
            NewChange::new(entity_type, entity_id, Action::restore()).with_after(restored.clone());
        change.before = current;
        let record_id = log.append(&change, self.now())?;

        tx.commit()?;

        tracing::info!(
            entity_type,
            entity_id,
            restored_to = %to,
            record_id,
            recreated,
            "restored entity"
        );

        Ok(RestoreOutcome {
            entity_type: entity_type.to_string(),
            entity_id,
            restored_to: to,
            restored_state: restored,
            record_id,
            recreated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rewind_core::{DELETED_MARKER, ManualClock};
    use rusqlite::params;
    use serde_json::json;
    use std::sync::Arc;

    fn obj(value: serde_json::Value) -> EntityState {
        value.as_object().cloned().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    /// Drives task #7 through create "A", update "B", update "C" via the
    /// live table, one hour apart.
    fn seeded() -> (EventStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = EventStore::open_in_memory().unwrap().with_clock(clock.clone());
        seed(&store, &clock);
        (store, clock)
    }

    fn seed(store: &EventStore, clock: &ManualClock) {
        store
            .record_mutation(|conn| {
                conn.execute("INSERT INTO tasks (id, title) VALUES (7, 'A')", [])?;
                Ok(((), NewChange::create("task", 7, obj(json!({"id": 7, "title": "A"})))))
            })
            .unwrap();
        for (prev, next) in [("A", "B"), ("B", "C")] {
            clock.advance(Duration::hours(1));
            store
                .record_mutation(|conn| {
                    conn.execute("UPDATE tasks SET title = ?1 WHERE id = 7", params![next])?;
                    Ok((
                        (),
                        NewChange::update(
                            "task",
                            7,
                            obj(json!({"id": 7, "title": prev})),
                            obj(json!({"id": 7, "title": next})),
                        ),
                    ))
                })
                .unwrap();
        }
        clock.advance(Duration::hours(1));
    }

    #[test]
    fn restore_overwrites_an_existing_row_and_records_itself() {
        let (store, _clock) = seeded();
        let target = t0() + Duration::minutes(90);

        let outcome = store.restore("task", 7, target).unwrap();
        assert!(!outcome.recreated);
        assert_eq!(outcome.restored_state, obj(json!({"id": 7, "title": "B"})));
        assert_eq!(store.live_state("task", 7).unwrap().unwrap()["title"], json!("B"));

        let history = store.history("task", 7).unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.id, outcome.record_id);
        assert!(last.action.is_restore());
        assert_eq!(last.before_state.as_ref().unwrap()["title"], json!("C"));
        assert_eq!(last.after_state.as_ref().unwrap()["title"], json!("B"));

        let now = store.state_at("task", 7, store.now()).unwrap().unwrap();
        assert_eq!(now.state, outcome.restored_state);
    }

    #[test]
    fn restore_recreates_a_deleted_row_with_its_original_id() {
        let (store, clock) = seeded();
        store
            .record_mutation(|conn| {
                conn.execute("DELETE FROM tasks WHERE id = 7", [])?;
                Ok(((), NewChange::delete("task", 7, obj(json!({"id": 7, "title": "C"})))))
            })
            .unwrap();
        clock.advance(Duration::hours(1));

        let outcome = store
            .restore("task", 7, t0() + Duration::minutes(30))
            .unwrap();
        assert!(outcome.recreated);

        let row = store.live_state("task", 7).unwrap().unwrap();
        assert_eq!(row["id"], json!(7));
        assert_eq!(row["title"], json!("A"));

        let last = store.history("task", 7).unwrap().pop().unwrap();
        assert!(last.before_state.is_none());
    }

    #[test]
    fn restore_to_a_tombstone_is_refused_without_mutation() {
        let (store, clock) = seeded();
        store
            .record_mutation(|conn| {
                conn.execute("DELETE FROM tasks WHERE id = 7", [])?;
                Ok(((), NewChange::delete("task", 7, obj(json!({"id": 7, "title": "C"})))))
            })
            .unwrap();
        let deleted_at = store.now();
        clock.advance(Duration::hours(1));
        let records_before = store.history("task", 7).unwrap().len();

        let err = store.restore("task", 7, deleted_at).unwrap_err();
        match err {
            StoreError::EntityWasDeleted {
                last_known_state, ..
            } => {
                assert_eq!(last_known_state["title"], json!("C"));
                assert_eq!(last_known_state[DELETED_MARKER], json!(true));
            }
            other => panic!("expected EntityWasDeleted, got {other:?}"),
        }
        assert!(store.live_state("task", 7).unwrap().is_none());
        assert_eq!(store.history("task", 7).unwrap().len(), records_before);
    }

    #[test]
    fn restore_before_first_record_is_not_found() {
        let (store, _clock) = seeded();
        let err = store
            .restore("task", 7, t0() - Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::EntityNotFoundAtTime { .. }));
        assert_eq!(store.live_state("task", 7).unwrap().unwrap()["title"], json!("C"));
    }

    #[test]
    fn restore_of_unmapped_type_fails_fast() {
        let (store, _clock) = seeded();
        store
            .record(&NewChange::create("comment", 1, obj(json!({"content": "hi"}))))
            .unwrap();
        let err = store.restore("comment", 1, store.now()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownEntityType(ref t) if t == "comment"));
    }

    #[test]
    fn fields_without_columns_are_skipped_but_kept_in_the_log() {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = EventStore::open_in_memory().unwrap().with_clock(clock.clone());
        store
            .record(&NewChange::create(
                "column",
                3,
                obj(json!({"name": "Doing", "position": 2, "wip_limit": 4})),
            ))
            .unwrap();
        clock.advance(Duration::minutes(1));

        let outcome = store.restore("column", 3, t0()).unwrap();
        assert!(outcome.recreated);
        assert_eq!(outcome.restored_state["wip_limit"], json!(4));

        let row = store.live_state("column", 3).unwrap().unwrap();
        assert_eq!(row["name"], json!("Doing"));
        assert!(!row.contains_key("wip_limit"));
    }

    #[test]
    fn a_restore_is_itself_subject_to_time_travel() {
        let (store, clock) = seeded();
        let restored_at = store.now();
        store
            .restore("task", 7, t0() + Duration::minutes(30))
            .unwrap();
        clock.advance(Duration::hours(1));

        let outcome = store
            .restore("task", 7, restored_at - Duration::microseconds(1))
            .unwrap();
        assert_eq!(outcome.restored_state["title"], json!("C"));
        assert_eq!(
            store.state_at("task", 7, restored_at).unwrap().unwrap().state["title"],
            json!("A")
        );
    }

    #[test]
    fn concurrent_restores_of_one_entity_serialize_and_last_commit_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(t0()));
        let store = EventStore::open(&dir.path().join("rewind.db"))
            .unwrap()
            .with_clock(clock.clone());
        seed(&store, &clock);
        let store = Arc::new(store);

        let targets = [30, 90, 150, 45, 100, 170];
        let handles: Vec<_> = targets
            .into_iter()
            .map(|minutes| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .restore("task", 7, t0() + Duration::minutes(minutes))
                        .unwrap()
                })
            })
            .collect();
        let mut outcomes: Vec<RestoreOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        outcomes.sort_by_key(|o| o.record_id);

        let restores: Vec<_> = store
            .history("task", 7)
            .unwrap()
            .into_iter()
            .filter(|r| r.action.is_restore())
            .collect();
        assert_eq!(restores.len(), targets.len());
        let logged: Vec<i64> = restores.iter().map(|r| r.id).collect();
        let returned: Vec<i64> = outcomes.iter().map(|o| o.record_id).collect();
        assert_eq!(logged, returned);

        // Each restore saw the row the previous one committed.
        for pair in restores.windows(2) {
            let previous = pair[0].after_state.as_ref().unwrap();
            let seen = pair[1].before_state.as_ref().unwrap();
            assert_eq!(seen["title"], previous["title"]);
        }

        let last = restores.last().unwrap();
        let live = store.live_state("task", 7).unwrap().unwrap();
        assert_eq!(live["title"], last.after_state.as_ref().unwrap()["title"]);
    }
}
