// ABOUTME: EventStore, the shared handle every caller goes through to reach the change log.
// ABOUTME: Owns the SQLite connection, the clock that stamps records, and the replay policy.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rewind_core::{Clock, EntityState, ReplayPolicy, SystemClock};
use rusqlite::Connection;

use crate::error::StoreError;
use crate::live::LiveTable;
use crate::migrations;

/// The event-sourced audit store.
///
/// All access to the connection is serialized through a mutex, so appends
/// get their id and timestamp atomically with respect to each other and
/// restores of the same entity run one after another.
pub struct EventStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    replay_policy: ReplayPolicy,
}

impl EventStore {
    /// Open or create a store at `path`, creating parent directories and
    /// running migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        tracing::info!(path = %path.display(), "opened change log");
        Self::from_connection(conn)
    }

    /// A throwaway store that lives only as long as this handle.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an existing connection, running migrations first.
    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
            replay_policy: ReplayPolicy::default(),
        })
    }

    /// Replace the clock used to stamp appended records.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_replay_policy(mut self, policy: ReplayPolicy) -> Self {
        self.replay_policy = policy;
        self
    }

    pub fn replay_policy(&self) -> ReplayPolicy {
        self.replay_policy
    }

    /// The time the next appended record would be stamped with.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The current live row for an entity, read from its backing table.
    pub fn live_state(&self, entity_type: &str, entity_id: i64) -> Result<Option<EntityState>, StoreError> {
        let table = LiveTable::for_entity_type(entity_type)?;
        let conn = self.connection();
        table.fetch(&conn, entity_id)
    }

    /// A poisoned lock only means another caller panicked mid-call; any
    /// open transaction was rolled back when it dropped.
    pub(crate) fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
