// ABOUTME: The audit recorder: the single write path that turns a mutation into a change record.
// ABOUTME: Appends are never retried here; storage errors propagate so the caller can abort its own work.

use rewind_core::NewChange;
use rusqlite::{Connection, TransactionBehavior};

use crate::error::StoreError;
use crate::log::ChangeLog;
use crate::store::EventStore;

impl EventStore {
    /// Append one change stamped with the current time and return its id.
    pub fn record(&self, change: &NewChange) -> Result<i64, StoreError> {
        let conn = self.connection();
        ChangeLog::new(&conn).append(change, self.now())
    }

    /// Run a live-table mutation and append the change it describes in one
    /// transaction. If `mutate` fails, or the append does, neither lands.
    pub fn record_mutation<T, F>(&self, mutate: F) -> Result<(T, i64), StoreError>
    where
        F: FnOnce(&Connection) -> Result<(T, NewChange), StoreError>,
    {
        let mut conn = self.connection();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (value, change) = mutate(&*tx)?;
        let id = ChangeLog::new(&tx).append(&change, self.now())?;
        tx.commit()?;

        Ok((value, id))
    }
}
