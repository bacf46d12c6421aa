// ABOUTME: The append-only change log: one insert path and a handful of indexed read queries.
// ABOUTME: Works over any borrowed Connection so the same calls run inside a restore transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rewind_core::{ChangeRecord, EntityState, NewChange, format_timestamp};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Params, Row, params, params_from_iter};

use crate::audit::AuditFilter;
use crate::error::StoreError;

const SELECT_RECORD: &str = "SELECT id, entity_type, entity_id, action, before_state, after_state, timestamp
     FROM audit_log";

/// A row exactly as stored, before JSON and timestamp decoding.
struct RawRecord {
    id: i64,
    entity_type: String,
    entity_id: i64,
    action: String,
    before_state: Option<String>,
    after_state: Option<String>,
    timestamp: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entity_type: row.get(1)?,
            entity_id: row.get(2)?,
            action: row.get(3)?,
            before_state: row.get(4)?,
            after_state: row.get(5)?,
            timestamp: row.get(6)?,
        })
    }

    fn decode(self) -> Result<ChangeRecord, StoreError> {
        let id = self.id;
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| StoreError::CorruptRecord {
                id,
                reason: format!("bad timestamp {:?}: {}", self.timestamp, e),
            })?
            .with_timezone(&Utc);

        Ok(ChangeRecord {
            id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            action: self.action.into(),
            before_state: decode_state(id, self.before_state.as_deref())?,
            after_state: decode_state(id, self.after_state.as_deref())?,
            timestamp,
        })
    }
}

fn decode_state(id: i64, raw: Option<&str>) -> Result<Option<EntityState>, StoreError> {
    raw.map(|text| {
        serde_json::from_str::<EntityState>(text).map_err(|e| StoreError::CorruptRecord {
            id,
            reason: format!("state is not a JSON object: {}", e),
        })
    })
    .transpose()
}

/// Read and append access to the `audit_log` table through a borrowed connection.
pub struct ChangeLog<'c> {
    conn: &'c Connection,
}

impl<'c> ChangeLog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Append one record stamped `at` and return the id SQLite assigned.
    pub fn append(&self, change: &NewChange, at: DateTime<Utc>) -> Result<i64, StoreError> {
        if !change.has_state() {
            return Err(StoreError::EmptyChange);
        }

        let before = change.before.as_ref().map(serde_json::to_string).transpose()?;
        let after = change.after.as_ref().map(serde_json::to_string).transpose()?;

        self.conn.execute(
            "INSERT INTO audit_log (entity_type, entity_id, action, before_state, after_state, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                change.entity_type,
                change.entity_id,
                change.action.as_str(),
                before,
                after,
                format_timestamp(&at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        tracing::debug!(
            id,
            entity_type = %change.entity_type,
            entity_id = change.entity_id,
            action = %change.action,
            "appended change record"
        );
        Ok(id)
    }

    /// Fetch a single record by id.
    pub fn get(&self, id: i64) -> Result<Option<ChangeRecord>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_RECORD} WHERE id = ?1"),
                params![id],
                RawRecord::from_row,
            )
            .optional()?;
        raw.map(RawRecord::decode).transpose()
    }

    /// The most recent record for an entity at or before `at`; later id wins ties.
    pub fn latest_at(
        &self,
        entity_type: &str,
        entity_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<ChangeRecord>, StoreError> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    "{SELECT_RECORD}
                     WHERE entity_type = ?1 AND entity_id = ?2 AND timestamp <= ?3
                     ORDER BY timestamp DESC, id DESC
                     LIMIT 1"
                ),
                params![entity_type, entity_id, format_timestamp(&at)],
                RawRecord::from_row,
            )
            .optional()?;
        raw.map(RawRecord::decode).transpose()
    }

    /// Every record for an entity in `(timestamp, id)` order, optionally
    /// stopping at `until` inclusive.
    pub fn history(
        &self,
        entity_type: &str,
        entity_id: i64,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChangeRecord>, StoreError> {
        match until {
            Some(until) => self.collect(
                &format!(
                    "{SELECT_RECORD}
                     WHERE entity_type = ?1 AND entity_id = ?2 AND timestamp <= ?3
                     ORDER BY timestamp ASC, id ASC"
                ),
                params![entity_type, entity_id, format_timestamp(&until)],
            ),
            None => self.collect(
                &format!(
                    "{SELECT_RECORD}
                     WHERE entity_type = ?1 AND entity_id = ?2
                     ORDER BY timestamp ASC, id ASC"
                ),
                params![entity_type, entity_id],
            ),
        }
    }

    /// The newest `limit` records across all entities, optionally restricted
    /// to some entity types. Newest first.
    pub fn recent(&self, entity_types: &[String], limit: u32) -> Result<Vec<ChangeRecord>, StoreError> {
        let mut values: Vec<SqlValue> = entity_types
            .iter()
            .map(|t| SqlValue::Text(t.clone()))
            .collect();

        let where_clause = if entity_types.is_empty() {
            String::new()
        } else {
            let placeholders: Vec<String> =
                (1..=entity_types.len()).map(|i| format!("?{i}")).collect();
            format!("WHERE entity_type IN ({})", placeholders.join(", "))
        };

        values.push(SqlValue::Integer(i64::from(limit)));
        let sql = format!(
            "{SELECT_RECORD} {where_clause}
             ORDER BY timestamp DESC, id DESC
             LIMIT ?{}",
            values.len()
        );
        self.collect(&sql, params_from_iter(values))
    }

    /// Records matching an audit filter, newest first, paged by limit/offset.
    pub fn filtered(&self, filter: &AuditFilter) -> Result<Vec<ChangeRecord>, StoreError> {
        let mut conditions = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(ref entity_type) = filter.entity_type {
            values.push(SqlValue::Text(entity_type.clone()));
            conditions.push(format!("entity_type = ?{}", values.len()));
        }
        if let Some(entity_id) = filter.entity_id {
            values.push(SqlValue::Integer(entity_id));
            conditions.push(format!("entity_id = ?{}", values.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        values.push(SqlValue::Integer(i64::from(filter.limit)));
        let limit_idx = values.len();
        values.push(SqlValue::Integer(i64::from(filter.offset)));
        let offset_idx = values.len();

        let sql = format!(
            "{SELECT_RECORD} {where_clause}
             ORDER BY timestamp DESC, id DESC
             LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );
        self.collect(&sql, params_from_iter(values))
    }

    /// Total number of records in the log.
    pub fn count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?)
    }

    /// Number of records stamped strictly after `since`.
    pub fn count_since(&self, since: DateTime<Utc>) -> Result<i64, StoreError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE timestamp > ?1",
            params![format_timestamp(&since)],
            |row| row.get(0),
        )?)
    }

    /// Record counts grouped by action label.
    pub fn count_by_action(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        self.grouped_counts("SELECT action, COUNT(*) FROM audit_log GROUP BY action")
    }

    /// Record counts grouped by entity type.
    pub fn count_by_entity_type(&self) -> Result<BTreeMap<String, i64>, StoreError> {
        self.grouped_counts("SELECT entity_type, COUNT(*) FROM audit_log GROUP BY entity_type")
    }

    fn grouped_counts(&self, sql: &str) -> Result<BTreeMap<String, i64>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (key, count) = row?;
            counts.insert(key, count);
        }
        Ok(counts)
    }

    fn collect<P: Params>(&self, sql: &str, params: P) -> Result<Vec<ChangeRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, RawRecord::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.decode()?);
        }
        Ok(records)
    }
}
