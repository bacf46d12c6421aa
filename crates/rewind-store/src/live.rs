// ABOUTME: Fixed mapping from entity type to the live table that holds it, plus row access for restores.
// ABOUTME: Column names are checked against PRAGMA table_info before they are ever written into SQL.

use std::collections::HashSet;

use rewind_core::EntityState;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Value;

use crate::error::StoreError;

/// A live entity table that restores can write into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveTable {
    Tasks,
    Columns,
    Monitors,
    Incidents,
    Projects,
}

impl LiveTable {
    pub const ALL: [LiveTable; 5] = [
        LiveTable::Tasks,
        LiveTable::Columns,
        LiveTable::Monitors,
        LiveTable::Incidents,
        LiveTable::Projects,
    ];

    /// Look up the table for an entity type, failing on anything unmapped.
    pub fn for_entity_type(entity_type: &str) -> Result<Self, StoreError> {
        Self::ALL
            .into_iter()
            .find(|table| table.entity_type() == entity_type)
            .ok_or_else(|| StoreError::UnknownEntityType(entity_type.to_string()))
    }

    pub fn entity_type(self) -> &'static str {
        match self {
            LiveTable::Tasks => "task",
            LiveTable::Columns => "column",
            LiveTable::Monitors => "monitor",
            LiveTable::Incidents => "incident",
            LiveTable::Projects => "project",
        }
    }

    pub fn table_name(self) -> &'static str {
        match self {
            LiveTable::Tasks => "tasks",
            LiveTable::Columns => "columns",
            LiveTable::Monitors => "monitors",
            LiveTable::Incidents => "incidents",
            LiveTable::Projects => "projects",
        }
    }

    /// The table's column names as SQLite reports them.
    pub fn column_names(self, conn: &Connection) -> Result<HashSet<String>, StoreError> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", self.table_name()))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;

        let mut names = HashSet::new();
        for row in rows {
            names.insert(row?);
        }
        Ok(names)
    }

    /// Read the live row for `id` as a state map, if it exists.
    pub fn fetch(self, conn: &Connection, id: i64) -> Result<Option<EntityState>, StoreError> {
        let mut stmt = conn.prepare(&format!("SELECT * FROM {} WHERE id = ?1", self.table_name()))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let state = stmt
            .query_row(params![id], |row| {
                let mut state = EntityState::new();
                for (idx, name) in names.iter().enumerate() {
                    state.insert(name.clone(), sql_to_json(row.get_ref(idx)?));
                }
                Ok(state)
            })
            .optional()?;
        Ok(state)
    }

    /// Overwrite the given columns of row `id`. Column names must already be
    /// validated against [`LiveTable::column_names`].
    pub fn update(self, conn: &Connection, id: i64, fields: &[(String, SqlValue)]) -> Result<usize, StoreError> {
        if fields.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(idx, (name, _))| format!("\"{}\" = ?{}", name, idx + 1))
            .collect();

        let mut values: Vec<SqlValue> = fields.iter().map(|(_, value)| value.clone()).collect();
        values.push(SqlValue::Integer(id));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            self.table_name(),
            assignments.join(", "),
            values.len()
        );
        Ok(conn.execute(&sql, params_from_iter(values))?)
    }

    /// Insert row `id` with the given columns. Column names must already be
    /// validated against [`LiveTable::column_names`].
    pub fn insert(self, conn: &Connection, id: i64, fields: &[(String, SqlValue)]) -> Result<(), StoreError> {
        let mut names = vec!["\"id\"".to_string()];
        let mut values = vec![SqlValue::Integer(id)];
        for (name, value) in fields {
            names.push(format!("\"{}\"", name));
            values.push(value.clone());
        }

        let placeholders: Vec<String> = (1..=values.len()).map(|idx| format!("?{idx}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_name(),
            names.join(", "),
            placeholders.join(", ")
        );
        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }
}

/// Convert a snapshot value to the SQLite value stored in a live column.
/// Booleans become 0/1; arrays and objects are stored as JSON text.
pub fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                SqlValue::Integer(int)
            } else if let Some(float) = number.as_f64() {
                SqlValue::Real(float)
            } else {
                SqlValue::Text(number.to_string())
            }
        }
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Convert a live column value into a snapshot value.
pub fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) => Value::from(int),
        ValueRef::Real(float) => serde_json::Number::from_f64(float)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
