// ABOUTME: Paged audit-log listing with optional entity filters, and aggregate log statistics.
// ABOUTME: Both are plain reads over the change log, newest first.

use std::collections::BTreeMap;

use chrono::Duration;
use rewind_core::ChangeRecord;
use serde::Serialize;

use crate::error::StoreError;
use crate::log::ChangeLog;
use crate::store::EventStore;

/// Filter criteria for audit listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            entity_type: None,
            entity_id: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// Aggregate counts over the whole change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    pub total_actions: i64,
    pub by_action: BTreeMap<String, i64>,
    pub by_entity: BTreeMap<String, i64>,
    pub recent_24h: i64,
}

impl EventStore {
    /// List change records matching `filter`, newest first.
    pub fn audit_logs(&self, filter: &AuditFilter) -> Result<Vec<ChangeRecord>, StoreError> {
        let conn = self.connection();
        ChangeLog::new(&conn).filtered(filter)
    }

    /// Totals by action and entity type, plus records from the last 24 hours.
    pub fn audit_stats(&self) -> Result<AuditStats, StoreError> {
        let since = self.now() - Duration::hours(24);
        let conn = self.connection();
        let log = ChangeLog::new(&conn);

        Ok(AuditStats {
            total_actions: log.count()?,
            by_action: log.count_by_action()?,
            by_entity: log.count_by_entity_type()?,
            recent_24h: log.count_since(since)?,
        })
    }
}
