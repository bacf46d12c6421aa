// ABOUTME: Parsing and canonical formatting of change-record timestamps.
// ABOUTME: Stored timestamps are fixed-width RFC 3339 UTC so string order matches time order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::CoreError;

/// Format a timestamp the way the change log stores it:
/// `2024-01-15T10:30:00.000000Z`.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a caller-supplied timestamp.
///
/// Accepts RFC 3339 with any offset, a naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (or with a space separator) read as UTC, or a bare `YYYY-MM-DD` meaning
/// midnight UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, CoreError> {
    let trimmed = input.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(at.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }

    Err(CoreError::InvalidTimestamp(input.to_string()))
}
