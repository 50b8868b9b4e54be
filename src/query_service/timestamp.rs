//! Parsing of query-string time bounds into epoch milliseconds.
//!
//! Accepted forms, all read as UTC:
//! - bare integer: epoch milliseconds (`1700000000000`)
//! - RFC 3339 / ISO-8601 with offset (`2024-01-01T00:00:00.000Z`)
//! - ISO-8601 without offset (`2024-01-01T10:30`, `2024-01-01T10:30:15.250`)
//! - date only (`2024-01-01`, midnight)

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error_handling::types::QueryError;
use crate::storage::types::{TimeRange, Timestamp};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

pub fn parse_timestamp(field: &str, raw: Option<&str>) -> Result<Timestamp, QueryError> {
    let raw = raw
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| QueryError::validation(field, "is required"))?;

    if let Ok(millis) = raw.parse::<i64>() {
        return Ok(millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().timestamp_millis());
    }

    Err(QueryError::validation(
        field,
        format!(
            "cannot parse {:?}, expected an ISO-8601 datetime or epoch milliseconds",
            raw
        ),
    ))
}

/// Both bounds of a `[start, end)` window; `end` may not precede `start`.
pub fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<TimeRange, QueryError> {
    let start = parse_timestamp("start", start)?;
    let end = parse_timestamp("end", end)?;
    if end < start {
        return Err(QueryError::validation("end", "must not be before `start`"));
    }
    Ok(TimeRange::new(start, end))
}
