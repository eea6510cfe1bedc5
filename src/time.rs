//! Time dimension: epoch milliseconds to a calendar-decomposed row.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use rustc_hash::FxHashSet;

use crate::error::RecordError;
use crate::models::TimeRow;

/// 9999-12-31T23:59:59.999Z. Later timestamps are rejected.
pub const MAX_TIMESTAMP_MS: i64 = 253_402_300_799_999;

/// Derive the time row for one event timestamp.
///
/// Timestamps before the Unix epoch or after [`MAX_TIMESTAMP_MS`] fail with
/// `InvalidTimestamp` rather than producing a nonsense calendar row.
pub fn derive_time_row(ts_ms: i64) -> Result<TimeRow, RecordError> {
    if !(0..=MAX_TIMESTAMP_MS).contains(&ts_ms) {
        return Err(RecordError::InvalidTimestamp(ts_ms));
    }
    let start_time = DateTime::from_timestamp_millis(ts_ms)
        .ok_or(RecordError::InvalidTimestamp(ts_ms))?
        .naive_utc();

    Ok(TimeRow {
        start_time,
        hour: start_time.hour(),
        day: start_time.day(),
        week: start_time.iso_week().week(),
        month: start_time.month(),
        year: start_time.year(),
        weekday: start_time.weekday().num_days_from_monday(),
    })
}

/// Keep the first row for each distinct start time, preserving order.
pub fn distinct_time_rows(rows: &[TimeRow]) -> Vec<TimeRow> {
    let mut seen: FxHashSet<NaiveDateTime> = FxHashSet::default();
    rows.iter()
        .filter(|row| seen.insert(row.start_time))
        .cloned()
        .collect()
}
