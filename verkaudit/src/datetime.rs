//! Time window handling for report runs
use crate::error::{Result, VerkauditError};
use chrono::{DateTime, NaiveDateTime, Utc};
use verkada_platform::QueryWindow;

/// Human readable datetime format (always UTC)
pub const FORMAT_DATETIME_SECOND: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a point in time given as epoch seconds or `YYYY-MM-DD HH:MM:SS` (UTC)
///
/// # Errors
///
/// Returns `InvalidDateTimeFormat` if the value matches neither form
///
/// # Examples
///
/// ```
/// use verkaudit::datetime::parse_timestamp;
///
/// assert_eq!(parse_timestamp("1704067200").unwrap(), 1_704_067_200);
/// assert_eq!(parse_timestamp("2024-01-01 00:00:00").unwrap(), 1_704_067_200);
/// ```
pub fn parse_timestamp(value: &str) -> Result<i64> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(VerkauditError::InvalidDateTimeFormat(
            "Datetime cannot be empty".to_string(),
        ));
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse::<i64>().map_err(|_| {
            VerkauditError::InvalidDateTimeFormat(format!("Epoch seconds out of range: '{value}'"))
        });
    }

    NaiveDateTime::parse_from_str(trimmed, FORMAT_DATETIME_SECOND)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| {
            VerkauditError::InvalidDateTimeFormat(format!(
                "'{value}'. Expected epoch seconds or YYYY-MM-DD HH:MM:SS"
            ))
        })
}

/// Format epoch seconds as `YYYY-MM-DD HH:MM:SS`, falling back to the raw number
#[must_use]
pub fn format_epoch_utc(epoch_secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.format(FORMAT_DATETIME_SECOND).to_string())
        .unwrap_or_else(|| epoch_secs.to_string())
}

/// Current time in epoch seconds
#[must_use]
pub fn now_epoch_secs() -> i64 {
    Utc::now().timestamp()
}

/// Work out the `(start, end)` window for this run.
///
/// Explicit bounds win; otherwise the most recently completed
/// `interval_minutes` interval before `now` is used.
///
/// # Errors
///
/// Returns `DateRangeInvalid` if only one bound is given or start is not before end
pub fn resolve_window(
    start: Option<i64>,
    end: Option<i64>,
    interval_minutes: u32,
    now: i64,
) -> Result<(i64, i64)> {
    let window = QueryWindow::new(start, end)
        .map_err(|e| VerkauditError::DateRangeInvalid(e.to_string()))?;
    Ok(window.resolve(now, i64::from(interval_minutes) * 60))
}
