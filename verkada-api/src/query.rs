//! Query parameter helpers and time windows.

use crate::VerkadaError;

/// Page size requested when the caller does not choose one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Largest page size the collection endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 200;

pub(crate) fn validate_page_size(page_size: Option<u32>) -> Result<(), VerkadaError> {
    match page_size {
        Some(size) if !(1..=MAX_PAGE_SIZE).contains(&size) => Err(VerkadaError::InvalidConfig(
            format!("Page size must be between 1 and {MAX_PAGE_SIZE}, got {size}"),
        )),
        _ => Ok(()),
    }
}

/// Drop parameters without a value and stringify the rest, preserving order.
///
/// A key with an absent value is never sent, not even as an empty string.
///
/// ```
/// use verkada_platform::clean_params;
///
/// let params = clean_params([
///     ("start_time", None),
///     ("end_time", Some(5)),
///     ("page_size", None),
/// ]);
/// assert_eq!(params, vec![("end_time".to_string(), "5".to_string())]);
/// ```
pub fn clean_params<I, K, V>(params: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: Into<String>,
    V: ToString,
{
    params
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.into(), v.to_string())))
        .collect()
}

/// Start/end bounds of a query in epoch seconds.
///
/// Either both bounds are set or neither is; an unset window resolves to the
/// most recently completed fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryWindow {
    start_time: Option<i64>,
    end_time: Option<i64>,
}

impl QueryWindow {
    /// Build a window from optional bounds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if exactly one bound is given or `start >= end`.
    pub fn new(start_time: Option<i64>, end_time: Option<i64>) -> Result<Self, VerkadaError> {
        match (start_time, end_time) {
            (Some(start), Some(end)) if start >= end => Err(VerkadaError::InvalidConfig(format!(
                "Start time ({start}) must be before end time ({end})"
            ))),
            (Some(_), None) | (None, Some(_)) => Err(VerkadaError::InvalidConfig(
                "Start and end times must be given together".to_string(),
            )),
            _ => Ok(Self {
                start_time,
                end_time,
            }),
        }
    }

    #[must_use]
    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> Option<i64> {
        self.end_time
    }

    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.start_time.is_some()
    }

    /// The last full `interval_secs` interval ending at or before `now`.
    ///
    /// With a 15-minute interval and `now` = 10:07:30 this is 09:45:00..10:00:00;
    /// exactly on a boundary (10:00:00) it is the interval that just finished.
    #[must_use]
    pub fn latest_completed_interval(now: i64, interval_secs: i64) -> (i64, i64) {
        let interval = interval_secs.max(1);
        let end = now - now.rem_euclid(interval);
        (end - interval, end)
    }

    /// Concrete `(start, end)` bounds: the explicit ones, or the latest completed interval.
    #[must_use]
    pub fn resolve(&self, now: i64, interval_secs: i64) -> (i64, i64) {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (start, end),
            _ => Self::latest_completed_interval(now, interval_secs),
        }
    }
}
