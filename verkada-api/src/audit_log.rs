//! Verkada Audit Log API
//!
//! Organization audit events (logins, permission changes, device changes)
//! from `GET /core/v1/audit_log`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::pagination::AggregatedResult;
use crate::query::{DEFAULT_PAGE_SIZE, QueryWindow, clean_params, validate_page_size};
use crate::records::{into_typed, string_or_number};
use crate::session::VerkadaSession;
use crate::VerkadaError;

/// Audit log collection endpoint.
pub const AUDIT_LOG_ENDPOINT: &str = "/core/v1/audit_log";

/// Response field holding the audit log records.
pub const AUDIT_LOGS_FIELD: &str = "audit_logs";

/// Query parameters for audit log retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Start of the window in epoch seconds
    pub start_time: Option<i64>,
    /// End of the window in epoch seconds
    pub end_time: Option<i64>,
    /// Records per page (1-200)
    pub page_size: Option<u32>,
}

impl Default for AuditLogQuery {
    fn default() -> Self {
        Self {
            start_time: None,
            end_time: None,
            page_size: Some(DEFAULT_PAGE_SIZE),
        }
    }
}

impl AuditLogQuery {
    /// Query for the API's default window with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit to events between `start_time` and `end_time` (epoch seconds)
    #[must_use]
    pub fn with_time_range(mut self, start_time: i64, end_time: i64) -> Self {
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self
    }

    /// Use the bounds of a resolved window, if it has any
    #[must_use]
    pub fn with_window(mut self, window: QueryWindow) -> Self {
        self.start_time = window.start_time();
        self.end_time = window.end_time();
        self
    }

    /// Set the page size, or `None` to let the API choose
    #[must_use]
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` for a page size outside 1..=200 or an
    /// incomplete or inverted time range.
    pub fn validate(&self) -> Result<(), VerkadaError> {
        validate_page_size(self.page_size)?;
        QueryWindow::new(self.start_time, self.end_time)?;
        Ok(())
    }

    /// Convert to query parameters; unset values are omitted.
    #[must_use]
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        Vec::from(self)
    }
}

impl From<&AuditLogQuery> for Vec<(String, String)> {
    fn from(query: &AuditLogQuery) -> Self {
        clean_params([
            ("start_time", query.start_time),
            ("end_time", query.end_time),
            ("page_size", query.page_size.map(i64::from)),
        ])
    }
}

/// A single audit log record.
///
/// The API has added fields over time, so everything is optional and unknown
/// fields are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Event name, e.g. "User Logged In"
    #[serde(default)]
    pub event_name: Option<String>,
    /// When the event happened (ISO 8601 string or epoch seconds)
    #[serde(default, deserialize_with = "string_or_number")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub organization_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Devices the event refers to
    #[serde(default)]
    pub devices: Option<Vec<Value>>,
    /// Event specific payload
    #[serde(default)]
    pub details: Option<Value>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Audit Log API operations
pub struct AuditLogApi<'a> {
    session: &'a VerkadaSession,
}

impl<'a> AuditLogApi<'a> {
    /// Create a new `AuditLogApi` instance
    #[must_use]
    pub fn new(session: &'a VerkadaSession) -> Self {
        Self { session }
    }

    /// Fetch every audit log page for `query`.
    ///
    /// The returned result holds the merged `audit_logs` records.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an invalid query, otherwise any
    /// authentication, executor or pagination error.
    pub async fn get_audit_logs(&self, query: &AuditLogQuery) -> Result<AggregatedResult, VerkadaError> {
        query.validate()?;
        let params = query.to_query_params();
        self.session
            .fetch_collection(AUDIT_LOG_ENDPOINT, &params, &[AUDIT_LOGS_FIELD])
            .await
    }

    /// Like [`Self::get_audit_logs`], decoded into [`AuditLogEntry`] values.
    ///
    /// # Errors
    ///
    /// See [`Self::get_audit_logs`]; also `Serialization` for a record that is
    /// not a JSON object.
    pub async fn get_audit_log_entries(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogEntry>, VerkadaError> {
        let result = self.get_audit_logs(query).await?;
        into_typed(result, AUDIT_LOGS_FIELD)
    }
}
