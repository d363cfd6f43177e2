//! Verkada camera notifications (`GET /cameras/v1/alerts`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::VerkadaError;
use crate::pagination::AggregatedResult;
use crate::query::{QueryWindow, clean_params, validate_page_size};
use crate::records::{into_typed, string_or_number};
use crate::session::VerkadaSession;

/// Camera notification collection endpoint.
pub const NOTIFICATIONS_ENDPOINT: &str = "/cameras/v1/alerts";

/// Response field holding the notification records.
pub const NOTIFICATIONS_FIELD: &str = "notifications";

/// Query parameters for camera notification retrieval
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationQuery {
    /// Start of the window in epoch seconds
    pub start_time: Option<i64>,
    /// End of the window in epoch seconds
    pub end_time: Option<i64>,
    /// Ask the API to include a signed thumbnail URL per notification
    pub include_image_url: Option<bool>,
    /// Records per page (1-200)
    pub page_size: Option<u32>,
    /// Comma separated notification types, e.g. `person_of_interest,tamper`
    pub notification_type: Option<String>,
}

impl NotificationQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_time_range(mut self, start_time: i64, end_time: i64) -> Self {
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: QueryWindow) -> Self {
        self.start_time = window.start_time();
        self.end_time = window.end_time();
        self
    }

    #[must_use]
    pub fn with_include_image_url(mut self, include: bool) -> Self {
        self.include_image_url = Some(include);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_notification_type(mut self, notification_type: impl Into<String>) -> Self {
        self.notification_type = Some(notification_type.into());
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

impl From<&NotificationQuery> for Vec<(String, String)> {
    fn from(query: &NotificationQuery) -> Self {
        clean_params([
            ("start_time", query.start_time.map(|v| v.to_string())),
            ("end_time", query.end_time.map(|v| v.to_string())),
            ("include_image_url", query.include_image_url.map(|v| v.to_string())),
            ("page_size", query.page_size.map(|v| v.to_string())),
            ("notification_type", query.notification_type.clone()),
        ])
    }
}

/// A camera notification (motion, person of interest, tamper, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, deserialize_with = "string_or_number")]
    pub camera_id: Option<String>,
    /// Epoch seconds the notification was raised at
    #[serde(default, deserialize_with = "string_or_number")]
    pub created: Option<String>,
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub person_label: Option<String>,
    #[serde(default)]
    pub crowd_threshold: Option<f64>,
    /// Only present when `include_image_url` was requested
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub objects: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Notification API operations
pub struct NotificationApi<'a> {
    session: &'a VerkadaSession,
}

impl<'a> NotificationApi<'a> {
    /// Create a new `NotificationApi` instance
    #[must_use]
    pub fn new(session: &'a VerkadaSession) -> Self {
        Self { session }
    }

    /// Fetch every notification page for `query`, merged under `notifications`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an invalid query, otherwise any
    /// authentication, executor or pagination error.
    pub async fn get_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<AggregatedResult, VerkadaError> {
        query.validate()?;
        let params = query.to_query_params();
        self.session
            .fetch_collection(NOTIFICATIONS_ENDPOINT, &params, &[NOTIFICATIONS_FIELD])
            .await
    }

    /// Like [`Self::get_notifications`], decoded into [`Notification`] values.
    ///
    /// # Errors
    ///
    /// See [`Self::get_notifications`].
    pub async fn get_notification_entries(
        &self,
        query: &NotificationQuery,
    ) -> Result<Vec<Notification>, VerkadaError> {
        let result = self.get_notifications(query).await?;
        into_typed(result, NOTIFICATIONS_FIELD)
    }
}
