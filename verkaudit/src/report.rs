//! One report run: fetch, filter and print
use crate::cli::Cli;
use crate::datetime::{format_epoch_utc, resolve_window};
use crate::error::Result;
use crate::output::{events_of_interest, filter_events_of_interest, write_report};
use log::info;
use std::io::Write;
use verkada_platform::{AuditLogQuery, NotificationQuery, VerkadaSession};

/// Everything a run needs, resolved from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub start_time: i64,
    pub end_time: i64,
    pub events: Vec<String>,
    pub page_size: u32,
    pub notification_type: Option<String>,
    pub include_image_url: bool,
    pub skip_notifications: bool,
}

impl ReportOptions {
    /// Resolve the window against `now` and the interest list against the defaults
    ///
    /// # Errors
    ///
    /// Returns `DateRangeInvalid` for an incomplete or inverted window
    pub fn from_cli(cli: &Cli, now: i64) -> Result<Self> {
        let (start_time, end_time) = resolve_window(cli.start, cli.end, cli.interval, now)?;
        Ok(Self {
            start_time,
            end_time,
            events: events_of_interest(&cli.events),
            page_size: cli.page_size,
            notification_type: cli.notification_type.clone(),
            include_image_url: cli.include_image_url,
            skip_notifications: cli.skip_notifications,
        })
    }

    fn audit_log_query(&self) -> AuditLogQuery {
        AuditLogQuery::new()
            .with_time_range(self.start_time, self.end_time)
            .with_page_size(Some(self.page_size))
    }

    fn notification_query(&self) -> NotificationQuery {
        let query = NotificationQuery::new()
            .with_time_range(self.start_time, self.end_time)
            .with_include_image_url(self.include_image_url)
            .with_page_size(Some(self.page_size));
        match &self.notification_type {
            Some(notification_type) => query.with_notification_type(notification_type.clone()),
            None => query,
        }
    }
}

/// Fetch audit logs (and notifications unless skipped) and write the report to `out`
///
/// # Errors
///
/// Returns any API error, or an I/O error while writing the report
pub async fn run_report<W: Write>(
    session: &VerkadaSession,
    options: &ReportOptions,
    out: &mut W,
) -> Result<()> {
    info!(
        "Reporting window {} to {} UTC",
        format_epoch_utc(options.start_time),
        format_epoch_utc(options.end_time)
    );

    let entries = session
        .audit_log_api()
        .get_audit_log_entries(&options.audit_log_query())
        .await?;
    let interesting = filter_events_of_interest(&entries, &options.events);
    info!(
        "Retrieved {} audit log entries, {} of interest",
        entries.len(),
        interesting.len()
    );

    let notifications = if options.skip_notifications {
        None
    } else {
        let notifications = session
            .notification_api()
            .get_notification_entries(&options.notification_query())
            .await?;
        info!("Retrieved {} notifications", notifications.len());
        Some(notifications)
    };

    write_report(
        out,
        (options.start_time, options.end_time),
        &interesting,
        notifications.as_deref(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;
    use tempfile::TempDir;
    use verkada_platform::{RetryConfig, VerkadaConfig};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(args: &[&str]) -> ReportOptions {
        let cli = Cli::try_parse_from(std::iter::once("verkaudit").chain(args.iter().copied()))
            .unwrap();
        ReportOptions::from_cli(&cli, 1_704_103_650).unwrap()
    }

    fn session_for(server: &MockServer, dir: &TempDir) -> VerkadaSession {
        let config = VerkadaConfig::new()
            .with_api_key("key")
            .with_base_url(server.uri())
            .with_credential_path(dir.path().join("token.json"))
            .with_retry_config(RetryConfig::no_wait());
        VerkadaSession::new(config).unwrap()
    }

    #[test]
    fn test_options_default_window() {
        let options = options(&[]);
        assert_eq!(options.start_time, 1_704_102_300);
        assert_eq!(options.end_time, 1_704_103_200);
        assert!(!options.events.is_empty());
        assert_eq!(
            options.notification_query().to_query_params(),
            vec![
                ("start_time".to_string(), "1704102300".to_string()),
                ("end_time".to_string(), "1704103200".to_string()),
                ("include_image_url".to_string(), "false".to_string()),
                ("page_size".to_string(), "100".to_string()),
            ]
        );
    }

    #[test]
    fn test_options_with_type_filter() {
        let options = options(&["--notification-type", "tamper", "--page-size", "50"]);
        let params = options.notification_query().to_query_params();
        assert!(params.contains(&("notification_type".to_string(), "tamper".to_string())));
        assert!(params.contains(&("page_size".to_string(), "50".to_string())));
    }

    #[tokio::test]
    async fn test_run_report_end_to_end() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/core/v1/audit_log"))
            .and(query_param("start_time", "1704102300"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "audit_logs": [
                    {"event_name": "Camera Viewed", "user_email": "a@example.com"},
                    {"event_name": "User Added", "user_email": "admin@example.com", "timestamp": 1704102400}
                ],
                "next_page_token": null
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cameras/v1/alerts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "notifications": [{"camera_id": "cam-9", "notification_type": "motion", "created": 1704102500}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = session_for(&server, &dir);
        let mut out = Vec::new();
        run_report(&session, &options(&[]), &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Audit events of interest (1):"));
        assert!(text.contains("[2024-01-01 09:46:40] User Added | user: admin@example.com | ip: -"));
        assert!(!text.contains("Camera Viewed"));
        assert!(text.contains("[2024-01-01 09:48:20] motion | camera: cam-9"));
    }

    #[tokio::test]
    async fn test_skip_notifications_makes_no_alert_request() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/core/v1/audit_log"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"audit_logs": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cameras/v1/alerts"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let session = session_for(&server, &dir);
        let mut out = Vec::new();
        run_report(&session, &options(&["--skip-notifications"]), &mut out)
            .await
            .unwrap();
        assert!(!String::from_utf8(out).unwrap().contains("Notifications"));
    }
}
