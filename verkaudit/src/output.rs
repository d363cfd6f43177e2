//! Report filtering and formatting
use crate::datetime::format_epoch_utc;
use std::io::Write;
use verkada_platform::{AuditLogEntry, Notification};

/// Audit events reported when no `--event` is given
pub const DEFAULT_EVENTS_OF_INTEREST: &[&str] = &[
    "User Login Failed",
    "User Added",
    "User Removed",
    "User Role Updated",
    "API Key Created",
    "API Key Deleted",
    "Camera Added",
    "Camera Deleted",
    "Door Unlocked Remotely",
    "Alarm Disarmed",
];

/// Resolve the interest list: explicit events or the built-in defaults
#[must_use]
pub fn events_of_interest(requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        DEFAULT_EVENTS_OF_INTEREST
            .iter()
            .map(|event| (*event).to_string())
            .collect()
    } else {
        requested.to_vec()
    }
}

/// Keep audit entries whose event name is in `interest` (case-insensitive), in order
#[must_use]
pub fn filter_events_of_interest<'a>(
    entries: &'a [AuditLogEntry],
    interest: &[String],
) -> Vec<&'a AuditLogEntry> {
    entries
        .iter()
        .filter(|entry| {
            entry.event_name.as_deref().is_some_and(|name| {
                interest
                    .iter()
                    .any(|wanted| wanted.trim().eq_ignore_ascii_case(name.trim()))
            })
        })
        .collect()
}

/// Render an API timestamp; epoch seconds become `YYYY-MM-DD HH:MM:SS`
fn display_time(raw: Option<&str>) -> String {
    match raw {
        Some(value) => value
            .parse::<i64>()
            .map(format_epoch_utc)
            .unwrap_or_else(|_| value.to_string()),
        None => "-".to_string(),
    }
}

#[must_use]
pub fn format_audit_entry(entry: &AuditLogEntry) -> String {
    let user = entry
        .user_email
        .as_deref()
        .or(entry.user_name.as_deref())
        .unwrap_or("-");
    format!(
        "[{}] {} | user: {} | ip: {}",
        display_time(entry.timestamp.as_deref()),
        entry.event_name.as_deref().unwrap_or("<unnamed event>"),
        user,
        entry.ip_address.as_deref().unwrap_or("-"),
    )
}

#[must_use]
pub fn format_notification(notification: &Notification) -> String {
    let mut line = format!(
        "[{}] {} | camera: {}",
        display_time(notification.created.as_deref()),
        notification.notification_type.as_deref().unwrap_or("unknown"),
        notification.camera_id.as_deref().unwrap_or("-"),
    );
    if let Some(label) = &notification.person_label {
        line.push_str(&format!(" | person: {label}"));
    }
    if let Some(url) = notification.video_url.as_ref().or(notification.image_url.as_ref()) {
        line.push_str(&format!(" | {url}"));
    }
    line
}

/// Write the report for one window.
///
/// `notifications` is `None` when they were not requested.
///
/// # Errors
///
/// Returns any error from writing to `out`
pub fn write_report<W: Write>(
    out: &mut W,
    window: (i64, i64),
    audit_entries: &[&AuditLogEntry],
    notifications: Option<&[Notification]>,
) -> std::io::Result<()> {
    let (start, end) = window;
    writeln!(
        out,
        "Verkada activity from {} to {} UTC",
        format_epoch_utc(start),
        format_epoch_utc(end)
    )?;

    writeln!(out)?;
    writeln!(out, "Audit events of interest ({}):", audit_entries.len())?;
    if audit_entries.is_empty() {
        writeln!(out, "  none")?;
    }
    for entry in audit_entries {
        writeln!(out, "  {}", format_audit_entry(entry))?;
    }

    if let Some(notifications) = notifications {
        writeln!(out)?;
        writeln!(out, "Notifications ({}):", notifications.len())?;
        if notifications.is_empty() {
            writeln!(out, "  none")?;
        }
        for notification in notifications {
            writeln!(out, "  {}", format_notification(notification))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> AuditLogEntry {
        AuditLogEntry {
            event_name: Some(name.to_string()),
            ..AuditLogEntry::default()
        }
    }

    #[test]
    fn test_default_interest_list() {
        let events = events_of_interest(&[]);
        assert_eq!(events.len(), DEFAULT_EVENTS_OF_INTEREST.len());

        let custom = vec!["Door Opened".to_string()];
        assert_eq!(events_of_interest(&custom), custom);
    }

    #[test]
    fn test_filter_keeps_order_and_ignores_case() {
        let entries = vec![
            entry("User Added"),
            entry("Camera Viewed"),
            entry("api key created"),
            AuditLogEntry::default(),
            entry("User Added"),
        ];
        let interest = events_of_interest(&[]);

        let names: Vec<_> = filter_events_of_interest(&entries, &interest)
            .into_iter()
            .filter_map(|e| e.event_name.as_deref())
            .collect();
        assert_eq!(names, vec!["User Added", "api key created", "User Added"]);
    }

    #[test]
    fn test_format_audit_entry() {
        let entry = AuditLogEntry {
            event_name: Some("User Added".to_string()),
            timestamp: Some("1704103650".to_string()),
            user_name: Some("Dana".to_string()),
            ip_address: Some("10.0.0.5".to_string()),
            ..AuditLogEntry::default()
        };
        assert_eq!(
            format_audit_entry(&entry),
            "[2024-01-01 10:07:30] User Added | user: Dana | ip: 10.0.0.5"
        );

        let iso = AuditLogEntry {
            timestamp: Some("2024-01-01T10:07:30Z".to_string()),
            ..AuditLogEntry::default()
        };
        assert_eq!(
            format_audit_entry(&iso),
            "[2024-01-01T10:07:30Z] <unnamed event> | user: - | ip: -"
        );
    }

    #[test]
    fn test_format_notification() {
        let notification = Notification {
            camera_id: Some("cam-1".to_string()),
            created: Some("1704103650".to_string()),
            notification_type: Some("tamper".to_string()),
            image_url: Some("https://img".to_string()),
            ..Notification::default()
        };
        assert_eq!(
            format_notification(&notification),
            "[2024-01-01 10:07:30] tamper | camera: cam-1 | https://img"
        );
    }

    #[test]
    fn test_write_report() {
        let entries = [entry("User Added")];
        let refs: Vec<&AuditLogEntry> = entries.iter().collect();
        let mut out = Vec::new();

        write_report(&mut out, (1_704_102_300, 1_704_103_200), &refs, Some(&[][..])).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Verkada activity from 2024-01-01 09:45:00 to 2024-01-01 10:00:00 UTC"));
        assert!(text.contains("Audit events of interest (1):"));
        assert!(text.contains("  [-] User Added | user: - | ip: -"));
        assert!(text.contains("Notifications (0):\n  none"));
    }

    #[test]
    fn test_write_report_without_notifications() {
        let mut out = Vec::new();
        write_report(&mut out, (0, 900), &[], None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Audit events of interest (0):\n  none"));
        assert!(!text.contains("Notifications"));
    }
}
