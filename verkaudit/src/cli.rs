//! CLI argument parsing for verkaudit
use crate::datetime::parse_timestamp;
use clap::Parser;
use verkada_platform::VerkadaRegion;

#[derive(Parser, Debug)]
#[command(
    name = "verkaudit",
    version,
    about = "Verkada audit log and camera notification report",
    long_about = "Prints Verkada audit-log events of interest and camera notifications for one time window. \
                  Intended to run from cron on a fixed cadence.",
    after_help = "ENVIRONMENT:
  VERKADA_API_KEY                  API key used to obtain API tokens (required for real calls)
  VERKADA_REGION                   us, eu or au (default: au)
  VERKADA_BASE_URL                 Override the API host
  VERKADA_TOKEN_FILE               Where the API token is cached (default: .verkada_token.json)
  VERKADA_DISABLE_CERT_VALIDATION  Skip TLS verification (development only)
  HTTPS_PROXY / HTTP_PROXY         Proxy for API requests
  RUST_LOG                         Log level (default: info)

EXAMPLES:
  # Report the last completed 15-minute interval
  verkaudit

  # Explicit window
  verkaudit --start '2024-01-01 09:00:00' --end '2024-01-01 10:00:00'"
)]
pub struct Cli {
    /// Window start: epoch seconds or YYYY-MM-DD HH:MM:SS (UTC). Requires --end
    #[arg(short, long, requires = "end", value_parser = validate_timestamp)]
    pub start: Option<i64>,

    /// Window end: epoch seconds or YYYY-MM-DD HH:MM:SS (UTC). Requires --start
    #[arg(short, long, requires = "start", value_parser = validate_timestamp)]
    pub end: Option<i64>,

    /// Interval in minutes used when no explicit window is given
    #[arg(short, long, default_value_t = 15, value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub interval: u32,

    /// Verkada region (us, eu, au); overrides VERKADA_REGION
    #[arg(long, value_parser = clap::value_parser!(VerkadaRegion))]
    pub region: Option<VerkadaRegion>,

    /// Audit event name to report; repeat for several. Defaults to a built-in list
    #[arg(long = "event", value_name = "EVENT_NAME", value_parser = validate_event)]
    pub events: Vec<String>,

    /// Records per page (1-200)
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=200))]
    pub page_size: u32,

    /// Only fetch notifications of this type, e.g. person_of_interest
    #[arg(long)]
    pub notification_type: Option<String>,

    /// Ask for a thumbnail URL on each notification
    #[arg(long)]
    pub include_image_url: bool,

    /// Do not fetch camera notifications
    #[arg(long)]
    pub skip_notifications: bool,
}

fn validate_timestamp(s: &str) -> Result<i64, String> {
    parse_timestamp(s).map_err(|e| e.to_string())
}

fn validate_event(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("Event name cannot be empty".to_string());
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("verkaudit").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.start, None);
        assert_eq!(cli.end, None);
        assert_eq!(cli.interval, 15);
        assert_eq!(cli.page_size, 100);
        assert!(cli.region.is_none());
        assert!(cli.events.is_empty());
        assert!(!cli.include_image_url);
        assert!(!cli.skip_notifications);
    }

    #[test]
    fn test_explicit_window() {
        let cli = parse(&["--start", "1700000000", "--end", "2023-11-14 22:15:00"]).unwrap();
        assert_eq!(cli.start, Some(1_700_000_000));
        assert_eq!(cli.end, Some(1_700_000_100));
    }

    #[test]
    fn test_start_and_end_require_each_other() {
        assert!(parse(&["--start", "1700000000"]).is_err());
        assert!(parse(&["--end", "1700000000"]).is_err());
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        assert!(parse(&["--start", "yesterday", "--end", "1700000000"]).is_err());
    }

    #[test]
    fn test_interval_range() {
        assert_eq!(parse(&["--interval", "60"]).unwrap().interval, 60);
        assert!(parse(&["--interval", "0"]).is_err());
        assert!(parse(&["--interval", "1441"]).is_err());
    }

    #[test]
    fn test_page_size_range() {
        assert!(parse(&["--page-size", "200"]).is_ok());
        assert!(parse(&["--page-size", "201"]).is_err());
    }

    #[test]
    fn test_region_and_events() {
        let cli = parse(&[
            "--region",
            "EU",
            "--event",
            "User Added",
            "--event",
            "Camera Deleted",
            "--notification-type",
            "tamper",
            "--include-image-url",
            "--skip-notifications",
        ])
        .unwrap();

        assert_eq!(cli.region, Some(VerkadaRegion::Eu));
        assert_eq!(cli.events, vec!["User Added", "Camera Deleted"]);
        assert_eq!(cli.notification_type.as_deref(), Some("tamper"));
        assert!(cli.include_image_url);
        assert!(cli.skip_notifications);
    }

    #[test]
    fn test_invalid_region_and_blank_event() {
        assert!(parse(&["--region", "commercial"]).is_err());
        assert!(parse(&["--event", "  "]).is_err());
    }
}
