//! # Verkada API Client Library
//!
//! A Rust client for the Verkada cloud REST API, focused on pulling audit-log
//! and camera notification records for a time window.
//!
//! The library handles the API token lifecycle (a long-lived API key is exchanged
//! for a short-lived token which is cached on disk), retries transient failures
//! with backoff, and merges paginated collection responses into a single result.
//!
//! ## Features
//!
//! - 🔐 **Token Lifecycle** - API key to API token exchange, on-disk caching and refresh on expiry
//! - 🌍 **Regional Endpoints** - US, EU and AU API hosts
//! - 🔄 **Resilient Requests** - Classified HTTP outcomes with rate-limit waits and linear backoff
//! - 📄 **Pagination** - `next_page_token` driven aggregation with a page cap
//! - 📜 **Audit Logs** - `/core/v1/audit_log`
//! - 📷 **Notifications** - `/cameras/v1/alerts`
//!
//! ## Quick Start
//!
//! ```no_run
//! use verkada_platform::{AuditLogQuery, VerkadaConfig, VerkadaRegion, VerkadaSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VerkadaConfig::new()
//!         .with_api_key("your_api_key")
//!         .with_region(VerkadaRegion::Us);
//!
//!     let session = VerkadaSession::new(config)?;
//!     let query = AuditLogQuery::new().with_time_range(1_700_000_000, 1_700_000_900);
//!     let logs = session.audit_log_api().get_audit_logs(&query).await?;
//!
//!     for record in logs.records("audit_logs") {
//!         println!("{record}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod audit_log;
pub mod auth;
pub mod client;
pub mod credentials;
pub mod json_validator;
pub mod notifications;
pub mod pagination;
pub mod query;
mod records;
pub mod session;

use secrecy::SecretString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// Re-export common types for convenience
pub use audit_log::{AUDIT_LOGS_FIELD, AuditLogApi, AuditLogEntry, AuditLogQuery};
pub use auth::TokenAuthenticator;
pub use client::{ApiResponse, RequestOutcome, StatusClass, VerkadaClient, classify_status};
pub use credentials::{Credential, CredentialStore, is_expired};
pub use notifications::{NOTIFICATIONS_FIELD, Notification, NotificationApi, NotificationQuery};
pub use pagination::{AggregatedResult, PageAggregator};
pub use query::{QueryWindow, clean_params};
pub use session::VerkadaSession;

/// Default lifetime we grant a cached API token. Verkada expires tokens after
/// 30 minutes; we refresh five minutes early.
pub const DEFAULT_TOKEN_EXPIRATION_SECS: i64 = 25 * 60;

/// Default location of the cached token record.
pub const DEFAULT_CREDENTIAL_FILE: &str = ".verkada_token.json";

/// Default maximum number of pages fetched for one collection request.
pub const DEFAULT_MAX_PAGES: u32 = 1000;

/// Error type for Verkada API operations.
///
/// Variants mirror the outcome classes of the request executor so callers can
/// tell "retried and gave up" apart from "not authorised at all".
#[derive(Debug, thiserror::Error)]
pub enum VerkadaError {
    /// A single HTTP transport failure (connection refused, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The API key or token was rejected; retrying will not help
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The API token has expired and must be refreshed
    #[error("Token expired: {0}")]
    TokenExpired(String),

    /// Rate limit still in force after all attempts
    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    /// 5xx response still returned after all attempts
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// 4xx response still returned after all attempts
    #[error("Client error (HTTP {status}): {message}")]
    ClientError { status: u16, message: String },

    /// Could not reach the API within the retry budget
    #[error("Connection error: {0}")]
    Connection(String),

    /// The endpoint kept returning continuation tokens past the page cap
    #[error("Pagination exhausted: more than {max_pages} pages returned")]
    PaginationExhausted { max_pages: u32 },

    /// API returned a body we could not use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Credential file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerkadaError {
    /// True for errors produced by exhausting the retry budget on a transient condition.
    #[must_use]
    pub fn is_retryable_exhausted(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::RateLimited { .. }
                | Self::ServerError { .. }
                | Self::ClientError { .. }
        )
    }

    /// True when the credentials themselves were refused.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::TokenExpired(_))
    }
}

/// Verkada regions for API access.
///
/// Each region is served from its own API host. Choose the region your
/// organization was created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerkadaRegion {
    /// United States - api.verkada.com
    Us,
    /// Europe - api.eu.verkada.com
    Eu,
    /// Australia - api.au.verkada.com
    #[default]
    Au,
}

impl VerkadaRegion {
    /// Base URL of the API host for this region.
    #[must_use]
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Us => "https://api.verkada.com",
            Self::Eu => "https://api.eu.verkada.com",
            Self::Au => "https://api.au.verkada.com",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "us",
            Self::Eu => "eu",
            Self::Au => "au",
        }
    }
}

impl fmt::Display for VerkadaRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerkadaRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "us" => Ok(Self::Us),
            "eu" => Ok(Self::Eu),
            "au" => Ok(Self::Au),
            _ => Err(format!("Invalid region '{s}'. Valid values: us, eu, au")),
        }
    }
}

/// Retry policy for the request executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts per request (default: 3)
    pub max_attempts: u32,
    /// Unit of the linear backoff used for 5xx, 4xx and transport failures (default: 2s)
    pub base_wait: Duration,
    /// Fixed wait after a 429 response (default: 10s)
    pub rate_limit_wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_wait: Duration::from_secs(2),
            rate_limit_wait: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Retry policy with the default attempt count and no waiting, for tests.
    #[must_use]
    pub fn no_wait() -> Self {
        Self {
            base_wait: Duration::ZERO,
            rate_limit_wait: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_base_wait(mut self, base_wait: Duration) -> Self {
        self.base_wait = base_wait;
        self
    }

    #[must_use]
    pub fn with_rate_limit_wait(mut self, rate_limit_wait: Duration) -> Self {
        self.rate_limit_wait = rate_limit_wait;
        self
    }

    /// Backoff before the attempt following `attempt` (1-based): `attempt × base_wait`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_wait.saturating_mul(attempt)
    }
}

/// Configuration for the Verkada API client.
///
/// Everything the client, the credential store and the retry loop need is
/// carried here so tests can inject short waits and a mock base URL.
#[derive(Clone)]
pub struct VerkadaConfig {
    /// Long-lived API key (should be kept secret)
    pub api_key: Option<SecretString>,
    /// Base URL for API requests
    pub base_url: String,
    /// Region the base URL was derived from
    pub region: VerkadaRegion,
    /// Where the cached API token is persisted
    pub credential_path: PathBuf,
    /// Seconds a cached token is trusted after issue
    pub token_expiration_secs: i64,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Whole-request timeout in seconds
    pub request_timeout: u64,
    /// Upper bound on pages fetched per collection call (None = unbounded)
    pub max_pages: Option<u32>,
    /// HTTP(S) proxy URL
    pub proxy_url: Option<String>,
    /// Whether to validate TLS certificates (default: true)
    pub validate_certificates: bool,
    /// Retry policy
    pub retry_config: RetryConfig,
}

impl fmt::Debug for VerkadaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerkadaConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("region", &self.region)
            .field("credential_path", &self.credential_path)
            .field("token_expiration_secs", &self.token_expiration_secs)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("max_pages", &self.max_pages)
            .field("proxy_url", &self.proxy_url)
            .field("validate_certificates", &self.validate_certificates)
            .field("retry_config", &self.retry_config)
            .finish()
    }
}

impl Default for VerkadaConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl VerkadaConfig {
    /// Create a configuration for the default (AU) region with no API key.
    #[must_use]
    pub fn new() -> Self {
        let region = VerkadaRegion::default();
        Self {
            api_key: None,
            base_url: region.base_url().to_string(),
            region,
            credential_path: PathBuf::from(DEFAULT_CREDENTIAL_FILE),
            token_expiration_secs: DEFAULT_TOKEN_EXPIRATION_SECS,
            connect_timeout: 10,
            request_timeout: 30,
            max_pages: Some(DEFAULT_MAX_PAGES),
            proxy_url: None,
            validate_certificates: true,
            retry_config: RetryConfig::default(),
        }
    }

    /// Set the API key used to obtain API tokens.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Set the region; this also resets `base_url` to the region's host.
    #[must_use]
    pub fn with_region(mut self, region: VerkadaRegion) -> Self {
        self.region = region;
        self.base_url = region.base_url().to_string();
        self
    }

    /// Override the base URL (trailing slashes are dropped).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = path.into();
        self
    }

    #[must_use]
    pub fn with_token_expiration(mut self, seconds: i64) -> Self {
        self.token_expiration_secs = seconds;
        self
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Set connect and request timeouts in seconds.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: u64, request_timeout: u64) -> Self {
        self.connect_timeout = connect_timeout;
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Disable certificate validation for development environments.
    ///
    /// WARNING: Never use this in production.
    #[must_use]
    pub fn with_certificate_validation_disabled(mut self) -> Self {
        self.validate_certificates = false;
        self
    }

    /// Check the configuration is usable before building a client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an unparsable base URL, a zero page cap or
    /// a non-positive token expiration window.
    pub fn validate(&self) -> Result<(), VerkadaError> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| VerkadaError::InvalidConfig(format!("Invalid base URL '{}': {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(VerkadaError::InvalidConfig(format!(
                "Base URL must use http or https: {}",
                self.base_url
            )));
        }
        if self.max_pages == Some(0) {
            return Err(VerkadaError::InvalidConfig(
                "Page cap must allow at least one page".to_string(),
            ));
        }
        if self.token_expiration_secs <= 0 {
            return Err(VerkadaError::InvalidConfig(
                "Token expiration window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
