//! Core Verkada API client implementation.
//!
//! This module contains the HTTP client and the resilient request executor:
//! every call is classified into a [`RequestOutcome`] and the retry loop
//! dispatches on that outcome explicitly.

use log::{debug, info, warn};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response, StatusCode};
use std::borrow::Cow;
use std::time::Duration;

use crate::{VerkadaConfig, VerkadaError};

/// Maximum number of characters of an error body kept in error messages.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Coarse classification of an HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    TokenExpired,
    AuthError,
    RateLimited,
    ServerError,
    ClientError,
}

/// Classify a status code according to the executor's retry policy.
///
/// Anything that is neither 2xx, 401, 409, 429 nor 5xx (including 1xx/3xx
/// that reqwest did not follow) is treated as a client error.
#[must_use]
pub fn classify_status(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        200..=299 => StatusClass::Success,
        401 => StatusClass::TokenExpired,
        409 => StatusClass::AuthError,
        429 => StatusClass::RateLimited,
        500..=599 => StatusClass::ServerError,
        _ => StatusClass::ClientError,
    }
}

/// A 2xx response whose body has been read in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }
}

/// Result of a single HTTP attempt.
#[derive(Debug)]
pub enum RequestOutcome {
    Success(ApiResponse),
    AuthError(String),
    TokenExpired(String),
    RateLimited(String),
    ServerError { status: u16, message: String },
    ClientError { status: u16, message: String },
    TransportError(reqwest::Error),
}

impl RequestOutcome {
    /// Classify the result of `RequestBuilder::send`.
    ///
    /// A success body is read here, so a body that times out or is cut short
    /// is a transport failure of this attempt. Non-success bodies are read
    /// (and truncated) so that the final error carries the vendor's message.
    pub async fn from_result(result: Result<Response, reqwest::Error>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(e) => return Self::TransportError(e),
        };

        let status = response.status();
        match classify_status(status) {
            StatusClass::Success => match response.text().await {
                Ok(body) => Self::Success(ApiResponse { status, body }),
                Err(e) => Self::TransportError(e),
            },
            StatusClass::TokenExpired => Self::TokenExpired(read_error_message(response).await),
            StatusClass::AuthError => Self::AuthError(read_error_message(response).await),
            StatusClass::RateLimited => Self::RateLimited(read_error_message(response).await),
            StatusClass::ServerError => Self::ServerError {
                status: status.as_u16(),
                message: read_error_message(response).await,
            },
            StatusClass::ClientError => Self::ClientError {
                status: status.as_u16(),
                message: read_error_message(response).await,
            },
        }
    }
}

async fn read_error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format_error_message(status, &body)
}

fn format_error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {status}");
    }
    let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("HTTP {status}: {truncated}")
}

/// Core Verkada API client.
///
/// Wraps a `reqwest::Client` configured from [`VerkadaConfig`] and provides the
/// retrying executor used by the authenticator and the page aggregator.
#[derive(Clone)]
pub struct VerkadaClient {
    config: VerkadaConfig,
    client: Client,
}

impl VerkadaClient {
    /// Create a new Verkada API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the underlying
    /// HTTP client cannot be built (e.g. a malformed proxy URL).
    pub fn new(config: VerkadaConfig) -> Result<Self, VerkadaError> {
        config.validate()?;

        if config.api_key.is_none() {
            warn!("No Verkada API key configured; requests will fail until one is provided");
        }

        let mut client_builder = Client::builder()
            .user_agent(concat!("verkada-platform/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout));

        if !config.validate_certificates {
            client_builder = client_builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| VerkadaError::InvalidConfig(format!("Invalid proxy URL: {e}")))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder.build().map_err(VerkadaError::Http)?;
        Ok(Self { config, client })
    }

    /// Get the base URL for API requests.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get access to the configuration
    #[must_use]
    pub fn config(&self) -> &VerkadaConfig {
        &self.config
    }

    /// Build the full URL for `endpoint` with URL-encoded query parameters.
    fn build_url(&self, endpoint: &str, params: &[(String, String)]) -> String {
        let estimated_capacity = self
            .config
            .base_url
            .len()
            .saturating_add(endpoint.len())
            .saturating_add(params.len().saturating_mul(32));

        let mut url = String::with_capacity(estimated_capacity);
        url.push_str(&self.config.base_url);
        url.push_str(endpoint);

        for (i, (key, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        url
    }

    /// Execute one logical request with classification and retry.
    ///
    /// | outcome        | action                                        |
    /// |----------------|-----------------------------------------------|
    /// | 2xx            | return the fully read body                    |
    /// | 401            | `TokenExpired`, not retried here              |
    /// | 409            | `Authentication`, not retried                 |
    /// | 429            | wait `rate_limit_wait`, retry                 |
    /// | 5xx / other 4xx| wait `attempt × base_wait`, retry             |
    /// | transport      | wait `attempt × base_wait`, retry             |
    /// | (incl. body)   |                                               |
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `endpoint` - Path below the base URL (e.g. "/core/v1/audit_log")
    /// * `headers` - Request headers (auth, content type)
    /// * `params` - Query parameters, already stripped of absent values
    /// * `timeout` - Optional per-request timeout overriding the client default
    ///
    /// # Errors
    ///
    /// Fails fast with `Authentication` or `TokenExpired`. When the attempts run
    /// out, fails with `Connection` if the last problem was a transport failure,
    /// otherwise with the last classified error. With zero attempts configured it
    /// fails with `Connection` without sending anything.
    pub async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        headers: &HeaderMap,
        params: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<ApiResponse, VerkadaError> {
        let retry_config = &self.config.retry_config;
        let url = self.build_url(endpoint, params);
        let operation_name: Cow<'_, str> = if endpoint.len() < 50 {
            Cow::Owned(format!("{method} {endpoint}"))
        } else {
            Cow::Borrowed("request [long endpoint]")
        };

        let mut last_error: Option<VerkadaError> = None;

        for attempt in 1..=retry_config.max_attempts {
            debug!("{operation_name} attempt {attempt}/{}", retry_config.max_attempts);

            let mut request = self
                .client
                .request(method.clone(), &url)
                .headers(headers.clone());
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            let outcome = RequestOutcome::from_result(request.send().await).await;

            let (error, delay) = match outcome {
                RequestOutcome::Success(response) => {
                    if attempt > 1 {
                        info!("✅ {operation_name} succeeded on attempt {attempt}");
                    }
                    return Ok(response);
                }
                RequestOutcome::TokenExpired(message) => {
                    return Err(VerkadaError::TokenExpired(message));
                }
                RequestOutcome::AuthError(message) => {
                    return Err(VerkadaError::Authentication(message));
                }
                RequestOutcome::RateLimited(message) => (
                    VerkadaError::RateLimited { message },
                    retry_config.rate_limit_wait,
                ),
                RequestOutcome::ServerError { status, message } => (
                    VerkadaError::ServerError { status, message },
                    retry_config.backoff_delay(attempt),
                ),
                RequestOutcome::ClientError { status, message } => (
                    VerkadaError::ClientError { status, message },
                    retry_config.backoff_delay(attempt),
                ),
                RequestOutcome::TransportError(e) => {
                    (VerkadaError::Http(e), retry_config.backoff_delay(attempt))
                }
            };

            if attempt < retry_config.max_attempts {
                warn!(
                    "⚠️  {operation_name} failed on attempt {attempt}, retrying in {}ms: {error}",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            last_error = Some(error);
        }

        match last_error {
            Some(VerkadaError::Http(e)) => Err(VerkadaError::Connection(format!(
                "{operation_name} failed after {} attempts: {e}",
                retry_config.max_attempts
            ))),
            Some(error) => Err(error),
            None => Err(VerkadaError::Connection(format!(
                "{operation_name} exhausted its retry budget ({} attempts) without a response",
                retry_config.max_attempts
            ))),
        }
    }
}
