//! API key to API token exchange.

use log::{debug, info};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::credentials::{Credential, now_epoch_secs};
use crate::json_validator::parse_typed_body;
use crate::{VerkadaClient, VerkadaError};

/// Token endpoint path.
pub const TOKEN_ENDPOINT: &str = "/token";

/// Header carrying the long-lived API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Stateless authenticator; persisting the result is the caller's job.
pub struct TokenAuthenticator<'a> {
    client: &'a VerkadaClient,
}

impl<'a> TokenAuthenticator<'a> {
    #[must_use]
    pub fn new(client: &'a VerkadaClient) -> Self {
        Self { client }
    }

    /// Exchange `api_key` for an API token stamped with the current time.
    ///
    /// Uses the client's retrying executor, so rate limits and transient
    /// failures are retried like any other request.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` when the key is rejected (409 or 401) or the
    /// response has no `token`, plus any executor error.
    pub async fn authenticate(&self, api_key: &SecretString) -> Result<Credential, VerkadaError> {
        let headers = api_key_headers(api_key)?;

        debug!("Requesting API token from {}{TOKEN_ENDPOINT}", self.client.base_url());
        let response = self
            .client
            .execute(Method::POST, TOKEN_ENDPOINT, &headers, &[], None)
            .await
            .map_err(|e| match e {
                // 401 here rejects the API key itself; refreshing cannot fix it
                VerkadaError::TokenExpired(message) => {
                    VerkadaError::Authentication(format!("API key rejected: {message}"))
                }
                other => other,
            })?;

        let parsed: TokenResponse = parse_typed_body(response.body())?;

        let token = parsed
            .token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                VerkadaError::Authentication("Token response did not contain a token".to_string())
            })?;

        info!("Obtained new Verkada API token");
        Ok(Credential::new(token, now_epoch_secs()))
    }
}

fn api_key_headers(api_key: &SecretString) -> Result<HeaderMap, VerkadaError> {
    let mut value = HeaderValue::from_str(api_key.expose_secret())
        .map_err(|_| VerkadaError::InvalidConfig("API key contains invalid characters".to_string()))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}
