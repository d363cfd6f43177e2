//! Token lifecycle on top of the request executor.
//!
//! A [`VerkadaSession`] owns the HTTP client, the on-disk credential cache and
//! the token currently in use. Every API call goes through
//! [`VerkadaSession::with_token_refresh`], which attaches a valid token and,
//! if the API reports it expired, fetches a new one and re-runs the call once.

use log::{debug, info, warn};
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use std::future::Future;
use tokio::sync::Mutex;

use crate::audit_log::AuditLogApi;
use crate::auth::TokenAuthenticator;
use crate::credentials::{Credential, CredentialStore, now_epoch_secs};
use crate::notifications::NotificationApi;
use crate::pagination::{AggregatedResult, PageAggregator};
use crate::{VerkadaClient, VerkadaConfig, VerkadaError};

/// Header carrying the short-lived API token.
pub const AUTH_HEADER: &str = "x-verkada-auth";

/// Authenticated access to the Verkada API.
pub struct VerkadaSession {
    client: VerkadaClient,
    store: CredentialStore,
    cached: Mutex<Option<Credential>>,
}

impl VerkadaSession {
    /// Build the client and pick up any token cached by a previous run.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built from `config`.
    pub fn new(config: VerkadaConfig) -> Result<Self, VerkadaError> {
        let store = CredentialStore::new(config.credential_path.clone());
        let client = VerkadaClient::new(config)?;

        let cached = store.load();
        if cached.is_some() {
            debug!("Loaded cached API token from {}", store.path().display());
        }

        Ok(Self {
            client,
            store,
            cached: Mutex::new(cached),
        })
    }

    #[must_use]
    pub fn client(&self) -> &VerkadaClient {
        &self.client
    }

    #[must_use]
    pub fn credential_store(&self) -> &CredentialStore {
        &self.store
    }

    /// Return a token that is still inside its expiration window, fetching one if needed.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` when no API key is configured or the key is
    /// rejected, plus any executor error from the token request.
    pub async fn ensure_token(&self) -> Result<Credential, VerkadaError> {
        let mut cached = self.cached.lock().await;
        let window = self.client.config().token_expiration_secs;

        if let Some(credential) = cached.as_ref()
            && !credential.is_expired(now_epoch_secs(), window)
        {
            return Ok(credential.clone());
        }

        debug!("No valid cached API token, authenticating");
        let credential = self.authenticate_and_persist().await?;
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// Discard the current token (in memory and on disk) and fetch a new one.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_token`].
    pub async fn refresh_token(&self) -> Result<Credential, VerkadaError> {
        let mut cached = self.cached.lock().await;
        *cached = None;
        if let Err(e) = self.store.clear() {
            warn!("Failed to remove cached API token {}: {e}", self.store.path().display());
        }

        let credential = self.authenticate_and_persist().await?;
        *cached = Some(credential.clone());
        Ok(credential)
    }

    async fn authenticate_and_persist(&self) -> Result<Credential, VerkadaError> {
        let api_key = self
            .client
            .config()
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                VerkadaError::Authentication(
                    "No API key configured; set VERKADA_API_KEY to obtain an API token".to_string(),
                )
            })?;

        let credential = TokenAuthenticator::new(&self.client)
            .authenticate(api_key)
            .await?;

        // The token is still usable for this run even if it cannot be cached.
        if let Err(e) = self.store.save(&credential) {
            warn!(
                "⚠️  Failed to cache API token at {}: {e}",
                self.store.path().display()
            );
        }
        Ok(credential)
    }

    /// Headers for an authenticated API call with a currently valid token.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_token`].
    pub async fn auth_headers(&self) -> Result<HeaderMap, VerkadaError> {
        let credential = self.ensure_token().await?;
        token_headers(&credential)
    }

    /// Run `operation` with auth headers, refreshing the token once if it was rejected.
    ///
    /// The whole operation is re-run after a refresh, not just the failing
    /// request. A second `TokenExpired` is returned to the caller.
    ///
    /// # Errors
    ///
    /// Whatever `operation` or the token refresh fails with.
    pub async fn with_token_refresh<T, F, Fut>(&self, operation: F) -> Result<T, VerkadaError>
    where
        F: Fn(HeaderMap) -> Fut,
        Fut: Future<Output = Result<T, VerkadaError>>,
    {
        let headers = self.auth_headers().await?;
        match operation(headers).await {
            Err(VerkadaError::TokenExpired(message)) => {
                warn!("🔑 API token rejected ({message}), refreshing and retrying");
                let credential = self.refresh_token().await?;
                info!("✅ API token refreshed");
                operation(token_headers(&credential)?).await
            }
            other => other,
        }
    }

    /// GET every page of `endpoint` and merge `list_fields` across pages.
    ///
    /// # Errors
    ///
    /// Any authentication, executor or pagination error; no partial results.
    pub async fn fetch_collection(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        list_fields: &[&str],
    ) -> Result<AggregatedResult, VerkadaError> {
        self.with_token_refresh(|headers| async move {
            PageAggregator::new(&self.client)
                .fetch_all_pages(Method::GET, endpoint, &headers, params, list_fields)
                .await
        })
        .await
    }

    /// Get an audit log API instance.
    #[must_use]
    pub fn audit_log_api(&self) -> AuditLogApi<'_> {
        AuditLogApi::new(self)
    }

    /// Get a camera notification API instance.
    #[must_use]
    pub fn notification_api(&self) -> NotificationApi<'_> {
        NotificationApi::new(self)
    }
}

fn token_headers(credential: &Credential) -> Result<HeaderMap, VerkadaError> {
    let mut value = HeaderValue::from_str(credential.token()).map_err(|_| {
        VerkadaError::InvalidResponse("API token contains invalid header characters".to_string())
    })?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(AUTH_HEADER), value);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryConfig;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, dir: &TempDir) -> VerkadaConfig {
        VerkadaConfig::new()
            .with_api_key("test-key")
            .with_base_url(server.uri())
            .with_credential_path(dir.path().join("token.json"))
            .with_retry_config(RetryConfig::no_wait())
    }

    async fn mount_token(server: &MockServer, token: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": token})))
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_valid_cached_token_skips_authentication() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_token(&server, "unused", 0).await;

        let config = config_for(&server, &dir);
        CredentialStore::new(&config.credential_path)
            .save(&Credential::new("cached", now_epoch_secs() - 60))
            .unwrap();

        let session = VerkadaSession::new(config).unwrap();
        assert_eq!(session.ensure_token().await.unwrap().token(), "cached");
    }

    #[tokio::test]
    async fn test_expired_token_is_replaced_and_persisted() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_token(&server, "fresh", 1).await;

        let config = config_for(&server, &dir);
        CredentialStore::new(&config.credential_path)
            .save(&Credential::new("stale", now_epoch_secs() - 26 * 60))
            .unwrap();

        let session = VerkadaSession::new(config).unwrap();
        assert_eq!(session.ensure_token().await.unwrap().token(), "fresh");
        // Second call is served from memory.
        assert_eq!(session.ensure_token().await.unwrap().token(), "fresh");

        let stored = session.credential_store().load().unwrap();
        assert_eq!(stored.token(), "fresh");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_auth_error() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let config = VerkadaConfig::new()
            .with_base_url(server.uri())
            .with_credential_path(dir.path().join("token.json"));

        let session = VerkadaSession::new(config).unwrap();
        let err = session.ensure_token().await.unwrap_err();
        assert!(matches!(err, VerkadaError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_fatal() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_token(&server, "fresh", 1).await;

        // A directory cannot be replaced by the cache file.
        let blocked = dir.path().join("blocked");
        std::fs::create_dir(&blocked).unwrap();
        let config = config_for(&server, &dir).with_credential_path(&blocked);

        let session = VerkadaSession::new(config).unwrap();
        assert_eq!(session.ensure_token().await.unwrap().token(), "fresh");
    }

    #[tokio::test]
    async fn test_rejected_token_is_refreshed_once() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_token(&server, "new", 1).await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(header("x-verkada-auth", "old"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(header("x-verkada-auth", "new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1]})))
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server, &dir);
        CredentialStore::new(&config.credential_path)
            .save(&Credential::new("old", now_epoch_secs()))
            .unwrap();

        let session = VerkadaSession::new(config).unwrap();
        let result = session.fetch_collection("/items", &[], &["items"]).await.unwrap();

        assert_eq!(result.records("items"), &[json!(1)]);
        assert_eq!(session.credential_store().load().unwrap().token(), "new");
    }

    #[tokio::test]
    async fn test_second_rejection_is_surfaced() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_token(&server, "also-rejected", 2).await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let session = VerkadaSession::new(config_for(&server, &dir)).unwrap();
        let err = session
            .fetch_collection("/items", &[], &["items"])
            .await
            .unwrap_err();
        assert!(matches!(err, VerkadaError::TokenExpired(_)));
    }

    #[test]
    fn test_token_headers_are_sensitive() {
        let headers = token_headers(&Credential::new("tok", 1)).unwrap();
        let value = headers.get(AUTH_HEADER).unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "tok");
    }
}
