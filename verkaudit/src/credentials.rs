//! Client configuration from environment variables
use crate::error::{Result, VerkauditError};
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};
use verkada_platform::{VerkadaConfig, VerkadaRegion};

pub const ENV_API_KEY: &str = "VERKADA_API_KEY";
pub const ENV_REGION: &str = "VERKADA_REGION";
pub const ENV_BASE_URL: &str = "VERKADA_BASE_URL";
pub const ENV_TOKEN_FILE: &str = "VERKADA_TOKEN_FILE";
pub const ENV_DISABLE_CERT_VALIDATION: &str = "VERKADA_DISABLE_CERT_VALIDATION";

/// Proxy variables, in order of precedence
const PROXY_VARS: [&str; 4] = ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"];

/// Settings read from the environment before they are applied to a config
#[derive(Debug, Default)]
pub struct EnvSettings {
    pub api_key: Option<SecretString>,
    pub region: Option<VerkadaRegion>,
    pub base_url: Option<String>,
    pub token_file: Option<String>,
    pub disable_cert_validation: bool,
    pub proxy_url: Option<String>,
}

impl EnvSettings {
    /// Read settings through `lookup`; empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an unknown region name
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let region = get(ENV_REGION)
            .map(|value| {
                value
                    .parse::<VerkadaRegion>()
                    .map_err(|e| VerkauditError::InvalidConfig(format!("{ENV_REGION}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            api_key: get(ENV_API_KEY).map(SecretString::from),
            region,
            base_url: get(ENV_BASE_URL),
            token_file: get(ENV_TOKEN_FILE),
            disable_cert_validation: get(ENV_DISABLE_CERT_VALIDATION)
                .is_some_and(|value| is_truthy(&value)),
            proxy_url: PROXY_VARS.iter().find_map(|name| get(*name)),
        })
    }

    /// Read settings from the process environment
    ///
    /// # Errors
    ///
    /// See [`Self::from_lookup`]
    pub fn from_env() -> Result<Self> {
        debug!("Loading Verkada settings from environment variables");
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the client configuration; `region_override` (from the CLI) beats `VERKADA_REGION`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the resulting configuration is unusable
    pub fn into_config(self, region_override: Option<VerkadaRegion>) -> Result<VerkadaConfig> {
        let region = region_override.or(self.region).unwrap_or_default();
        let mut config = VerkadaConfig::new().with_region(region);

        match &self.api_key {
            Some(key) => config = config.with_api_key(key.expose_secret()),
            None => warn!("⚠️  {ENV_API_KEY} is not set; API calls will fail to authenticate"),
        }

        if let Some(base_url) = self.base_url {
            info!("Using base URL override: {base_url}");
            config = config.with_base_url(base_url);
        }
        if let Some(token_file) = self.token_file {
            config = config.with_credential_path(token_file);
        }
        if let Some(proxy_url) = self.proxy_url {
            debug!("Using proxy from environment");
            config = config.with_proxy(proxy_url);
        }
        if self.disable_cert_validation {
            warn!("⚠️  Certificate validation disabled via {ENV_DISABLE_CERT_VALIDATION}");
            config = config.with_certificate_validation_disabled();
        }

        config
            .validate()
            .map_err(|e| VerkauditError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Load the client configuration from the environment
///
/// # Errors
///
/// Returns `InvalidConfig` for an unknown region or an unusable configuration
pub fn load_config_from_env(region_override: Option<VerkadaRegion>) -> Result<VerkadaConfig> {
    EnvSettings::from_env()?.into_config(region_override)
}
