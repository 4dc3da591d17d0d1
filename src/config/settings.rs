//! Client configuration settings
//!
//! Defines the construction-time configuration, its defaults and the
//! validation that turns it into immutable [`ClientSettings`]

use super::credentials::Credentials;
use crate::utils::error::{OzonError, OzonResult};
use crate::utils::logging::mask_secret;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api-seller.ozon.ru";

/// Default attempt timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default maximum retries
pub const DEFAULT_RETRIES: u32 = 3;

/// Default `User-Agent`
pub const DEFAULT_USER_AGENT: &str = concat!("ozon-seller-api/", env!("CARGO_PKG_VERSION"));

/// Accepted timeout range in milliseconds
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Maximum accepted retry count
pub const MAX_RETRIES: u32 = 10;

/// Client configuration as supplied by the caller
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OzonConfig {
    /// Seller API key
    pub api_key: String,
    /// Seller client ID
    pub client_id: String,
    /// API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Attempt timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Maximum retries per call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// `User-Agent` header value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl fmt::Debug for OzonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OzonConfig")
            .field("api_key", &mask_secret(&self.api_key, 4))
            .field("client_id", &mask_secret(&self.client_id, 2))
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("retries", &self.retries)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Validated, immutable client settings
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: Url,
    pub credentials: Credentials,
    pub timeout_ms: u64,
    pub retries: u32,
    pub user_agent: String,
}

impl OzonConfig {
    /// Create a configuration with defaults for everything but the credentials
    pub fn new(api_key: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client_id: client_id.into(),
            base_url: None,
            timeout_ms: None,
            retries: None,
            user_agent: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Load configuration from environment variables
    ///
    /// Reads `OZON_API_KEY` and `OZON_CLIENT_ID` (required) plus the optional
    /// `OZON_BASE_URL`, `OZON_TIMEOUT_MS`, `OZON_RETRIES` and
    /// `OZON_USER_AGENT`. A `.env` file is honoured if present.
    pub fn from_env() -> OzonResult<Self> {
        dotenv::dotenv().ok();

        let config = Self {
            api_key: env::var("OZON_API_KEY")
                .map_err(|_| OzonError::config("OZON_API_KEY environment variable not set"))?,
            client_id: env::var("OZON_CLIENT_ID")
                .map_err(|_| OzonError::config("OZON_CLIENT_ID environment variable not set"))?,
            base_url: get_env("OZON_BASE_URL"),
            timeout_ms: get_env("OZON_TIMEOUT_MS")
                .map(|v| {
                    v.parse()
                        .map_err(|_| OzonError::config(format!("Invalid timeout value: {}", v)))
                })
                .transpose()?,
            retries: get_env("OZON_RETRIES")
                .map(|v| {
                    v.parse()
                        .map_err(|_| OzonError::config(format!("Invalid retries value: {}", v)))
                })
                .transpose()?,
            user_agent: get_env("OZON_USER_AGENT"),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Validate and apply defaults
    pub fn resolve(&self) -> OzonResult<ClientSettings> {
        let credentials = Credentials::new(self.api_key.clone(), self.client_id.clone());
        credentials.validate_presence()?;

        let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base_url)
            .map_err(|e| OzonError::config(format!("Base URL must be a valid URL: {}", e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(OzonError::config(format!(
                "Invalid base URL scheme '{}', expected http or https",
                base_url.scheme()
            )));
        }

        let timeout_ms = validate_timeout_ms(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))?;
        let retries = validate_retries(self.retries.unwrap_or(DEFAULT_RETRIES))?;

        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Ok(ClientSettings {
            base_url,
            credentials,
            timeout_ms,
            retries,
            user_agent,
        })
    }
}

/// Check an attempt timeout lies within `[MIN_TIMEOUT_MS, MAX_TIMEOUT_MS]`
pub fn validate_timeout_ms(timeout_ms: u64) -> OzonResult<u64> {
    if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout_ms) {
        return Err(OzonError::config(format!(
            "Timeout must be between {}ms and {}ms, got {}ms",
            MIN_TIMEOUT_MS, MAX_TIMEOUT_MS, timeout_ms
        )));
    }
    Ok(timeout_ms)
}

/// Check a retry count does not exceed `MAX_RETRIES`
pub fn validate_retries(retries: u32) -> OzonResult<u32> {
    if retries > MAX_RETRIES {
        return Err(OzonError::config(format!(
            "Retries must be between 0 and {}, got {}",
            MAX_RETRIES, retries
        )));
    }
    Ok(retries)
}

/// Get a non-empty environment variable
fn get_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OzonConfig {
        OzonConfig::new("12345678-1234-5678-9abc-123456789012", "12345678")
    }

    #[test]
    fn test_defaults_applied() {
        let settings = config().resolve().unwrap();
        assert_eq!(settings.base_url.as_str(), "https://api-seller.ozon.ru/");
        assert_eq!(settings.timeout_ms, 30_000);
        assert_eq!(settings.retries, 3);
        assert!(settings.user_agent.starts_with("ozon-seller-api/"));
    }

    #[test]
    fn test_timeout_bounds() {
        assert!(config().with_timeout_ms(1_000).resolve().is_ok());
        assert!(config().with_timeout_ms(300_000).resolve().is_ok());
        assert!(config().with_timeout_ms(999).resolve().is_err());
        assert!(config().with_timeout_ms(300_001).resolve().is_err());
    }

    #[test]
    fn test_retry_bounds() {
        assert!(config().with_retries(0).resolve().is_ok());
        assert!(config().with_retries(10).resolve().is_ok());
        assert!(matches!(
            config().with_retries(11).resolve(),
            Err(OzonError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn test_base_url_validation() {
        assert!(config().with_base_url("not a url").resolve().is_err());
        assert!(config().with_base_url("ftp://example.com").resolve().is_err());
        assert!(config().with_base_url("http://localhost:8080").resolve().is_ok());
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: OzonConfig = serde_json::from_str(
            r#"{"api_key": "key", "client_id": "42", "timeout_ms": 5000}"#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, Some(5000));
        assert_eq!(config.retries, None);
    }
}
