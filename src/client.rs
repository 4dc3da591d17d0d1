//! Seller API client
//!
//! Entry point for callers: validates the configuration, owns the
//! [`HttpClient`] facade and offers a few diagnostics helpers.

use crate::config::{Credentials, MaskedCredentials, OzonConfig};
use crate::models::request::{HttpMethod, RequestOptions};
use crate::services::{HttpClient, ReqwestTransport, Transport};
use crate::utils::error::{OzonError, OzonResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Endpoint probed by [`OzonSellerClient::test_connection`]
pub const CONNECTION_TEST_PATH: &str = "/v1/seller/info";

/// Result of a connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

/// Credential validity with the secrets masked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub is_valid: bool,
    pub masked_credentials: MaskedCredentials,
}

/// Version and effective configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub version: String,
    pub base_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub retries: u32,
}

/// Ozon Seller API client
#[derive(Debug, Clone)]
pub struct OzonSellerClient {
    http: HttpClient,
}

impl OzonSellerClient {
    /// Create a client, validating the configuration and credential format
    pub fn new(config: OzonConfig) -> OzonResult<Self> {
        let transport = ReqwestTransport::new()
            .map_err(|e| OzonError::config(format!("Failed to create HTTP client: {}", e)))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client that sends through a custom transport
    pub fn with_transport(config: OzonConfig, transport: Arc<dyn Transport>) -> OzonResult<Self> {
        Credentials::new(config.api_key.as_str(), config.client_id.as_str()).validate_format()?;
        let http = HttpClient::with_transport(config, transport)?;

        info!(
            "Ozon Seller API client ready (base URL: {})",
            http.settings().base_url
        );
        Ok(Self { http })
    }

    /// Create a client from `OZON_*` environment variables
    pub fn from_env() -> OzonResult<Self> {
        Self::new(OzonConfig::from_env()?)
    }

    /// HTTP facade shared by the API categories
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Probe connectivity and authentication; failures are reported, not returned
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.http.get::<Value>(CONNECTION_TEST_PATH, None).await {
            Ok(_) => ConnectionStatus {
                success: true,
                message: "Connection successful".to_string(),
            },
            Err(e) => {
                debug!(error_type = e.error_type(), "Connection test failed: {}", e);
                ConnectionStatus {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    pub fn auth_status(&self) -> AuthStatus {
        let credentials = &self.http.settings().credentials;
        AuthStatus {
            is_valid: credentials.is_valid(),
            masked_credentials: credentials.masked(),
        }
    }

    /// Send a request to any endpoint and return the raw JSON body
    ///
    /// Supports GET, POST, PUT and DELETE. POST and PUT without a body send
    /// `{}`.
    pub async fn raw_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: Option<RequestOptions>,
    ) -> OzonResult<Value> {
        let body = match method {
            HttpMethod::Get | HttpMethod::Delete => None,
            HttpMethod::Post | HttpMethod::Put => {
                Some(body.unwrap_or_else(|| Value::Object(Default::default())))
            }
            HttpMethod::Patch => {
                return Err(OzonError::config(format!("Unsupported HTTP method: {}", method)))
            }
        };

        self.http.request_value(method, path, body, options).await
    }

    pub fn info(&self) -> ClientInfo {
        let settings = self.http.settings();
        ClientInfo {
            version: crate::VERSION.to_string(),
            base_url: settings.base_url.as_str().trim_end_matches('/').to_string(),
            user_agent: settings.user_agent.clone(),
            timeout_ms: settings.timeout_ms,
            retries: settings.retries,
        }
    }
}
