//! HTTP client service
//!
//! Typed facade over the retry controller and request executor. Owns the
//! validated settings and resolves per-call options against them.

use super::executor::{ApiResponse, RequestExecutor};
use super::retry::execute_with_retry;
use super::transport::{ReqwestTransport, Transport};
use crate::config::settings::{validate_retries, validate_timeout_ms};
use crate::config::{ClientSettings, OzonConfig};
use crate::models::request::{
    HttpMethod, IdempotencyKey, RequestDescriptor, RequestId, RequestOptions, ResolvedOptions,
};
use crate::utils::error::{OzonError, OzonResult};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Ozon Seller API HTTP client
///
/// Cheap to clone; clones share the transport and settings.
#[derive(Clone)]
pub struct HttpClient {
    settings: Arc<ClientSettings>,
    executor: RequestExecutor,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new client instance backed by `reqwest`
    pub fn new(config: OzonConfig) -> OzonResult<Self> {
        let settings = config.resolve()?;
        let transport = ReqwestTransport::new()
            .map_err(|e| OzonError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::from_settings(settings, Arc::new(transport)))
    }

    /// Create a client that sends through a custom transport
    pub fn with_transport(config: OzonConfig, transport: Arc<dyn Transport>) -> OzonResult<Self> {
        let settings = config.resolve()?;
        Ok(Self::from_settings(settings, transport))
    }

    fn from_settings(settings: ClientSettings, transport: Arc<dyn Transport>) -> Self {
        let executor = RequestExecutor::new(transport, &settings);
        Self {
            settings: Arc::new(settings),
            executor,
        }
    }

    /// Validated settings
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Build the request URL from the base URL and `path`
    pub fn build_url(&self, path: &str) -> OzonResult<Url> {
        self.settings
            .base_url
            .join(path)
            .map_err(|e| OzonError::config(format!("Invalid request path '{}': {}", path, e)))
    }

    /// Apply client defaults to per-call options
    ///
    /// Per-call timeout and retries are held to the same bounds as the client
    /// configuration. Write methods get their idempotency key here, once per
    /// logical call, so every retry sends the same key.
    pub fn resolve_options(
        &self,
        method: HttpMethod,
        options: RequestOptions,
    ) -> OzonResult<ResolvedOptions> {
        let timeout_ms = match options.timeout_ms {
            Some(timeout_ms) => validate_timeout_ms(timeout_ms)?,
            None => self.settings.timeout_ms,
        };
        let retries = match options.retries {
            Some(retries) => validate_retries(retries)?,
            None => self.settings.retries,
        };

        let idempotency_key = if method.is_write() {
            Some(options.idempotency_key.unwrap_or_else(IdempotencyKey::generate))
        } else {
            None
        };

        Ok(ResolvedOptions {
            timeout_ms,
            retries,
            headers: options.headers,
            idempotency_key,
            cancellation: options.cancellation,
        })
    }

    /// Send a request and return the undecoded JSON body
    pub async fn request_value(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: Option<RequestOptions>,
    ) -> OzonResult<Value> {
        Ok(self.send(method, path, body, options).await?.body)
    }

    /// Send a request and decode the JSON body into `R`
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: Option<RequestOptions>,
    ) -> OzonResult<R> {
        let response = self.send(method, path, body, options).await?;
        serde_json::from_value(response.body).map_err(|e| {
            OzonError::invalid_response_with_headers(
                response.status,
                format!("Unexpected response shape: {}", e),
                response.headers,
                Some(response.request_id),
            )
        })
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: Option<RequestOptions>,
    ) -> OzonResult<ApiResponse> {
        let url = self.build_url(path)?;
        let descriptor = RequestDescriptor::new(method, path, body);
        let resolved = self.resolve_options(method, options.unwrap_or_default())?;
        let call_id = RequestId::generate();

        debug!(
            call_id = %call_id,
            "{} {} (retries: {}, timeout: {}ms)",
            method,
            path,
            resolved.retries,
            resolved.timeout_ms
        );

        execute_with_retry(
            || self.executor.execute_once(&url, &descriptor, &resolved),
            resolved.retries,
            &call_id,
            resolved.cancellation.as_ref(),
        )
        .await
    }

    /// GET request
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        options: Option<RequestOptions>,
    ) -> OzonResult<R> {
        self.request(HttpMethod::Get, path, None, options).await
    }

    /// POST request
    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> OzonResult<R> {
        self.request(HttpMethod::Post, path, Some(to_body(body)?), options)
            .await
    }

    /// PUT request
    pub async fn put<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> OzonResult<R> {
        self.request(HttpMethod::Put, path, Some(to_body(body)?), options)
            .await
    }

    /// PATCH request
    pub async fn patch<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        options: Option<RequestOptions>,
    ) -> OzonResult<R> {
        self.request(HttpMethod::Patch, path, Some(to_body(body)?), options)
            .await
    }

    /// DELETE request
    pub async fn delete<R: DeserializeOwned>(
        &self,
        path: &str,
        options: Option<RequestOptions>,
    ) -> OzonResult<R> {
        self.request(HttpMethod::Delete, path, None, options).await
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> OzonResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| OzonError::config(format!("Failed to serialize request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> OzonConfig {
        OzonConfig::new("12345678-1234-5678-9abc-123456789012", "12345678")
    }

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new(create_test_config());
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_url() {
        let client = HttpClient::new(create_test_config()).unwrap();
        assert_eq!(
            client.build_url("/v3/product/list").unwrap().as_str(),
            "https://api-seller.ozon.ru/v3/product/list"
        );
    }

    #[test]
    fn test_resolve_options_defaults() {
        let client = HttpClient::new(create_test_config().with_retries(2)).unwrap();

        let resolved = client
            .resolve_options(HttpMethod::Get, RequestOptions::new())
            .unwrap();
        assert_eq!(resolved.timeout_ms, 30_000);
        assert_eq!(resolved.retries, 2);
        assert!(resolved.idempotency_key.is_none());

        let resolved = client
            .resolve_options(
                HttpMethod::Post,
                RequestOptions::new().timeout_ms(2_000).retries(0),
            )
            .unwrap();
        assert_eq!(resolved.timeout_ms, 2_000);
        assert_eq!(resolved.retries, 0);
        assert!(resolved.idempotency_key.is_some());
    }

    #[test]
    fn test_explicit_idempotency_key_kept() {
        let client = HttpClient::new(create_test_config()).unwrap();
        let resolved = client
            .resolve_options(
                HttpMethod::Put,
                RequestOptions::new().idempotency_key("idem-caller"),
            )
            .unwrap();
        assert_eq!(resolved.idempotency_key.unwrap().as_str(), "idem-caller");
    }

    #[test]
    fn test_per_call_values_out_of_range() {
        let client = HttpClient::new(create_test_config()).unwrap();

        for options in [
            RequestOptions::new().retries(11),
            RequestOptions::new().retries(u32::MAX),
            RequestOptions::new().timeout_ms(0),
            RequestOptions::new().timeout_ms(300_001),
        ] {
            assert!(matches!(
                client.resolve_options(HttpMethod::Get, options),
                Err(OzonError::ConfigurationInvalid { .. })
            ));
        }

        let resolved = client
            .resolve_options(HttpMethod::Get, RequestOptions::new().retries(10).timeout_ms(1_000))
            .unwrap();
        assert_eq!((resolved.retries, resolved.timeout_ms), (10, 1_000));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = HttpClient::new(create_test_config()).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("12345678-1234-5678-9abc-123456789012"));
    }
}
