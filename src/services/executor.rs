//! Request executor
//!
//! Performs exactly one network attempt: assembles headers, serializes the
//! body, races the transport against the timeout and the caller's
//! cancellation, then decodes or classifies the response.

use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::config::ClientSettings;
use crate::models::request::{RequestDescriptor, RequestId, ResolvedOptions};
use crate::utils::cancel::cancelled_or_pending;
use crate::utils::error::{classify_http_failure, ErrorBody, OzonError, OzonResult};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Header carrying the per-attempt identifier
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Header carrying the idempotency key of write calls
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Decoded body of a successful attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub request_id: RequestId,
    /// Response headers, lower-cased names
    pub headers: HashMap<String, String>,
    /// Decoded JSON, returned as-is
    pub body: Value,
}

/// Single-attempt request executor
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    base_headers: Vec<(String, String)>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, settings: &ClientSettings) -> Self {
        let mut base_headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), settings.user_agent.clone()),
        ];
        base_headers.extend(
            settings
                .credentials
                .auth_headers()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value)),
        );

        Self {
            transport,
            base_headers,
        }
    }

    /// Execute one attempt and return the decoded body
    pub async fn execute_once(
        &self,
        url: &Url,
        descriptor: &RequestDescriptor,
        options: &ResolvedOptions,
    ) -> OzonResult<ApiResponse> {
        let request_id = RequestId::generate();
        if options
            .cancellation
            .as_ref()
            .map_or(false, |token| token.is_cancelled())
        {
            return Err(OzonError::cancelled(Some(request_id)));
        }
        let request = self.build_request(url, descriptor, options, &request_id)?;

        debug!(
            request_id = %request_id,
            "Sending {} {}",
            descriptor.method,
            url.path()
        );

        let timeout = Duration::from_millis(options.timeout_ms);
        let response = tokio::select! {
            biased;

            _ = cancelled_or_pending(options.cancellation.as_ref()) => {
                return Err(OzonError::cancelled(Some(request_id)));
            }
            // Dropping the losing branch aborts the in-flight request.
            result = tokio::time::timeout(timeout, self.transport.send(request)) => match result {
                Ok(Ok(response)) => response,
                Ok(Err(source)) => return Err(OzonError::connection(source, Some(request_id))),
                Err(_) => return Err(OzonError::timed_out(options.timeout_ms, Some(request_id))),
            },
        };

        handle_response(response, request_id)
    }

    /// Assemble headers and body for one attempt
    pub fn build_request(
        &self,
        url: &Url,
        descriptor: &RequestDescriptor,
        options: &ResolvedOptions,
        request_id: &RequestId,
    ) -> OzonResult<HttpRequest> {
        let mut headers = self.base_headers.clone();
        for (name, value) in &options.headers {
            set_header(&mut headers, name, value);
        }
        set_header(&mut headers, REQUEST_ID_HEADER, request_id.as_str());

        let mut body = None;
        if descriptor.method.is_write() {
            if let Some(key) = &options.idempotency_key {
                set_header(&mut headers, IDEMPOTENCY_KEY_HEADER, key.as_str());
            }
            if let Some(payload) = &descriptor.body {
                body = Some(serde_json::to_string(payload).map_err(|e| {
                    OzonError::config(format!("Failed to serialize request body: {}", e))
                })?);
            }
        }

        for (name, value) in &headers {
            validate_header(name, value)?;
        }

        Ok(HttpRequest {
            method: descriptor.method,
            url: url.to_string(),
            headers,
            body,
        })
    }
}

/// Replace a header (case-insensitive name match) or append it
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
    {
        Some(entry) => *entry = (name.to_string(), value.to_string()),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Reject names and values the HTTP layer cannot put on the wire
///
/// The value is left out of the message since it may be a credential.
fn validate_header(name: &str, value: &str) -> OzonResult<()> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| OzonError::config(format!("Invalid header name '{}'", name)))?;
    HeaderValue::from_str(value)
        .map_err(|_| OzonError::config(format!("Invalid value for header '{}'", name)))?;
    Ok(())
}

/// Decode a response or turn it into a classified error
fn handle_response(response: HttpResponse, request_id: RequestId) -> OzonResult<ApiResponse> {
    let decoded = if response.body.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        match serde_json::from_str::<Value>(&response.body) {
            Ok(value) => value,
            Err(e) => {
                return Err(OzonError::invalid_response_with_headers(
                    response.status,
                    e.to_string(),
                    response.headers,
                    Some(request_id),
                ))
            }
        }
    };

    if !response.is_success() {
        let error_body = ErrorBody::extract(&decoded);
        return Err(classify_http_failure(
            response.status,
            error_body,
            response.headers,
            Some(request_id),
        ));
    }

    debug!(request_id = %request_id, "Request completed with HTTP {}", response.status);
    Ok(ApiResponse {
        status: response.status,
        request_id,
        headers: response.headers,
        body: decoded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OzonConfig;
    use crate::models::request::{HttpMethod, IdempotencyKey};
    use crate::utils::cancel::CancellationToken;
    use crate::utils::error::BoxError;
    use async_trait::async_trait;
    use serde_json::json;

    struct NoopTransport;

    #[async_trait]
    impl Transport for NoopTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, BoxError> {
            Ok(HttpResponse::default())
        }
    }

    fn executor() -> RequestExecutor {
        let settings = OzonConfig::new("12345678-1234-5678-9abc-123456789012", "12345678")
            .resolve()
            .unwrap();
        RequestExecutor::new(Arc::new(NoopTransport), &settings)
    }

    fn options() -> ResolvedOptions {
        ResolvedOptions {
            timeout_ms: 5000,
            retries: 0,
            headers: HashMap::new(),
            idempotency_key: Some(IdempotencyKey::from("idem-1")),
            cancellation: None,
        }
    }

    fn url() -> Url {
        Url::parse("https://api-seller.ozon.ru/v3/product/list").unwrap()
    }

    #[test]
    fn test_base_headers() {
        let descriptor = RequestDescriptor::new(HttpMethod::Post, "/v3/product/list", Some(json!({"limit": 10})));
        let request_id = RequestId::generate();
        let request = executor()
            .build_request(&url(), &descriptor, &options(), &request_id)
            .unwrap();

        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("client-id"), Some("12345678"));
        assert_eq!(request.header("api-key"), Some("12345678-1234-5678-9abc-123456789012"));
        assert_eq!(request.header("x-request-id"), Some(request_id.as_str()));
        assert_eq!(request.header("idempotency-key"), Some("idem-1"));
        assert_eq!(request.body.as_deref(), Some(r#"{"limit":10}"#));
    }

    #[test]
    fn test_caller_headers_override_defaults() {
        let mut opts = options();
        opts.headers.insert("content-type".to_string(), "application/x-custom".to_string());
        opts.headers.insert("X-Extra".to_string(), "1".to_string());

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/v1/roles", None);
        let request = executor()
            .build_request(&url(), &descriptor, &opts, &RequestId::generate())
            .unwrap();

        assert_eq!(request.header("Content-Type"), Some("application/x-custom"));
        assert_eq!(request.header("x-extra"), Some("1"));
        assert_eq!(
            request.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("content-type")).count(),
            1
        );
    }

    #[test]
    fn test_read_methods_carry_no_body_or_key() {
        let descriptor = RequestDescriptor::new(HttpMethod::Delete, "/v1/x", Some(json!({"a": 1})));
        let request = executor()
            .build_request(&url(), &descriptor, &options(), &RequestId::generate())
            .unwrap();

        assert!(request.body.is_none());
        assert!(request.header("idempotency-key").is_none());
    }

    #[test]
    fn test_empty_success_body_decodes_to_object() {
        let response = HttpResponse {
            status: 200,
            ..Default::default()
        };
        let decoded = handle_response(response, RequestId::generate()).unwrap();
        assert_eq!(decoded.status, 200);
        assert_eq!(decoded.body, json!({}));
    }

    #[test]
    fn test_non_json_body_is_decode_error() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        let response = HttpResponse {
            status: 502,
            headers: headers.clone(),
            body: "<html>oops</html>".to_string(),
        };
        let err = handle_response(response, RequestId::generate()).unwrap_err();
        assert!(matches!(err, OzonError::InvalidResponse { status: 502, .. }));
        assert!(err.request_id().is_some());
        assert_eq!(err.response_headers(), Some(&headers));
    }

    #[test]
    fn test_success_keeps_response_headers() {
        let mut headers = HashMap::new();
        headers.insert("x-o3-trace-id".to_string(), "trace-1".to_string());
        let response = HttpResponse {
            status: 200,
            headers: headers.clone(),
            body: r#"{"result": []}"#.to_string(),
        };
        let decoded = handle_response(response, RequestId::generate()).unwrap();
        assert_eq!(decoded.headers, headers);
    }

    #[test]
    fn test_malformed_caller_header_rejected() {
        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/v1/roles", None);

        let mut opts = options();
        opts.headers.insert("X-Trace".to_string(), "abc\nInjected: 1".to_string());
        let err = executor()
            .build_request(&url(), &descriptor, &opts, &RequestId::generate())
            .unwrap_err();
        assert!(matches!(err, OzonError::ConfigurationInvalid { .. }));
        assert!(!err.to_string().contains("Injected"));

        let mut opts = options();
        opts.headers.insert("Bad Name".to_string(), "1".to_string());
        assert!(matches!(
            executor().build_request(&url(), &descriptor, &opts, &RequestId::generate()),
            Err(OzonError::ConfigurationInvalid { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_send() {
        let token = CancellationToken::new();
        token.cancel();
        let mut opts = options();
        opts.cancellation = Some(token);

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "/v1/roles", None);
        let err = executor().execute_once(&url(), &descriptor, &opts).await.unwrap_err();
        assert!(matches!(err, OzonError::Cancelled { .. }));
    }

    #[test]
    fn test_error_response_is_classified() {
        let response = HttpResponse {
            status: 404,
            body: r#"{"code": 5, "message": "product not found"}"#.to_string(),
            ..Default::default()
        };
        match handle_response(response, RequestId::generate()).unwrap_err() {
            OzonError::NotFound(failure) => {
                assert_eq!(failure.message, "product not found");
                assert_eq!(failure.code.as_deref(), Some("5"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
