//! Error handling module
//!
//! Maps HTTP statuses and network conditions onto typed error kinds, and
//! decides which of them are worth retrying.

use crate::models::request::RequestId;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Boxed transport-level cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Backoff base delay in milliseconds
pub const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Backoff ceiling in milliseconds
pub const MAX_RETRY_DELAY_MS: u64 = 16_000;

/// Details of a failed HTTP exchange
#[derive(Debug, Clone)]
pub struct ApiFailure {
    /// HTTP status code
    pub status: u16,
    /// Human readable message
    pub message: String,
    /// Server-supplied error code
    pub code: Option<String>,
    /// Structured error details
    pub details: Option<Vec<Value>>,
    /// Response headers snapshot, lower-cased names
    pub headers: HashMap<String, String>,
    /// Attempt identifier the failure belongs to
    pub request_id: Option<RequestId>,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {})", self.message, self.status)?;
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        Ok(())
    }
}

/// Error payload extracted from a failed response body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBody {
    /// Server error code
    pub code: Option<String>,
    /// Server error message
    pub message: Option<String>,
    /// Structured details
    pub details: Option<Vec<Value>>,
}

impl ErrorBody {
    /// Extract an error payload from a decoded response body
    ///
    /// A nested `error` object wins; otherwise a top-level `message` (with
    /// optional `code`) is used.
    pub fn extract(body: &Value) -> Option<Self> {
        let object = body.as_object()?;

        if let Some(error) = object.get("error").and_then(Value::as_object) {
            return Some(Self {
                code: error.get("code").and_then(code_as_string),
                message: Some(
                    error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown error")
                        .to_string(),
                ),
                details: error.get("details").and_then(Value::as_array).cloned(),
            });
        }

        let message = object.get("message").and_then(Value::as_str)?;
        Some(Self {
            code: object.get("code").and_then(code_as_string),
            message: Some(message.to_string()),
            details: object.get("details").and_then(Value::as_array).cloned(),
        })
    }
}

/// Ozon returns numeric gRPC codes as well as string codes
fn code_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// SDK error kinds
#[derive(Error, Debug)]
pub enum OzonError {
    /// HTTP 400
    #[error("Bad request: {0}")]
    BadRequest(ApiFailure),

    /// HTTP 401
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(ApiFailure),

    /// HTTP 403
    #[error("Permission denied: {0}")]
    PermissionDenied(ApiFailure),

    /// HTTP 404
    #[error("Resource not found: {0}")]
    NotFound(ApiFailure),

    /// HTTP 422
    #[error("Validation failed: {0}")]
    ValidationFailed(ApiFailure),

    /// HTTP 429
    #[error("Rate limit exceeded: {failure}")]
    RateLimited {
        failure: ApiFailure,
        /// Parsed `retry-after` header
        retry_after_secs: Option<u64>,
    },

    /// HTTP 5xx
    #[error("Server error: {0}")]
    ServerError(ApiFailure),

    /// Any other non-success status
    #[error("HTTP error: {0}")]
    Http(ApiFailure),

    /// The response body was not valid JSON
    #[error("Invalid JSON response from server (HTTP {status}): {message}")]
    InvalidResponse {
        status: u16,
        message: String,
        /// Response headers snapshot, lower-cased names
        headers: HashMap<String, String>,
        request_id: Option<RequestId>,
        timestamp: DateTime<Utc>,
    },

    /// Network failure before any response arrived
    #[error("Network error: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<BoxError>,
        request_id: Option<RequestId>,
        timestamp: DateTime<Utc>,
    },

    /// The attempt exceeded its timeout
    #[error("Request timeout after {timeout_ms}ms")]
    TimedOut {
        timeout_ms: u64,
        request_id: Option<RequestId>,
        timestamp: DateTime<Utc>,
    },

    /// The caller cancelled the call
    #[error("Request cancelled")]
    Cancelled {
        request_id: Option<RequestId>,
        timestamp: DateTime<Utc>,
    },

    /// Invalid client or request configuration
    #[error("Configuration error: {message}")]
    ConfigurationInvalid {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A page could not be advanced
    #[error("Pagination error: {message}")]
    Pagination {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Result type alias
pub type OzonResult<T> = Result<T, OzonError>;

impl OzonError {
    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        OzonError::ConfigurationInvalid {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create pagination error
    pub fn pagination(message: impl Into<String>) -> Self {
        OzonError::Pagination {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create connection error
    pub fn connection(source: BoxError, request_id: Option<RequestId>) -> Self {
        OzonError::ConnectionFailed {
            message: source.to_string(),
            source: Some(source),
            request_id,
            timestamp: Utc::now(),
        }
    }

    /// Create timeout error
    pub fn timed_out(timeout_ms: u64, request_id: Option<RequestId>) -> Self {
        OzonError::TimedOut {
            timeout_ms,
            request_id,
            timestamp: Utc::now(),
        }
    }

    /// Create cancellation error
    pub fn cancelled(request_id: Option<RequestId>) -> Self {
        OzonError::Cancelled {
            request_id,
            timestamp: Utc::now(),
        }
    }

    /// Create decode error
    pub fn invalid_response(
        status: u16,
        message: impl Into<String>,
        request_id: Option<RequestId>,
    ) -> Self {
        Self::invalid_response_with_headers(status, message, HashMap::new(), request_id)
    }

    /// Create decode error keeping the response headers
    pub fn invalid_response_with_headers(
        status: u16,
        message: impl Into<String>,
        headers: HashMap<String, String>,
        request_id: Option<RequestId>,
    ) -> Self {
        OzonError::InvalidResponse {
            status,
            message: message.into(),
            headers,
            request_id,
            timestamp: Utc::now(),
        }
    }

    /// Get the response headers, for any kind that received a response
    pub fn response_headers(&self) -> Option<&HashMap<String, String>> {
        match self {
            OzonError::InvalidResponse { headers, .. } => Some(headers),
            _ => self.api_failure().map(|failure| &failure.headers),
        }
    }

    /// Get the HTTP failure details, if this is an HTTP kind
    pub fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            OzonError::BadRequest(f)
            | OzonError::AuthenticationFailed(f)
            | OzonError::PermissionDenied(f)
            | OzonError::NotFound(f)
            | OzonError::ValidationFailed(f)
            | OzonError::ServerError(f)
            | OzonError::Http(f) => Some(f),
            OzonError::RateLimited { failure, .. } => Some(failure),
            _ => None,
        }
    }

    /// Get the HTTP status code, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            OzonError::InvalidResponse { status, .. } => Some(*status),
            other => other.api_failure().map(|f| f.status),
        }
    }

    /// Get the attempt identifier, if known
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            OzonError::InvalidResponse { request_id, .. }
            | OzonError::ConnectionFailed { request_id, .. }
            | OzonError::TimedOut { request_id, .. }
            | OzonError::Cancelled { request_id, .. } => request_id.as_ref(),
            OzonError::ConfigurationInvalid { .. } | OzonError::Pagination { .. } => None,
            other => other.api_failure().and_then(|f| f.request_id.as_ref()),
        }
    }

    /// Get the creation time
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            OzonError::InvalidResponse { timestamp, .. }
            | OzonError::ConnectionFailed { timestamp, .. }
            | OzonError::TimedOut { timestamp, .. }
            | OzonError::Cancelled { timestamp, .. }
            | OzonError::ConfigurationInvalid { timestamp, .. }
            | OzonError::Pagination { timestamp, .. } => *timestamp,
            other => other
                .api_failure()
                .map(|f| f.timestamp)
                .unwrap_or_else(Utc::now),
        }
    }

    /// Get error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            OzonError::BadRequest(_) => "bad_request",
            OzonError::AuthenticationFailed(_) => "authentication_error",
            OzonError::PermissionDenied(_) => "permission_error",
            OzonError::NotFound(_) => "not_found_error",
            OzonError::ValidationFailed(_) => "validation_error",
            OzonError::RateLimited { .. } => "rate_limit_error",
            OzonError::ServerError(_) => "server_error",
            OzonError::Http(_) => "http_error",
            OzonError::InvalidResponse { .. } => "invalid_response",
            OzonError::ConnectionFailed { .. } => "connection_error",
            OzonError::TimedOut { .. } => "timeout_error",
            OzonError::Cancelled { .. } => "cancelled",
            OzonError::ConfigurationInvalid { .. } => "configuration_error",
            OzonError::Pagination { .. } => "pagination_error",
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        is_retryable(self)
    }
}

/// Build the error for a non-success HTTP response
pub fn classify_http_failure(
    status: u16,
    error_body: Option<ErrorBody>,
    headers: HashMap<String, String>,
    request_id: Option<RequestId>,
) -> OzonError {
    let error_body = error_body.unwrap_or_default();
    let message = error_body
        .message
        .or_else(|| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Unknown API error".to_string());

    let failure = ApiFailure {
        status,
        message,
        code: error_body.code,
        details: error_body.details,
        headers,
        request_id,
        timestamp: Utc::now(),
    };

    match status {
        400 => OzonError::BadRequest(failure),
        401 => OzonError::AuthenticationFailed(failure),
        403 => OzonError::PermissionDenied(failure),
        404 => OzonError::NotFound(failure),
        422 => OzonError::ValidationFailed(failure),
        429 => {
            let retry_after_secs = header_value(&failure.headers, "retry-after")
                .and_then(|v| v.trim().parse::<u64>().ok());
            OzonError::RateLimited {
                failure,
                retry_after_secs,
            }
        }
        s if s >= 500 => OzonError::ServerError(failure),
        _ => OzonError::Http(failure),
    }
}

fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn is_gateway_status(status: u16) -> bool {
    matches!(status, 502 | 503 | 504)
}

/// Whether the error kind is worth another attempt
pub fn is_retryable(error: &OzonError) -> bool {
    match error {
        OzonError::RateLimited { .. }
        | OzonError::ServerError(_)
        | OzonError::ConnectionFailed { .. }
        | OzonError::TimedOut { .. } => true,
        OzonError::Http(failure) => is_gateway_status(failure.status),
        OzonError::InvalidResponse { status, .. } => is_gateway_status(*status),
        _ => false,
    }
}

/// Delay before the retry that follows `attempt` (0-based)
pub fn retry_delay_ms(error: &OzonError, attempt: u32) -> u64 {
    if let OzonError::RateLimited {
        retry_after_secs: Some(secs),
        ..
    } = error
    {
        return secs.saturating_mul(1000);
    }

    BASE_RETRY_DELAY_MS
        .saturating_mul(2_u64.saturating_pow(attempt))
        .min(MAX_RETRY_DELAY_MS)
}
