//! Service layer module
//!
//! Contains the transport seam, the single-attempt executor, the retry
//! controller and the typed HTTP client built on top of them

pub mod client;
pub mod executor;
pub mod retry;
pub mod transport;

pub use client::HttpClient;
pub use executor::{ApiResponse, RequestExecutor, IDEMPOTENCY_KEY_HEADER, REQUEST_ID_HEADER};
pub use retry::execute_with_retry;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
