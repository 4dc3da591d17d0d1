//! Ozon Seller API Library
//!
//! Provides the HTTP request execution core of the Ozon Seller API client:
//! authenticated JSON requests with timeouts, bounded retry and idempotency
//! keys, typed errors, and offset/cursor pagination.

pub mod client;
pub mod config;
pub mod models;
pub mod pagination;
pub mod services;
pub mod utils;

// Re-export common types
pub use client::{AuthStatus, ClientInfo, ConnectionStatus, OzonSellerClient};
pub use config::{ClientSettings, Credentials, OzonConfig};
pub use models::{HttpMethod, IdempotencyKey, RequestId, RequestOptions};
pub use pagination::{
    CursorPaginator, CursorRequest, LastId, OffsetPaginator, OffsetRequest, PaginationConfig,
    PaginationType,
};
pub use services::{HttpClient, Transport};
pub use utils::cancel::CancellationToken;
pub use utils::error::{OzonError, OzonResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
