//! Data models module
//!
//! Request descriptors, per-call options and the identifiers attached to them

pub mod request;

pub use request::{
    HttpMethod, IdempotencyKey, RequestDescriptor, RequestId, RequestOptions, ResolvedOptions,
};
