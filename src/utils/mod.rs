//! Utilities module
//!
//! Contains error handling, cancellation and logging helpers

pub mod cancel;
pub mod error;
pub mod logging;
