//! Configuration management module
//!
//! Responsible for client configuration: defaults, environment loading,
//! validation and credentials.

pub mod credentials;
pub mod settings;

pub use credentials::{Credentials, MaskedCredentials};
pub use settings::{ClientSettings, OzonConfig};
