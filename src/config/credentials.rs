//! API credentials
//!
//! Holds the `Api-Key` / `Client-Id` pair and keeps it out of logs

use crate::utils::error::{OzonError, OzonResult};
use crate::utils::logging::mask_secret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum plausible length of an Ozon API key
pub const MIN_API_KEY_LEN: usize = 20;

/// Seller credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub client_id: String,
}

/// Credentials safe to display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaskedCredentials {
    pub client_id: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client_id: client_id.into(),
        }
    }

    /// Check both values are present
    pub fn validate_presence(&self) -> OzonResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(OzonError::config("API key is required and cannot be empty"));
        }

        if self.client_id.trim().is_empty() {
            return Err(OzonError::config("Client ID is required and cannot be empty"));
        }

        Ok(())
    }

    /// Check presence plus the basic shape of both values
    pub fn validate_format(&self) -> OzonResult<()> {
        self.validate_presence()?;

        if !self.client_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(OzonError::config("Client ID must be a numeric string"));
        }

        if self.api_key.contains(char::is_whitespace) {
            return Err(OzonError::config("API key cannot contain whitespace characters"));
        }

        if self.api_key.len() < MIN_API_KEY_LEN {
            return Err(OzonError::config("API key appears to be too short"));
        }

        Ok(())
    }

    /// Whether the format checks pass
    pub fn is_valid(&self) -> bool {
        self.validate_format().is_ok()
    }

    /// Authentication headers sent with every request
    pub fn auth_headers(&self) -> [(&'static str, String); 2] {
        [
            ("Client-Id", self.client_id.clone()),
            ("Api-Key", self.api_key.clone()),
        ]
    }

    pub fn masked(&self) -> MaskedCredentials {
        MaskedCredentials {
            client_id: mask_secret(&self.client_id, 2),
            api_key: mask_secret(&self.api_key, 4),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = self.masked();
        f.debug_struct("Credentials")
            .field("api_key", &masked.api_key)
            .field("client_id", &masked.client_id)
            .finish()
    }
}
