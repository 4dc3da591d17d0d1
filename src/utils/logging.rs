//! Logging utilities
//!
//! Subscriber setup for applications embedding the client, and helpers that
//! keep secrets out of log lines

use anyhow::{anyhow, Result};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable format (development environment)
    #[default]
    Text,
    /// JSON format logs (production environment)
    Json,
}

impl LogFormat {
    /// Parse `text` or `json`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Initialize logging system
///
/// `RUST_LOG` wins over `default_level` when set. Returns an error instead of
/// panicking when a global subscriber is already installed.
pub fn init_logging(default_level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("Invalid log level '{}': {}", default_level, e))?;

    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .try_init(),
    };

    result.map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))
}

/// Mask a secret, keeping only its last `visible` characters
pub fn mask_secret(secret: &str, visible: usize) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let tail: String = if chars.len() > visible {
        chars[chars.len() - visible..].iter().collect()
    } else {
        String::new()
    };
    format!("*****{}*****", tail)
}
