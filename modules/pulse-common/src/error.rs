use std::time::Duration;

use thiserror::Error;

/// Result type alias for signal operations.
pub type SignalResult<T> = std::result::Result<T, SignalError>;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Fetch failed for source {name}: {message}")]
    SourceFetch { name: String, message: String },

    #[error("Parse error for source {name}: {message}")]
    Parse { name: String, message: String },

    #[error("Source {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("Source {name} rate limited the request")]
    RateLimited {
        name: String,
        retry_after: Option<Duration>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SignalError {
    /// Short machine-friendly label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalError::SourceFetch { .. } => "source_fetch",
            SignalError::Parse { .. } => "parse",
            SignalError::Timeout { .. } => "timeout",
            SignalError::RateLimited { .. } => "rate_limited",
            SignalError::Config(_) => "config",
            SignalError::Other(_) => "other",
        }
    }

    /// Server-requested wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SignalError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
