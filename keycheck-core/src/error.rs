//! Error types for key checking.

use thiserror::Error;

/// Key checking errors.
#[derive(Debug, Error)]
pub enum KeyCheckError {
    /// Empty or whitespace-only product key.
    #[error("invalid input: {0}")]
    Input(String),

    /// Every candidate configuration rejected the key.
    #[error("key not found or invalid")]
    NotFound,

    /// A DPID buffer or a field derived from it is malformed.
    #[error("decode error: {0}")]
    Decode(String),

    /// Catalog or configuration file unreadable or unparseable.
    #[error("config load error: {0}")]
    ConfigLoad(String),

    /// Network failure talking to the activation service.
    #[error("transport error: {0}")]
    Transport(String),

    /// Activation service answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),

    /// Activation service response could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl KeyCheckError {
    /// Returns true if this is the "no configuration accepted the key" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns true for failures of the activation transport (network or status).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status(_))
    }
}

/// Result type for key checking operations.
pub type KeyCheckResult<T> = Result<T, KeyCheckError>;
