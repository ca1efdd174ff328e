//! Error types for Tether

use thiserror::Error;

/// Core Tether errors
#[derive(Error, Debug)]
pub enum TetherError {
    // Protocol errors
    #[error("Action rejected by peer: {action}")]
    ActionRejected { action: String },

    #[error("Channel closed before a result arrived")]
    ChannelClosed,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // Interceptor errors
    #[error("Observation failed: {0}")]
    Observation(String),

    #[error("Invalid URL pattern: {0}")]
    InvalidPattern(String),

    #[error("Interceptor already installed: {0}")]
    AlreadyInstalled(String),

    // Runtime errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TetherError {
    /// Whether this error came back from the peer rather than the transport
    pub fn is_rejection(&self) -> bool {
        matches!(self, TetherError::ActionRejected { .. })
    }
}

/// Result type for Tether operations
pub type TetherResult<T> = Result<T, TetherError>;
