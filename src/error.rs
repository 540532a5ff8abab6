//! Error types for the frequency limiter.

use thiserror::Error;

/// Main error type for freqlimit operations.
#[derive(Error, Debug)]
pub enum FreqlimitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared-store communication errors
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for freqlimit operations.
pub type Result<T> = std::result::Result<T, FreqlimitError>;
