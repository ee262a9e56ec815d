//! Error types for the Floodgate service.

use thiserror::Error;

/// Main error type for Floodgate operations.
///
/// Admission decisions are never errors; a rejected request is a normal
/// [`Decision`](crate::ratelimit::Decision).
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// Configuration values that failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration sources that could not be read or parsed
    #[error("Configuration error: {0}")]
    Settings(#[from] ::config::ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
