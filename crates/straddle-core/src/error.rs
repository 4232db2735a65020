//! Error types for straddle-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown connection status: {0}")]
    UnknownStatus(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
