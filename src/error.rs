//! Error taxonomy for backend calls.
//!
//! Every variant carries the human-readable message the UI shows as-is.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Network, HTTP or timeout failure on a read
    #[error("{message}")]
    Fetch { message: String, timed_out: bool },
    /// Validation or transport failure while planting
    #[error("{0}")]
    Creation(String),
    #[error("{0}")]
    Search(String),
    #[error("{0}")]
    Stats(String),
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::Fetch { message, .. } => message,
            ApiError::Creation(m) | ApiError::Search(m) | ApiError::Stats(m) => m,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Fetch { timed_out: true, .. })
    }
}
