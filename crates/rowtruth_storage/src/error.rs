//! Error types for payload store operations.

use std::io;
use thiserror::Error;

/// Result type for payload store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during payload store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No payload exists at the requested location.
    #[error("no payload at location: {location}")]
    LocationNotFound {
        /// The location key that did not resolve.
        location: String,
    },

    /// The store is unreachable or refused the operation.
    #[error("payload store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Creates a location-not-found error.
    pub fn location_not_found(location: impl Into<String>) -> Self {
        Self::LocationNotFound {
            location: location.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
