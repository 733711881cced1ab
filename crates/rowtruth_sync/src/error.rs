//! Error types for synchronization.

use thiserror::Error;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a synchronization pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Truth store error while producing the truth-side stream.
    #[error("truth store error: {0}")]
    Truth(#[from] rowtruth_core::CoreError),

    /// A stream failed mid-iteration; the pass must be retried with a
    /// fresh salt.
    #[error("checksum stream failed: {message}")]
    StreamFailed {
        /// Description of the failure.
        message: String,
    },

    /// A stream violated its ascending-id contract.
    #[error("checksum stream out of order: id {current} after id {previous}")]
    OutOfOrder {
        /// The id seen before the violation.
        previous: u64,
        /// The offending id.
        current: u64,
    },

    /// Every attempted pass aborted.
    #[error("synchronization failed after {attempts} attempts: {last_error}")]
    PassesExhausted {
        /// Number of passes attempted.
        attempts: u32,
        /// The last pass's failure.
        last_error: String,
    },
}

impl SyncError {
    /// Creates a stream-failed error.
    pub fn stream_failed(message: impl Into<String>) -> Self {
        Self::StreamFailed {
            message: message.into(),
        }
    }
}
