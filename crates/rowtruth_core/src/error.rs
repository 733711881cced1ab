//! Error types for the truth store.

use crate::types::TableId;
use thiserror::Error;

/// Result type for truth store operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in truth store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Payload store error.
    #[error("storage error: {0}")]
    Storage(#[from] rowtruth_storage::StorageError),

    /// Payload encoding or decoding failed.
    #[error("payload codec error: {0}")]
    PayloadCodec(String),

    /// Malformed input, surfaced immediately and never retried internally.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the malformed input.
        message: String,
    },

    /// A concurrent writer changed rows this change set also touches.
    ///
    /// The caller must re-read the offending rows and resubmit.
    #[error("conflicting update on {table_id}: rows {row_ids:?} were changed concurrently")]
    ConflictingUpdate {
        /// The table the conflict occurred on.
        table_id: TableId,
        /// The row ids changed by both writers.
        row_ids: Vec<i64>,
    },

    /// No change record exists for the requested table and version.
    #[error("no change for {table_id} at version {version}")]
    ChangeNotFound {
        /// The table searched.
        table_id: TableId,
        /// The version that was not found.
        version: i64,
    },

    /// No change record in the table's history carries the requested etag.
    #[error("etag {etag} not found in history of {table_id}")]
    EtagNotFound {
        /// The table searched.
        table_id: TableId,
        /// The etag that was not found.
        etag: String,
    },
}

impl CoreError {
    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a payload codec error.
    pub fn payload_codec(message: impl Into<String>) -> Self {
        Self::PayloadCodec(message.into())
    }

    /// Creates a conflicting-update error for the given rows.
    pub fn conflicting_update(table_id: TableId, row_ids: Vec<i64>) -> Self {
        Self::ConflictingUpdate { table_id, row_ids }
    }

    /// Creates a change-not-found error.
    pub fn change_not_found(table_id: TableId, version: i64) -> Self {
        Self::ChangeNotFound { table_id, version }
    }

    /// Creates an etag-not-found error.
    pub fn etag_not_found(table_id: TableId, etag: impl Into<String>) -> Self {
        Self::EtagNotFound {
            table_id,
            etag: etag.into(),
        }
    }
}
