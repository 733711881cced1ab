//! # Rowtruth Core
//!
//! Versioned table-change truth store.
//!
//! This crate provides:
//! - [`IdAllocator`] - per-table monotonic row-id/version counters
//! - [`TruthStore`] - the append-only log of row and schema changes
//! - [`ConflictDetector`] - optimistic-concurrency validation for writers
//! - [`FileRefBackfillWorker`] - lazy resolution of file-reference flags
//!
//! A writer reserves row ids and a version number from the allocator, builds
//! a [`model::SparseChangeSet`], validates it against the log with the
//! conflict detector, and appends it under the reserved version. Readers page
//! through the log by version or by global change id. Payload bytes live
//! behind the [`rowtruth_storage::PayloadStore`] boundary.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocator;
mod conflict;
mod error;
mod filerefs;
pub mod model;
mod truth;
mod types;

pub use allocator::IdAllocator;
pub use conflict::ConflictDetector;
pub use error::{CoreError, CoreResult};
pub use filerefs::{BackfillOutcome, ColumnModelProvider, FileRefBackfillWorker};
pub use truth::TruthStore;
pub use types::{ChangeId, ColumnId, Etag, PrincipalId, TableId, TransactionId};
