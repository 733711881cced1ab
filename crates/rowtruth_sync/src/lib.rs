//! # Rowtruth Sync
//!
//! Checksum-stream synchronization between the truth store and a replica.
//!
//! A reconciliation pass picks one random salt and streams
//! `(object id, checksum)` pairs from both sides under it. The two ascending
//! sequences are merge-joined in lockstep: ids missing from the replica are
//! created, ids only the replica holds are deleted, and ids whose checksums
//! differ are re-derived from truth. Checksums travel instead of rows, so a
//! pass costs bandwidth proportional to the id space, not the data.
//!
//! The salt is shared by both legs of one pass and differs between passes,
//! so no checksum can be precomputed consistently across runs. If either
//! stream fails mid-iteration the whole pass aborts and is retried from
//! scratch with a fresh salt - no partial reconciliation state is kept.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod error;
mod filter;
mod reconcile;
mod stream;
mod synchronizer;
mod truth_source;

pub use checksum::{salted_checksum, IdAndChecksum};
pub use error::{SyncError, SyncResult};
pub use filter::{ScopeFilter, ViewFilter};
pub use reconcile::{reconcile, SyncAction};
pub use stream::{ChecksumStream, IdAndChecksumSource};
pub use synchronizer::{SyncPassReport, Synchronizer, SynchronizerConfig};
pub use truth_source::TruthChecksumSource;
