//! Checksum stream production.

use crate::checksum::IdAndChecksum;
use crate::error::SyncResult;
use crate::filter::ViewFilter;

/// A lazy, finite sequence of id/checksum pairs, ascending by object id.
///
/// A stream is restartable as a fresh call but not resumable: after a
/// mid-iteration failure, a new stream starts over from the beginning.
pub type ChecksumStream = Box<dyn Iterator<Item = SyncResult<IdAndChecksum>> + Send>;

/// Produces checksum streams over one side's object set.
///
/// Implemented by the truth store (see [`crate::TruthChecksumSource`]) and
/// by each replica's materialized object set. Both legs of one pass must be
/// invoked with the same salt and filter.
pub trait IdAndChecksumSource: Send + Sync {
    /// Streams the ids and salted checksums of every in-scope object,
    /// ascending by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened; items themselves
    /// are fallible, and a failed item aborts the consuming pass.
    fn stream_ids_and_checksums(
        &self,
        salt: u64,
        filter: &dyn ViewFilter,
    ) -> SyncResult<ChecksumStream>;
}
