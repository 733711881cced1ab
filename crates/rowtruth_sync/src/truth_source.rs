//! Checksum stream over the truth store.

use crate::checksum::{salted_checksum, IdAndChecksum};
use crate::error::SyncResult;
use crate::filter::ViewFilter;
use crate::stream::{ChecksumStream, IdAndChecksumSource};
use rowtruth_core::TruthStore;
use std::sync::Arc;

/// The truth-side leg of a reconciliation pass.
///
/// Streams the change log's record set: object id is the global change id,
/// and the checksum covers the record's current etag. The etag is
/// regenerated on every record mutation (including the file-reference
/// backfill), so any divergence a replica can accumulate changes the
/// checksum.
pub struct TruthChecksumSource {
    store: Arc<TruthStore>,
}

impl TruthChecksumSource {
    /// Creates a source over the given truth store.
    #[must_use]
    pub fn new(store: Arc<TruthStore>) -> Self {
        Self { store }
    }
}

impl IdAndChecksumSource for TruthChecksumSource {
    fn stream_ids_and_checksums(
        &self,
        salt: u64,
        filter: &dyn ViewFilter,
    ) -> SyncResult<ChecksumStream> {
        // Snapshot ascends by change id, satisfying the ordering contract.
        let items: Vec<SyncResult<IdAndChecksum>> = self
            .store
            .change_etags_snapshot()
            .into_iter()
            .filter(|(id, _)| filter.includes(id.as_u64()))
            .map(|(id, etag)| {
                Ok(IdAndChecksum::new(
                    id.as_u64(),
                    salted_checksum(salt, id.as_u64(), etag.as_str()),
                ))
            })
            .collect();
        Ok(Box::new(items.into_iter()))
    }
}
