//! An in-memory replica object set.

use parking_lot::RwLock;
use rowtruth_sync::{
    salted_checksum, ChecksumStream, IdAndChecksum, IdAndChecksumSource, SyncAction, SyncResult,
    ViewFilter,
};
use std::collections::BTreeMap;

/// A materialized object set standing in for a downstream replica.
///
/// Holds `(object id, state token)` pairs, streams checksums like a real
/// replica leg, and can apply reconciliation actions against a truth-side
/// token map - enough to drive a full pass-repair-pass cycle in tests.
#[derive(Debug, Default)]
pub struct InMemoryReplica {
    objects: RwLock<BTreeMap<u64, String>>,
}

impl InMemoryReplica {
    /// Creates an empty replica.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a replica preloaded with the given objects.
    #[must_use]
    pub fn with_objects(objects: impl IntoIterator<Item = (u64, String)>) -> Self {
        Self {
            objects: RwLock::new(objects.into_iter().collect()),
        }
    }

    /// Inserts or replaces an object.
    pub fn put(&self, object_id: u64, token: impl Into<String>) {
        self.objects.write().insert(object_id, token.into());
    }

    /// Removes an object.
    pub fn remove(&self, object_id: u64) {
        self.objects.write().remove(&object_id);
    }

    /// Returns the number of objects held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the replica holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Returns the token of an object, if present.
    #[must_use]
    pub fn token(&self, object_id: u64) -> Option<String> {
        self.objects.read().get(&object_id).cloned()
    }

    /// Applies reconciliation actions, re-deriving created and updated
    /// objects from the given truth-side token map.
    ///
    /// # Panics
    ///
    /// Panics if a create or update targets an id the truth map lacks;
    /// this is a test helper.
    pub fn apply(&self, actions: &[SyncAction], truth: &BTreeMap<u64, String>) {
        let mut objects = self.objects.write();
        for action in actions {
            match action {
                SyncAction::Create(id) | SyncAction::Update(id) => {
                    let token = truth
                        .get(id)
                        .unwrap_or_else(|| panic!("truth has no object {id}"));
                    objects.insert(*id, token.clone());
                }
                SyncAction::Delete(id) => {
                    objects.remove(id);
                }
            }
        }
    }
}

impl IdAndChecksumSource for InMemoryReplica {
    fn stream_ids_and_checksums(
        &self,
        salt: u64,
        filter: &dyn ViewFilter,
    ) -> SyncResult<ChecksumStream> {
        let items: Vec<SyncResult<IdAndChecksum>> = self
            .objects
            .read()
            .iter()
            .filter(|(id, _)| filter.includes(**id))
            .map(|(id, token)| Ok(IdAndChecksum::new(*id, salted_checksum(salt, *id, token))))
            .collect();
        Ok(Box::new(items.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowtruth_sync::ScopeFilter;

    #[test]
    fn stream_ascends_and_respects_filter() {
        let replica =
            InMemoryReplica::with_objects([(3, "c".to_string()), (1, "a".to_string())]);

        let items: Vec<IdAndChecksum> = replica
            .stream_ids_and_checksums(5, &ScopeFilter::all())
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].object_id < items[1].object_id);

        let filtered: Vec<IdAndChecksum> = replica
            .stream_ids_and_checksums(5, &ScopeFilter::of([3]))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].object_id, 3);
    }

    #[test]
    fn apply_converges_on_truth() {
        let replica = InMemoryReplica::with_objects([(2, "b".to_string()), (4, "d".to_string())]);
        let truth: BTreeMap<u64, String> =
            [(1, "a".to_string()), (2, "b".to_string())].into();

        replica.apply(
            &[SyncAction::Create(1), SyncAction::Delete(4)],
            &truth,
        );

        assert_eq!(replica.token(1), Some("a".to_string()));
        assert_eq!(replica.token(2), Some("b".to_string()));
        assert_eq!(replica.token(4), None);
        assert_eq!(replica.len(), 2);
    }
}
