//! In-memory payload store for testing.

use crate::error::{StorageError, StorageResult};
use crate::location::PayloadLocation;
use crate::store::PayloadStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory payload store.
///
/// This store keeps all payloads in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral change logs that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use rowtruth_storage::{PayloadStore, InMemoryPayloadStore};
///
/// let store = InMemoryPayloadStore::new();
/// let location = store.write(1, b"bytes").unwrap();
/// assert_eq!(store.read(&location).unwrap(), b"bytes");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryPayloadStore {
    payloads: RwLock<BTreeMap<PayloadLocation, Vec<u8>>>,
}

impl InMemoryPayloadStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of payloads held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.read().len()
    }

    /// Returns true if the store holds no payloads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payloads.read().is_empty()
    }

    /// Removes every payload. Test support.
    pub fn clear(&self) {
        self.payloads.write().clear();
    }
}

impl PayloadStore for InMemoryPayloadStore {
    fn write(&self, table_id: u64, data: &[u8]) -> StorageResult<PayloadLocation> {
        let location = PayloadLocation::mint(table_id);
        self.payloads
            .write()
            .insert(location.clone(), data.to_vec());
        Ok(location)
    }

    fn read(&self, location: &PayloadLocation) -> StorageResult<Vec<u8>> {
        self.payloads
            .read()
            .get(location)
            .cloned()
            .ok_or_else(|| StorageError::location_not_found(location.as_key()))
    }

    fn delete_table(&self, table_id: u64) -> StorageResult<()> {
        self.payloads
            .write()
            .retain(|location, _| !location.in_table(table_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryPayloadStore::new();
        assert!(store.is_empty());
    }

    #[test]
    fn memory_write_then_read() {
        let store = InMemoryPayloadStore::new();
        let location = store.write(1, b"hello").unwrap();
        assert_eq!(store.read(&location).unwrap(), b"hello");
    }

    #[test]
    fn memory_writes_never_collide() {
        let store = InMemoryPayloadStore::new();
        let a = store.write(1, b"first").unwrap();
        let b = store.write(1, b"second").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.read(&a).unwrap(), b"first");
        assert_eq!(store.read(&b).unwrap(), b"second");
    }

    #[test]
    fn memory_read_missing_fails() {
        let store = InMemoryPayloadStore::new();
        let result = store.read(&PayloadLocation::from_key("1/missing"));
        assert!(matches!(result, Err(StorageError::LocationNotFound { .. })));
    }

    #[test]
    fn memory_delete_table_is_scoped() {
        let store = InMemoryPayloadStore::new();
        let kept = store.write(1, b"keep").unwrap();
        let dropped = store.write(2, b"drop").unwrap();

        store.delete_table(2).unwrap();

        assert_eq!(store.read(&kept).unwrap(), b"keep");
        assert!(store.read(&dropped).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_empty_payload() {
        let store = InMemoryPayloadStore::new();
        let location = store.write(1, b"").unwrap();
        assert!(store.read(&location).unwrap().is_empty());
    }
}
