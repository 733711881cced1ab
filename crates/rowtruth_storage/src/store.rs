//! Payload store trait definition.

use crate::error::StorageResult;
use crate::location::PayloadLocation;

/// A keyed blob store for change-set payloads.
///
/// Payload stores are **opaque byte stores**. They mint a fresh location key
/// for every write and return exactly the bytes previously written when that
/// key is read back. The change log owns all payload format interpretation -
/// stores do not understand change sets or schema changes.
///
/// # Invariants
///
/// - `write` never overwrites an existing payload; every call mints a new key
/// - `read` returns exactly the bytes previously written under that key
/// - Individual payloads are never deleted except by `delete_table`, which
///   removes every payload in a table's scope during whole-table teardown
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`crate::InMemoryPayloadStore`] - For testing
/// - [`crate::FilePayloadStore`] - For persistent storage
pub trait PayloadStore: Send + Sync {
    /// Writes a payload and returns its freshly minted location.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the write fails.
    fn write(&self, table_id: u64, data: &[u8]) -> StorageResult<PayloadLocation>;

    /// Reads the payload at the given location.
    ///
    /// # Errors
    ///
    /// Returns an error if no payload exists at the location or the read
    /// fails.
    fn read(&self, location: &PayloadLocation) -> StorageResult<Vec<u8>>;

    /// Deletes every payload in the given table's scope.
    ///
    /// Only called as part of whole-table teardown, after the owning entity
    /// itself has been deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_table(&self, table_id: u64) -> StorageResult<()>;
}
