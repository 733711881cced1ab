//! Opaque payload location keys.

use std::fmt;
use uuid::Uuid;

/// An opaque reference to a stored payload.
///
/// Locations are minted by a [`crate::PayloadStore`] on write and are only
/// meaningful to the store that produced them. Callers persist the key
/// verbatim and hand it back to read the payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PayloadLocation(String);

impl PayloadLocation {
    /// Mints a fresh location key scoped to the given table.
    ///
    /// The table scope lets stores drop every payload for a table in one
    /// pass during whole-table teardown.
    #[must_use]
    pub fn mint(table_id: u64) -> Self {
        Self(format!("{table_id}/{}", Uuid::new_v4()))
    }

    /// Creates a location from an existing key string.
    #[must_use]
    pub fn from_key(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key.
    #[must_use]
    pub fn as_key(&self) -> &str {
        &self.0
    }

    /// Returns true if this location belongs to the given table scope.
    #[must_use]
    pub fn in_table(&self, table_id: u64) -> bool {
        self.0
            .split_once('/')
            .and_then(|(prefix, _)| prefix.parse::<u64>().ok())
            .map(|id| id == table_id)
            .unwrap_or(false)
    }
}

impl fmt::Display for PayloadLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_is_unique() {
        let a = PayloadLocation::mint(1);
        let b = PayloadLocation::mint(1);
        assert_ne!(a, b);
    }

    #[test]
    fn table_scope() {
        let location = PayloadLocation::mint(42);
        assert!(location.in_table(42));
        assert!(!location.in_table(43));
    }

    #[test]
    fn from_key_roundtrip() {
        let location = PayloadLocation::from_key("7/abc");
        assert_eq!(location.as_key(), "7/abc");
        assert!(location.in_table(7));
    }

    #[test]
    fn malformed_key_is_in_no_table() {
        let location = PayloadLocation::from_key("not-a-table-key");
        assert!(!location.in_table(0));
    }
}
