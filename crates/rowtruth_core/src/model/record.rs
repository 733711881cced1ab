//! Change records and allocation results.

use crate::types::{ChangeId, Etag, PrincipalId, TableId, TransactionId};
use rowtruth_storage::PayloadLocation;
use std::fmt;

/// The kind of mutation a change record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// Row inserts, updates, or deletes carried by a sparse change set.
    Row,
    /// Schema column add, delete, or replace operations.
    Column,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Row => write!(f, "ROW"),
            ChangeType::Column => write!(f, "COLUMN"),
        }
    }
}

/// Whether a change's payload references external file objects.
///
/// The flag is tri-state so "not yet computed" is never conflated with
/// "computed false". `Unknown` records are resolved lazily by the backfill
/// worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRefs {
    /// The payload references at least one file object.
    Yes,
    /// The payload references no file objects.
    No,
    /// Not yet computed; pending backfill.
    Unknown,
}

impl FileRefs {
    /// Converts from the nullable-boolean form used at the append boundary.
    #[must_use]
    pub fn from_option(value: Option<bool>) -> Self {
        match value {
            Some(true) => FileRefs::Yes,
            Some(false) => FileRefs::No,
            None => FileRefs::Unknown,
        }
    }

    /// Converts to the nullable-boolean form. `Unknown` maps to `None`.
    #[must_use]
    pub fn as_option(self) -> Option<bool> {
        match self {
            FileRefs::Yes => Some(true),
            FileRefs::No => Some(false),
            FileRefs::Unknown => None,
        }
    }

    /// Returns true if the flag has not been computed yet.
    #[must_use]
    pub fn is_unknown(self) -> bool {
        matches!(self, FileRefs::Unknown)
    }
}

/// One immutable entry in the truth store.
///
/// Records are created only by appends and destroyed only by whole-table
/// deletion. The single permitted mutation is the file-reference backfill,
/// which also regenerates the record's etag.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Global change id, monotonic across all tables.
    pub id: ChangeId,
    /// The table this change belongs to.
    pub table_id: TableId,
    /// Row or column change.
    pub change_type: ChangeType,
    /// Table-local version this change represents.
    pub version_number: i64,
    /// Opaque token for this record; regenerated on backfill.
    pub etag: Etag,
    /// Transaction token supplied by the caller.
    pub transaction_id: TransactionId,
    /// Number of rows in the change set. Present for row changes.
    pub row_count: Option<i64>,
    /// Location of the serialized payload in the payload store.
    pub payload_location: PayloadLocation,
    /// Whether the payload references external file objects.
    pub has_file_refs: FileRefs,
    /// Principal that appended the change.
    pub created_by: PrincipalId,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_on: u64,
}

/// Result of one row-id/version allocation for one table.
///
/// `minimum_row_id`/`maximum_row_id` are absent for zero-count reservations;
/// `version_number` still advances by exactly one per call and a fresh etag
/// is minted regardless.
#[derive(Debug, Clone, PartialEq)]
pub struct IdRange {
    /// First reserved row id, inclusive.
    pub minimum_row_id: Option<i64>,
    /// Last reserved row id, inclusive.
    pub maximum_row_id: Option<i64>,
    /// The version number reserved by this allocation.
    pub version_number: i64,
    /// The previous high-water-mark row id, used as a conflict-scan lower
    /// bound. `-1` when the table had no prior rows.
    pub maximum_update_id: i64,
    /// Fresh opaque token for this allocation.
    pub etag: Etag,
}

impl IdRange {
    /// Returns the number of row ids reserved by this allocation.
    #[must_use]
    pub fn row_id_count(&self) -> i64 {
        match (self.minimum_row_id, self.maximum_row_id) {
            (Some(min), Some(max)) => max - min + 1,
            _ => 0,
        }
    }

    /// Iterates the reserved row ids in ascending order.
    pub fn row_ids(&self) -> impl Iterator<Item = i64> {
        let (start, end) = match (self.minimum_row_id, self.maximum_row_id) {
            (Some(min), Some(max)) => (min, max),
            // Empty range.
            _ => (0, -1),
        };
        start..=end
    }
}

/// The inclusive range of global change ids currently in the store.
///
/// `(-1, -1)` when the store holds no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeIdRange {
    /// Smallest global change id, or `-1` when empty.
    pub min_id: i64,
    /// Largest global change id, or `-1` when empty.
    pub max_id: i64,
}

impl ChangeIdRange {
    /// The range of an empty store.
    pub const EMPTY: Self = Self {
        min_id: -1,
        max_id: -1,
    };

    /// Creates a new range.
    #[must_use]
    pub const fn new(min_id: i64, max_id: i64) -> Self {
        Self { min_id, max_id }
    }

    /// Returns true if this is the empty sentinel range.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_id < 0 || self.max_id < 0
    }

    /// Returns true if the given change id falls inside this range.
    #[must_use]
    pub fn contains(&self, id: ChangeId) -> bool {
        if self.is_empty() {
            return false;
        }
        let id = id.as_u64() as i64;
        id >= self.min_id && id <= self.max_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_refs_option_roundtrip() {
        assert_eq!(FileRefs::from_option(Some(true)), FileRefs::Yes);
        assert_eq!(FileRefs::from_option(Some(false)), FileRefs::No);
        assert_eq!(FileRefs::from_option(None), FileRefs::Unknown);

        assert_eq!(FileRefs::Yes.as_option(), Some(true));
        assert_eq!(FileRefs::No.as_option(), Some(false));
        assert_eq!(FileRefs::Unknown.as_option(), None);
    }

    #[test]
    fn file_refs_unknown() {
        assert!(FileRefs::Unknown.is_unknown());
        assert!(!FileRefs::Yes.is_unknown());
        assert!(!FileRefs::No.is_unknown());
    }

    #[test]
    fn id_range_count() {
        let range = IdRange {
            minimum_row_id: Some(3),
            maximum_row_id: Some(7),
            version_number: 1,
            maximum_update_id: 2,
            etag: Etag::mint(),
        };
        assert_eq!(range.row_id_count(), 5);
        assert_eq!(range.row_ids().collect::<Vec<_>>(), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn id_range_empty() {
        let range = IdRange {
            minimum_row_id: None,
            maximum_row_id: None,
            version_number: 4,
            maximum_update_id: 9,
            etag: Etag::mint(),
        };
        assert_eq!(range.row_id_count(), 0);
        assert_eq!(range.row_ids().count(), 0);
    }

    #[test]
    fn change_id_range_empty() {
        assert!(ChangeIdRange::EMPTY.is_empty());
        assert!(!ChangeIdRange::EMPTY.contains(ChangeId::new(0)));
    }

    #[test]
    fn change_id_range_contains() {
        let range = ChangeIdRange::new(2, 5);
        assert!(!range.contains(ChangeId::new(1)));
        assert!(range.contains(ChangeId::new(2)));
        assert!(range.contains(ChangeId::new(5)));
        assert!(!range.contains(ChangeId::new(6)));
    }

    #[test]
    fn change_type_display() {
        assert_eq!(format!("{}", ChangeType::Row), "ROW");
        assert_eq!(format!("{}", ChangeType::Column), "COLUMN");
    }
}
