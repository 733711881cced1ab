//! Sparse change-set payloads.

use crate::error::{CoreError, CoreResult};
use crate::model::column::ColumnModel;
use crate::model::record::IdRange;
use crate::types::{ColumnId, Etag, TableId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One sparse row in a change set.
///
/// An insert carries no prior identity; an update names the row it targets
/// and the version that row had when the writer read it. The version is
/// optional only so malformed input can be rejected by the conflict
/// detector - a well-formed update always carries one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SparseRow {
    /// A brand-new row with no prior id or version.
    Insert {
        /// Partial cell map: column id to new value. `None` clears the cell.
        cells: BTreeMap<ColumnId, Option<String>>,
    },
    /// A change to an existing row.
    Update {
        /// The row being changed.
        row_id: i64,
        /// The version the row had when the writer read it.
        row_version: Option<i64>,
        /// Partial cell map; absent columns are unchanged.
        cells: BTreeMap<ColumnId, Option<String>>,
    },
}

impl SparseRow {
    /// Creates an insert row.
    #[must_use]
    pub fn insert(cells: BTreeMap<ColumnId, Option<String>>) -> Self {
        Self::Insert { cells }
    }

    /// Creates an update row.
    #[must_use]
    pub fn update(row_id: i64, row_version: i64, cells: BTreeMap<ColumnId, Option<String>>) -> Self {
        Self::Update {
            row_id,
            row_version: Some(row_version),
            cells,
        }
    }

    /// Returns true for insert rows.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        matches!(self, SparseRow::Insert { .. })
    }

    /// Returns the target row id, if this is an update.
    #[must_use]
    pub fn row_id(&self) -> Option<i64> {
        match self {
            SparseRow::Insert { .. } => None,
            SparseRow::Update { row_id, .. } => Some(*row_id),
        }
    }

    /// Returns the read-time row version, if present.
    #[must_use]
    pub fn row_version(&self) -> Option<i64> {
        match self {
            SparseRow::Insert { .. } => None,
            SparseRow::Update { row_version, .. } => *row_version,
        }
    }

    /// Returns the cell map.
    #[must_use]
    pub fn cells(&self) -> &BTreeMap<ColumnId, Option<String>> {
        match self {
            SparseRow::Insert { cells } | SparseRow::Update { cells, .. } => cells,
        }
    }
}

/// A partial-row change payload for one table.
///
/// Carries the ordered column ids the cells are keyed against, the sparse
/// rows, and optionally the base etag of the allocation the writer last read
/// under (its optimistic-concurrency marker).
///
/// # Lifecycle
///
/// Constructed by a writer, validated by the conflict detector, assigned
/// reserved row ids and the reserved version, persisted as a change record
/// payload, reconstructed on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseChangeSet {
    /// The table this change set targets.
    pub table_id: TableId,
    /// Ordered column ids the cells reference.
    pub column_ids: Vec<ColumnId>,
    /// Base etag from the writer's last read, if it has one.
    pub base_etag: Option<Etag>,
    /// The sparse rows.
    pub rows: Vec<SparseRow>,
}

impl SparseChangeSet {
    /// Creates an empty change set over the given columns.
    #[must_use]
    pub fn new(table_id: TableId, column_ids: Vec<ColumnId>) -> Self {
        Self {
            table_id,
            column_ids,
            base_etag: None,
            rows: Vec::new(),
        }
    }

    /// Sets the writer's base etag.
    #[must_use]
    pub fn with_base_etag(mut self, etag: Etag) -> Self {
        self.base_etag = Some(etag);
        self
    }

    /// Adds a row.
    pub fn push_row(&mut self, row: SparseRow) {
        self.rows.push(row);
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> i64 {
        self.rows.len() as i64
    }

    /// Returns true if the change set has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of insert rows (rows needing a reserved id).
    #[must_use]
    pub fn insert_count(&self) -> i64 {
        self.rows.iter().filter(|r| r.is_insert()).count() as i64
    }

    /// Returns the row ids targeted by update rows, ascending and deduplicated.
    #[must_use]
    pub fn updated_row_ids(&self) -> Vec<i64> {
        let ids: BTreeSet<i64> = self.rows.iter().filter_map(SparseRow::row_id).collect();
        ids.into_iter().collect()
    }

    /// Returns the maximum read-time row version among update rows.
    #[must_use]
    pub fn max_row_version(&self) -> Option<i64> {
        self.rows.iter().filter_map(SparseRow::row_version).max()
    }

    /// Assigns reserved row ids to insert rows and stamps every row with the
    /// reserved version number.
    ///
    /// Insert rows consume ids from the range in order and become update
    /// rows carrying their assigned identity; existing update rows keep
    /// their target id and are restamped to the new version. Run the
    /// conflict detector *before* this - assignment overwrites the
    /// read-time versions the detector needs.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the range reserves fewer ids
    /// than the change set has insert rows.
    pub fn assign_ids_and_versions(&mut self, range: &IdRange) -> CoreResult<()> {
        let mut reserved = range.row_ids();
        let version = range.version_number;

        for row in &mut self.rows {
            match row {
                SparseRow::Insert { cells } => {
                    let row_id = reserved.next().ok_or_else(|| {
                        CoreError::invalid_argument(
                            "reserved id range has fewer ids than the change set has insert rows",
                        )
                    })?;
                    let cells = std::mem::take(cells);
                    *row = SparseRow::Update {
                        row_id,
                        row_version: Some(version),
                        cells,
                    };
                }
                SparseRow::Update { row_version, .. } => {
                    *row_version = Some(version);
                }
            }
        }

        Ok(())
    }

    /// Collects the file-handle ids referenced by this change set under the
    /// given schema: every non-null cell in a file-reference column.
    #[must_use]
    pub fn file_handle_ids(&self, columns: &[ColumnModel]) -> BTreeSet<String> {
        let file_columns: BTreeSet<ColumnId> = columns
            .iter()
            .filter(|c| c.column_type.is_file_reference())
            .map(|c| c.id)
            .collect();

        self.rows
            .iter()
            .flat_map(|row| row.cells().iter())
            .filter(|(column_id, value)| file_columns.contains(column_id) && value.is_some())
            .filter_map(|(_, value)| value.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::column::ColumnType;

    fn cells(pairs: &[(u64, Option<&str>)]) -> BTreeMap<ColumnId, Option<String>> {
        pairs
            .iter()
            .map(|(id, v)| (ColumnId::new(*id), v.map(String::from)))
            .collect()
    }

    fn range(min: i64, max: i64, version: i64) -> IdRange {
        IdRange {
            minimum_row_id: Some(min),
            maximum_row_id: Some(max),
            version_number: version,
            maximum_update_id: min - 1,
            etag: Etag::mint(),
        }
    }

    #[test]
    fn insert_has_no_identity() {
        let row = SparseRow::insert(cells(&[(1, Some("a"))]));
        assert!(row.is_insert());
        assert_eq!(row.row_id(), None);
        assert_eq!(row.row_version(), None);
    }

    #[test]
    fn update_carries_identity() {
        let row = SparseRow::update(7, 3, cells(&[(1, Some("b"))]));
        assert!(!row.is_insert());
        assert_eq!(row.row_id(), Some(7));
        assert_eq!(row.row_version(), Some(3));
    }

    #[test]
    fn updated_row_ids_skips_inserts() {
        let mut set = SparseChangeSet::new(TableId::new(1), vec![ColumnId::new(1)]);
        set.push_row(SparseRow::insert(cells(&[(1, Some("a"))])));
        set.push_row(SparseRow::update(9, 0, cells(&[(1, Some("b"))])));
        set.push_row(SparseRow::update(4, 0, cells(&[(1, Some("c"))])));

        assert_eq!(set.updated_row_ids(), vec![4, 9]);
        assert_eq!(set.insert_count(), 1);
        assert_eq!(set.row_count(), 3);
    }

    #[test]
    fn max_row_version() {
        let mut set = SparseChangeSet::new(TableId::new(1), vec![ColumnId::new(1)]);
        assert_eq!(set.max_row_version(), None);

        set.push_row(SparseRow::update(1, 2, cells(&[])));
        set.push_row(SparseRow::update(2, 5, cells(&[])));
        assert_eq!(set.max_row_version(), Some(5));
    }

    #[test]
    fn assign_converts_inserts() {
        let mut set = SparseChangeSet::new(TableId::new(1), vec![ColumnId::new(1)]);
        set.push_row(SparseRow::insert(cells(&[(1, Some("a"))])));
        set.push_row(SparseRow::insert(cells(&[(1, Some("b"))])));
        set.push_row(SparseRow::update(0, 0, cells(&[(1, Some("c"))])));

        set.assign_ids_and_versions(&range(5, 6, 2)).unwrap();

        assert_eq!(set.rows[0].row_id(), Some(5));
        assert_eq!(set.rows[1].row_id(), Some(6));
        assert_eq!(set.rows[2].row_id(), Some(0));
        // Every row is stamped with the reserved version.
        assert!(set.rows.iter().all(|r| r.row_version() == Some(2)));
        // Cell values survive the conversion.
        assert_eq!(
            set.rows[0].cells().get(&ColumnId::new(1)),
            Some(&Some("a".to_string()))
        );
    }

    #[test]
    fn assign_fails_when_range_too_small() {
        let mut set = SparseChangeSet::new(TableId::new(1), vec![ColumnId::new(1)]);
        set.push_row(SparseRow::insert(cells(&[])));
        set.push_row(SparseRow::insert(cells(&[])));

        let result = set.assign_ids_and_versions(&range(0, 0, 0));
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }

    #[test]
    fn file_handle_ids_respect_schema() {
        let columns = vec![
            ColumnModel::new(ColumnId::new(1), "name", ColumnType::String),
            ColumnModel::new(ColumnId::new(2), "attachment", ColumnType::FileHandle),
        ];

        let mut set = SparseChangeSet::new(TableId::new(1), vec![ColumnId::new(1), ColumnId::new(2)]);
        set.push_row(SparseRow::insert(cells(&[
            (1, Some("alpha")),
            (2, Some("9001")),
        ])));
        set.push_row(SparseRow::insert(cells(&[(1, Some("beta")), (2, None)])));
        set.push_row(SparseRow::insert(cells(&[(2, Some("9002"))])));

        let ids = set.file_handle_ids(&columns);
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec!["9001".to_string(), "9002".to_string()]
        );
    }

    #[test]
    fn file_handle_ids_empty_without_file_columns() {
        let columns = vec![ColumnModel::new(ColumnId::new(1), "name", ColumnType::String)];
        let mut set = SparseChangeSet::new(TableId::new(1), vec![ColumnId::new(1)]);
        set.push_row(SparseRow::insert(cells(&[(1, Some("alpha"))])));

        assert!(set.file_handle_ids(&columns).is_empty());
    }
}
