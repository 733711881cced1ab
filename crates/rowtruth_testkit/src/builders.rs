//! Schema and change-set builders.

use rowtruth_core::model::{ColumnModel, ColumnType, SparseChangeSet, SparseRow};
use rowtruth_core::{ColumnId, PrincipalId, TableId, TransactionId, TruthStore};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION: AtomicU64 = AtomicU64::new(1);

/// Builds a schema with one column of every type.
#[must_use]
pub fn one_of_each_type() -> Vec<ColumnModel> {
    vec![
        ColumnModel::new(ColumnId::new(1), "a_string", ColumnType::String),
        ColumnModel::new(ColumnId::new(2), "an_integer", ColumnType::Integer),
        ColumnModel::new(ColumnId::new(3), "a_double", ColumnType::Double),
        ColumnModel::new(ColumnId::new(4), "a_boolean", ColumnType::Boolean),
        ColumnModel::new(ColumnId::new(5), "a_date", ColumnType::Date),
        ColumnModel::new(ColumnId::new(6), "a_file", ColumnType::FileHandle),
    ]
}

/// Returns the ids of the given columns, in order.
#[must_use]
pub fn column_ids(columns: &[ColumnModel]) -> Vec<ColumnId> {
    columns.iter().map(|c| c.id).collect()
}

/// Builds `count` insert rows with a plausible value in every column.
#[must_use]
pub fn make_insert_rows(columns: &[ColumnModel], count: usize) -> Vec<SparseRow> {
    (0..count)
        .map(|i| {
            let cells: BTreeMap<ColumnId, Option<String>> = columns
                .iter()
                .map(|c| {
                    let value = match c.column_type {
                        ColumnType::String => format!("string-{i}"),
                        ColumnType::Integer => i.to_string(),
                        ColumnType::Double => format!("{i}.5"),
                        ColumnType::Boolean => (i % 2 == 0).to_string(),
                        ColumnType::Date => format!("{}", 1_700_000_000_000u64 + i as u64),
                        ColumnType::FileHandle => format!("{}", 9000 + i),
                    };
                    (c.id, Some(value))
                })
                .collect();
            SparseRow::insert(cells)
        })
        .collect()
}

/// Appends `count` freshly built insert rows through the full writer flow:
/// reserve, assign, append. Returns the version appended.
///
/// # Panics
///
/// Panics on any store error; this is a test helper.
pub fn append_insert_rows(
    store: &TruthStore,
    table_id: TableId,
    columns: &[ColumnModel],
    count: usize,
) -> i64 {
    let mut set = SparseChangeSet::new(table_id, column_ids(columns));
    for row in make_insert_rows(columns, count) {
        set.push_row(row);
    }
    let has_file_refs = !set.file_handle_ids(columns).is_empty();

    let range = store.reserve_ids(table_id, set.insert_count()).unwrap();
    set.assign_ids_and_versions(&range).unwrap();
    store
        .append_row_change(
            PrincipalId::new(1),
            table_id,
            range.etag.clone(),
            range.version_number,
            columns,
            &set,
            TransactionId::new(NEXT_TRANSACTION.fetch_add(1, Ordering::SeqCst)),
            Some(has_file_refs),
        )
        .unwrap();
    range.version_number
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowtruth_storage::InMemoryPayloadStore;
    use std::sync::Arc;

    #[test]
    fn rows_cover_every_column() {
        let columns = one_of_each_type();
        let rows = make_insert_rows(&columns, 3);
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.cells().len(), columns.len());
        }
    }

    #[test]
    fn append_helper_advances_versions() {
        let store = TruthStore::new(Arc::new(InMemoryPayloadStore::new()));
        let columns = one_of_each_type();
        let table = TableId::new(1);

        assert_eq!(append_insert_rows(&store, table, &columns, 2), 0);
        assert_eq!(append_insert_rows(&store, table, &columns, 2), 1);
    }
}
