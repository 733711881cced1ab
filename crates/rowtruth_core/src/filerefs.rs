//! Lazy backfill of file-reference flags.

use crate::error::CoreResult;
use crate::model::{ChangeRecord, ColumnModel};
use crate::truth::TruthStore;
use crate::types::TableId;
use std::sync::Arc;

/// Resolves the current column schema for a table.
///
/// The backfill worker needs column types to decide whether a payload's
/// cells reference file objects; schemas are owned by the repository layer,
/// so the worker consumes them through this boundary.
pub trait ColumnModelProvider: Send + Sync {
    /// Returns the columns of the given table.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be resolved.
    fn columns_for(&self, table_id: TableId) -> CoreResult<Vec<ColumnModel>>;
}

/// Outcome of one backfill batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillOutcome {
    /// Records whose flag was resolved and written.
    pub resolved: usize,
    /// Records that failed and remain unknown for a later retry.
    pub failed: usize,
}

/// Maintenance worker that resolves `Unknown` file-reference flags.
///
/// Each run pages through records whose flag is still unknown, reads each
/// payload exactly once, decides the flag under the table's schema, and
/// writes the result back in batches. A failure on a single record is
/// logged and skipped - it stays unknown and only the failed subset is
/// retried on the next run.
pub struct FileRefBackfillWorker {
    store: Arc<TruthStore>,
    schemas: Arc<dyn ColumnModelProvider>,
    batch_size: u64,
}

impl FileRefBackfillWorker {
    /// Default number of records examined per batch.
    pub const DEFAULT_BATCH_SIZE: u64 = 100;

    /// Creates a worker over the given store and schema provider.
    #[must_use]
    pub fn new(store: Arc<TruthStore>, schemas: Arc<dyn ColumnModelProvider>) -> Self {
        Self {
            store,
            schemas,
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Processes one batch of unknown records starting at `offset`.
    pub fn run_batch(&self, offset: u64) -> BackfillOutcome {
        let page = self
            .store
            .changes_with_unknown_file_refs_page(self.batch_size, offset);

        let mut with_refs = Vec::new();
        let mut without_refs = Vec::new();
        let mut failed = 0usize;

        for record in &page {
            match self.resolve(record) {
                Ok(true) => with_refs.push(record.id),
                Ok(false) => without_refs.push(record.id),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        change_id = %record.id,
                        table_id = %record.table_id,
                        error = %e,
                        "failed to resolve file references; record stays unknown"
                    );
                }
            }
        }

        let mut resolved = 0;
        if !with_refs.is_empty() {
            resolved += self.store.backfill_file_refs(&with_refs, true);
        }
        if !without_refs.is_empty() {
            resolved += self.store.backfill_file_refs(&without_refs, false);
        }

        BackfillOutcome { resolved, failed }
    }

    /// Runs batches until no unknown records remain except failed ones.
    ///
    /// Resolved records leave the unknown set as they are written, so the
    /// offset only advances past records that failed this run.
    pub fn run(&self) -> BackfillOutcome {
        let mut total = BackfillOutcome::default();
        loop {
            let outcome = self.run_batch(total.failed as u64);
            if outcome.resolved == 0 && outcome.failed == 0 {
                break;
            }
            total.resolved += outcome.resolved;
            total.failed += outcome.failed;
        }
        tracing::info!(
            resolved = total.resolved,
            failed = total.failed,
            "file reference backfill run finished"
        );
        total
    }

    fn resolve(&self, record: &ChangeRecord) -> CoreResult<bool> {
        let change_set = self.store.row_set_for_change(record)?;
        let columns = self.schemas.columns_for(record.table_id)?;
        Ok(!change_set.file_handle_ids(&columns).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::model::{ColumnType, FileRefs, SparseChangeSet, SparseRow};
    use crate::types::{ColumnId, PrincipalId, TransactionId};
    use rowtruth_storage::InMemoryPayloadStore;
    use std::collections::BTreeMap;

    struct FixedSchemas {
        columns: Vec<ColumnModel>,
        fail_for: Option<TableId>,
    }

    impl ColumnModelProvider for FixedSchemas {
        fn columns_for(&self, table_id: TableId) -> CoreResult<Vec<ColumnModel>> {
            if self.fail_for == Some(table_id) {
                return Err(CoreError::invalid_argument("schema unavailable"));
            }
            Ok(self.columns.clone())
        }
    }

    fn schema() -> Vec<ColumnModel> {
        vec![
            ColumnModel::new(ColumnId::new(1), "name", ColumnType::String),
            ColumnModel::new(ColumnId::new(2), "attachment", ColumnType::FileHandle),
        ]
    }

    fn append_unknown(store: &TruthStore, table: TableId, file_ref: Option<&str>) {
        let mut cells: BTreeMap<ColumnId, Option<String>> =
            [(ColumnId::new(1), Some("row".to_string()))].into();
        if let Some(handle) = file_ref {
            cells.insert(ColumnId::new(2), Some(handle.to_string()));
        }
        let mut set = SparseChangeSet::new(table, vec![ColumnId::new(1), ColumnId::new(2)]);
        set.push_row(SparseRow::insert(cells));

        let range = store.reserve_ids(table, 1).unwrap();
        set.assign_ids_and_versions(&range).unwrap();
        store
            .append_row_change(
                PrincipalId::new(1),
                table,
                range.etag.clone(),
                range.version_number,
                &schema(),
                &set,
                TransactionId::new(1),
                None,
            )
            .unwrap();
    }

    #[test]
    fn backfill_resolves_unknown_flags() {
        let store = Arc::new(TruthStore::new(Arc::new(InMemoryPayloadStore::new())));
        let table = TableId::new(1);
        append_unknown(&store, table, Some("9001"));
        append_unknown(&store, table, None);

        let worker = FileRefBackfillWorker::new(
            Arc::clone(&store),
            Arc::new(FixedSchemas {
                columns: schema(),
                fail_for: None,
            }),
        );
        let outcome = worker.run();

        assert_eq!(outcome, BackfillOutcome { resolved: 2, failed: 0 });
        assert!(store.changes_with_unknown_file_refs_page(10, 0).is_empty());

        let v0 = store.change_for_version(table, 0).unwrap();
        let v1 = store.change_for_version(table, 1).unwrap();
        assert_eq!(v0.has_file_refs, FileRefs::Yes);
        assert_eq!(v1.has_file_refs, FileRefs::No);
    }

    #[test]
    fn failed_records_stay_unknown() {
        let store = Arc::new(TruthStore::new(Arc::new(InMemoryPayloadStore::new())));
        let good = TableId::new(1);
        let bad = TableId::new(2);
        append_unknown(&store, good, Some("9001"));
        append_unknown(&store, bad, Some("9002"));

        let worker = FileRefBackfillWorker::new(
            Arc::clone(&store),
            Arc::new(FixedSchemas {
                columns: schema(),
                fail_for: Some(bad),
            }),
        )
        .with_batch_size(1);
        let outcome = worker.run();

        assert_eq!(outcome.resolved, 1);
        assert_eq!(outcome.failed, 1);

        // The failed record is still pending for the next run.
        let pending = store.changes_with_unknown_file_refs_page(10, 0);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].table_id, bad);
    }

    #[test]
    fn backfill_is_idempotent_on_the_flag() {
        let store = Arc::new(TruthStore::new(Arc::new(InMemoryPayloadStore::new())));
        let table = TableId::new(1);
        append_unknown(&store, table, None);

        let record = store.change_for_version(table, 0).unwrap();
        store.backfill_file_refs(&[record.id], false);
        let first_etag = store.change_for_version(table, 0).unwrap().etag;

        store.backfill_file_refs(&[record.id], false);
        let after = store.change_for_version(table, 0).unwrap();

        // The flag is stable across repeated runs; the etag need not be.
        assert_eq!(after.has_file_refs, FileRefs::No);
        assert_ne!(after.etag, first_etag);
    }
}
