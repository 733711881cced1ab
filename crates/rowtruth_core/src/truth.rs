//! The truth store: an append-only log of table changes.

use crate::allocator::IdAllocator;
use crate::error::{CoreError, CoreResult};
use crate::model::{
    ChangeIdRange, ChangeRecord, ChangeType, ColumnChange, ColumnModel, FileRefs, IdRange,
    SchemaChangePayload, SparseChangeSet,
};
use crate::types::{ChangeId, ColumnId, Etag, PrincipalId, TableId, TransactionId};
use parking_lot::RwLock;
use rowtruth_storage::{PayloadLocation, PayloadStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// The authoritative record of every change applied to every table.
///
/// Appends write the serialized payload to the payload store first and
/// insert the metadata record second, so a storage failure surfaces before
/// any record exists - there are no partial change records. Once written, a
/// record is immutable except for the file-reference backfill, which also
/// regenerates the record's etag.
///
/// # Ordering
///
/// Per table, version numbers across both change types form a strictly
/// increasing sequence with no repeats. Across tables, only global change
/// ids are comparable, and only for backfill pagination.
pub struct TruthStore {
    allocator: Arc<IdAllocator>,
    payloads: Arc<dyn PayloadStore>,
    state: RwLock<LogState>,
}

#[derive(Debug, Default)]
struct LogState {
    next_change_id: u64,
    records: BTreeMap<ChangeId, ChangeRecord>,
}

impl TruthStore {
    /// Creates a truth store over the given payload store.
    #[must_use]
    pub fn new(payloads: Arc<dyn PayloadStore>) -> Self {
        Self {
            allocator: Arc::new(IdAllocator::new()),
            payloads,
            state: RwLock::new(LogState::default()),
        }
    }

    /// Returns the allocator serializing this store's reservations.
    #[must_use]
    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    /// Reserves row ids and a version number for a table.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if `count` is negative.
    pub fn reserve_ids(&self, table_id: TableId, count: i64) -> CoreResult<IdRange> {
        self.allocator.reserve(table_id, count)
    }

    /// Returns the highest row id in a table, or `-1` if it has none.
    #[must_use]
    pub fn max_row_id(&self, table_id: TableId) -> i64 {
        self.allocator.max_row_id(table_id)
    }

    /// Appends a sparse change set under a previously reserved version.
    ///
    /// `etag` and `version_number` come from the reservation the writer
    /// obtained for this change. `has_file_refs` may be `None` to record
    /// "unknown", leaving resolution to the backfill worker.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the change set targets a
    /// different table, references columns outside `columns`, or the version
    /// was already appended; a storage error if the payload write fails (no
    /// record is inserted in that case).
    #[allow(clippy::too_many_arguments)]
    pub fn append_row_change(
        &self,
        created_by: PrincipalId,
        table_id: TableId,
        etag: Etag,
        version_number: i64,
        columns: &[ColumnModel],
        change_set: &SparseChangeSet,
        transaction_id: TransactionId,
        has_file_refs: Option<bool>,
    ) -> CoreResult<PayloadLocation> {
        if change_set.table_id != table_id {
            return Err(CoreError::invalid_argument(format!(
                "change set targets {} but was appended to {table_id}",
                change_set.table_id
            )));
        }
        let known: Vec<ColumnId> = columns.iter().map(|c| c.id).collect();
        if let Some(unknown) = change_set.column_ids.iter().find(|id| !known.contains(*id)) {
            return Err(CoreError::invalid_argument(format!(
                "change set references {unknown} which is not in the supplied schema"
            )));
        }

        let bytes = encode_payload(change_set)?;
        let location = self.payloads.write(table_id.as_u64(), &bytes)?;

        self.insert_record(
            table_id,
            ChangeType::Row,
            version_number,
            etag,
            transaction_id,
            Some(change_set.row_count()),
            location.clone(),
            FileRefs::from_option(has_file_refs),
            created_by,
        )?;

        tracing::debug!(
            %table_id,
            version = version_number,
            rows = change_set.row_count(),
            "appended row change"
        );

        Ok(location)
    }

    /// Appends a schema change, allocating its version internally with a
    /// zero-count reservation.
    ///
    /// Returns the version number the change was appended under.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the payload write fails; no record is
    /// inserted in that case.
    pub fn append_schema_change(
        &self,
        created_by: PrincipalId,
        table_id: TableId,
        current: Vec<ColumnId>,
        changes: Vec<ColumnChange>,
        transaction_id: TransactionId,
    ) -> CoreResult<i64> {
        let range = self.allocator.reserve(table_id, 0)?;

        let payload = SchemaChangePayload::new(current, changes);
        let bytes = encode_payload(&payload)?;
        let location = self.payloads.write(table_id.as_u64(), &bytes)?;

        self.insert_record(
            table_id,
            ChangeType::Column,
            range.version_number,
            range.etag,
            transaction_id,
            None,
            location,
            FileRefs::No,
            created_by,
        )?;

        tracing::debug!(
            %table_id,
            version = range.version_number,
            "appended schema change"
        );

        Ok(range.version_number)
    }

    /// Reads back the schema change appended at the given version.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no change exists at that version, or an
    /// invalid-argument error if the change there is a row change.
    pub fn schema_change_for_version(
        &self,
        table_id: TableId,
        version: i64,
    ) -> CoreResult<Vec<ColumnChange>> {
        let record = self.change_for_version(table_id, version)?;
        if record.change_type != ChangeType::Column {
            return Err(CoreError::invalid_argument(format!(
                "change at version {version} of {table_id} is not a schema change"
            )));
        }
        let bytes = self.payloads.read(&record.payload_location)?;
        let payload: SchemaChangePayload = decode_payload(&bytes)?;
        Ok(payload.changes)
    }

    /// Reads back the sparse change set appended at the given version.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no change exists at that version, or an
    /// invalid-argument error if the change there is a schema change.
    pub fn row_set(&self, table_id: TableId, version: i64) -> CoreResult<SparseChangeSet> {
        let record = self.change_for_version(table_id, version)?;
        self.row_set_for_change(&record)
    }

    /// Reads back the sparse change set for a row change record.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error for schema change records, or a
    /// storage/codec error if the payload cannot be read back.
    pub fn row_set_for_change(&self, record: &ChangeRecord) -> CoreResult<SparseChangeSet> {
        if record.change_type != ChangeType::Row {
            return Err(CoreError::invalid_argument(format!(
                "change at version {} of {} is not a row change",
                record.version_number, record.table_id
            )));
        }
        let bytes = self.payloads.read(&record.payload_location)?;
        decode_payload(&bytes)
    }

    /// Returns the latest change for a table by version number, if any.
    #[must_use]
    pub fn latest_change(&self, table_id: TableId) -> Option<ChangeRecord> {
        let state = self.state.read();
        state
            .records
            .values()
            .filter(|r| r.table_id == table_id)
            .max_by_key(|r| r.version_number)
            .cloned()
    }

    /// Returns the latest change of the given type for a table, if any.
    #[must_use]
    pub fn latest_change_of_type(
        &self,
        table_id: TableId,
        change_type: ChangeType,
    ) -> Option<ChangeRecord> {
        let state = self.state.read();
        state
            .records
            .values()
            .filter(|r| r.table_id == table_id && r.change_type == change_type)
            .max_by_key(|r| r.version_number)
            .cloned()
    }

    /// Returns all changes with a version strictly greater than `version`,
    /// ascending by version.
    #[must_use]
    pub fn changes_after_version(&self, table_id: TableId, version: i64) -> Vec<ChangeRecord> {
        self.table_history(table_id)
            .into_iter()
            .filter(|r| r.version_number > version)
            .collect()
    }

    /// Lists a table's full change history, ascending by version.
    ///
    /// The result is a snapshot at call time with no isolation guarantee
    /// relative to concurrent appends.
    #[deprecated(note = "use change_page to bound the result")]
    #[must_use]
    pub fn list_all_changes(&self, table_id: TableId) -> Vec<ChangeRecord> {
        self.table_history(table_id)
    }

    /// Returns one page of a table's changes, ascending by version.
    #[must_use]
    pub fn change_page(&self, table_id: TableId, limit: u64, offset: u64) -> Vec<ChangeRecord> {
        self.table_history(table_id)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect()
    }

    /// Returns the change appended at the given table and version.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no such change exists.
    pub fn change_for_version(&self, table_id: TableId, version: i64) -> CoreResult<ChangeRecord> {
        let state = self.state.read();
        state
            .records
            .values()
            .find(|r| r.table_id == table_id && r.version_number == version)
            .cloned()
            .ok_or_else(|| CoreError::change_not_found(table_id, version))
    }

    /// Returns the version of the most recent change for a table, if any.
    #[must_use]
    pub fn last_change_version(&self, table_id: TableId) -> Option<i64> {
        self.latest_change(table_id).map(|r| r.version_number)
    }

    /// Returns the transaction token of the most recent change, if any.
    #[must_use]
    pub fn last_transaction_id(&self, table_id: TableId) -> Option<TransactionId> {
        self.latest_change(table_id).map(|r| r.transaction_id)
    }

    /// Returns true if the table has at least one change of the given type.
    #[must_use]
    pub fn has_change_of_type(&self, table_id: TableId, change_type: ChangeType) -> bool {
        let state = self.state.read();
        state
            .records
            .values()
            .any(|r| r.table_id == table_id && r.change_type == change_type)
    }

    /// Returns true if any change in the table's history carries the etag.
    #[must_use]
    pub fn etag_in_history(&self, table_id: TableId, etag: &Etag) -> bool {
        let state = self.state.read();
        state
            .records
            .values()
            .any(|r| r.table_id == table_id && &r.etag == etag)
    }

    /// Resolves an etag to the version it was appended under.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no change in the table's history carries
    /// the etag.
    pub fn version_for_etag(&self, table_id: TableId, etag: &Etag) -> CoreResult<i64> {
        let state = self.state.read();
        state
            .records
            .values()
            .find(|r| r.table_id == table_id && &r.etag == etag)
            .map(|r| r.version_number)
            .ok_or_else(|| CoreError::etag_not_found(table_id, etag.as_str()))
    }

    /// Returns a snapshot of every record's global change id and current
    /// etag, ascending by change id.
    ///
    /// This is the record set replica synchronization checksums against:
    /// the etag changes on every record mutation, so drift is always
    /// visible to a checksum over it.
    #[must_use]
    pub fn change_etags_snapshot(&self) -> Vec<(ChangeId, Etag)> {
        let state = self.state.read();
        state
            .records
            .values()
            .map(|r| (r.id, r.etag.clone()))
            .collect()
    }

    /// Returns the inclusive range of global change ids currently stored,
    /// or the `(-1, -1)` sentinel when the store is empty.
    #[must_use]
    pub fn global_change_id_range(&self) -> ChangeIdRange {
        let state = self.state.read();
        match (
            state.records.keys().next(),
            state.records.keys().next_back(),
        ) {
            (Some(min), Some(max)) => {
                ChangeIdRange::new(min.as_u64() as i64, max.as_u64() as i64)
            }
            _ => ChangeIdRange::EMPTY,
        }
    }

    /// Returns one page of row changes whose payloads reference file objects
    /// (or whose flag is still unknown), restricted to the given global
    /// change-id range.
    ///
    /// The range restriction lets sharded backfill workers partition the log
    /// without double-processing.
    #[must_use]
    pub fn changes_with_file_refs_page(
        &self,
        id_range: ChangeIdRange,
        limit: u64,
        offset: u64,
    ) -> Vec<ChangeRecord> {
        let state = self.state.read();
        state
            .records
            .values()
            .filter(|r| {
                r.change_type == ChangeType::Row
                    && r.has_file_refs != FileRefs::No
                    && id_range.contains(r.id)
            })
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }

    /// Returns one page of row changes whose file-reference flag has not
    /// been computed yet, across all tables, ascending by global change id.
    #[must_use]
    pub fn changes_with_unknown_file_refs_page(
        &self,
        limit: u64,
        offset: u64,
    ) -> Vec<ChangeRecord> {
        let state = self.state.read();
        state
            .records
            .values()
            .filter(|r| r.change_type == ChangeType::Row && r.has_file_refs.is_unknown())
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }

    /// Sets the file-reference flag for a batch of records.
    ///
    /// Because this mutates otherwise-immutable records, each touched
    /// record's etag is regenerated - readers holding the old etag correctly
    /// perceive the record as changed. Ids with no matching record are
    /// skipped. Returns the number of records updated.
    pub fn backfill_file_refs(&self, ids: &[ChangeId], value: bool) -> usize {
        let mut state = self.state.write();
        let mut updated = 0;
        for id in ids {
            if let Some(record) = state.records.get_mut(id) {
                record.has_file_refs = FileRefs::from_option(Some(value));
                record.etag = Etag::mint();
                updated += 1;
            }
        }
        tracing::info!(requested = ids.len(), updated, value, "backfilled file refs");
        updated
    }

    /// Deletes the single change at the given table and version.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if no such change exists.
    pub fn delete_change(&self, table_id: TableId, version: i64) -> CoreResult<()> {
        let mut state = self.state.write();
        let id = state
            .records
            .values()
            .find(|r| r.table_id == table_id && r.version_number == version)
            .map(|r| r.id)
            .ok_or_else(|| CoreError::change_not_found(table_id, version))?;
        state.records.remove(&id);
        Ok(())
    }

    /// Irreversibly deletes every change, payload, and counter for a table.
    ///
    /// Callers must only invoke this after the owning entity itself has been
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the payload teardown fails.
    pub fn delete_all_for_table(&self, table_id: TableId) -> CoreResult<()> {
        {
            let mut state = self.state.write();
            state.records.retain(|_, r| r.table_id != table_id);
        }
        self.allocator.remove_table(table_id);
        self.payloads.delete_table(table_id.as_u64())?;
        tracing::info!(%table_id, "deleted all change data for table");
        Ok(())
    }

    /// Deletes every change for every table. Never call this in production.
    ///
    /// # Errors
    ///
    /// Returns a storage error if any table's payload teardown fails.
    pub fn truncate_all(&self) -> CoreResult<()> {
        let table_ids: Vec<TableId> = {
            let mut state = self.state.write();
            let ids = state
                .records
                .values()
                .map(|r| r.table_id)
                .collect::<std::collections::BTreeSet<_>>();
            state.records.clear();
            state.next_change_id = 0;
            ids.into_iter().collect()
        };
        self.allocator.reset();
        for table_id in table_ids {
            self.payloads.delete_table(table_id.as_u64())?;
        }
        Ok(())
    }

    fn table_history(&self, table_id: TableId) -> Vec<ChangeRecord> {
        let state = self.state.read();
        let mut history: Vec<ChangeRecord> = state
            .records
            .values()
            .filter(|r| r.table_id == table_id)
            .cloned()
            .collect();
        history.sort_by_key(|r| r.version_number);
        history
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_record(
        &self,
        table_id: TableId,
        change_type: ChangeType,
        version_number: i64,
        etag: Etag,
        transaction_id: TransactionId,
        row_count: Option<i64>,
        payload_location: PayloadLocation,
        has_file_refs: FileRefs,
        created_by: PrincipalId,
    ) -> CoreResult<()> {
        let mut state = self.state.write();

        if state
            .records
            .values()
            .any(|r| r.table_id == table_id && r.version_number == version_number)
        {
            return Err(CoreError::invalid_argument(format!(
                "version {version_number} was already appended to {table_id}"
            )));
        }

        let id = ChangeId::new(state.next_change_id);
        state.next_change_id += 1;

        state.records.insert(
            id,
            ChangeRecord {
                id,
                table_id,
                change_type,
                version_number,
                etag,
                transaction_id,
                row_count,
                payload_location,
                has_file_refs,
                created_by,
                created_on: now_millis(),
            },
        );
        Ok(())
    }
}

impl std::fmt::Debug for TruthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TruthStore")
            .field("records", &self.state.read().records.len())
            .finish_non_exhaustive()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn encode_payload<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| CoreError::payload_codec(e.to_string()))?;
    Ok(bytes)
}

fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> CoreResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CoreError::payload_codec(e.to_string()))
}
