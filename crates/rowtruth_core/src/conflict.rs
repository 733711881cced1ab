//! Optimistic-concurrency conflict detection.

use crate::error::{CoreError, CoreResult};
use crate::model::{ChangeType, SparseChangeSet};
use crate::truth::TruthStore;
use crate::types::TableId;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Validates a writer's change set against changes committed since the
/// writer last read.
///
/// No row locks are held between a writer's read and its append; correctness
/// comes from this after-the-fact scan instead. The scan cost is
/// proportional to the changes committed since the writer's baseline, not to
/// the table size, and pure inserts skip the log entirely.
///
/// Run the check *before* assigning reserved ids to the change set -
/// assignment overwrites the read-time row versions the baseline is derived
/// from.
pub struct ConflictDetector {
    store: Arc<TruthStore>,
}

impl ConflictDetector {
    /// Creates a detector over the given truth store.
    #[must_use]
    pub fn new(store: Arc<TruthStore>) -> Self {
        Self { store }
    }

    /// Checks a change set for conflicts with concurrently appended changes.
    ///
    /// Rows without a row id are pure inserts and cannot conflict. Every
    /// remaining row must carry the version it was read at. The baseline is
    /// the version resolved from the change set's base etag when present,
    /// otherwise the maximum read-time row version among the updated rows.
    /// Any change after the baseline that touches one of the updated rows is
    /// a conflict.
    ///
    /// # Errors
    ///
    /// - Invalid-argument if an update row's version is missing
    /// - Conflicting-update naming the offending rows; the caller must
    ///   re-read and resubmit
    /// - Not-found if the base etag is not in the table's history
    pub fn check_for_row_conflicts(
        &self,
        table_id: TableId,
        change_set: &SparseChangeSet,
    ) -> CoreResult<()> {
        let updated: BTreeSet<i64> = change_set.updated_row_ids().into_iter().collect();
        if updated.is_empty() {
            return Ok(());
        }

        if change_set
            .rows
            .iter()
            .any(|row| row.row_id().is_some() && row.row_version().is_none())
        {
            return Err(CoreError::invalid_argument(
                "row version number cannot be null",
            ));
        }

        let baseline = match &change_set.base_etag {
            Some(etag) => self.store.version_for_etag(table_id, etag)?,
            // Safe: updated is non-empty, so at least one row has a version.
            None => change_set.max_row_version().unwrap_or(-1),
        };

        for record in self.store.changes_after_version(table_id, baseline) {
            if record.change_type != ChangeType::Row {
                continue;
            }
            let committed = self.store.row_set_for_change(&record)?;
            let overlap: Vec<i64> = committed
                .updated_row_ids()
                .into_iter()
                .filter(|id| updated.contains(id))
                .collect();
            if !overlap.is_empty() {
                tracing::debug!(
                    %table_id,
                    baseline,
                    conflicting_version = record.version_number,
                    rows = ?overlap,
                    "detected conflicting update"
                );
                return Err(CoreError::conflicting_update(table_id, overlap));
            }
        }

        Ok(())
    }
}
