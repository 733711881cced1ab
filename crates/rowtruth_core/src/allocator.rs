//! Per-table row-id and version allocation.

use crate::error::{CoreError, CoreResult};
use crate::model::IdRange;
use crate::types::{Etag, TableId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Mutable counters for one table.
///
/// Both counters start at `-1`: the first reservation produces version `0`
/// and (when rows are requested) row ids starting at `0`.
#[derive(Debug)]
struct TableCounters {
    /// Highest row id ever handed out, `-1` before the first row.
    max_row_id: i64,
    /// Version of the most recent reservation, `-1` before the first call.
    version: i64,
}

impl TableCounters {
    fn new() -> Self {
        Self {
            max_row_id: -1,
            version: -1,
        }
    }
}

/// Allocates monotonic row-id ranges and version numbers per table.
///
/// The allocator is the single point of serialization for a table's
/// mutation history: reservations for the same table run under an exclusive
/// per-table lock and are serviced strictly in arrival order, each seeing
/// the prior call's results. Reservations for different tables never
/// contend.
///
/// # Invariants
///
/// - `version_number` advances by exactly one per reservation, including
///   zero-count reservations
/// - Two reservations never hand out overlapping row-id ranges
/// - A fresh etag is minted on every call
#[derive(Debug, Default)]
pub struct IdAllocator {
    tables: RwLock<HashMap<TableId, Arc<Mutex<TableCounters>>>>,
}

impl IdAllocator {
    /// Creates a new allocator with no table state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn counters_for(&self, table_id: TableId) -> Arc<Mutex<TableCounters>> {
        if let Some(counters) = self.tables.read().get(&table_id) {
            return Arc::clone(counters);
        }
        let mut tables = self.tables.write();
        Arc::clone(
            tables
                .entry(table_id)
                .or_insert_with(|| Arc::new(Mutex::new(TableCounters::new()))),
        )
    }

    /// Reserves `count` row ids and the next version number for a table.
    ///
    /// A zero count still advances the version and mints a fresh etag -
    /// schema-only changes use this to obtain a version number without
    /// reserving row ids.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if `count` is negative.
    pub fn reserve(&self, table_id: TableId, count: i64) -> CoreResult<IdRange> {
        if count < 0 {
            return Err(CoreError::invalid_argument(
                "reservation count cannot be negative",
            ));
        }

        let counters = self.counters_for(table_id);
        let mut counters = counters.lock();

        counters.version += 1;
        let maximum_update_id = counters.max_row_id;

        let (minimum_row_id, maximum_row_id) = if count > 0 {
            let min = counters.max_row_id + 1;
            let max = min + count - 1;
            counters.max_row_id = max;
            (Some(min), Some(max))
        } else {
            (None, None)
        };

        let range = IdRange {
            minimum_row_id,
            maximum_row_id,
            version_number: counters.version,
            maximum_update_id,
            etag: Etag::mint(),
        };

        tracing::debug!(
            %table_id,
            count,
            version = range.version_number,
            "reserved id range"
        );

        Ok(range)
    }

    /// Returns the highest row id ever handed out for a table, or `-1` if
    /// the table has never reserved rows.
    #[must_use]
    pub fn max_row_id(&self, table_id: TableId) -> i64 {
        self.tables
            .read()
            .get(&table_id)
            .map(|counters| counters.lock().max_row_id)
            .unwrap_or(-1)
    }

    /// Drops all counter state for a table.
    ///
    /// Called during whole-table teardown; a later reservation starts the
    /// table over from version `0`.
    pub fn remove_table(&self, table_id: TableId) {
        self.tables.write().remove(&table_id);
    }

    /// Drops every table's counter state. Test support.
    pub fn reset(&self) {
        self.tables.write().clear();
    }
}
