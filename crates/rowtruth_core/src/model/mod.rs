//! Data model for the truth store.
//!
//! Everything here is plain data: change records and their tri-state
//! file-reference flag, allocation results, sparse change-set payloads, and
//! column/schema-change descriptions. Payload types serialize to CBOR for
//! the payload store.

mod change_set;
mod column;
mod record;

pub use change_set::{SparseChangeSet, SparseRow};
pub use column::{ColumnChange, ColumnModel, ColumnType, SchemaChangePayload};
pub use record::{ChangeIdRange, ChangeRecord, ChangeType, FileRefs, IdRange};
