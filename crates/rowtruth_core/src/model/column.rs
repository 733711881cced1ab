//! Column models and schema changes.

use crate::types::ColumnId;
use serde::{Deserialize, Serialize};

/// The value type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// UTF-8 text.
    String,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Double,
    /// Boolean.
    Boolean,
    /// Milliseconds since the Unix epoch.
    Date,
    /// Reference to an externally stored file object.
    FileHandle,
}

impl ColumnType {
    /// Returns true if cells of this type reference external file objects.
    #[must_use]
    pub fn is_file_reference(self) -> bool {
        matches!(self, ColumnType::FileHandle)
    }
}

/// Definition of a single table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnModel {
    /// Stable column id.
    pub id: ColumnId,
    /// Display name.
    pub name: String,
    /// Value type.
    pub column_type: ColumnType,
}

impl ColumnModel {
    /// Creates a new column model.
    pub fn new(id: ColumnId, name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id,
            name: name.into(),
            column_type,
        }
    }
}

/// One schema operation: add, delete, or replace a column.
///
/// - add: `old_column_id` absent, `new_column_id` set
/// - delete: `old_column_id` set, `new_column_id` absent
/// - replace: both set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChange {
    /// The column being removed or replaced, if any.
    pub old_column_id: Option<ColumnId>,
    /// The column being added or substituted, if any.
    pub new_column_id: Option<ColumnId>,
}

impl ColumnChange {
    /// Creates an add operation.
    #[must_use]
    pub const fn add(new_column_id: ColumnId) -> Self {
        Self {
            old_column_id: None,
            new_column_id: Some(new_column_id),
        }
    }

    /// Creates a delete operation.
    #[must_use]
    pub const fn delete(old_column_id: ColumnId) -> Self {
        Self {
            old_column_id: Some(old_column_id),
            new_column_id: None,
        }
    }

    /// Creates a replace operation.
    #[must_use]
    pub const fn replace(old_column_id: ColumnId, new_column_id: ColumnId) -> Self {
        Self {
            old_column_id: Some(old_column_id),
            new_column_id: Some(new_column_id),
        }
    }
}

/// The persisted form of one schema change.
///
/// Carries the ordered operations plus the resulting full column-id list, so
/// a reader can reconstruct the post-change schema without replaying history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChangePayload {
    /// The full ordered column-id list after the change.
    pub current: Vec<ColumnId>,
    /// The ordered operations that produced it.
    pub changes: Vec<ColumnChange>,
}

impl SchemaChangePayload {
    /// Creates a new schema change payload.
    #[must_use]
    pub fn new(current: Vec<ColumnId>, changes: Vec<ColumnChange>) -> Self {
        Self { current, changes }
    }
}
