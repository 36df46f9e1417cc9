use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EditId(pub u64);

impl fmt::Display for EditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One primary-key column and its value, identifying a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    pub column: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A value written to one column of a new row. `value: None` writes NULL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnValue {
    pub column: String,
    pub value: Option<String>,
}

impl ColumnValue {
    pub fn new(column: impl Into<String>, value: Option<String>) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// A single cell change sent to the database. `value: None` writes NULL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEdit {
    pub id: EditId,
    pub table_name: String,
    pub column_key: String,
    pub primary_key: Vec<KeyValue>,
    pub value: Option<String>,
}

/// Per-cell outcome of an update batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub id: EditId,
    pub table_name: String,
    pub column_key: String,
    pub primary_key: Vec<KeyValue>,
    /// Value as stored after the update.
    pub value: Option<String>,
    pub error: Option<String>,
}

impl UpdateResult {
    pub fn applied(edit: &CellEdit, value: Option<String>) -> Self {
        Self {
            id: edit.id,
            table_name: edit.table_name.clone(),
            column_key: edit.column_key.clone(),
            primary_key: edit.primary_key.clone(),
            value,
            error: None,
        }
    }

    pub fn rejected(edit: &CellEdit, error: impl Into<String>) -> Self {
        Self {
            id: edit.id,
            table_name: edit.table_name.clone(),
            column_key: edit.column_key.clone(),
            primary_key: edit.primary_key.clone(),
            value: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
