use serde::{Deserialize, Serialize};

use super::column::ColumnDescriptor;
use super::constraint::{ConstraintDescriptor, ConstraintKind};
use super::edit::{KeyValue, UpdateResult};
use super::fetch_request::{Filter, SortOrder};

/// One row of cells in column order. `None` is SQL NULL, which stays distinct
/// from an empty string.
pub type Row = Vec<Option<String>>;

/// A page of rows as returned by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPage {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub total_count: u64,
}

/// Everything displayed for the selected table. Replaced wholesale after each
/// completed fetch; only [`ContentPatch`]es touch it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContent {
    pub table_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub total_count: u64,
    pub structure: Vec<ColumnDescriptor>,
    /// Ordered; the first one drives the synthetic sort.
    pub primary_keys: Vec<String>,
    pub constraints: Vec<ConstraintDescriptor>,
    pub filters: Vec<Filter>,
    pub show_filter: bool,
    pub order: Vec<SortOrder>,
    /// 1-based
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPatch {
    Cells(Vec<UpdateResult>),
    ColumnAdded(ColumnDescriptor),
    ColumnDropped { name: String },
    ConstraintAdded(ConstraintDescriptor),
    ConstraintDropped { name: String },
    /// Rows deleted by primary key.
    RowsDeleted(Vec<Vec<KeyValue>>),
}

impl TableContent {
    pub fn total_pages(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 1;
        }
        let pages = (self.total_count as usize).div_ceil(page_size);
        pages.max(1)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Text of a non-NULL cell.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        self.cell_value(row, column).flatten()
    }

    /// `Some(None)` for a NULL cell, `None` when the cell does not exist.
    pub fn cell_value(&self, row: usize, column: &str) -> Option<Option<&str>> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col).map(Option::as_deref)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_keys.iter().any(|pk| pk == column)
    }

    /// Primary-key values of a displayed row, or `None` when the table has no
    /// primary key or a key column is not part of the page.
    pub fn row_key(&self, row: usize) -> Option<Vec<KeyValue>> {
        if self.primary_keys.is_empty() {
            return None;
        }
        self.primary_keys
            .iter()
            .map(|pk| self.cell(row, pk).map(|v| KeyValue::new(pk.clone(), v)))
            .collect()
    }

    pub fn row_index_by_key(&self, key: &[KeyValue]) -> Option<usize> {
        if key.is_empty() {
            return None;
        }
        (0..self.rows.len()).find(|&row| {
            key.iter()
                .all(|kv| self.cell(row, &kv.column) == Some(kv.value.as_str()))
        })
    }

    /// Applies a targeted change. Returns how many cells or entries changed.
    pub fn apply_patch(&mut self, patch: &ContentPatch) -> usize {
        match patch {
            ContentPatch::Cells(results) => self.apply_cells(results),
            ContentPatch::ColumnAdded(column) => {
                if self.column_index(&column.name).is_some() {
                    return 0;
                }
                self.columns.push(column.name.clone());
                for row in &mut self.rows {
                    row.push(None);
                }
                self.structure.push(column.clone());
                1
            }
            ContentPatch::ColumnDropped { name } => {
                let Some(index) = self.column_index(name) else {
                    return 0;
                };
                self.columns.remove(index);
                for row in &mut self.rows {
                    if index < row.len() {
                        row.remove(index);
                    }
                }
                self.structure.retain(|c| &c.name != name);
                self.primary_keys.retain(|pk| pk != name);
                self.constraints.retain(|c| &c.column_name != name);
                self.order.retain(|o| &o.column != name);
                self.filters.retain(|f| &f.column != name);
                1
            }
            ContentPatch::ConstraintAdded(constraint) => {
                if let Some(column) = self
                    .structure
                    .iter_mut()
                    .find(|c| c.name == constraint.column_name)
                {
                    match constraint.kind {
                        ConstraintKind::NotNull => column.nullable = false,
                        ConstraintKind::PrimaryKey => {
                            column.is_primary_key = true;
                            column.nullable = false;
                        }
                        _ => {}
                    }
                }
                if constraint.kind == ConstraintKind::PrimaryKey
                    && !self.is_primary_key(&constraint.column_name)
                {
                    self.primary_keys.push(constraint.column_name.clone());
                }
                self.constraints.push(constraint.clone());
                1
            }
            ContentPatch::ConstraintDropped { name } => {
                let Some(index) = self.constraints.iter().position(|c| &c.name == name) else {
                    return 0;
                };
                let removed = self.constraints.remove(index);
                if let Some(column) = self
                    .structure
                    .iter_mut()
                    .find(|c| c.name == removed.column_name)
                {
                    match removed.kind {
                        ConstraintKind::NotNull => column.nullable = true,
                        ConstraintKind::PrimaryKey => column.is_primary_key = false,
                        _ => {}
                    }
                }
                if removed.kind == ConstraintKind::PrimaryKey {
                    self.primary_keys.retain(|pk| pk != &removed.column_name);
                }
                1
            }
            ContentPatch::RowsDeleted(keys) => self.remove_rows(keys),
        }
    }

    fn remove_rows(&mut self, keys: &[Vec<KeyValue>]) -> usize {
        let mut doomed: Vec<usize> = keys
            .iter()
            .filter_map(|key| self.row_index_by_key(key))
            .collect();
        doomed.sort_unstable();
        doomed.dedup();
        for &index in doomed.iter().rev() {
            self.rows.remove(index);
        }
        self.total_count = self.total_count.saturating_sub(doomed.len() as u64);
        doomed.len()
    }

    fn apply_cells(&mut self, results: &[UpdateResult]) -> usize {
        let mut applied = 0;
        for result in results {
            if result.is_error() || result.table_name != self.table_name {
                continue;
            }
            let Some(col) = self.column_index(&result.column_key) else {
                continue;
            };
            let Some(row) = self.row_index_by_key(&result.primary_key) else {
                continue;
            };
            if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
                cell.clone_from(&result.value);
                applied += 1;
            }
        }
        applied
    }
}

/// Read-only peek at a table referenced by a foreign key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignTableView {
    pub table_name: String,
    pub first_column: String,
    pub structure: Vec<ColumnDescriptor>,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub total_count: u64,
}
