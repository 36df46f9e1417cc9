use std::collections::BTreeMap;

use tabula_domain::{CellEdit, EditId, KeyValue, UpdateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditStatus {
    #[default]
    Pending,
    /// Sent in a commit batch that has not answered yet.
    InFlight,
    Committed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub table_name: String,
    pub column_key: String,
    pub row_index: usize,
    pub primary_key: Vec<KeyValue>,
    pub original_value: Option<String>,
    pub new_value: Option<String>,
    pub status: EditStatus,
    pub error: Option<String>,
}

impl PendingEdit {
    fn targets(&self, other: &Self) -> bool {
        self.table_name == other.table_name
            && self.column_key == other.column_key
            && self.primary_key == other.primary_key
    }

    fn is_unsent(&self) -> bool {
        matches!(self.status, EditStatus::Pending | EditStatus::Failed)
    }

    fn to_cell_edit(&self, id: EditId) -> CellEdit {
        CellEdit {
            id,
            table_name: self.table_name.clone(),
            column_key: self.column_key.clone(),
            primary_key: self.primary_key.clone(),
            value: self.new_value.clone(),
        }
    }
}

/// Staged cell edits keyed by id, in staging order.
#[derive(Debug, Clone, Default)]
pub struct EditBuffer {
    entries: BTreeMap<EditId, PendingEdit>,
    next_id: u64,
}

impl EditBuffer {
    /// Stages `edit`, replacing an earlier edit of the same cell. Staging the
    /// original value back drops the entry. Returns the id of the live entry.
    pub fn stage(&mut self, edit: PendingEdit) -> Option<EditId> {
        let existing = self
            .entries
            .iter()
            .find(|(_, e)| e.targets(&edit))
            .map(|(id, _)| *id);
        let reverts = edit.new_value == edit.original_value;

        match existing {
            Some(id) if reverts => {
                self.entries.remove(&id);
                None
            }
            Some(id) => {
                if let Some(entry) = self.entries.get_mut(&id) {
                    entry.new_value = edit.new_value;
                    entry.status = EditStatus::Pending;
                    entry.error = None;
                }
                Some(id)
            }
            None if reverts => None,
            None => {
                self.next_id += 1;
                let id = EditId(self.next_id);
                self.entries.insert(id, edit);
                Some(id)
            }
        }
    }

    pub fn undo(&mut self, id: EditId) -> Option<PendingEdit> {
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn clear_table(&mut self, table: &str) {
        self.entries.retain(|_, e| e.table_name != table);
    }

    /// Drops edits of rows that no longer exist.
    pub fn clear_rows(&mut self, table: &str, keys: &[Vec<KeyValue>]) {
        self.entries
            .retain(|_, e| e.table_name != table || !keys.contains(&e.primary_key));
    }

    /// Points each edit of `table` at the row its key now sits on.
    pub fn reindex<F>(&mut self, table: &str, locate: F)
    where
        F: Fn(&[KeyValue]) -> Option<usize>,
    {
        for entry in self.entries.values_mut() {
            if entry.table_name == table
                && let Some(row) = locate(&entry.primary_key)
            {
                entry.row_index = row;
            }
        }
    }

    pub fn rename_table(&mut self, from: &str, to: &str) {
        for entry in self.entries.values_mut() {
            if entry.table_name == from {
                entry.table_name = to.to_string();
            }
        }
    }

    pub fn clear_committed(&mut self) {
        self.entries.retain(|_, e| e.status != EditStatus::Committed);
    }

    pub fn get(&self, id: EditId) -> Option<&PendingEdit> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EditId, &PendingEdit)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Edits of `table` that still need to reach the database.
    pub fn batch_for(&self, table: &str) -> Vec<CellEdit> {
        self.entries
            .iter()
            .filter(|(_, e)| e.table_name == table && e.is_unsent())
            .map(|(id, e)| e.to_cell_edit(*id))
            .collect()
    }

    /// Like [`batch_for`](Self::batch_for), but marks the batch in flight so a
    /// second commit does not send it again.
    pub fn take_batch(&mut self, table: &str) -> Vec<CellEdit> {
        let mut batch = Vec::new();
        for (id, entry) in &mut self.entries {
            if entry.table_name == table && entry.is_unsent() {
                entry.status = EditStatus::InFlight;
                entry.error = None;
                batch.push(entry.to_cell_edit(*id));
            }
        }
        batch
    }

    /// Merges update results. Successful results for the displayed table are
    /// dropped from the buffer (the content now carries them); for any other
    /// table they stay as committed until the next content replacement.
    ///
    /// Only entries still in flight are touched. An entry staged again while
    /// its commit was running keeps its newer value and stays pending, now
    /// measured against the value the database stored.
    pub fn apply_results(&mut self, results: &[UpdateResult], displayed: Option<&str>) {
        for result in results {
            let Some(entry) = self.entries.get_mut(&result.id) else {
                continue;
            };
            if entry.status != EditStatus::InFlight {
                if !result.is_error() {
                    entry.original_value.clone_from(&result.value);
                    if entry.new_value == entry.original_value {
                        self.entries.remove(&result.id);
                    }
                }
                continue;
            }
            if result.is_error() {
                entry.status = EditStatus::Failed;
                entry.error.clone_from(&result.error);
            } else if displayed == Some(result.table_name.as_str()) {
                self.entries.remove(&result.id);
            } else {
                entry.status = EditStatus::Committed;
                entry.error = None;
            }
        }
    }

    /// The whole batch was refused before any cell was written.
    pub fn reject(&mut self, ids: &[EditId], error: &str) {
        for id in ids {
            if let Some(entry) = self.entries.get_mut(id)
                && entry.status == EditStatus::InFlight
            {
                entry.status = EditStatus::Failed;
                entry.error = Some(error.to_string());
            }
        }
    }
}
