//! Edit sub-reducer: staged cell edits, row inserts and deletes, and column
//! and constraint mutations.

use std::time::Instant;

use tabula_domain::{ColumnValue, KeyValue};

use crate::action::Action;
use crate::edit_buffer::{EditStatus, PendingEdit};
use crate::effect::Effect;
use crate::state::AppState;

pub fn reduce_edits(state: &mut AppState, action: &Action, now: Instant) -> Option<Vec<Effect>> {
    match action {
        Action::StageCellEdit {
            row_index,
            column_key,
            value,
        } => {
            if let Err(message) = stage_edit(state, *row_index, column_key, value.clone()) {
                state.errors.push_at(message, now);
            }
            Some(vec![])
        }
        Action::UndoEdit(id) => {
            state.edits.undo(*id);
            Some(vec![])
        }
        Action::UndoEdits => {
            state.edits.clear();
            Some(vec![])
        }
        Action::CommitEdits => {
            let Some(table) = state.displayed_table() else {
                return Some(vec![]);
            };
            let table = table.to_string();
            let batch = state.edits.take_batch(&table);
            if batch.is_empty() {
                return Some(vec![]);
            }
            Some(vec![Effect::CommitCellEdits(batch)])
        }
        Action::EditsRejected { ids, error } => {
            state.edits.reject(ids, error);
            Some(vec![])
        }

        Action::InsertRow { table, values } => Some(vec![Effect::InsertRow {
            table: table.clone(),
            values: values.clone(),
        }]),
        Action::CloneRow { row_index } => match clone_values(state, *row_index) {
            Ok((table, values)) => Some(vec![Effect::InsertRow { table, values }]),
            Err(message) => {
                state.errors.push_at(message, now);
                Some(vec![])
            }
        },
        Action::RowInserted { table } => {
            if !state.is_displayed(table) {
                return Some(vec![]);
            }
            Some(
                state
                    .current_request()
                    .map(|request| vec![Effect::RefreshContent(request)])
                    .unwrap_or_default(),
            )
        }
        Action::DeleteRows { table, keys } => {
            if keys.is_empty() {
                return Some(vec![]);
            }
            Some(vec![Effect::DeleteRows {
                table: table.clone(),
                keys: keys.clone(),
            }])
        }
        Action::DeleteDisplayedRows(rows) => match displayed_keys(state, rows) {
            Ok((table, keys)) if !keys.is_empty() => Some(vec![Effect::DeleteRows { table, keys }]),
            Ok(_) => Some(vec![]),
            Err(message) => {
                state.errors.push_at(message, now);
                Some(vec![])
            }
        },

        Action::AddColumn {
            table,
            name,
            data_type,
        } => Some(vec![Effect::AddColumn {
            table: table.clone(),
            name: name.clone(),
            data_type: data_type.clone(),
        }]),
        Action::DropColumn { table, name } => Some(vec![Effect::DropColumn {
            table: table.clone(),
            name: name.clone(),
        }]),
        Action::AddConstraint { table, constraint } => Some(vec![Effect::AddConstraint {
            table: table.clone(),
            constraint: constraint.clone(),
        }]),
        Action::DropConstraint { table, name } => Some(vec![Effect::DropConstraint {
            table: table.clone(),
            name: name.clone(),
        }]),

        _ => None,
    }
}

fn stage_edit(
    state: &mut AppState,
    row_index: usize,
    column_key: &str,
    value: Option<String>,
) -> Result<(), String> {
    let Some(content) = state.content.as_ref() else {
        return Err("No table is loaded".to_string());
    };
    if content.primary_keys.is_empty() {
        return Err(format!(
            "Table {} has no primary key; rows cannot be edited",
            content.table_name
        ));
    }
    if content.is_primary_key(column_key) {
        return Err(format!("Primary key column {} is read-only", column_key));
    }
    let Some(original) = content.cell_value(row_index, column_key) else {
        return Err(format!("No cell at row {} column {}", row_index, column_key));
    };
    let Some(primary_key) = content.row_key(row_index) else {
        return Err(format!("Row {} has no primary key value", row_index));
    };

    let edit = PendingEdit {
        table_name: content.table_name.clone(),
        column_key: column_key.to_string(),
        row_index,
        primary_key,
        original_value: original.map(str::to_string),
        new_value: value,
        status: EditStatus::Pending,
        error: None,
    };
    state.edits.stage(edit);
    Ok(())
}

/// Every non-key column of a displayed row.
fn clone_values(state: &AppState, row_index: usize) -> Result<(String, Vec<ColumnValue>), String> {
    let Some(content) = state.content.as_ref() else {
        return Err("No table is loaded".to_string());
    };
    let Some(row) = content.rows.get(row_index) else {
        return Err(format!("No row {} to clone", row_index));
    };
    let values = content
        .columns
        .iter()
        .zip(row)
        .filter(|(column, _)| !content.is_primary_key(column))
        .map(|(column, value)| ColumnValue::new(column.clone(), value.clone()))
        .collect();
    Ok((content.table_name.clone(), values))
}

fn displayed_keys(
    state: &AppState,
    rows: &[usize],
) -> Result<(String, Vec<Vec<KeyValue>>), String> {
    let Some(content) = state.content.as_ref() else {
        return Err("No table is loaded".to_string());
    };
    if content.primary_keys.is_empty() {
        return Err(format!(
            "Table {} has no primary key; rows cannot be deleted",
            content.table_name
        ));
    }
    let keys = rows
        .iter()
        .map(|&row| {
            content
                .row_key(row)
                .ok_or_else(|| format!("Row {} has no primary key value", row))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((content.table_name.clone(), keys))
}
