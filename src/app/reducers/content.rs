//! Content sub-reducer: table selection, fetch lifecycle, content results.

use std::time::Instant;

use tabula_domain::{ContentPatch, FetchRequest};

use crate::action::{Action, FilterUpdate};
use crate::effect::Effect;
use crate::state::AppState;

pub fn reduce_content(state: &mut AppState, action: &Action, _now: Instant) -> Option<Vec<Effect>> {
    match action {
        Action::SelectTable(name) => {
            state.selected_table = Some(name.clone());
            state.filter_draft.clear();
            state.foreign_table = None;
            Some(vec![Effect::LoadTable(
                FetchRequest::new(name.clone()).with_filters(Vec::new(), false),
            )])
        }
        Action::OpenTable(request) => {
            let mut request = request.clone();
            let displayed = state
                .content
                .as_ref()
                .is_some_and(|c| c.table_name == request.table_name);
            if displayed {
                request.page = request.page.clamp(1, state.total_pages());
            }
            state.selected_table = Some(request.table_name.clone());
            if let Some(filters) = &request.filters {
                state.filter_draft.clone_from(filters);
            }
            state.foreign_table = None;
            Some(vec![Effect::LoadTable(request)])
        }
        Action::ReloadCurrentTable => Some(
            state
                .current_request()
                .map(|request| vec![Effect::RefreshContent(request)])
                .unwrap_or_default(),
        ),
        Action::LoadStructure => Some(
            state
                .content
                .as_ref()
                .map(|content| {
                    vec![Effect::LoadConstraints {
                        table: content.table_name.clone(),
                        structure: content.structure.clone(),
                    }]
                })
                .unwrap_or_default(),
        ),

        Action::FetchStarted { table } => {
            state.fetching_table = Some(table.clone());
            state.is_fetching = true;
            Some(vec![])
        }
        Action::FetchStopped => {
            state.is_fetching = false;
            Some(vec![])
        }

        Action::ContentReplaced { content, filters } => {
            let mut next = (**content).clone();
            match filters {
                FilterUpdate::Replace {
                    filters,
                    show_filter,
                } => {
                    next.filters.clone_from(filters);
                    next.show_filter = *show_filter;
                    state.filter_draft.clone_from(filters);
                }
                FilterUpdate::ReplaceIfShown(filters) => {
                    if next.show_filter {
                        next.filters.clone_from(filters);
                        state.filter_draft.clone_from(filters);
                    }
                }
                FilterUpdate::Keep => {
                    if let Some(previous) = &state.content {
                        next.filters.clone_from(&previous.filters);
                        next.show_filter = previous.show_filter;
                    }
                }
            }
            state.content = Some(next);
            state.edits.clear_committed();
            Some(vec![])
        }
        Action::RowsReplaced {
            table_name,
            page,
            order,
            page_no,
            filters,
        } => {
            let Some(content) = state
                .content
                .as_mut()
                .filter(|c| &c.table_name == table_name)
            else {
                return Some(vec![]);
            };
            content.columns.clone_from(&page.columns);
            content.rows.clone_from(&page.rows);
            content.total_count = page.total_count;
            content.order.clone_from(order);
            content.page = *page_no;
            match filters {
                FilterUpdate::Replace {
                    filters,
                    show_filter,
                } => {
                    content.filters.clone_from(filters);
                    content.show_filter = *show_filter;
                    state.filter_draft.clone_from(filters);
                }
                FilterUpdate::ReplaceIfShown(filters) => {
                    if content.show_filter {
                        content.filters.clone_from(filters);
                        state.filter_draft.clone_from(filters);
                    }
                }
                FilterUpdate::Keep => {}
            }
            state.edits.clear_committed();
            Some(vec![])
        }
        Action::ConstraintsLoaded { table, constraints } => {
            if let Some(content) = state.content.as_mut()
                && &content.table_name == table
            {
                content.constraints.clone_from(constraints);
            }
            Some(vec![])
        }
        Action::ContentPatched { table, patch } => {
            match patch {
                ContentPatch::Cells(results) => {
                    let displayed = state.displayed_table().map(str::to_string);
                    state.edits.apply_results(results, displayed.as_deref());
                }
                ContentPatch::RowsDeleted(keys) => state.edits.clear_rows(table, keys),
                _ => {}
            }
            if let Some(content) = state.content.as_mut()
                && &content.table_name == table
            {
                content.apply_patch(patch);
                if matches!(patch, ContentPatch::RowsDeleted(_)) {
                    state
                        .edits
                        .reindex(table, |key| content.row_index_by_key(key));
                }
            }
            Some(vec![])
        }

        Action::OpenForeignTable { table, column } => Some(vec![Effect::OpenForeignTable {
            request: FetchRequest::new(table.clone()),
            first_column: column.clone(),
        }]),
        Action::ForeignTableLoaded(view) => {
            state.foreign_table = Some((**view).clone());
            Some(vec![])
        }
        Action::CloseForeignTable => {
            state.foreign_table = None;
            Some(vec![])
        }

        _ => None,
    }
}
