//! Table list sub-reducer: registry sync, search, create/drop/truncate/rename.

use std::time::Instant;

use tabula_domain::FetchRequest;

use crate::action::Action;
use crate::effect::Effect;
use crate::state::AppState;

pub fn reduce_tables(state: &mut AppState, action: &Action, _now: Instant) -> Option<Vec<Effect>> {
    match action {
        Action::ReloadTables => Some(vec![Effect::ReloadTables {
            restore: state.current_request(),
        }]),
        Action::SearchTables(keyword) => {
            state.table_search.clone_from(keyword);
            Some(vec![])
        }
        Action::TablesCleared => {
            state.registry = Default::default();
            Some(vec![])
        }
        Action::TablesReplaced(registry) => {
            state.registry = registry.clone();
            if let Some(table) = state.displayed_table()
                && !registry.contains(table)
            {
                state.content = None;
                state.filter_draft.clear();
            }
            if state
                .selected_table
                .as_deref()
                .is_some_and(|t| !registry.contains(t))
            {
                state.selected_table = None;
            }
            Some(vec![])
        }

        Action::CreateTable { base } => Some(vec![Effect::CreateTable { base: base.clone() }]),
        Action::TableCreated { name } => {
            state.selected_table = Some(name.clone());
            state.filter_draft.clear();
            Some(vec![Effect::ReloadTables {
                restore: Some(FetchRequest::new(name.clone()).with_filters(Vec::new(), false)),
            }])
        }

        Action::DropTable(name) => Some(vec![Effect::DropTable { name: name.clone() }]),
        Action::TableDropped { name } => {
            state.registry.remove(name);
            state.edits.clear_table(name);
            if state.is_displayed(name) {
                state.content = None;
                state.filter_draft.clear();
            }
            if state.selected_table.as_deref() == Some(name.as_str()) {
                state.selected_table = None;
            }
            Some(vec![])
        }

        Action::TruncateTable {
            name,
            restart_identity,
        } => Some(vec![Effect::TruncateTable {
            name: name.clone(),
            restart_identity: *restart_identity,
        }]),
        Action::TableTruncated { name } => {
            state.edits.clear_table(name);
            if !state.is_displayed(name) {
                return Some(vec![]);
            }
            let effects = state
                .current_request()
                .map(|request| vec![Effect::RefreshContent(request.with_page(1))])
                .unwrap_or_default();
            Some(effects)
        }

        Action::RenameTable { from, to } => Some(vec![Effect::RenameTable {
            from: from.clone(),
            to: to.clone(),
        }]),
        Action::TableRenamed { from, to } => {
            state.registry.rename(from, to);
            state.edits.rename_table(from, to);
            if let Some(content) = state.content.as_mut()
                && &content.table_name == from
            {
                content.table_name.clone_from(to);
            }
            if let Some(view) = state.foreign_table.as_mut()
                && &view.table_name == from
            {
                view.table_name.clone_from(to);
            }
            if state.selected_table.as_deref() == Some(from.as_str()) {
                state.selected_table = Some(to.clone());
            }
            Some(vec![])
        }

        _ => None,
    }
}
