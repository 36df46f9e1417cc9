//! Filter, sort and pagination sub-reducer.
//!
//! Filter and sort changes go back to page 1. Paging keeps the current
//! order and filters.

use std::time::Instant;

use tabula_domain::{FetchRequest, Filter, SortOrder};

use crate::action::Action;
use crate::effect::Effect;
use crate::state::AppState;

pub fn reduce_view(state: &mut AppState, action: &Action, _now: Instant) -> Option<Vec<Effect>> {
    match action {
        Action::AddFilter(filter) => {
            state.filter_draft.push(filter.clone());
            if let Some(content) = state.content.as_mut() {
                content.show_filter = true;
            }
            Some(vec![])
        }
        Action::SetFilter { index, filter } => {
            if let Some(slot) = state.filter_draft.get_mut(*index) {
                *slot = filter.clone();
            }
            Some(vec![])
        }
        Action::RemoveFilter(index) => {
            if *index < state.filter_draft.len() {
                state.filter_draft.remove(*index);
            }
            Some(vec![])
        }
        Action::ToggleFilter => {
            if let Some(content) = state.content.as_mut() {
                content.show_filter = !content.show_filter;
            }
            Some(vec![])
        }
        Action::ApplyFilters => {
            state.filter_draft.retain(Filter::is_complete);
            let filters = state.filter_draft.clone();
            if let Some(content) = state.content.as_mut() {
                content.show_filter = true;
            }
            Some(refresh(state, 1, None, Some(filters)))
        }
        Action::ClearFilter { refresh: reload } => {
            state.filter_draft.clear();
            if let Some(content) = state.content.as_mut() {
                content.filters.clear();
            }
            if *reload {
                Some(refresh(state, 1, None, Some(Vec::new())))
            } else {
                Some(vec![])
            }
        }
        Action::SetSort { column, direction } => {
            let Some(content) = state.content.as_ref() else {
                return Some(vec![]);
            };
            let mut order = content.order.clone();
            match direction {
                None => order.retain(|o| &o.column != column),
                Some(direction) => {
                    if let Some(existing) = order.iter_mut().find(|o| &o.column == column) {
                        existing.direction = *direction;
                    } else {
                        order.insert(0, SortOrder::new(column.clone(), *direction));
                    }
                }
            }
            Some(refresh(state, 1, Some(order), None))
        }
        Action::NextPage => Some(go_to_page(state, |page| page.saturating_add(1))),
        Action::PrevPage => Some(go_to_page(state, |page| page.saturating_sub(1))),
        Action::GoToPage(target) => Some(go_to_page(state, |_| *target)),
        _ => None,
    }
}

fn go_to_page(state: &AppState, target: impl FnOnce(usize) -> usize) -> Vec<Effect> {
    let Some(content) = state.content.as_ref() else {
        return vec![];
    };
    let page = target(content.page).clamp(1, state.total_pages());
    if page == content.page {
        return vec![];
    }
    refresh(state, page, None, None)
}

/// Refresh of the displayed table. `None` keeps the displayed order or filters.
fn refresh(
    state: &AppState,
    page: usize,
    order: Option<Vec<SortOrder>>,
    filters: Option<Vec<Filter>>,
) -> Vec<Effect> {
    let Some(content) = state.content.as_ref() else {
        return vec![];
    };
    let request = FetchRequest::new(content.table_name.clone())
        .with_page(page)
        .with_order(order.unwrap_or_else(|| content.order.clone()))
        .with_filters(
            filters.unwrap_or_else(|| content.filters.clone()),
            content.show_filter,
        );
    vec![Effect::RefreshContent(request)]
}
