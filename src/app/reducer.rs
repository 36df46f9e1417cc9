//! Pure reducer: state transitions only, no I/O.
//!
//! # Purity Rules
//!
//! The reducer MUST NOT:
//! - Call `Instant::now()` (time is passed as `now` parameter)
//! - Perform I/O operations
//! - Spawn async tasks
//!
//! This keeps the reducer testable without mocking time or I/O.

use std::time::Instant;

use crate::action::Action;
use crate::effect::Effect;
use crate::reducers::{
    reduce_connection, reduce_content, reduce_edits, reduce_tables, reduce_view,
};
use crate::state::AppState;

pub fn reduce(state: &mut AppState, action: Action, now: Instant) -> Vec<Effect> {
    // Late results of a session that was disconnected.
    if state.connection_state.is_closed() && action.is_task_event() {
        return vec![];
    }
    if let Some(effects) = reduce_connection(state, &action, now) {
        return effects;
    }
    if let Some(effects) = reduce_tables(state, &action, now) {
        return effects;
    }
    if let Some(effects) = reduce_content(state, &action, now) {
        return effects;
    }
    if let Some(effects) = reduce_view(state, &action, now) {
        return effects;
    }
    if let Some(effects) = reduce_edits(state, &action, now) {
        return effects;
    }

    match action {
        Action::Quit => {
            state.should_quit = true;
            vec![]
        }
        Action::ErrorCaught(message) => {
            state.errors.push_at(message, now);
            vec![]
        }
        Action::CloseErrors => {
            state.errors.clear();
            vec![]
        }
        _ => vec![],
    }
}
