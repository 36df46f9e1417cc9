//! Connection sub-reducer: session open and teardown.

use std::time::Instant;

use crate::action::Action;
use crate::connection_state::ConnectionState;
use crate::effect::Effect;
use crate::state::AppState;

pub fn reduce_connection(
    state: &mut AppState,
    action: &Action,
    _now: Instant,
) -> Option<Vec<Effect>> {
    match action {
        Action::SessionOpened {
            database_name,
            auto_select,
        } => {
            state.connection_state = ConnectionState::connected(database_name.clone());
            Some(vec![Effect::ListTables {
                auto_select: *auto_select,
            }])
        }
        Action::Disconnect => {
            state.reset();
            state.connection_state = ConnectionState::Closed;
            Some(vec![Effect::ResetSession])
        }
        _ => None,
    }
}
