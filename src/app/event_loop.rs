//! Single-consumer loop: actions in, reducer, effects out.

use std::time::Instant;

use tokio::sync::mpsc;

use crate::action::Action;
use crate::effect_runner::EffectRunner;
use crate::reducer::reduce;
use crate::state::AppState;

pub fn dispatch(state: &mut AppState, runner: &EffectRunner, action: Action) {
    let effects = reduce(state, action, Instant::now());
    runner.run(effects);
}

/// Processes actions until no task is running and nothing is queued.
pub async fn run_until_idle(
    state: &mut AppState,
    runner: &EffectRunner,
    rx: &mut mpsc::UnboundedReceiver<Action>,
) {
    loop {
        // Checked before draining: a task that has finished has already
        // queued everything it emits.
        let idle = runner.is_idle();
        let mut progressed = false;
        while let Ok(action) = rx.try_recv() {
            progressed = true;
            dispatch(state, runner, action);
        }
        if state.should_quit || (idle && !progressed) {
            return;
        }
        if progressed {
            continue;
        }

        tokio::select! {
            Some(action) = rx.recv() => dispatch(state, runner, action),
            () = runner.wait_idle() => {}
        }
    }
}
