pub mod action;
pub mod connection_state;
pub mod coordinator;
pub mod edit_buffer;
pub mod effect;
pub mod effect_runner;
pub mod error_log;
pub mod event_loop;
pub mod ports;
pub mod reducer;
pub mod reducers;
pub mod session;
pub mod state;
pub mod tasks;
