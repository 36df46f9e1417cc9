//! Tracks which table the session is currently fetching.
//!
//! A fetch chain holds a [`FetchToken`] for the table it was issued for. Before
//! emitting anything that mutates the store it asks whether the token still
//! matches the cursor; a chain whose table has been superseded drops its
//! result instead.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchToken(String);

impl FetchToken {
    pub fn table_name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct FetchCoordinator {
    cursor: Arc<watch::Sender<Option<String>>>,
}

impl FetchCoordinator {
    pub fn new() -> Self {
        let (cursor, _) = watch::channel(None);
        Self {
            cursor: Arc::new(cursor),
        }
    }

    pub fn begin_fetch(&self, table: &str) -> FetchToken {
        self.cursor.send_replace(Some(table.to_string()));
        FetchToken(table.to_string())
    }

    pub fn is_current(&self, token: &FetchToken) -> bool {
        self.cursor.borrow().as_deref() == Some(token.0.as_str())
    }

    /// Runs `emit` only if `token` is current, holding the cursor so that no
    /// `begin_fetch` can land between the check and the emission.
    pub fn emit_if_current<F>(&self, token: &FetchToken, emit: F) -> bool
    where
        F: FnOnce(),
    {
        let cursor = self.cursor.borrow();
        if cursor.as_deref() != Some(token.0.as_str()) {
            return false;
        }
        emit();
        true
    }

    pub fn current(&self) -> Option<String> {
        self.cursor.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.cursor.subscribe()
    }

    pub fn reset(&self) {
        self.cursor.send_replace(None);
    }
}

impl Default for FetchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
