//! Per-connection context threaded through every orchestration task.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

use crate::action::Action;
use crate::coordinator::{FetchCoordinator, FetchToken};
use crate::ports::{DatabaseGateway, GatewayError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub page_size: usize,
    pub gateway_timeout: Duration,
    pub max_create_attempts: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            gateway_timeout: Duration::from_secs(30),
            max_create_attempts: 100,
        }
    }
}

pub struct SessionContext {
    gateway: Arc<dyn DatabaseGateway>,
    coordinator: FetchCoordinator,
    events: mpsc::UnboundedSender<Action>,
    settings: SessionSettings,
    creating: Arc<Mutex<HashSet<String>>>,
    generation: Arc<AtomicU64>,
    /// Generation this handle was pinned to.
    epoch: u64,
}

impl SessionContext {
    pub fn new(
        gateway: Arc<dyn DatabaseGateway>,
        events: mpsc::UnboundedSender<Action>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            gateway,
            coordinator: FetchCoordinator::new(),
            events,
            settings,
            creating: Arc::new(Mutex::new(HashSet::new())),
            generation: Arc::new(AtomicU64::new(0)),
            epoch: 0,
        }
    }

    /// A handle sharing this session, bound to the current generation. Once
    /// [`end_generation`](Self::end_generation) runs, everything it emits is
    /// dropped.
    pub fn pinned(&self) -> Arc<Self> {
        Arc::new(Self {
            gateway: Arc::clone(&self.gateway),
            coordinator: self.coordinator.clone(),
            events: self.events.clone(),
            settings: self.settings.clone(),
            creating: Arc::clone(&self.creating),
            generation: Arc::clone(&self.generation),
            epoch: self.generation.load(Ordering::SeqCst),
        })
    }

    /// Retires every pinned handle and clears the fetch cursor.
    pub fn end_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.coordinator.reset();
    }

    pub fn is_live(&self) -> bool {
        self.epoch == self.generation.load(Ordering::SeqCst)
    }

    /// Shares `coordinator` instead of a private one.
    pub fn with_coordinator(mut self, coordinator: FetchCoordinator) -> Self {
        self.coordinator = coordinator;
        self
    }

    pub fn gateway(&self) -> &dyn DatabaseGateway {
        self.gateway.as_ref()
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn emit(&self, action: Action) {
        if !self.is_live() {
            debug!(?action, "session ended, dropping event");
            return;
        }
        if self.events.send(action).is_err() {
            debug!("event channel closed");
        }
    }

    /// Emits all `actions` back to back if `token` is still current.
    pub fn emit_if_current<I>(&self, token: &FetchToken, actions: I) -> bool
    where
        I: IntoIterator<Item = Action>,
    {
        self.coordinator.emit_if_current(token, || {
            for action in actions {
                self.emit(action);
            }
        })
    }

    /// Awaits a gateway call, bounded by the session timeout.
    pub async fn call<T, F>(&self, request: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        timeout(self.settings.gateway_timeout, request)
            .await
            .map_err(|_| GatewayError::Timeout)?
    }

    /// Claims `base` for one table creation. `None` when another creation
    /// for the same base is still running.
    pub fn begin_creation(&self, base: &str) -> Option<CreationGuard<'_>> {
        let mut creating = self.creating.lock().unwrap_or_else(PoisonError::into_inner);
        if !creating.insert(base.to_string()) {
            return None;
        }
        Some(CreationGuard {
            session: self,
            base: base.to_string(),
        })
    }
}

pub struct CreationGuard<'a> {
    session: &'a SessionContext,
    base: String,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.session
            .creating
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.base);
    }
}
