//! Shared plumbing for the in-process simulated services.

use fluxstate_engine::{DispatchHandle, DomainAction};
use fluxstate_types::ActionError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// What a simulated server does with a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Trash on the first delete, remove permanently on the second.
    #[default]
    Trash,
    /// Always remove permanently.
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedServiceConfig {
    /// Delay before each call completes.
    pub latency: Duration,
    /// Whether a push echoes the post's creation date back.
    pub echo_date_created: bool,
    pub delete_mode: DeleteMode,
}

impl Default for SimulatedServiceConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            echo_date_created: true,
            delete_mode: DeleteMode::default(),
        }
    }
}

/// Server state plus errors queued to fail upcoming calls.
pub(crate) struct ServerState<S> {
    pub server: S,
    failures: VecDeque<ActionError>,
}

impl<S> ServerState<S> {
    pub fn take_failure(&mut self) -> Option<ActionError> {
        self.failures.pop_front()
    }
}

/// Runs simulated calls as tokio tasks that end by dispatching a result.
pub(crate) struct Completer<S> {
    state: Arc<Mutex<ServerState<S>>>,
    dispatcher: DispatchHandle,
    runtime: Handle,
    latency: Duration,
}

impl<S: Send + 'static> Completer<S> {
    pub fn new(server: S, dispatcher: DispatchHandle, runtime: Handle, latency: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState {
                server,
                failures: VecDeque::new(),
            })),
            dispatcher,
            runtime,
            latency,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, ServerState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_next(&self, error: ActionError) {
        self.lock().failures.push_back(error);
    }

    /// Computes the result against server state, then dispatches it.
    /// The state lock is released before dispatching.
    pub fn complete<A, F>(&self, compute: F)
    where
        A: DomainAction,
        F: FnOnce(&mut ServerState<S>) -> A + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let dispatcher = self.dispatcher.clone();
        let latency = self.latency;
        self.runtime.spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let action = {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                compute(&mut state)
            };
            debug!("simulated service completing with {}::{}", A::DOMAIN, action.name());
            dispatcher.dispatch(action);
        });
    }
}
