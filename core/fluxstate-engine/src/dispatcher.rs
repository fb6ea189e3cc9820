//! Synchronous action dispatcher.

use crate::action::Action;
use crate::store::Store;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::{debug, info, warn};

#[derive(Default)]
struct Inner {
    stores: RwLock<Vec<Arc<dyn Store>>>,
}

/// Routes actions to every registered store, in registration order.
///
/// `dispatch` runs on the calling thread and returns only after every store
/// has seen the action. Stores may dispatch from inside `on_action`; the
/// nested action visits all stores before the outer loop continues.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a store and calls its `on_register` hook.
    /// Returns `false` if the store was already registered.
    pub fn register(&self, store: Arc<dyn Store>) -> bool {
        {
            let mut stores = self
                .inner
                .stores
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if stores.iter().any(|s| same_store(s, &store)) {
                warn!("store {} already registered, ignoring", store.name());
                return false;
            }
            stores.push(Arc::clone(&store));
        }

        info!("registered store {}", store.name());
        store.on_register();
        true
    }

    /// Removes a store. Returns `false` if it was not registered.
    pub fn unregister(&self, store: &Arc<dyn Store>) -> bool {
        let mut stores = self
            .inner
            .stores
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = stores.len();
        stores.retain(|s| !same_store(s, store));
        let removed = stores.len() != before;
        if removed {
            info!("unregistered store {}", store.name());
        }
        removed
    }

    pub fn dispatch(&self, action: impl Into<Action>) {
        let action = action.into();
        debug!("dispatching {:?}", action);

        // Snapshot so stores can register, unregister or dispatch while handling.
        let stores = self
            .inner
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for store in &stores {
            store.on_action(&action);
        }
    }

    pub fn store_count(&self) -> usize {
        self.inner
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// A non-owning handle for collaborators that dispatch later.
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Weak reference to a [`Dispatcher`].
///
/// Stores and remote adapters hold this so they never keep the dispatcher
/// (and through it, themselves) alive.
#[derive(Clone)]
pub struct DispatchHandle {
    inner: Weak<Inner>,
}

impl DispatchHandle {
    /// Dispatches if the dispatcher still exists. Returns whether it did.
    pub fn dispatch(&self, action: impl Into<Action>) -> bool {
        let action = action.into();
        match self.inner.upgrade() {
            Some(inner) => {
                Dispatcher { inner }.dispatch(action);
                true
            }
            None => {
                warn!("dispatcher dropped, discarding {:?}", action);
                false
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

fn same_store(a: &Arc<dyn Store>, b: &Arc<dyn Store>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
