//! Change events and the helper stores use to publish them.

use crate::bus::ChangeBus;
use fluxstate_storage::StorageResult;
use fluxstate_types::{ActionError, LocalId, OwnerId};
use std::fmt;
use tracing::{debug, warn};

/// Notification that a store finished handling one logical mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent<C> {
    pub owner_id: OwnerId,
    pub cause: C,
    pub local_id: Option<LocalId>,
    pub rows_affected: Option<usize>,
    pub can_load_more: Option<bool>,
    pub error: Option<ActionError>,
}

impl<C> ChangeEvent<C> {
    pub fn new(owner_id: OwnerId, cause: C) -> Self {
        Self {
            owner_id,
            cause,
            local_id: None,
            rows_affected: None,
            can_load_more: None,
            error: None,
        }
    }

    pub fn with_local_id(mut self, local_id: impl Into<Option<LocalId>>) -> Self {
        self.local_id = local_id.into();
        self
    }

    pub fn with_rows_affected(mut self, rows: usize) -> Self {
        self.rows_affected = Some(rows);
        self
    }

    pub fn with_can_load_more(mut self, can_load_more: bool) -> Self {
        self.can_load_more = Some(can_load_more);
        self
    }

    pub fn with_error(mut self, error: ActionError) -> Self {
        self.error = Some(error);
        self
    }

    /// Copies whatever the reconciliation step reported onto the event.
    pub fn applied(mut self, applied: Applied) -> Self {
        if applied.local_id.is_some() {
            self.local_id = applied.local_id;
        }
        self.rows_affected = applied.rows_affected.or(self.rows_affected);
        self.can_load_more = applied.can_load_more.or(self.can_load_more);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// What a reconciliation step wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub local_id: Option<LocalId>,
    pub rows_affected: Option<usize>,
    pub can_load_more: Option<bool>,
}

impl Applied {
    pub fn record(local_id: LocalId) -> Self {
        Self {
            local_id: Some(local_id),
            ..Self::default()
        }
    }

    pub fn rows(rows: usize) -> Self {
        Self {
            rows_affected: Some(rows),
            ..Self::default()
        }
    }

    pub fn with_can_load_more(mut self, can_load_more: bool) -> Self {
        self.can_load_more = Some(can_load_more);
        self
    }
}

/// Publishes a store's change events.
///
/// `complete` is the single exit of every result handler: it turns the
/// result's outcome into exactly one published event.
pub struct ChangeEmitter<C> {
    store: &'static str,
    bus: ChangeBus<ChangeEvent<C>>,
}

impl<C> Clone for ChangeEmitter<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            bus: self.bus.clone(),
        }
    }
}

impl<C: Clone + fmt::Debug + Send + 'static> ChangeEmitter<C> {
    pub fn new(store: &'static str, bus: ChangeBus<ChangeEvent<C>>) -> Self {
        Self { store, bus }
    }

    pub fn bus(&self) -> &ChangeBus<ChangeEvent<C>> {
        &self.bus
    }

    pub fn emit(&self, event: ChangeEvent<C>) {
        if let Some(error) = &event.error {
            debug!("{}: {:?} for owner {} failed: {}", self.store, event.cause, event.owner_id, error);
        } else {
            debug!("{}: {:?} for owner {}", self.store, event.cause, event.owner_id);
        }
        self.bus.publish(event);
    }

    /// Reconciles a successful outcome and publishes the resulting event.
    ///
    /// An error outcome is published unchanged and `reconcile` is not run.
    /// A storage failure inside `reconcile` is published as a `Generic`
    /// error.
    pub fn complete<T>(
        &self,
        owner_id: OwnerId,
        cause: C,
        local_id: Option<LocalId>,
        outcome: Result<T, ActionError>,
        reconcile: impl FnOnce(T) -> StorageResult<Applied>,
    ) -> ChangeEvent<C> {
        let event = ChangeEvent::new(owner_id, cause).with_local_id(local_id);
        let event = match outcome {
            Err(error) => event.with_error(error),
            Ok(value) => match reconcile(value) {
                Ok(applied) => event.applied(applied),
                Err(err) => {
                    warn!(
                        "{}: reconciling {:?} for owner {} failed: {}",
                        self.store, event.cause, owner_id, err
                    );
                    event.with_error(ActionError::generic(err.to_string()))
                }
            },
        };
        self.emit(event.clone());
        event
    }
}
