//! The store seam between the dispatcher and domain state owners.

use crate::action::{Action, DomainAction};

/// A state owner registered with a [`Dispatcher`](crate::Dispatcher).
///
/// Every registered store sees every action. Stores ignore actions they do
/// not recognize.
pub trait Store: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Called once when the store is registered.
    fn on_register(&self) {}

    fn on_action(&self, action: &Action);
}

/// A store that handles exactly one domain's action enum.
///
/// Implementing this gives a [`Store`] that downcasts each envelope and
/// ignores other domains.
pub trait ActionHandler: Send + Sync {
    type Action: DomainAction;

    const NAME: &'static str;

    fn handle(&self, action: &Self::Action);
}

impl<H: ActionHandler> Store for H {
    fn name(&self) -> &str {
        H::NAME
    }

    fn on_action(&self, action: &Action) {
        if let Some(action) = action.payload::<H::Action>() {
            self.handle(action);
        }
    }
}
