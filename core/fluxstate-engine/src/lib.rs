//! Action-dispatch engine for fluxstate.
//!
//! # Architecture
//!
//! - [`Dispatcher`] routes type-erased [`Action`] envelopes to every
//!   registered [`Store`], synchronously and in registration order
//! - Stores handle request actions by calling a remote adapter (which later
//!   dispatches a paired result action) or by writing the gateway directly
//! - Result handlers reconcile server state into the gateway with the
//!   functions in [`reconcile`] and publish exactly one [`ChangeEvent`]
//! - [`ChangeBus`] queues events per subscription and runs handlers in
//!   their own [`DeliveryContext`], never on the dispatching thread
//!
//! # Example
//!
//! ```
//! use fluxstate_engine::{ActionHandler, Dispatcher, DomainAction};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Debug)]
//! enum CounterAction {
//!     Bump,
//! }
//!
//! impl DomainAction for CounterAction {
//!     const DOMAIN: &'static str = "counter";
//!     fn name(&self) -> &'static str {
//!         "Bump"
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl ActionHandler for Counter {
//!     type Action = CounterAction;
//!     const NAME: &'static str = "counter";
//!     fn handle(&self, _: &CounterAction) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new();
//! let counter = Arc::new(Counter::default());
//! dispatcher.register(counter.clone());
//! dispatcher.dispatch(CounterAction::Bump);
//! assert_eq!(counter.0.load(Ordering::SeqCst), 1);
//! ```

mod action;
mod bus;
mod dispatcher;
mod event;
pub mod reconcile;
mod store;

pub use action::{Action, DomainAction};
pub use bus::{ChangeBus, DeliveryContext, SubscriptionId};
pub use dispatcher::{DispatchHandle, Dispatcher};
pub use event::{Applied, ChangeEmitter, ChangeEvent};
pub use reconcile::{DeleteOutcome, FetchOutcome};
pub use store::{ActionHandler, Store};
