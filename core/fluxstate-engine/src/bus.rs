//! Change bus: fan-out of events to subscribers.
//!
//! Every subscription owns an unbounded queue. Publishing only enqueues, so
//! a store never runs subscriber code and a slow or failing subscriber never
//! delays the others.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Where a subscription's handler runs.
#[derive(Debug, Clone)]
pub enum DeliveryContext {
    /// A task on the given tokio runtime.
    Runtime(Handle),
    /// A dedicated OS thread owned by the subscription.
    Thread,
}

impl DeliveryContext {
    /// The runtime of the calling task, if there is one.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::Runtime)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscriber<E> {
    id: SubscriptionId,
    sender: UnboundedSender<E>,
}

struct BusInner<E> {
    next_id: u64,
    subscribers: Vec<Subscriber<E>>,
}

/// Publishes events of one type to any number of subscribers.
pub struct ChangeBus<E> {
    inner: Arc<Mutex<BusInner<E>>>,
}

impl<E> Clone for ChangeBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Clone + Send + 'static> Default for ChangeBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send + 'static> ChangeBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                next_id: 1,
                subscribers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusInner<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes a handler that runs in `context`.
    ///
    /// Errors and panics from the handler are logged and the subscription
    /// keeps receiving events.
    pub fn subscribe<F>(&self, context: DeliveryContext, mut handler: F) -> SubscriptionId
    where
        F: FnMut(E) -> anyhow::Result<()> + Send + 'static,
    {
        let (id, mut receiver) = self.subscribe_channel();
        match context {
            DeliveryContext::Runtime(handle) => {
                handle.spawn(async move {
                    while let Some(event) = receiver.recv().await {
                        deliver(id, &mut handler, event);
                    }
                    debug!("{id} closed");
                });
            }
            DeliveryContext::Thread => {
                let spawned = std::thread::Builder::new()
                    .name(format!("fluxstate-{id}"))
                    .spawn(move || {
                        while let Some(event) = receiver.blocking_recv() {
                            deliver(id, &mut handler, event);
                        }
                        debug!("{id} closed");
                    });
                if let Err(err) = spawned {
                    warn!("failed to spawn delivery thread for {id}: {err}");
                    self.unsubscribe(id);
                }
            }
        }
        id
    }

    /// Subscribes a raw queue, for callers that await events themselves.
    /// Dropping the receiver ends the subscription.
    pub fn subscribe_channel(&self) -> (SubscriptionId, UnboundedReceiver<E>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push(Subscriber { id, sender });
        (id, receiver)
    }

    /// Ends a subscription. Events already queued are still delivered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        inner.subscribers.len() != before
    }

    /// Enqueues `event` for every live subscription and returns how many
    /// received it.
    pub fn publish(&self, event: E) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|s| !s.sender.is_closed());
        inner
            .subscribers
            .iter()
            .filter(|s| s.sender.send(event.clone()).is_ok())
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|s| !s.sender.is_closed());
        inner.subscribers.len()
    }
}

fn deliver<E, F>(id: SubscriptionId, handler: &mut F, event: E)
where
    F: FnMut(E) -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(|| handler(event))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!("subscriber {id} failed: {err:#}"),
        Err(_) => warn!("subscriber {id} panicked"),
    }
}
