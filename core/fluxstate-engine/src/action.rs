//! Type-erased action envelopes.
//!
//! Each domain defines its own action enum and implements [`DomainAction`]
//! for it. The dispatcher only ever sees [`Action`], and stores recover
//! their own enum with [`Action::payload`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A domain's action enumeration.
pub trait DomainAction: Any + Send + Sync + fmt::Debug {
    /// Domain tag, e.g. `"posts"`.
    const DOMAIN: &'static str;

    /// Name of this variant, for logging.
    fn name(&self) -> &'static str;
}

/// An action envelope routed by the dispatcher.
#[derive(Clone)]
pub struct Action {
    domain: &'static str,
    name: &'static str,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Action {
    pub fn new<A: DomainAction>(action: A) -> Self {
        Self {
            domain: A::DOMAIN,
            name: action.name(),
            payload: Arc::new(action),
        }
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The domain action, if this envelope carries an `A`.
    pub fn payload<A: DomainAction>(&self) -> Option<&A> {
        self.payload.downcast_ref::<A>()
    }

    pub fn is<A: DomainAction>(&self) -> bool {
        self.payload.is::<A>()
    }
}

impl<A: DomainAction> From<A> for Action {
    fn from(action: A) -> Self {
        Self::new(action)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({}::{})", self.domain, self.name)
    }
}
