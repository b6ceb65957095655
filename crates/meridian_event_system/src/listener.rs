//! Listener registration records.
//!
//! A listener declares its handlers as explicit [`Subscription`] records:
//! one `(event type, priority, callback)` tuple per handler. The bus keys
//! registrations on the listener's `Arc` identity, so the same object can be
//! unregistered later without naming each subscription again.

use crate::error::EventError;
use crate::events::{Event, EventHandler, TypedEventHandler};
use std::any::TypeId;
use std::sync::Arc;

/// A single handler subscription: event type, dispatch priority, callback.
///
/// Lower priority values dispatch first; the full `i8` range is honored and
/// listeners sharing a priority run in no guaranteed relative order.
pub struct Subscription {
    pub(crate) event_type: TypeId,
    pub(crate) event_name: &'static str,
    pub(crate) priority: i8,
    pub(crate) handler: Arc<dyn EventHandler>,
}

impl Subscription {
    /// Builds a subscription from a typed closure.
    ///
    /// The closure receives the event by shared reference and reports
    /// listener-logic failures through its `Result`; returning `Err` never
    /// stops dispatch to other handlers.
    pub fn new<T, F>(priority: i8, name: impl Into<String>, handler: F) -> Self
    where
        T: Event,
        F: Fn(&T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let handler: Arc<dyn EventHandler> = Arc::new(TypedEventHandler::new(name.into(), handler));
        Self {
            // The registration key comes from the handler itself, so the
            // two can never disagree.
            event_type: handler.expected_type_id(),
            event_name: T::type_name(),
            priority,
            handler,
        }
    }

    /// The priority this subscription dispatches at.
    pub fn priority(&self) -> i8 {
        self.priority
    }

    /// Type name of the subscribed event, for diagnostics.
    pub fn event_name(&self) -> &'static str {
        self.event_name
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event_name)
            .field("priority", &self.priority)
            .field("handler", &self.handler.handler_name())
            .finish()
    }
}

/// A registrable bundle of event subscriptions.
///
/// Implementors return one [`Subscription`] per handler from
/// [`subscriptions`](Listener::subscriptions); the bus calls it once at
/// registration time. Handlers typically capture an `Arc` of the listener's
/// own state.
pub trait Listener: Send + Sync + 'static {
    /// The handler subscriptions this listener wants registered.
    fn subscriptions(&self) -> Vec<Subscription>;

    /// Name used to identify this listener in dispatch diagnostics.
    fn listener_name(&self) -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}
