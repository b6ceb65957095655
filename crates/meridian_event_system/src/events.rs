//! # Event Traits and Handler Infrastructure
//!
//! This module defines the core abstractions of the event system: the
//! [`Event`] marker trait, the object-safe [`EventHandler`] trait the bus
//! stores in its baked tables, and the [`TypedEventHandler`] bridge that
//! turns a typed closure into an `EventHandler`.
//!
//! ## Design Principles
//!
//! - **Type Safety**: handlers are written against concrete event types;
//!   the erased invocation path re-checks the type and treats a mismatch as
//!   a programming error.
//! - **Zero ceremony**: any `Send + Sync + Debug + 'static` value is an
//!   event through the blanket implementation; no derive, no registration.
//! - **Immutability**: events are passed to handlers by shared reference and
//!   never outlive the `post` call that delivers them.

use crate::error::EventError;
use std::any::{Any, TypeId};
use std::fmt::Debug;

// ============================================================================
// Event Trait
// ============================================================================

/// Marker trait for values that can be posted through the bus.
///
/// Events are immutable value objects describing something that happened.
/// Dispatch is keyed on the event's *concrete* type; posting a value only
/// reaches handlers subscribed to exactly that type.
///
/// The `Debug` bound exists so failing and slow dispatches can name the
/// event in log output.
pub trait Event: Any + Send + Sync + Debug {
    /// Stable type name of this event, used in diagnostics.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Returns this event as `&dyn Any` for the erased dispatch path.
    fn as_any(&self) -> &dyn Any;
}

/// Blanket implementation: every `Send + Sync + Debug + 'static` value is an
/// event. Creating a new event type is just defining a struct:
///
/// ```rust
/// #[derive(Debug)]
/// struct PeerJoined { name: String }
/// // PeerJoined now implements Event automatically.
/// ```
impl<T> Event for T
where
    T: Any + Send + Sync + Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Handler Traits
// ============================================================================

/// Object-safe handler interface stored in the bus's baked tables.
///
/// Most users never implement this directly; [`Subscription::new`] wraps a
/// typed closure in a [`TypedEventHandler`] instead.
///
/// [`Subscription::new`]: crate::listener::Subscription::new
pub trait EventHandler: Send + Sync + 'static {
    /// Handles a type-erased event.
    ///
    /// # Panics
    ///
    /// Panics if `event` is not the type reported by
    /// [`expected_type_id`](Self::expected_type_id). The bus only invokes a
    /// handler from the table baked for its own event type, so reaching the
    /// panic means the dispatch machinery is broken; that is escalated, not
    /// swallowed.
    fn handle(&self, event: &dyn Any) -> Result<(), EventError>;

    /// The [`TypeId`] of the event type this handler accepts; used as the
    /// registration key the handler is baked under.
    fn expected_type_id(&self) -> TypeId;

    /// Human-readable handler name for diagnostics.
    fn handler_name(&self) -> &str;
}

/// Bridges a typed closure `Fn(&T) -> Result<(), EventError>` to the
/// type-erased [`EventHandler`] interface.
pub struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(&T) -> Result<(), EventError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(&T) -> Result<(), EventError> + Send + Sync,
{
    /// Creates a new typed handler with a diagnostic name.
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> Debug for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(&T) -> Result<(), EventError> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedEventHandler")
            .field("name", &self.name)
            .finish()
    }
}

impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(&T) -> Result<(), EventError> + Send + Sync + 'static,
{
    fn handle(&self, event: &dyn Any) -> Result<(), EventError> {
        let Some(event) = event.downcast_ref::<T>() else {
            // Dispatch-machinery fault, not a listener failure.
            panic!(
                "handler '{}' invoked with an event that is not {}",
                self.name,
                T::type_name()
            );
        };
        (self.handler)(event)
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}
