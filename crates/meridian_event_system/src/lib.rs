//! # Meridian Event System
//!
//! In-process publish/subscribe bus for the Meridian messaging fabric.
//! Listeners subscribe typed handlers at a signed 8-bit priority; for every
//! event type the bus keeps a pre-flattened, priority-ordered handler table
//! that is rebuilt whenever registrations change and swapped in whole, so
//! the hot dispatch path never contends with registration activity.
//!
//! ## Dispatch model
//!
//! * **Exact types only**: an event is routed by its concrete [`TypeId`];
//!   there is no inheritance-style matching.
//! * **Synchronous**: [`EventBus::post`] runs every handler on the calling
//!   thread, in ascending priority order, before returning.
//! * **Isolated failures**: a handler returning an error is logged and the
//!   remaining handlers still run. A handler invoked with the wrong event
//!   type is a bug in the dispatch machinery itself and panics.
//!
//! ## Example
//!
//! ```rust
//! use meridian_event_system::{EventBus, Listener, Subscription};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct TickEvent { count: u64 }
//!
//! struct TickLogger;
//!
//! impl Listener for TickLogger {
//!     fn subscriptions(&self) -> Vec<Subscription> {
//!         vec![Subscription::new(0, "tick_logger", |event: &TickEvent| {
//!             println!("tick {}", event.count);
//!             Ok(())
//!         })]
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let logger = Arc::new(TickLogger);
//! bus.register(&logger);
//! bus.post(&TickEvent { count: 1 });
//! bus.unregister(&logger);
//! ```
//!
//! [`TypeId`]: std::any::TypeId

pub use bus::{EventBus, SLOW_HANDLER_THRESHOLD};
pub use error::EventError;
pub use events::{Event, EventHandler, TypedEventHandler};
pub use listener::{Listener, Subscription};
pub use stats::EventBusStats;
pub use utils::{create_event_bus, current_timestamp};

pub mod bus;
pub mod error;
pub mod events;
pub mod listener;
pub mod stats;
pub mod utils;

mod tests;
