//! Error types for event dispatch.

/// Errors surfaced by event handlers.
///
/// A handler returning `Err` reports a failure in the *listener's own logic*;
/// the bus logs it and continues dispatching to the remaining handlers. This
/// is distinct from dispatch-machinery faults (a handler invoked with the
/// wrong event type), which panic instead of being represented here.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The listener's handler logic failed while processing the event.
    #[error("handler execution failed: {0}")]
    HandlerExecution(#[from] anyhow::Error),
}
