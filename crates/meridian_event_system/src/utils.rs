//! Utility functions shared across the event system and its consumers.

use crate::bus::EventBus;
use std::sync::Arc;

/// Returns the current Unix timestamp in seconds.
///
/// All Meridian events stamp themselves through this function so timestamps
/// are generated the same way everywhere.
///
/// # Panics
///
/// Panics if the system clock is set before the Unix epoch.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// Creates a new shared event bus ready for listener registration.
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::new())
}
