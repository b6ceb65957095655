//! Statistics tracking for the event bus.

use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicU64;

/// Snapshot of bus activity for monitoring.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventBusStats {
    /// Number of handlers currently present across all baked tables.
    pub total_handlers: usize,
    /// Events posted since the bus was created.
    pub events_posted: u64,
    /// Individual handler invocations since the bus was created.
    pub handler_invocations: u64,
    /// Handler invocations that returned an error.
    pub handler_failures: u64,
}

/// Live counters behind [`EventBusStats`] snapshots.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) events_posted: AtomicU64,
    pub(crate) handler_invocations: AtomicU64,
    pub(crate) handler_failures: AtomicU64,
}
