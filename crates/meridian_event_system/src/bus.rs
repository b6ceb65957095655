//! Core event bus implementation.
//!
//! Registration state lives in a single mutex-guarded map keyed by event
//! type, priority, and listener identity. From it the bus bakes, per event
//! type, a flat priority-ordered handler table stored in a [`DashMap`] of
//! `Arc` slices: `post` clones the `Arc` out of the map and iterates without
//! ever touching the registration lock, and rebaking replaces the slice as
//! one value so concurrent readers never observe a half-built table.
//!
//! Baking is a full recompute of the affected event type. Registration
//! changes are rare next to posts, so recompute keeps the hot path free of
//! bookkeeping.

use crate::events::{Event, EventHandler};
use crate::listener::Listener;
use crate::stats::{EventBusStats, StatsCounters};
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Per-handler dispatch time above which a warning is logged.
pub const SLOW_HANDLER_THRESHOLD: Duration = Duration::from_millis(50);

/// Listener identity: the address of the registered `Arc`'s allocation.
type ListenerKey = usize;

/// Handlers one listener registered at one (event type, priority) slot.
struct ListenerHandlers {
    listener_name: Arc<str>,
    handlers: Vec<Arc<dyn EventHandler>>,
}

/// One entry of a baked dispatch table.
struct BakedHandler {
    listener_name: Arc<str>,
    handler: Arc<dyn EventHandler>,
}

/// Registration state, mutated only under the bus's lock.
///
/// The priority level is a `BTreeMap` key, so baking walks the full signed
/// 8-bit range in ascending order without any wrap-around arithmetic.
type Registrations = HashMap<TypeId, BTreeMap<i8, HashMap<ListenerKey, ListenerHandlers>>>;

/// The in-process publish/subscribe bus.
///
/// Cheap to share behind an `Arc`; registration and unregistration are
/// serialized by an internal lock while [`post`](EventBus::post) reads only
/// the baked tables.
pub struct EventBus {
    registrations: Mutex<Registrations>,
    baked: DashMap<TypeId, Arc<[BakedHandler]>>,
    counters: StatsCounters,
}

impl EventBus {
    /// Creates a new bus with no registered listeners.
    pub fn new() -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
            baked: DashMap::new(),
            counters: StatsCounters::default(),
        }
    }

    /// Registers every subscription a listener declares.
    ///
    /// Registering the same listener object again replaces its handler set
    /// at each (event type, priority) slot it declares, rather than
    /// stacking duplicates. The affected event types are rebaked before the
    /// call returns, so the new handlers are visible to the next `post`.
    pub fn register<L: Listener>(&self, listener: &Arc<L>) {
        let subscriptions = listener.subscriptions();
        if subscriptions.is_empty() {
            debug!(
                "listener '{}' registered no subscriptions",
                listener.listener_name()
            );
            return;
        }

        let key = listener_key(listener);
        let name: Arc<str> = Arc::from(listener.listener_name());

        // Group first so a listener declaring several handlers for the same
        // slot replaces the slot as one unit.
        let mut grouped: HashMap<(TypeId, i8), Vec<Arc<dyn EventHandler>>> = HashMap::new();
        for subscription in subscriptions {
            grouped
                .entry((subscription.event_type, subscription.priority))
                .or_default()
                .push(subscription.handler);
        }

        let mut registrations = self.lock_registrations();
        let mut touched: HashSet<TypeId> = HashSet::new();
        for ((event_type, priority), handlers) in grouped {
            registrations
                .entry(event_type)
                .or_default()
                .entry(priority)
                .or_default()
                .insert(
                    key,
                    ListenerHandlers {
                        listener_name: name.clone(),
                        handlers,
                    },
                );
            touched.insert(event_type);
        }
        for event_type in touched {
            self.bake(&registrations, event_type);
        }
    }

    /// Removes a listener from every event type it is registered for.
    ///
    /// Empty priority buckets and empty event-type buckets are pruned and
    /// each affected event type is rebaked. Unregistering a listener that
    /// was never registered is a no-op.
    pub fn unregister<L: Listener>(&self, listener: &Arc<L>) {
        let key = listener_key(listener);

        let mut registrations = self.lock_registrations();
        let mut touched: Vec<TypeId> = Vec::new();
        for (event_type, priorities) in registrations.iter_mut() {
            let mut removed = false;
            priorities.retain(|_, bucket| {
                removed |= bucket.remove(&key).is_some();
                !bucket.is_empty()
            });
            if removed {
                touched.push(*event_type);
            }
        }
        registrations.retain(|_, priorities| !priorities.is_empty());
        for event_type in touched {
            self.bake(&registrations, event_type);
        }
    }

    /// Dispatches an event to every handler baked for its concrete type.
    ///
    /// Handlers run synchronously on the calling thread in ascending
    /// priority order. A handler that returns `Err` is logged together with
    /// the event and the owning listener, and dispatch continues; a handler
    /// that exceeds [`SLOW_HANDLER_THRESHOLD`] is logged as slow. Posting an
    /// event type with no registered handlers is a no-op.
    pub fn post<E: Event>(&self, event: &E) {
        self.counters.events_posted.fetch_add(1, Ordering::Relaxed);

        // Clone the table out of the map so dispatch holds no lock and a
        // concurrent rebake cannot change the sequence mid-post.
        let Some(handlers) = self
            .baked
            .get(&TypeId::of::<E>())
            .map(|entry| entry.value().clone())
        else {
            return;
        };

        for baked in handlers.iter() {
            let start = Instant::now();

            if let Err(err) = baked.handler.handle(event.as_any()) {
                self.counters.handler_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "error dispatching event {:?} to listener '{}': {:#}",
                    event, baked.listener_name, err
                );
            }
            self.counters
                .handler_invocations
                .fetch_add(1, Ordering::Relaxed);

            let elapsed = start.elapsed();
            if elapsed > SLOW_HANDLER_THRESHOLD {
                warn!(
                    "listener '{}' took {}ms to process event {:?}",
                    baked.listener_name,
                    elapsed.as_millis(),
                    event
                );
            }
        }
    }

    /// Snapshot of dispatch statistics for monitoring.
    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            total_handlers: self.baked.iter().map(|entry| entry.value().len()).sum(),
            events_posted: self.counters.events_posted.load(Ordering::Relaxed),
            handler_invocations: self.counters.handler_invocations.load(Ordering::Relaxed),
            handler_failures: self.counters.handler_failures.load(Ordering::Relaxed),
        }
    }

    /// Rebuilds the baked table for one event type from the registration
    /// state, or drops it when nothing is registered. Call only with the
    /// registration lock held.
    fn bake(&self, registrations: &Registrations, event_type: TypeId) {
        match registrations.get(&event_type) {
            Some(priorities) => {
                let mut flat: Vec<BakedHandler> = Vec::new();
                for bucket in priorities.values() {
                    for listener_handlers in bucket.values() {
                        for handler in &listener_handlers.handlers {
                            flat.push(BakedHandler {
                                listener_name: listener_handlers.listener_name.clone(),
                                handler: handler.clone(),
                            });
                        }
                    }
                }
                self.baked.insert(event_type, Arc::from(flat));
            }
            None => {
                self.baked.remove(&event_type);
            }
        }
    }

    fn lock_registrations(&self) -> std::sync::MutexGuard<'_, Registrations> {
        // A poisoning panic came from inside this module's own bookkeeping,
        // never from listener code, so the state is still consistent.
        self.registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.baked.len())
            .finish()
    }
}

fn listener_key<L: Listener>(listener: &Arc<L>) -> ListenerKey {
    Arc::as_ptr(listener) as *const () as usize
}
