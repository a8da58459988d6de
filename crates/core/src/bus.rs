// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! String-routed event bus with wildcard subscriptions.
//!
//! Listeners subscribe to a literal event name or a `*`/`#` pattern and are
//! delivered `(event, body)` pairs. Delivery iterates a snapshot of the
//! listener sets, so listeners may subscribe or unsubscribe during delivery;
//! such changes only affect future events. Listener errors are logged and
//! skipped, they never interrupt dispatch.

use crate::bundle::BundleValue;
use crate::pattern::Pattern;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error a listener may return; logged by the bus and otherwise ignored.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Handle identifying a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerFn = dyn Fn(&str, Option<&BundleValue>) -> Result<(), ListenerError> + Send + Sync;

struct WildcardEntry {
    pattern: Pattern,
    listeners: IndexMap<ListenerId, Arc<ListenerFn>>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    specific: IndexMap<String, IndexMap<ListenerId, Arc<ListenerFn>>>,
    wildcard: IndexMap<String, WildcardEntry>,
}

impl BusInner {
    fn alloc_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }
}

/// Cheaply clonable event bus handle.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener to an event string or wildcard pattern.
    ///
    /// Returns a [`ListenerId`] for unsubscription. The same callback may be
    /// registered multiple times; each registration is independent.
    pub fn start_listening<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&str, Option<&BundleValue>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.alloc_id();
        let listener: Arc<ListenerFn> = Arc::new(listener);
        if Pattern::is_wildcard(event) {
            inner
                .wildcard
                .entry(event.to_string())
                .or_insert_with(|| WildcardEntry {
                    pattern: Pattern::compile(event),
                    listeners: IndexMap::new(),
                })
                .listeners
                .insert(id, listener);
        } else {
            inner
                .specific
                .entry(event.to_string())
                .or_default()
                .insert(id, listener);
        }
        id
    }

    /// Remove a subscription from every event it is registered under.
    ///
    /// Returns true if the listener was found.
    pub fn stop_listening(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let mut found = false;
        inner.specific.retain(|_, listeners| {
            found |= listeners.shift_remove(&id).is_some();
            !listeners.is_empty()
        });
        inner.wildcard.retain(|_, entry| {
            found |= entry.listeners.shift_remove(&id).is_some();
            !entry.listeners.is_empty()
        });
        found
    }

    /// Deliver an event to all matching listeners.
    ///
    /// Wildcard matches are delivered first, then specific matches, each in
    /// registration order. The listener sets are snapshotted before delivery.
    pub fn emit(&self, event: &str, body: Option<&BundleValue>) {
        let snapshot: Vec<Arc<ListenerFn>> = {
            let inner = self.inner.lock();
            let wildcard = inner
                .wildcard
                .values()
                .filter(|entry| entry.pattern.matches(event))
                .flat_map(|entry| entry.listeners.values().cloned());
            let specific = inner
                .specific
                .get(event)
                .into_iter()
                .flat_map(|listeners| listeners.values().cloned());
            wildcard.chain(specific).collect()
        };

        for listener in snapshot {
            if let Err(e) = listener(event, body) {
                tracing::warn!(event, error = %e, "event listener failed, skipping");
            }
        }
    }

    /// Number of active subscriptions (one per `start_listening` call).
    pub fn listener_count(&self) -> usize {
        let inner = self.inner.lock();
        let specific: usize = inner.specific.values().map(IndexMap::len).sum();
        let wildcard: usize = inner.wildcard.values().map(|e| e.listeners.len()).sum();
        specific + wildcard
    }

    /// Drop all subscriptions.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.specific.clear();
        inner.wildcard.clear();
    }

    /// Subscribe for the duration of the returned guard.
    pub fn listen_scope<F>(&self, event: &str, listener: F) -> ListenGuard
    where
        F: Fn(&str, Option<&BundleValue>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = self.start_listening(event, listener);
        ListenGuard {
            bus: self.clone(),
            id,
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// RAII subscription scope; unsubscribes on drop.
pub struct ListenGuard {
    bus: EventBus,
    id: ListenerId,
}

impl ListenGuard {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ListenGuard {
    fn drop(&mut self) {
        self.bus.stop_listening(self.id);
    }
}

/// An event bus that also forwards subscriptions to child buses, so a single
/// subscribe reaches events emitted on any child.
#[derive(Default)]
pub struct BusAggregator {
    bus: EventBus,
    inner: Mutex<AggregatorInner>,
}

#[derive(Default)]
struct AggregatorInner {
    children: Vec<EventBus>,
    /// event string -> (subscriber count, passthrough listener per child)
    events: IndexMap<String, EventForward>,
    /// which event each of our ListenerIds subscribes to
    ids: IndexMap<ListenerId, String>,
}

struct EventForward {
    count: usize,
    passthroughs: Vec<(EventBus, ListenerId)>,
}

impl BusAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_listening<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&str, Option<&BundleValue>) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = self.bus.start_listening(event, listener);
        let mut inner = self.inner.lock();
        inner.ids.insert(id, event.to_string());
        if let Some(forward) = inner.events.get_mut(event) {
            forward.count += 1;
            return id;
        }
        let passthroughs = inner
            .children
            .iter()
            .map(|child| (child.clone(), Self::attach_passthrough(&self.bus, child, event)))
            .collect();
        inner.events.insert(
            event.to_string(),
            EventForward {
                count: 1,
                passthroughs,
            },
        );
        id
    }

    pub fn stop_listening(&self, id: ListenerId) -> bool {
        if !self.bus.stop_listening(id) {
            return false;
        }
        let mut inner = self.inner.lock();
        let Some(event) = inner.ids.shift_remove(&id) else {
            return true;
        };
        let remove = match inner.events.get_mut(&event) {
            Some(forward) => {
                forward.count -= 1;
                forward.count == 0
            }
            None => false,
        };
        if remove {
            if let Some(forward) = inner.events.shift_remove(&event) {
                for (child, pass_id) in forward.passthroughs {
                    child.stop_listening(pass_id);
                }
            }
        }
        true
    }

    /// Emit an event on the aggregator itself.
    pub fn emit(&self, event: &str, body: Option<&BundleValue>) {
        self.bus.emit(event, body);
    }

    pub fn add_child(&self, child: &EventBus) {
        let mut inner = self.inner.lock();
        inner.children.push(child.clone());
        let events: Vec<String> = inner.events.keys().cloned().collect();
        for event in events {
            let id = Self::attach_passthrough(&self.bus, child, &event);
            if let Some(forward) = inner.events.get_mut(&event) {
                forward.passthroughs.push((child.clone(), id));
            }
        }
    }

    pub fn remove_child(&self, child: &EventBus) {
        let mut inner = self.inner.lock();
        inner
            .children
            .retain(|c| !Arc::ptr_eq(&c.inner, &child.inner));
        for forward in inner.events.values_mut() {
            forward.passthroughs.retain(|(c, id)| {
                if Arc::ptr_eq(&c.inner, &child.inner) {
                    c.stop_listening(*id);
                    false
                } else {
                    true
                }
            });
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().ids.len()
    }

    fn attach_passthrough(bus: &EventBus, child: &EventBus, event: &str) -> ListenerId {
        let bus = bus.clone();
        child.start_listening(event, move |event, body| {
            bus.emit(event, body);
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
