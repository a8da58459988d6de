// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provided wait-on implementations.

use crate::error::EngineError;
use crate::event_loop::LoopHandle;
use crate::future::Future;
use crate::wait::{load_outcome, save_outcome, Outcome, WaitCore, WaitOn};
use parking_lot::Mutex;
use std::sync::Arc;
use wf_core::{
    process_event_pattern, Bundle, BundleValue, EventBus, ListenerError, ListenerId, ProcessEvent,
    ProcessId,
};

/// A trivially-ready wait used as a state-save boundary: the process
/// suspends, persistence listeners get a chance to snapshot it, and it
/// resumes on the next tick.
#[derive(Clone)]
pub struct Checkpoint {
    core: WaitCore,
}

impl Checkpoint {
    pub const KIND: &'static str = "checkpoint";

    pub fn new() -> Self {
        Self {
            core: WaitCore::with_outcome(Some(Outcome::success())),
        }
    }

    pub fn load(bundle: &Bundle) -> Result<Self, EngineError> {
        Ok(Self {
            core: WaitCore::with_outcome(load_outcome(bundle)?),
        })
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitOn for Checkpoint {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outcome(&self) -> Option<Outcome> {
        self.core.outcome()
    }

    fn make_future(&mut self, handle: &LoopHandle) -> Result<Future, EngineError> {
        self.core.make_future(handle)
    }

    fn save_state(&self, out: &mut Bundle) -> Result<(), EngineError> {
        save_outcome(Self::KIND, self.core.outcome().as_ref(), out);
        Ok(())
    }
}

/// A wait resolved by an external signal.
///
/// Clones share the resolution core: keep a clone and call
/// [`continue_`](Self::continue_) (or [`fail`](Self::fail)) to release the
/// waiting process.
#[derive(Clone, Default)]
pub struct WaitForSignal {
    core: WaitCore,
}

impl WaitForSignal {
    pub const KIND: &'static str = "wait_for_signal";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(bundle: &Bundle) -> Result<Self, EngineError> {
        Ok(Self {
            core: WaitCore::with_outcome(load_outcome(bundle)?),
        })
    }

    /// Release the waiter successfully.
    pub fn continue_(&self) -> Result<(), EngineError> {
        self.core.done(true, None)
    }

    /// Release the waiter with a failure.
    pub fn fail(&self, message: impl Into<String>) -> Result<(), EngineError> {
        self.core.done(false, Some(message.into()))
    }

    pub fn is_done(&self) -> bool {
        self.core.is_done()
    }

    /// The future the engine is currently waiting on, if armed.
    pub fn future(&self) -> Option<Future> {
        self.core.current_future()
    }
}

impl WaitOn for WaitForSignal {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outcome(&self) -> Option<Outcome> {
        self.core.outcome()
    }

    fn make_future(&mut self, handle: &LoopHandle) -> Result<Future, EngineError> {
        self.core.make_future(handle)
    }

    fn save_state(&self, out: &mut Bundle) -> Result<(), EngineError> {
        save_outcome(Self::KIND, self.core.outcome().as_ref(), out);
        Ok(())
    }
}

/// Waits for an event on a bus; resolves on the first match and then
/// unsubscribes itself. Not savable: the bus subscription only exists at
/// runtime.
pub struct WaitOnEvent {
    core: WaitCore,
    bus: EventBus,
    listener: Arc<Mutex<Option<ListenerId>>>,
    received: Arc<Mutex<Option<(String, Option<BundleValue>)>>>,
}

impl WaitOnEvent {
    pub const KIND: &'static str = "wait_on_event";

    /// Wait for any event matching the given string or pattern.
    pub fn new(bus: &EventBus, event: &str) -> Self {
        let core = WaitCore::new();
        let received: Arc<Mutex<Option<(String, Option<BundleValue>)>>> =
            Arc::new(Mutex::new(None));
        let listener: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

        let core_cb = core.clone();
        let received_cb = Arc::clone(&received);
        let listener_cb = Arc::clone(&listener);
        let bus_cb = bus.clone();
        let id = bus.start_listening(event, move |event, body| {
            if core_cb.is_done() {
                return Ok(());
            }
            *received_cb.lock() = Some((event.to_string(), body.cloned()));
            // Unsubscribe with our own listener id, then resolve
            if let Some(id) = *listener_cb.lock() {
                bus_cb.stop_listening(id);
            }
            core_cb
                .done(true, None)
                .map_err(|e| ListenerError::new(e.to_string()))
        });
        *listener.lock() = Some(id);

        Self {
            core,
            bus: bus.clone(),
            listener,
            received,
        }
    }

    /// The `(event, body)` pair that resolved this wait, if any.
    pub fn received(&self) -> Option<(String, Option<BundleValue>)> {
        self.received.lock().clone()
    }
}

impl Drop for WaitOnEvent {
    fn drop(&mut self) {
        if let Some(id) = self.listener.lock().take() {
            self.bus.stop_listening(id);
        }
    }
}

impl WaitOn for WaitOnEvent {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outcome(&self) -> Option<Outcome> {
        self.core.outcome()
    }

    fn make_future(&mut self, handle: &LoopHandle) -> Result<Future, EngineError> {
        self.core.make_future(handle)
    }

    fn save_state(&self, _out: &mut Bundle) -> Result<(), EngineError> {
        Err(EngineError::Unsupported(
            "a wait on a live event subscription cannot be saved".to_string(),
        ))
    }
}

/// Waits for a lifecycle event from a process, either or both of pid and
/// event name may be wildcards.
pub struct WaitOnProcessEvent {
    inner: WaitOnEvent,
}

impl WaitOnProcessEvent {
    pub const KIND: &'static str = "wait_on_process_event";

    pub fn new(bus: &EventBus, pid: Option<&ProcessId>, event: Option<ProcessEvent>) -> Self {
        let pattern = process_event_pattern(pid, event);
        Self {
            inner: WaitOnEvent::new(bus, &pattern),
        }
    }

    pub fn received(&self) -> Option<(String, Option<BundleValue>)> {
        self.inner.received()
    }
}

impl WaitOn for WaitOnProcessEvent {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn outcome(&self) -> Option<Outcome> {
        self.inner.outcome()
    }

    fn make_future(&mut self, handle: &LoopHandle) -> Result<Future, EngineError> {
        self.inner.make_future(handle)
    }

    fn save_state(&self, _out: &mut Bundle) -> Result<(), EngineError> {
        Err(EngineError::Unsupported(
            "a wait on a live event subscription cannot be saved".to_string(),
        ))
    }
}

#[cfg(test)]
#[path = "wait_ons_tests.rs"]
mod tests;
