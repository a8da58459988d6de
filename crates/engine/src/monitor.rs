// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry and event hub for live processes.
//!
//! A monitor is injected at loop construction; sharing one instance across
//! loops gives the original's "process-wide" registry semantics. Listener
//! sets are snapshotted before delivery, so listeners may register or
//! deregister (themselves included) during a notification without holding
//! any lock across the callbacks.

use crate::error::EngineError;
use crate::process::Process;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use wf_core::{process_event, BundleValue, EventBus, ProcessEvent, ProcessId};

/// Handle identifying a registered monitor listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorListenerId(u64);

/// Typed notifications about monitored processes. All hooks default to
/// no-ops; implementations receive the live process by reference and must
/// not block or try to lock it.
#[allow(unused_variables)]
pub trait MonitorListener: Send + Sync {
    /// A fresh process was created and registered.
    fn on_monitored_process_created(&self, process: &Process) {}

    /// A checkpointed process was reloaded and registered.
    fn on_monitored_process_registered(&self, process: &Process) {}

    fn on_monitored_process_run(&self, process: &Process) {}

    fn on_monitored_process_wait(&self, process: &Process) {}

    fn on_monitored_process_finish(&self, process: &Process) {}

    fn on_monitored_process_stopped(&self, process: &Process) {}

    fn on_monitored_process_failed(&self, process: &Process) {}
}

#[derive(Default)]
struct MonitorInner {
    procs: HashMap<ProcessId, Weak<Mutex<Process>>>,
    listeners: Vec<(MonitorListenerId, Arc<dyn MonitorListener>)>,
    next_listener: u64,
}

/// Process registry plus monitor event bus.
pub struct ProcessMonitor {
    inner: Mutex<MonitorInner>,
    bus: EventBus,
}

impl ProcessMonitor {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MonitorInner::default()),
            bus: EventBus::new(),
        }
    }

    /// The monitor's own bus; it mirrors every `process.<pid>.<name>`
    /// lifecycle event plus `created`/`registered`.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn add_listener(&self, listener: Arc<dyn MonitorListener>) -> MonitorListenerId {
        let mut inner = self.inner.lock();
        inner.next_listener += 1;
        let id = MonitorListenerId(inner.next_listener);
        inner.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: MonitorListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
        inner.listeners.len() != before
    }

    /// Look up a live process by pid.
    pub fn find(&self, pid: &ProcessId) -> Option<Arc<Mutex<Process>>> {
        self.inner.lock().procs.get(pid).and_then(Weak::upgrade)
    }

    /// Pids of all live processes.
    pub fn pids(&self) -> Vec<ProcessId> {
        let inner = self.inner.lock();
        inner
            .procs
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(pid, _)| pid.clone())
            .collect()
    }

    /// All live processes.
    pub fn processes(&self) -> Vec<Arc<Mutex<Process>>> {
        let inner = self.inner.lock();
        inner.procs.values().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .procs
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a live process. The pid must be unique across the registry.
    pub(crate) fn register(
        &self,
        pid: &ProcessId,
        cell: &Arc<Mutex<Process>>,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.procs.get(pid) {
            if existing.strong_count() > 0 {
                return Err(EngineError::DuplicatePid(pid.to_string()));
            }
        }
        inner.procs.insert(pid.clone(), Arc::downgrade(cell));
        Ok(())
    }

    pub(crate) fn deregister(&self, pid: &ProcessId) {
        self.inner.lock().procs.remove(pid);
    }

    fn snapshot(&self) -> Vec<Arc<dyn MonitorListener>> {
        self.inner
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Mirror a lifecycle event onto the monitor bus.
    pub(crate) fn emit_event(
        &self,
        pid: &ProcessId,
        event: ProcessEvent,
        body: Option<&BundleValue>,
    ) {
        self.bus.emit(&process_event(pid, event), body);
    }

    fn emit_named(&self, pid: &ProcessId, name: &str) {
        self.bus.emit(&format!("process.{pid}.{name}"), None);
    }

    pub(crate) fn notify_created(&self, process: &Process) {
        for listener in self.snapshot() {
            listener.on_monitored_process_created(process);
        }
        self.emit_named(process.pid(), "created");
    }

    pub(crate) fn notify_registered(&self, process: &Process) {
        for listener in self.snapshot() {
            listener.on_monitored_process_registered(process);
        }
        self.emit_named(process.pid(), "registered");
    }

    pub(crate) fn notify_run(&self, process: &Process) {
        for listener in self.snapshot() {
            listener.on_monitored_process_run(process);
        }
    }

    pub(crate) fn notify_wait(&self, process: &Process) {
        for listener in self.snapshot() {
            listener.on_monitored_process_wait(process);
        }
    }

    pub(crate) fn notify_finish(&self, process: &Process) {
        for listener in self.snapshot() {
            listener.on_monitored_process_finish(process);
        }
    }

    pub(crate) fn notify_stopped(&self, process: &Process) {
        for listener in self.snapshot() {
            listener.on_monitored_process_stopped(process);
        }
    }

    pub(crate) fn notify_failed(&self, process: &Process) {
        for listener in self.snapshot() {
            listener.on_monitored_process_failed(process);
        }
    }
}

impl Default for ProcessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
