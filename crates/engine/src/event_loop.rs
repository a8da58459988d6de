// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-threaded cooperative event loop.
//!
//! The loop owns its tasks and drives each by at most one step per tick, in
//! insertion order. A tick drains the deferred queue, sweeps a snapshot of
//! the ticking set, and drains the deferred queue again. Tasks suspend by
//! returning a wait future from `tick()`; a done-callback on that future
//! re-arms ticking. Tasks never preempt each other.

use crate::error::{EngineError, Failure};
use crate::future::{CallbackId, Future};
use crate::monitor::ProcessMonitor;
use crate::process::{Process, ProcessHandle, ProcessLogic};
use crate::registry::ProcessRegistry;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wf_core::{Bundle, BundleValue, Clock, EventBus, ProcessId, ProcessSpec, SystemClock};

type DeferredFn = Box<dyn FnOnce(&mut EventLoop) + Send>;

/// The outcome of one task step.
pub enum TickOutcome {
    /// Keep ticking next round.
    Continue,
    /// Stop ticking until the given future is done.
    Suspend(Future),
    /// The task is done; resolve its future and remove it.
    Terminated(BundleValue),
    /// The task failed; fail its future and remove it.
    Failed(Failure),
}

/// A loop-resident ticking object.
pub trait Task: Send {
    /// Stable identity of this task within the loop.
    fn uuid(&self) -> Uuid;

    /// Called when the task is inserted; stores the loop back-pointer.
    /// A task already in a loop must reject re-insertion.
    fn on_inserted(&mut self, handle: LoopHandle, future: Future) -> Result<(), EngineError>;

    /// Called when the task is removed; clears the loop back-pointer.
    fn on_removed(&mut self);

    /// Advance by one step.
    fn tick(&mut self) -> TickOutcome;

    /// Informational: the loop started or stopped ticking this task.
    fn set_ticking(&mut self, _ticking: bool) {}
}

struct LoopShared {
    loop_id: Uuid,
    bus: EventBus,
    deferred: Mutex<VecDeque<DeferredFn>>,
}

/// Cheaply clonable handle onto a loop: carries the deferred queue and the
/// loop's event bus, and is safe to use from other threads.
#[derive(Clone)]
pub struct LoopHandle {
    shared: Arc<LoopShared>,
}

impl LoopHandle {
    pub fn loop_id(&self) -> Uuid {
        self.shared.loop_id
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    /// Enqueue a one-shot callback to run on the loop thread at the next
    /// deferred-queue drain.
    pub fn call_soon<F>(&self, f: F)
    where
        F: FnOnce(&mut EventLoop) + Send + 'static,
    {
        self.shared.deferred.lock().push_back(Box::new(f));
    }

    /// Create a pending future bound to this loop.
    pub fn create_future(&self) -> Future {
        Future::new(self.clone())
    }

    fn take_deferred(&self) -> Vec<DeferredFn> {
        let mut queue = self.shared.deferred.lock();
        queue.drain(..).collect()
    }

    fn deferred_is_empty(&self) -> bool {
        self.shared.deferred.lock().is_empty()
    }
}

struct TaskEntry {
    task: Arc<Mutex<dyn Task>>,
    future: Future,
    /// Wait future and our resume callback on it, while suspended.
    wait: Option<(Future, CallbackId)>,
}

/// Single-threaded cooperative scheduler of tasks and deferred callbacks.
pub struct EventLoop {
    handle: LoopHandle,
    clock: Arc<dyn Clock>,
    monitor: Arc<ProcessMonitor>,
    objects: IndexMap<Uuid, TaskEntry>,
    ticking: Vec<Uuid>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::with(Arc::new(ProcessMonitor::new()), Arc::new(SystemClock))
    }

    /// Build a loop with an injected monitor (share one monitor across loops
    /// for process-wide registry semantics) and clock.
    pub fn with(monitor: Arc<ProcessMonitor>, clock: Arc<dyn Clock>) -> Self {
        Self {
            handle: LoopHandle {
                shared: Arc::new(LoopShared {
                    loop_id: Uuid::new_v4(),
                    bus: EventBus::new(),
                    deferred: Mutex::new(VecDeque::new()),
                }),
            },
            clock,
            monitor,
            objects: IndexMap::new(),
            ticking: Vec::new(),
        }
    }

    pub fn handle(&self) -> &LoopHandle {
        &self.handle
    }

    pub fn bus(&self) -> &EventBus {
        self.handle.bus()
    }

    pub fn monitor(&self) -> &Arc<ProcessMonitor> {
        &self.monitor
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// No objects and nothing deferred.
    pub fn is_idle(&self) -> bool {
        self.objects.is_empty() && self.handle.deferred_is_empty()
    }

    /// Enqueue a one-shot callback for the next deferred drain.
    pub fn call_soon<F>(&self, f: F)
    where
        F: FnOnce(&mut EventLoop) + Send + 'static,
    {
        self.handle.call_soon(f);
    }

    /// Insert a task and start ticking it. Double insertion is an error.
    pub fn insert(&mut self, task: Arc<Mutex<dyn Task>>) -> Result<Future, EngineError> {
        let uuid = task.lock().uuid();
        if self.objects.contains_key(&uuid) {
            return Err(EngineError::AlreadyInLoop);
        }
        let future = Future::new(self.handle.clone());
        task.lock().on_inserted(self.handle.clone(), future.clone())?;
        self.objects.insert(
            uuid,
            TaskEntry {
                task: Arc::clone(&task),
                future: future.clone(),
                wait: None,
            },
        );
        self.ticking.push(uuid);
        task.lock().set_ticking(true);
        Ok(future)
    }

    /// Remove a task from the loop, detaching any pending wait callback.
    pub fn remove(&mut self, uuid: Uuid) -> Result<(), EngineError> {
        let entry = self
            .objects
            .shift_remove(&uuid)
            .ok_or(EngineError::NotInLoop)?;
        self.ticking.retain(|u| *u != uuid);
        if let Some((wait_future, callback)) = entry.wait {
            wait_future.remove_done_callback(callback);
        }
        entry.task.lock().on_removed();
        Ok(())
    }

    pub fn is_ticking(&self, uuid: Uuid) -> bool {
        self.ticking.contains(&uuid)
    }

    /// Resume ticking a task (no-op if already ticking).
    pub fn start_ticking(&mut self, uuid: Uuid) -> Result<(), EngineError> {
        let entry = self.objects.get_mut(&uuid).ok_or(EngineError::NotInLoop)?;
        if !self.ticking.contains(&uuid) {
            self.ticking.push(uuid);
            entry.task.lock().set_ticking(true);
        }
        Ok(())
    }

    /// Stop ticking a task without removing it.
    pub fn stop_ticking(&mut self, uuid: Uuid) -> Result<(), EngineError> {
        let entry = self.objects.get_mut(&uuid).ok_or(EngineError::NotInLoop)?;
        if self.ticking.contains(&uuid) {
            self.ticking.retain(|u| *u != uuid);
            entry.task.lock().set_ticking(false);
        }
        Ok(())
    }

    fn resume_task(&mut self, uuid: Uuid) {
        if let Some(entry) = self.objects.get_mut(&uuid) {
            entry.wait = None;
            if !self.ticking.contains(&uuid) {
                self.ticking.push(uuid);
                entry.task.lock().set_ticking(true);
            }
        }
    }

    fn drain_deferred(&mut self) {
        let batch = self.handle.take_deferred();
        for callback in batch {
            callback(self);
        }
    }

    /// Run one scheduling round: drain deferred callbacks, sweep a snapshot
    /// of the ticking set advancing each task by at most one step, then
    /// drain deferred callbacks once more.
    pub fn tick(&mut self) {
        self.drain_deferred();

        let sweep: Vec<Uuid> = self.ticking.clone();
        for uuid in sweep {
            // Skip tasks removed or suspended earlier in this sweep
            if !self.ticking.contains(&uuid) {
                continue;
            }
            let (task, future) = match self.objects.get(&uuid) {
                Some(entry) => (Arc::clone(&entry.task), entry.future.clone()),
                None => continue,
            };

            // A cancelled task is removed without stepping
            if future.cancelled() {
                let _ = self.remove(uuid);
                continue;
            }

            let outcome = task.lock().tick();
            match outcome {
                TickOutcome::Continue => {}
                TickOutcome::Suspend(wait_future) => {
                    let _ = self.stop_ticking(uuid);
                    let callback =
                        wait_future.add_done_callback(move |event_loop, _| {
                            event_loop.resume_task(uuid);
                        });
                    if let Some(entry) = self.objects.get_mut(&uuid) {
                        entry.wait = Some((wait_future, callback));
                    }
                }
                TickOutcome::Terminated(result) => {
                    if future.set_result(result).is_err() {
                        tracing::error!(%uuid, "task terminated but its future was already resolved");
                    }
                    let _ = self.remove(uuid);
                }
                TickOutcome::Failed(failure) => {
                    if future.set_failure(failure).is_err() {
                        tracing::error!(%uuid, "task failed but its future was already resolved");
                    }
                    let _ = self.remove(uuid);
                }
            }
        }

        self.drain_deferred();
    }

    /// Tick until the given future is done, or until the optional deadline.
    pub fn run_until_complete(
        &mut self,
        future: &Future,
        timeout: Option<Duration>,
    ) -> Result<BundleValue, EngineError> {
        let deadline = timeout.map(|t| self.clock.now() + t);
        loop {
            if future.done() {
                return future.result(Some(Duration::ZERO));
            }
            if let Some(deadline) = deadline {
                if self.clock.now() >= deadline {
                    return Err(EngineError::Timeout);
                }
            }
            self.tick();
            if self.ticking.is_empty() && self.handle.deferred_is_empty() && !future.done() {
                // Everything is suspended; wait briefly for an external signal
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    // -- process construction --

    /// Construct a process from a logic value, validate its inputs, insert
    /// it, and return a handle.
    ///
    /// Input validation failures are reported synchronously.
    pub fn create_process<L>(
        &mut self,
        logic: L,
        inputs: Option<Bundle>,
        pid: Option<ProcessId>,
    ) -> Result<ProcessHandle, EngineError>
    where
        L: ProcessLogic + 'static,
    {
        let mut spec = ProcessSpec::new();
        L::define(&mut spec)?;
        spec.seal();
        self.create_with_spec(Box::new(logic), spec, inputs, pid)
    }

    /// Like [`create_process`](Self::create_process) with an explicit spec,
    /// for boxed logic (e.g. from a registry factory).
    pub fn create_with_spec(
        &mut self,
        logic: Box<dyn ProcessLogic>,
        spec: ProcessSpec,
        inputs: Option<Bundle>,
        pid: Option<ProcessId>,
    ) -> Result<ProcessHandle, EngineError> {
        let process = Process::new(
            logic,
            spec,
            inputs.unwrap_or_default(),
            pid,
            Arc::clone(&self.monitor),
            self.clock.epoch_ms(),
        )?;
        self.insert_process(process, false)
    }

    /// Instantiate a registered process type by its kind string.
    pub fn create_from_registry(
        &mut self,
        registry: &ProcessRegistry,
        kind: &str,
        inputs: Option<Bundle>,
        pid: Option<ProcessId>,
    ) -> Result<ProcessHandle, EngineError> {
        let (logic, spec) = registry.instantiate(kind)?;
        self.create_with_spec(logic, spec, inputs, pid)
    }

    /// Resurrect a checkpointed process from its saved bundle.
    ///
    /// The process resumes ticking from its saved state on the next tick.
    pub fn restore(
        &mut self,
        registry: &ProcessRegistry,
        bundle: &Bundle,
    ) -> Result<ProcessHandle, EngineError> {
        let process = Process::create_from(registry, bundle, Arc::clone(&self.monitor))?;
        self.insert_process(process, true)
    }

    fn insert_process(
        &mut self,
        process: Process,
        loaded: bool,
    ) -> Result<ProcessHandle, EngineError> {
        let pid = process.pid().clone();
        let uuid = Task::uuid(&process);
        if self.objects.contains_key(&uuid) {
            return Err(EngineError::AlreadyInLoop);
        }
        let cell = Arc::new(Mutex::new(process));
        self.monitor.register(&pid, &cell)?;

        let future = Future::new(self.handle.clone());
        {
            let mut process = cell.lock();
            if let Err(e) = process.on_inserted(self.handle.clone(), future.clone()) {
                drop(process);
                self.monitor.deregister(&pid);
                return Err(e);
            }
        }

        let task: Arc<Mutex<dyn Task>> = cell.clone();
        self.objects.insert(
            uuid,
            TaskEntry {
                task,
                future: future.clone(),
                wait: None,
            },
        );
        self.ticking.push(uuid);
        {
            let mut process = cell.lock();
            process.set_ticking(true);
            if loaded {
                self.monitor.notify_registered(&process);
            } else {
                self.monitor.notify_created(&process);
            }
        }

        Ok(ProcessHandle::new(pid, uuid, future, cell))
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "event_loop_tests.rs"]
mod tests;
