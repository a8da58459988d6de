// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reusable processes and recorders for tests.
//!
//! Enabled with the `test-support` feature so downstream crates can drive
//! real lifecycles without redeclaring the same fixtures.

use crate::error::{EngineError, Failure};
use crate::monitor::MonitorListener;
use crate::process::{Process, ProcessLogic, StepContext, StepResult, StepReturn};
use crate::state::ProcessState;
use crate::wait::WaitOn;
use crate::wait_ons::{Checkpoint, WaitForSignal};
use parking_lot::Mutex;
use std::sync::Arc;
use wf_core::{Bundle, BundleValue, EventBus, ListenerId, ProcessSpec, SpecError};

/// Does nothing and stops.
#[derive(Default)]
pub struct DummyProcess;

impl ProcessLogic for DummyProcess {
    fn kind(&self) -> &'static str {
        "dummy"
    }

    fn run(&mut self, _ctx: &mut StepContext<'_>) -> StepResult {
        Ok(StepReturn::Finish)
    }
}

/// Dynamic I/O; emits `default = 5`.
#[derive(Default)]
pub struct DummyProcessWithOutput;

impl ProcessLogic for DummyProcessWithOutput {
    fn kind(&self) -> &'static str {
        "dummy_with_output"
    }

    fn define(spec: &mut ProcessSpec) -> Result<(), SpecError> {
        spec.dynamic_input()?;
        spec.dynamic_output()
    }

    fn run(&mut self, ctx: &mut StepContext<'_>) -> StepResult {
        ctx.out("default", 5)?;
        Ok(StepReturn::Finish)
    }
}

/// Passes one checkpoint, then finishes.
#[derive(Default)]
pub struct ProcessWithCheckpoint;

impl ProcessLogic for ProcessWithCheckpoint {
    fn kind(&self) -> &'static str {
        "with_checkpoint"
    }

    fn run(&mut self, _ctx: &mut StepContext<'_>) -> StepResult {
        Ok(StepReturn::wait(Checkpoint::new(), "finish"))
    }

    fn continuations(&self) -> &'static [&'static str] {
        &["finish"]
    }

    fn resume(
        &mut self,
        step: &str,
        _wait_on: Option<Box<dyn WaitOn>>,
        _ctx: &mut StepContext<'_>,
    ) -> StepResult {
        match step {
            "finish" => Ok(StepReturn::Finish),
            other => Err(Failure::new(
                "UnknownContinuation",
                format!("no continuation named '{other}'"),
            )),
        }
    }
}

/// Emits, then passes two checkpoints before finishing.
#[derive(Default)]
pub struct TwoCheckpoint;

impl ProcessLogic for TwoCheckpoint {
    fn kind(&self) -> &'static str {
        "two_checkpoint"
    }

    fn define(spec: &mut ProcessSpec) -> Result<(), SpecError> {
        spec.dynamic_output()
    }

    fn run(&mut self, ctx: &mut StepContext<'_>) -> StepResult {
        ctx.out("test", 5)?;
        Ok(StepReturn::wait(Checkpoint::new(), "middle_step"))
    }

    fn continuations(&self) -> &'static [&'static str] {
        &["middle_step", "finish"]
    }

    fn resume(
        &mut self,
        step: &str,
        _wait_on: Option<Box<dyn WaitOn>>,
        _ctx: &mut StepContext<'_>,
    ) -> StepResult {
        match step {
            "middle_step" => Ok(StepReturn::wait(Checkpoint::new(), "finish")),
            "finish" => Ok(StepReturn::Finish),
            other => Err(Failure::new(
                "UnknownContinuation",
                format!("no continuation named '{other}'"),
            )),
        }
    }
}

/// Two checkpoints, the second with no continuation.
#[derive(Default)]
pub struct TwoCheckpointNoFinish;

impl ProcessLogic for TwoCheckpointNoFinish {
    fn kind(&self) -> &'static str {
        "two_checkpoint_no_finish"
    }

    fn define(spec: &mut ProcessSpec) -> Result<(), SpecError> {
        spec.dynamic_output()
    }

    fn run(&mut self, ctx: &mut StepContext<'_>) -> StepResult {
        ctx.out("test", 5)?;
        Ok(StepReturn::wait(Checkpoint::new(), "middle_step"))
    }

    fn continuations(&self) -> &'static [&'static str] {
        &["middle_step"]
    }

    fn resume(
        &mut self,
        step: &str,
        _wait_on: Option<Box<dyn WaitOn>>,
        _ctx: &mut StepContext<'_>,
    ) -> StepResult {
        match step {
            "middle_step" => Ok(StepReturn::wait_then_stop(Checkpoint::new())),
            other => Err(Failure::new(
                "UnknownContinuation",
                format!("no continuation named '{other}'"),
            )),
        }
    }
}

/// Emits, then fails.
#[derive(Default)]
pub struct ExceptionProcess;

impl ProcessLogic for ExceptionProcess {
    fn kind(&self) -> &'static str {
        "exception"
    }

    fn define(spec: &mut ProcessSpec) -> Result<(), SpecError> {
        spec.dynamic_output()
    }

    fn run(&mut self, ctx: &mut StepContext<'_>) -> StepResult {
        ctx.out("test", 5)?;
        Err(Failure::message("boom"))
    }
}

/// Suspends on an external signal; keep a clone of [`signal`](Self::signal)
/// to release it.
#[derive(Clone, Default)]
pub struct WaitForSignalProcess {
    signal: WaitForSignal,
}

impl WaitForSignalProcess {
    pub fn signal(&self) -> WaitForSignal {
        self.signal.clone()
    }
}

impl ProcessLogic for WaitForSignalProcess {
    fn kind(&self) -> &'static str {
        "wait_for_signal_process"
    }

    fn run(&mut self, _ctx: &mut StepContext<'_>) -> StepResult {
        Ok(StepReturn::wait(self.signal.clone(), "finish"))
    }

    fn continuations(&self) -> &'static [&'static str] {
        &["finish"]
    }

    fn resume(
        &mut self,
        step: &str,
        _wait_on: Option<Box<dyn WaitOn>>,
        _ctx: &mut StepContext<'_>,
    ) -> StepResult {
        match step {
            "finish" => Ok(StepReturn::Finish),
            other => Err(Failure::new(
                "UnknownContinuation",
                format!("no continuation named '{other}'"),
            )),
        }
    }
}

/// Records the state history of monitored processes.
#[derive(Default)]
pub struct StateRecorder {
    history: Mutex<Vec<ProcessState>>,
}

impl StateRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn history(&self) -> Vec<ProcessState> {
        self.history.lock().clone()
    }
}

impl MonitorListener for StateRecorder {
    fn on_monitored_process_created(&self, _process: &Process) {
        self.history.lock().push(ProcessState::Created);
    }

    fn on_monitored_process_run(&self, _process: &Process) {
        self.history.lock().push(ProcessState::Running);
    }

    fn on_monitored_process_wait(&self, _process: &Process) {
        self.history.lock().push(ProcessState::Waiting);
    }

    fn on_monitored_process_stopped(&self, _process: &Process) {
        self.history.lock().push(ProcessState::Stopped);
    }

    fn on_monitored_process_failed(&self, _process: &Process) {
        self.history.lock().push(ProcessState::Failed);
    }
}

/// Records `(event, body)` pairs from a bus subscription.
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<(String, Option<BundleValue>)>>,
}

impl EventRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe the recorder to a bus under the given pattern.
    pub fn attach(self: &Arc<Self>, bus: &EventBus, pattern: &str) -> ListenerId {
        let recorder = Arc::clone(self);
        bus.start_listening(pattern, move |event, body| {
            recorder.events.lock().push((event.to_string(), body.cloned()));
            Ok(())
        })
    }

    pub fn events(&self) -> Vec<(String, Option<BundleValue>)> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

/// A point-in-time snapshot of a process.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: ProcessState,
    pub bundle: Bundle,
    pub outputs: Bundle,
}

/// Snapshot a process's instance state.
pub fn snapshot(process: &Process) -> Result<Snapshot, EngineError> {
    let mut bundle = Bundle::new();
    process.save_instance_state(&mut bundle)?;
    Ok(Snapshot {
        state: process.state(),
        bundle,
        outputs: process.outputs().clone(),
    })
}

/// Saves a snapshot at every lifecycle notification.
#[derive(Default)]
pub struct ProcessSaver {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl ProcessSaver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().clone()
    }

    fn save(&self, process: &Process) {
        match snapshot(process) {
            Ok(snap) => self.snapshots.lock().push(snap),
            Err(e) => tracing::warn!(pid = %process.pid(), error = %e, "snapshot failed"),
        }
    }
}

impl MonitorListener for ProcessSaver {
    fn on_monitored_process_run(&self, process: &Process) {
        self.save(process);
    }

    fn on_monitored_process_wait(&self, process: &Process) {
        self.save(process);
    }

    fn on_monitored_process_finish(&self, process: &Process) {
        self.save(process);
    }

    fn on_monitored_process_stopped(&self, process: &Process) {
        self.save(process);
    }

    fn on_monitored_process_failed(&self, process: &Process) {
        self.save(process);
    }
}
