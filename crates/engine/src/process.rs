// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process: a loop task implementing the lifecycle state machine.
//!
//! User code implements [`ProcessLogic`]; the engine wraps it in a
//! [`Process`] which owns validated inputs, append-only outputs, the state
//! holder, and the bus/monitor wiring. Each tick executes the current state
//! once. Step failures move the process to FAILED; entry hooks fire the
//! matching `process.<pid>.<name>` event.

use crate::error::{EngineError, Failure};
use crate::event_loop::{LoopHandle, Task, TickOutcome};
use crate::future::Future;
use crate::monitor::ProcessMonitor;
use crate::registry::ProcessRegistry;
use crate::state::ProcessState;
use crate::wait::WaitOn;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wf_core::{
    process_event, Bundle, BundleValue, ProcessEvent, ProcessId, ProcessSpec, SpecError, DYNAMIC,
};

/// What a step tells the engine to do next.
pub enum StepReturn {
    /// The process is done; move to STOPPED.
    Finish,
    /// Suspend on the wait; when it resolves, run the named continuation
    /// (or stop if `then` is `None`).
    Wait {
        on: Box<dyn WaitOn>,
        then: Option<String>,
    },
}

impl StepReturn {
    /// Suspend on `on`, continuing with the named continuation.
    pub fn wait(on: impl WaitOn + 'static, then: &str) -> Self {
        StepReturn::Wait {
            on: Box::new(on),
            then: Some(then.to_string()),
        }
    }

    /// Suspend on `on`; stop when it resolves.
    pub fn wait_then_stop(on: impl WaitOn + 'static) -> Self {
        StepReturn::Wait {
            on: Box::new(on),
            then: None,
        }
    }
}

pub type StepResult = Result<StepReturn, Failure>;

/// The authoring surface of a process.
///
/// `run` is the initial step; continuations are stable names declared in
/// [`continuations`](Self::continuations) and dispatched through
/// [`resume`](Self::resume) — checkpoints persist the name, never a code
/// pointer. All lifecycle hooks default to no-ops; the engine performs the
/// mandatory bookkeeping itself, so hooks are pure notifications.
#[allow(unused_variables)]
pub trait ProcessLogic: Send + 'static {
    /// Stable registry identifier for this process type.
    fn kind(&self) -> &'static str;

    /// Declare inputs and outputs.
    fn define(spec: &mut ProcessSpec) -> Result<(), SpecError>
    where
        Self: Sized,
    {
        Ok(())
    }

    /// The initial step.
    fn run(&mut self, ctx: &mut StepContext<'_>) -> StepResult;

    /// The continuation names this process may resume with.
    fn continuations(&self) -> &'static [&'static str] {
        &[]
    }

    /// Run the named continuation after its wait resolved. `wait_on` is the
    /// resolved wait when resuming in-memory, `None` after a reload.
    fn resume(
        &mut self,
        step: &str,
        wait_on: Option<Box<dyn WaitOn>>,
        ctx: &mut StepContext<'_>,
    ) -> StepResult {
        Err(Failure::new(
            "UnknownContinuation",
            format!("no continuation named '{step}'"),
        ))
    }

    // -- lifecycle hooks --

    /// Entering CREATED; `saved` is the checkpoint bundle when reloading.
    fn on_create(&mut self, saved: Option<&Bundle>) -> Result<(), Failure> {
        Ok(())
    }

    fn on_start(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    fn on_run(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    fn on_wait(&mut self, wait_kind: &str) -> Result<(), Failure> {
        Ok(())
    }

    fn on_resume(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    fn on_finish(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    fn on_abort(&mut self, msg: Option<&str>) -> Result<(), Failure> {
        Ok(())
    }

    fn on_stop(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    /// Entering FAILED; errors here are logged, never propagated.
    fn on_fail(&mut self, failure: &Failure) -> Result<(), Failure> {
        Ok(())
    }

    fn on_destroy(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    /// An output was emitted during the step that just returned.
    fn on_output_emitted(
        &mut self,
        port: &str,
        value: &BundleValue,
        dynamic: bool,
    ) -> Result<(), Failure> {
        Ok(())
    }

    // -- user-state persistence --

    fn save_state(&self, out: &mut Bundle) -> Result<(), EngineError> {
        Ok(())
    }

    fn load_state(&mut self, saved: &Bundle) -> Result<(), EngineError> {
        Ok(())
    }
}

/// What a step sees: validated inputs, the output emitter, and the loop.
pub struct StepContext<'a> {
    pid: &'a ProcessId,
    spec: &'a ProcessSpec,
    inputs: &'a Bundle,
    outputs: &'a mut Bundle,
    handle: &'a LoopHandle,
    monitor: &'a ProcessMonitor,
    emitted: &'a mut Vec<(String, BundleValue, bool)>,
}

impl StepContext<'_> {
    pub fn pid(&self) -> &ProcessId {
        self.pid
    }

    pub fn inputs(&self) -> &Bundle {
        self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&BundleValue> {
        self.inputs.get(name)
    }

    pub fn outputs(&self) -> &Bundle {
        self.outputs
    }

    /// The loop handle, for building waits that need the bus.
    pub fn handle(&self) -> &LoopHandle {
        self.handle
    }

    /// Emit a value on an output port.
    ///
    /// The port must be declared unless the spec has a dynamic output; the
    /// value must match the port's kind; a port emits at most once.
    pub fn out(&mut self, port: &str, value: impl Into<BundleValue>) -> Result<(), Failure> {
        let value = value.into();
        if self.outputs.contains(port) {
            return Err(Failure::new(
                "OutputAlreadySet",
                format!("output '{port}' was already emitted"),
            ));
        }
        let dynamic = match self.spec.get_output(port) {
            Some(declared) => {
                declared
                    .validate(&value)
                    .map_err(|m| Failure::new("InvalidOutput", m))?;
                false
            }
            None => match self.spec.get_output(DYNAMIC) {
                Some(dynamic_port) => {
                    dynamic_port
                        .validate(&value)
                        .map_err(|m| Failure::new("InvalidOutput", m))?;
                    true
                }
                None => {
                    return Err(Failure::new(
                        "UnknownOutput",
                        format!(
                            "unknown output '{port}'; declare dynamic_output() to allow undeclared outputs"
                        ),
                    ))
                }
            },
        };

        self.outputs.set(port, value.clone());

        let mut body = Bundle::new();
        body.set("port", port);
        body.set("value", value.clone());
        body.set("dynamic", dynamic);
        let body = BundleValue::Map(body);
        let event = process_event(self.pid, ProcessEvent::Emitted);
        self.handle.bus().emit(&event, Some(&body));
        self.monitor
            .emit_event(self.pid, ProcessEvent::Emitted, Some(&body));

        self.emitted.push((port.to_string(), value, dynamic));
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) enum ExecTarget {
    Run,
    Continuation(String),
}

impl ExecTarget {
    fn name(&self) -> &str {
        match self {
            ExecTarget::Run => "run",
            ExecTarget::Continuation(name) => name,
        }
    }

    fn load(name: &str, logic: &dyn ProcessLogic) -> Result<Self, EngineError> {
        if name == "run" {
            return Ok(ExecTarget::Run);
        }
        if logic.continuations().contains(&name) {
            Ok(ExecTarget::Continuation(name.to_string()))
        } else {
            Err(EngineError::UnknownContinuation(name.to_string()))
        }
    }
}

pub(crate) enum StateHolder {
    Created,
    Running {
        exec: ExecTarget,
        wait_on: Option<Box<dyn WaitOn>>,
    },
    Waiting {
        wait_on: Option<Box<dyn WaitOn>>,
        then: Option<String>,
        future: Option<Future>,
    },
    Stopped {
        abort: bool,
        abort_msg: Option<String>,
    },
    Failed {
        failure: Failure,
    },
}

impl StateHolder {
    fn label(&self) -> ProcessState {
        match self {
            StateHolder::Created => ProcessState::Created,
            StateHolder::Running { .. } => ProcessState::Running,
            StateHolder::Waiting { .. } => ProcessState::Waiting,
            StateHolder::Stopped { .. } => ProcessState::Stopped,
            StateHolder::Failed { .. } => ProcessState::Failed,
        }
    }
}

/// A user process inside the engine: a loop task with the lifecycle state
/// machine, validated inputs, and append-only outputs.
pub struct Process {
    uuid: Uuid,
    pid: ProcessId,
    logic: Box<dyn ProcessLogic>,
    spec: ProcessSpec,
    raw_inputs: Bundle,
    inputs: Bundle,
    outputs: Bundle,
    creation_time: u64,
    state: StateHolder,
    handle: Option<LoopHandle>,
    future: Option<Future>,
    monitor: Arc<ProcessMonitor>,
    playing: bool,
    destroyed: bool,
}

impl Process {
    pub(crate) fn new(
        logic: Box<dyn ProcessLogic>,
        spec: ProcessSpec,
        raw_inputs: Bundle,
        pid: Option<ProcessId>,
        monitor: Arc<ProcessMonitor>,
        creation_time: u64,
    ) -> Result<Self, EngineError> {
        let inputs = spec.validate(&raw_inputs).map_err(EngineError::InvalidInput)?;
        let mut process = Self {
            uuid: Uuid::new_v4(),
            pid: pid.unwrap_or_else(ProcessId::generate),
            logic,
            spec,
            raw_inputs,
            inputs,
            outputs: Bundle::new(),
            creation_time,
            state: StateHolder::Created,
            handle: None,
            future: None,
            monitor,
            playing: false,
            destroyed: false,
        };
        process
            .logic
            .on_create(None)
            .map_err(EngineError::Failed)?;
        Ok(process)
    }

    // -- accessors --

    pub fn pid(&self) -> &ProcessId {
        &self.pid
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn state(&self) -> ProcessState {
        self.state.label()
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn raw_inputs(&self) -> &Bundle {
        &self.raw_inputs
    }

    pub fn inputs(&self) -> &Bundle {
        &self.inputs
    }

    pub fn outputs(&self) -> &Bundle {
        &self.outputs
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    /// Whether the loop is currently ticking this process.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn aborted(&self) -> bool {
        matches!(self.state, StateHolder::Stopped { abort: true, .. })
    }

    pub fn abort_msg(&self) -> Option<String> {
        match &self.state {
            StateHolder::Stopped { abort_msg, .. } => abort_msg.clone(),
            _ => None,
        }
    }

    /// Populated iff the process is FAILED.
    pub fn failure(&self) -> Option<&Failure> {
        match &self.state {
            StateHolder::Failed { failure } => Some(failure),
            _ => None,
        }
    }

    /// The kind of the wait this process is suspended on, if WAITING.
    pub fn waiting_on(&self) -> Option<&'static str> {
        match &self.state {
            StateHolder::Waiting {
                wait_on: Some(wait_on),
                ..
            } => Some(wait_on.kind()),
            _ => None,
        }
    }

    pub fn has_terminated(&self) -> bool {
        self.state.label().is_terminal()
    }

    // -- lifecycle --

    /// Abort the process. Legal from CREATED, RUNNING, and WAITING; moves
    /// straight to STOPPED with the aborted flag set and cancels a held
    /// wait future.
    pub fn abort(&mut self, msg: Option<&str>) -> Result<(), EngineError> {
        let from = self.state.label();
        match from {
            ProcessState::Created | ProcessState::Running | ProcessState::Waiting => {
                let wait_future = match &mut self.state {
                    StateHolder::Waiting { future, .. } => future.take(),
                    _ => None,
                };
                self.set_state(StateHolder::Stopped {
                    abort: true,
                    abort_msg: msg.map(str::to_string),
                })
                .map_err(EngineError::Failed)?;
                if let Some(future) = wait_future {
                    future.cancel();
                }
                Ok(())
            }
            _ => Err(EngineError::IllegalTransition {
                from,
                to: ProcessState::Stopped,
            }),
        }
    }

    fn execute(&mut self) -> Result<TickOutcome, Failure> {
        tracing::debug!(pid = %self.pid, state = %self.state.label(), "executing state");
        match self.state.label() {
            ProcessState::Created => {
                self.set_state(StateHolder::Running {
                    exec: ExecTarget::Run,
                    wait_on: None,
                })?;
                Ok(TickOutcome::Continue)
            }
            ProcessState::Running => {
                let (exec, wait_on) = match &mut self.state {
                    StateHolder::Running { exec, wait_on } => (exec.clone(), wait_on.take()),
                    _ => return Err(Failure::new("internal", "expected running state")),
                };
                match self.run_step(&exec, wait_on)? {
                    StepReturn::Finish => {
                        self.set_state(StateHolder::Stopped {
                            abort: false,
                            abort_msg: None,
                        })?;
                    }
                    StepReturn::Wait { on, then } => {
                        if let Some(name) = &then {
                            if !self.logic.continuations().contains(&name.as_str()) {
                                return Err(Failure::new(
                                    "UnknownContinuation",
                                    format!("process declares no continuation named '{name}'"),
                                ));
                            }
                        }
                        self.set_state(StateHolder::Waiting {
                            wait_on: Some(on),
                            then,
                            future: None,
                        })?;
                    }
                }
                Ok(TickOutcome::Continue)
            }
            ProcessState::Waiting => self.execute_waiting(),
            ProcessState::Stopped => {
                self.terminate();
                Ok(TickOutcome::Terminated(BundleValue::Map(
                    self.outputs.clone(),
                )))
            }
            ProcessState::Failed => {
                let failure = self
                    .failure()
                    .cloned()
                    .unwrap_or_else(|| Failure::message("process failed"));
                self.terminate();
                Ok(TickOutcome::Failed(failure))
            }
        }
    }

    fn execute_waiting(&mut self) -> Result<TickOutcome, Failure> {
        let handle = self
            .handle
            .clone()
            .ok_or_else(|| Failure::new("NotInLoop", "process is not attached to a loop"))?;

        // Arm the wait's future once
        let armed = match &mut self.state {
            StateHolder::Waiting {
                wait_on, future, ..
            } => {
                if future.is_none() {
                    let wait = wait_on
                        .as_mut()
                        .ok_or_else(|| Failure::new("internal", "waiting state has no wait on"))?;
                    *future = Some(wait.make_future(&handle).map_err(Failure::from)?);
                }
                future.clone()
            }
            _ => return Err(Failure::new("internal", "expected waiting state")),
        };
        let future = armed.ok_or_else(|| Failure::new("internal", "wait future missing"))?;

        if !future.done() {
            return Ok(TickOutcome::Suspend(future));
        }
        if future.cancelled() {
            // An abort would have moved us to STOPPED already; a cancelled
            // wait without an abort cannot continue.
            return Err(Failure::new("WaitCancelled", "wait future was cancelled"));
        }
        if let Some(failure) = future.failure(Some(Duration::ZERO)).map_err(Failure::from)? {
            return Err(failure);
        }

        let (wait_on, then) = match &mut self.state {
            StateHolder::Waiting { wait_on, then, .. } => (wait_on.take(), then.take()),
            _ => (None, None),
        };
        match then {
            Some(name) => self.set_state(StateHolder::Running {
                exec: ExecTarget::Continuation(name),
                wait_on,
            })?,
            None => self.set_state(StateHolder::Stopped {
                abort: false,
                abort_msg: None,
            })?,
        }
        Ok(TickOutcome::Continue)
    }

    fn run_step(
        &mut self,
        exec: &ExecTarget,
        wait_on: Option<Box<dyn WaitOn>>,
    ) -> Result<StepReturn, Failure> {
        let Process {
            ref pid,
            ref spec,
            ref inputs,
            ref mut outputs,
            ref mut logic,
            ref handle,
            ref monitor,
            ..
        } = *self;
        let handle = handle
            .as_ref()
            .ok_or_else(|| Failure::new("NotInLoop", "process is not attached to a loop"))?;

        let mut emitted = Vec::new();
        let result = {
            let mut ctx = StepContext {
                pid,
                spec,
                inputs,
                outputs,
                handle,
                monitor: monitor.as_ref(),
                emitted: &mut emitted,
            };
            match exec {
                ExecTarget::Run => logic.run(&mut ctx),
                ExecTarget::Continuation(name) => logic.resume(name, wait_on, &mut ctx),
            }
        };

        // The logic is exclusively borrowed during its own step, so emission
        // hooks are delivered right after it returns.
        for (port, value, dynamic) in emitted {
            if let Err(e) = logic.on_output_emitted(&port, &value, dynamic) {
                tracing::warn!(pid = %pid, port, error = %e, "error in on_output_emitted hook");
            }
        }

        result
    }

    fn set_state(&mut self, new: StateHolder) -> Result<(), Failure> {
        let prev = self.state.label();
        let next = new.label();
        if !prev.can_transition(next) {
            return Err(Failure::new(
                "IllegalTransition",
                format!("cannot transition from '{prev}' to '{next}'"),
            ));
        }
        tracing::debug!(pid = %self.pid, from = %prev, to = %next, "state transition");
        self.state = new;
        self.enter_state(prev)
    }

    fn enter_state(&mut self, prev: ProcessState) -> Result<(), Failure> {
        let monitor = Arc::clone(&self.monitor);
        match self.state.label() {
            ProcessState::Created => {}
            ProcessState::Running => {
                match prev {
                    ProcessState::Created => {
                        self.logic.on_start()?;
                        self.emit_event(ProcessEvent::Start, None);
                    }
                    ProcessState::Waiting => {
                        self.logic.on_resume()?;
                        self.emit_event(ProcessEvent::Resume, None);
                    }
                    ProcessState::Running => {}
                    other => {
                        return Err(Failure::new(
                            "IllegalTransition",
                            format!("cannot enter RUNNING from '{other}'"),
                        ))
                    }
                }
                self.logic.on_run()?;
                self.emit_event(ProcessEvent::Run, None);
                monitor.notify_run(self);
            }
            ProcessState::Waiting => {
                let kind = self.waiting_on().unwrap_or("unknown");
                self.logic.on_wait(kind)?;
                let mut body = Bundle::new();
                body.set("wait_on", kind);
                self.emit_event(ProcessEvent::Wait, Some(BundleValue::Map(body)));
                monitor.notify_wait(self);
            }
            ProcessState::Stopped => {
                let (abort, abort_msg) = match &self.state {
                    StateHolder::Stopped { abort, abort_msg } => (*abort, abort_msg.clone()),
                    _ => (false, None),
                };
                if abort {
                    self.logic.on_abort(abort_msg.as_deref())?;
                } else {
                    match prev {
                        ProcessState::Running => {
                            self.check_outputs()?;
                            self.logic.on_finish()?;
                            self.emit_event(ProcessEvent::Finish, None);
                            monitor.notify_finish(self);
                        }
                        // A wait with no continuation completes the process
                        ProcessState::Waiting => {}
                        other => {
                            return Err(Failure::new(
                                "IllegalTransition",
                                format!("cannot enter STOPPED from '{other}'"),
                            ))
                        }
                    }
                }
                self.logic.on_stop()?;
                let body = abort_msg.map(|msg| {
                    let mut b = Bundle::new();
                    b.set("abort_msg", msg);
                    BundleValue::Map(b)
                });
                self.emit_event(ProcessEvent::Stop, body);
            }
            ProcessState::Failed => {
                let failure = self
                    .failure()
                    .cloned()
                    .unwrap_or_else(|| Failure::message("process failed"));
                // Errors in on_fail must not mask the original failure
                if let Err(e) = self.logic.on_fail(&failure) {
                    tracing::error!(pid = %self.pid, error = %e, "error in on_fail hook");
                }
                let mut body = Bundle::new();
                body.set("error_type", failure.error_type.clone());
                body.set("message", failure.message.clone());
                self.emit_event(ProcessEvent::Fail, Some(BundleValue::Map(body)));
            }
        }
        Ok(())
    }

    fn enter_failed(&mut self, failure: Failure) {
        let prev = self.state.label();
        tracing::error!(pid = %self.pid, state = %prev, error = %failure, "process failed");
        self.state = StateHolder::Failed { failure };
        if let Err(e) = self.enter_state(prev) {
            tracing::error!(pid = %self.pid, error = %e, "error entering failed state");
        }
    }

    fn check_outputs(&self) -> Result<(), Failure> {
        for name in self.spec.required_outputs() {
            if !self.outputs.contains(name) {
                return Err(Failure::new(
                    "MissingOutput",
                    format!("required output '{name}' was never emitted"),
                ));
            }
        }
        Ok(())
    }

    /// Deregister, notify, and fire destroy. Observable exactly once.
    fn terminate(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let monitor = Arc::clone(&self.monitor);
        monitor.deregister(&self.pid);
        match self.state.label() {
            ProcessState::Stopped => monitor.notify_stopped(self),
            ProcessState::Failed => monitor.notify_failed(self),
            _ => {}
        }
        if let Err(e) = self.logic.on_destroy() {
            tracing::warn!(pid = %self.pid, error = %e, "error in on_destroy hook");
        }
        self.emit_event(ProcessEvent::Destroy, None);
    }

    fn emit_event(&self, event: ProcessEvent, body: Option<BundleValue>) {
        let name = process_event(&self.pid, event);
        if let Some(handle) = &self.handle {
            handle.bus().emit(&name, body.as_ref());
        }
        self.monitor.emit_event(&self.pid, event, body.as_ref());
    }

    // -- persistence --

    /// Serialize the full instance state into a bundle.
    ///
    /// Fails with [`EngineError::Unsupported`] when suspended on an
    /// unsavable wait.
    pub fn save_instance_state(&self, out: &mut Bundle) -> Result<(), EngineError> {
        out.set_class_name(self.logic.kind());
        out.set("pid", self.pid.as_str());
        out.set("state", self.state.label().as_str());
        out.set("creation_time", self.creation_time);
        out.set("raw_inputs", self.raw_inputs.clone());
        out.set("outputs", self.outputs.clone());
        match self.failure() {
            Some(failure) => out.set(
                "exc_info",
                BundleValue::List(vec![
                    failure.error_type.clone().into(),
                    failure.message.clone().into(),
                    BundleValue::Null,
                ]),
            ),
            None => out.set("exc_info", BundleValue::Null),
        }
        out.set("aborted", self.aborted());
        out.set("abort_msg", self.abort_msg());

        let mut state_data = Bundle::new();
        match &self.state {
            StateHolder::Created | StateHolder::Failed { .. } => {}
            StateHolder::Running { exec, .. } => {
                state_data.set("exec_func", exec.name());
            }
            StateHolder::Waiting { wait_on, then, .. } => {
                state_data.set("callback", then.clone());
                let wait = wait_on.as_ref().ok_or_else(|| {
                    EngineError::Malformed("waiting state has no wait on to save".to_string())
                })?;
                let mut wait_bundle = Bundle::new();
                wait.save_state(&mut wait_bundle)?;
                state_data.set("wait_on", wait_bundle);
            }
            StateHolder::Stopped { abort, abort_msg } => {
                state_data.set("abort", *abort);
                state_data.set("abort_msg", abort_msg.clone());
            }
        }
        out.set("state_data", state_data);

        let mut logic_state = Bundle::new();
        self.logic.save_state(&mut logic_state)?;
        out.set("logic_state", logic_state);
        Ok(())
    }

    /// Reconstruct a process from a saved bundle via the registry.
    pub(crate) fn create_from(
        registry: &ProcessRegistry,
        bundle: &Bundle,
        monitor: Arc<ProcessMonitor>,
    ) -> Result<Self, EngineError> {
        let kind = bundle.class_name()?;
        let (mut logic, spec) = registry.instantiate(kind)?;
        if let Ok(saved) = bundle.get_bundle("logic_state") {
            logic.load_state(saved)?;
        }

        let pid = ProcessId::new(bundle.get_str("pid")?);
        let raw_inputs = bundle.get_bundle("raw_inputs")?.clone();
        let inputs = spec.validate(&raw_inputs).map_err(EngineError::InvalidInput)?;
        let outputs = bundle.get_bundle("outputs")?.clone();
        let creation_time = bundle.get_int("creation_time")? as u64;
        let label = bundle.get_str("state")?;
        let label = ProcessState::parse(label)
            .ok_or_else(|| EngineError::Malformed(format!("unknown state label '{label}'")))?;
        let state_data = bundle.get_bundle("state_data")?;

        let state = match label {
            ProcessState::Created => StateHolder::Created,
            ProcessState::Running => StateHolder::Running {
                exec: ExecTarget::load(state_data.get_str("exec_func")?, logic.as_ref())?,
                wait_on: None,
            },
            ProcessState::Waiting => {
                let then = state_data.get_opt_str("callback")?.map(str::to_string);
                if let Some(name) = &then {
                    // Resolve eagerly so a stale checkpoint fails at load
                    ExecTarget::load(name, logic.as_ref())?;
                }
                let wait_on = registry.load_wait_on(state_data.get_bundle("wait_on")?)?;
                StateHolder::Waiting {
                    wait_on: Some(wait_on),
                    then,
                    future: None,
                }
            }
            ProcessState::Stopped => StateHolder::Stopped {
                abort: state_data.get_bool("abort").unwrap_or(false),
                abort_msg: state_data.get_opt_str("abort_msg")?.map(str::to_string),
            },
            ProcessState::Failed => {
                let exc_info = bundle.get_list("exc_info")?;
                StateHolder::Failed {
                    failure: failure_from_exc_info(exc_info)?,
                }
            }
        };

        let mut process = Self {
            uuid: Uuid::new_v4(),
            pid,
            logic,
            spec,
            raw_inputs,
            inputs,
            outputs,
            creation_time,
            state,
            handle: None,
            future: None,
            monitor,
            playing: false,
            destroyed: false,
        };
        process
            .logic
            .on_create(Some(bundle))
            .map_err(EngineError::Failed)?;
        Ok(process)
    }
}

fn failure_from_exc_info(exc_info: &[BundleValue]) -> Result<Failure, EngineError> {
    match exc_info {
        [BundleValue::Str(error_type), BundleValue::Str(message), _] => {
            Ok(Failure::new(error_type.clone(), message.clone()))
        }
        _ => Err(EngineError::Malformed(
            "exc_info must be a [type, message, null] triple".to_string(),
        )),
    }
}

impl Task for Process {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn on_inserted(&mut self, handle: LoopHandle, future: Future) -> Result<(), EngineError> {
        if self.handle.is_some() {
            return Err(EngineError::AlreadyInLoop);
        }
        self.handle = Some(handle);
        self.future = Some(future);
        Ok(())
    }

    fn on_removed(&mut self) {
        self.handle = None;
        self.playing = false;
    }

    fn tick(&mut self) -> TickOutcome {
        match self.execute() {
            Ok(outcome) => outcome,
            Err(failure) => {
                if self.state.label().is_terminal() {
                    tracing::error!(pid = %self.pid, error = %failure, "failure in terminal state");
                    TickOutcome::Failed(failure)
                } else {
                    self.enter_failed(failure);
                    TickOutcome::Continue
                }
            }
        }
    }

    fn set_ticking(&mut self, ticking: bool) {
        self.playing = ticking;
    }
}

/// Clonable handle onto a process living inside a loop.
#[derive(Clone)]
pub struct ProcessHandle {
    pid: ProcessId,
    uuid: Uuid,
    future: Future,
    cell: Arc<Mutex<Process>>,
}

impl ProcessHandle {
    pub(crate) fn new(
        pid: ProcessId,
        uuid: Uuid,
        future: Future,
        cell: Arc<Mutex<Process>>,
    ) -> Self {
        Self {
            pid,
            uuid,
            future,
            cell,
        }
    }

    pub fn pid(&self) -> &ProcessId {
        &self.pid
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The process's result future: outputs on STOPPED, the failure on
    /// FAILED.
    pub fn future(&self) -> &Future {
        &self.future
    }

    pub fn state(&self) -> ProcessState {
        self.cell.lock().state()
    }

    pub fn outputs(&self) -> Bundle {
        self.cell.lock().outputs().clone()
    }

    pub fn aborted(&self) -> bool {
        self.cell.lock().aborted()
    }

    pub fn abort_msg(&self) -> Option<String> {
        self.cell.lock().abort_msg()
    }

    pub fn failure(&self) -> Option<Failure> {
        self.cell.lock().failure().cloned()
    }

    pub fn is_playing(&self) -> bool {
        self.cell.lock().is_playing()
    }

    pub fn abort(&self, msg: Option<&str>) -> Result<(), EngineError> {
        self.cell.lock().abort(msg)
    }

    /// Snapshot the process's instance state.
    pub fn save(&self) -> Result<Bundle, EngineError> {
        let mut bundle = Bundle::new();
        self.cell.lock().save_instance_state(&mut bundle)?;
        Ok(bundle)
    }

    /// Run a closure against the live process.
    pub fn with_process<T>(&self, f: impl FnOnce(&Process) -> T) -> T {
        f(&self.cell.lock())
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
