// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wf-engine: cooperative event loop, futures, and the process lifecycle
//! state machine.

pub mod controller;
pub mod error;
pub mod event_loop;
pub mod future;
pub mod monitor;
pub mod process;
pub mod registry;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod wait;
pub mod wait_ons;

pub use controller::ProcessController;
pub use error::{EngineError, Failure};
pub use event_loop::{EventLoop, LoopHandle, Task, TickOutcome};
pub use future::{CallbackId, Future};
pub use monitor::{MonitorListener, MonitorListenerId, ProcessMonitor};
pub use process::{Process, ProcessHandle, ProcessLogic, StepContext, StepResult, StepReturn};
pub use registry::ProcessRegistry;
pub use state::ProcessState;
pub use wait::{Outcome, WaitCore, WaitOn};
pub use wait_ons::{Checkpoint, WaitForSignal, WaitOnEvent, WaitOnProcessEvent};
