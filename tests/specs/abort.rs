// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abort semantics, including aborting a process suspended on a wait.

use crate::prelude::tick_until_state;
use wf_engine::test_support::{EventRecorder, WaitForSignalProcess};
use wf_engine::{EventLoop, ProcessState};

#[test]
fn abort_a_waiting_process() {
    let mut event_loop = EventLoop::new();
    let logic = WaitForSignalProcess::default();
    let signal = logic.signal();
    let handle = event_loop
        .create_process(logic, None, Some("w1".into()))
        .unwrap();

    let recorder = EventRecorder::new();
    recorder.attach(event_loop.bus(), "process.w1.stop");

    // Suspend on the signal, with the wait future armed
    tick_until_state(&mut event_loop, &handle, ProcessState::Waiting);
    while signal.future().is_none() {
        event_loop.tick();
    }
    assert!(!handle.future().done());

    handle.abort(Some("user")).unwrap();
    event_loop.tick();

    assert_eq!(handle.state(), ProcessState::Stopped);
    assert!(handle.aborted());
    assert_eq!(handle.abort_msg(), Some("user".to_string()));
    assert!(signal.future().is_some_and(|f| f.cancelled()));
    assert!(handle.future().done());

    // on_stop fired exactly once
    assert_eq!(recorder.count(), 1);
}

#[test]
fn aborted_process_still_resolves_outputs() {
    let mut event_loop = EventLoop::new();
    let logic = WaitForSignalProcess::default();
    let handle = event_loop.create_process(logic, None, None).unwrap();

    tick_until_state(&mut event_loop, &handle, ProcessState::Waiting);
    handle.abort(None).unwrap();

    let result = event_loop.run_until_complete(handle.future(), None).unwrap();
    assert_eq!(result, wf_core::BundleValue::Map(wf_core::Bundle::new()));
}

#[test]
fn signal_after_abort_is_too_late() {
    let mut event_loop = EventLoop::new();
    let logic = WaitForSignalProcess::default();
    let signal = logic.signal();
    let handle = event_loop.create_process(logic, None, None).unwrap();

    tick_until_state(&mut event_loop, &handle, ProcessState::Waiting);
    handle.abort(None).unwrap();
    event_loop.tick();
    assert_eq!(handle.state(), ProcessState::Stopped);

    // The signal can still be decided, but the process stays stopped
    signal.continue_().unwrap();
    event_loop.tick();
    assert_eq!(handle.state(), ProcessState::Stopped);
    assert!(handle.aborted());
}
