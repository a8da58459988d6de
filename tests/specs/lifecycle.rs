// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core lifecycle scenarios: clean runs, dynamic outputs, failures.

use crate::prelude::run_process;
use wf_core::{Bundle, BundleValue};
use wf_engine::test_support::{
    DummyProcess, DummyProcessWithOutput, EventRecorder, ExceptionProcess, StateRecorder,
};
use wf_engine::{EngineError, EventLoop, ProcessState};

#[test]
fn dummy_process_returns_empty_outputs() {
    let (_lp, handle, result) = run_process(DummyProcess, None, None);
    assert_eq!(result.unwrap(), BundleValue::Map(Bundle::new()));
    assert_eq!(handle.state(), ProcessState::Stopped);
}

#[test]
fn dummy_process_state_history() {
    let mut event_loop = EventLoop::new();
    let recorder = StateRecorder::new();
    event_loop.monitor().add_listener(recorder.clone());

    let handle = event_loop.create_process(DummyProcess, None, None).unwrap();
    event_loop.run_until_complete(handle.future(), None).unwrap();

    assert_eq!(
        recorder.history(),
        vec![
            ProcessState::Created,
            ProcessState::Running,
            ProcessState::Stopped,
        ]
    );
}

#[test]
fn dynamic_output_process_emits_default_five() {
    let mut inputs = Bundle::new();
    inputs.set("a", 1);

    let mut event_loop = EventLoop::new();
    let recorder = EventRecorder::new();
    let handle = event_loop
        .create_process(DummyProcessWithOutput, Some(inputs), Some("out-1".into()))
        .unwrap();
    recorder.attach(event_loop.bus(), "process.out-1.emitted");

    let result = event_loop.run_until_complete(handle.future(), None).unwrap();
    match result {
        BundleValue::Map(outputs) => assert_eq!(outputs.get_int("default").unwrap(), 5),
        other => panic!("expected outputs map, got {other:?}"),
    }

    // Exactly one emitted event carrying (port, value, dynamic)
    let events = recorder.events();
    assert_eq!(events.len(), 1);
    let body = events[0].1.as_ref().and_then(BundleValue::as_map).unwrap();
    assert_eq!(body.get_str("port").unwrap(), "default");
    assert_eq!(body.get_int("value").unwrap(), 5);
    assert!(body.get_bool("dynamic").unwrap());
}

#[test]
fn exception_in_run_fails_the_process() {
    let mut event_loop = EventLoop::new();
    let recorder = EventRecorder::new();
    let handle = event_loop
        .create_process(ExceptionProcess, None, Some("x-1".into()))
        .unwrap();
    recorder.attach(event_loop.bus(), "process.x-1.*");

    let result = event_loop.run_until_complete(handle.future(), None);

    // The result future carries the same failure the process holds
    let failure = match result {
        Err(EngineError::Failed(failure)) => failure,
        other => panic!("expected failure, got {other:?}"),
    };
    assert_eq!(failure.message, "boom");
    assert_eq!(handle.state(), ProcessState::Failed);
    assert_eq!(handle.failure(), Some(failure.clone()));
    assert_eq!(
        handle.future().failure(None).unwrap(),
        Some(failure)
    );

    // stop is not fired on failure, destroy is
    let names = recorder.names();
    assert!(!names.contains(&"process.x-1.stop".to_string()));
    assert!(names.contains(&"process.x-1.fail".to_string()));
    assert!(names.contains(&"process.x-1.destroy".to_string()));
}

#[test]
fn every_transition_in_history_is_allowed() {
    // Run a mix of processes and validate each observed history against the
    // transition table
    let histories = [
        run_history(DummyProcess),
        run_history(DummyProcessWithOutput),
        run_history(ExceptionProcess),
    ];
    for history in histories {
        for pair in history.windows(2) {
            assert!(
                pair[0].can_transition(pair[1]),
                "illegal transition {} -> {} observed",
                pair[0],
                pair[1]
            );
        }
    }
}

fn run_history<L: wf_engine::ProcessLogic + 'static>(logic: L) -> Vec<ProcessState> {
    let mut event_loop = EventLoop::new();
    let recorder = StateRecorder::new();
    event_loop.monitor().add_listener(recorder.clone());
    let handle = event_loop.create_process(logic, None, None).unwrap();
    let _ = event_loop.run_until_complete(handle.future(), None);
    recorder.history()
}
