// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event routing: wildcard dispatch and per-pid isolation.

use wf_engine::test_support::{DummyProcess, EventRecorder};
use wf_engine::EventLoop;

#[test]
fn wildcard_and_pid_scoped_listeners() {
    let mut event_loop = EventLoop::new();

    // L1: any process's finish; L2: everything from one pid
    let finish_listener = EventRecorder::new();
    finish_listener.attach(event_loop.bus(), "process.*.finish");
    let pid_listener = EventRecorder::new();
    pid_listener.attach(event_loop.bus(), "process.p1.*");

    let handle = event_loop
        .create_process(DummyProcess, None, Some("p1".into()))
        .unwrap();
    event_loop.run_until_complete(handle.future(), None).unwrap();

    // Both listeners saw exactly one finish for p1
    assert_eq!(finish_listener.names(), vec!["process.p1.finish"]);
    let pid_events = pid_listener.names();
    assert_eq!(
        pid_events
            .iter()
            .filter(|name| name.as_str() == "process.p1.finish")
            .count(),
        1
    );

    // A different pid finishing reaches only the finish listener
    let handle = event_loop
        .create_process(DummyProcess, None, Some("p2".into()))
        .unwrap();
    event_loop.run_until_complete(handle.future(), None).unwrap();

    assert_eq!(
        finish_listener.names(),
        vec!["process.p1.finish", "process.p2.finish"]
    );
    assert_eq!(pid_listener.names(), pid_events);
}

#[test]
fn pid_scoped_pattern_sees_full_lifecycle() {
    let mut event_loop = EventLoop::new();
    let recorder = EventRecorder::new();
    recorder.attach(event_loop.bus(), "process.p1.*");

    let handle = event_loop
        .create_process(DummyProcess, None, Some("p1".into()))
        .unwrap();
    event_loop.run_until_complete(handle.future(), None).unwrap();

    assert_eq!(
        recorder.names(),
        vec![
            "process.p1.start",
            "process.p1.run",
            "process.p1.finish",
            "process.p1.stop",
            "process.p1.destroy",
        ]
    );
}

#[test]
fn lifecycle_events_deliver_in_emission_order() {
    let mut event_loop = EventLoop::new();
    let all = EventRecorder::new();
    all.attach(event_loop.bus(), "process.#");

    let handle = event_loop
        .create_process(DummyProcess, None, Some("p1".into()))
        .unwrap();
    event_loop.run_until_complete(handle.future(), None).unwrap();

    let names = all.names();
    let start = names.iter().position(|n| n.ends_with(".start")).unwrap();
    let run = names.iter().position(|n| n.ends_with(".run")).unwrap();
    let finish = names.iter().position(|n| n.ends_with(".finish")).unwrap();
    let stop = names.iter().position(|n| n.ends_with(".stop")).unwrap();
    let destroy = names.iter().position(|n| n.ends_with(".destroy")).unwrap();
    assert!(start < run && run < finish && finish < stop && stop < destroy);
}
