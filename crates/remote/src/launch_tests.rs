// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::broker::InMemoryBroker;
use serde_json::json;
use wf_engine::test_support::{DummyProcess, DummyProcessWithOutput};
use wf_engine::ProcessState;

fn setup() -> (InMemoryBroker, LaunchPublisher, LaunchSubscriber, EventLoop, ProcessRegistry) {
    let broker = InMemoryBroker::new();
    let publisher = LaunchPublisher::new(std::sync::Arc::new(broker.clone()));
    let subscriber = LaunchSubscriber::new(&broker);
    let event_loop = EventLoop::new();
    let mut registry = ProcessRegistry::new();
    registry.register::<DummyProcess>();
    registry.register::<DummyProcessWithOutput>();
    (broker, publisher, subscriber, event_loop, registry)
}

#[test]
fn published_request_launches_a_process() {
    let (_broker, publisher, subscriber, mut event_loop, registry) = setup();

    publisher
        .launch(&LaunchRequest::new("dummy").with_pid("remote-1"))
        .unwrap();

    let launched = subscriber.pump(&mut event_loop, &registry);
    assert_eq!(launched, vec![ProcessId::new("remote-1")]);
    assert_eq!(event_loop.object_count(), 1);

    let cell = event_loop.monitor().find(&ProcessId::new("remote-1")).unwrap();
    assert_eq!(cell.lock().state(), ProcessState::Created);
}

#[test]
fn inputs_are_passed_through() {
    let (_broker, publisher, subscriber, mut event_loop, registry) = setup();

    publisher
        .launch(
            &LaunchRequest::new("dummy_with_output")
                .with_inputs(json!({"a": 1}))
                .with_pid("remote-2"),
        )
        .unwrap();
    subscriber.pump(&mut event_loop, &registry);

    let cell = event_loop.monitor().find(&ProcessId::new("remote-2")).unwrap();
    let raw = cell.lock().raw_inputs().clone();
    assert_eq!(raw.get_int("a").unwrap(), 1);
}

#[test]
fn unknown_class_is_skipped() {
    let (_broker, publisher, subscriber, mut event_loop, registry) = setup();

    publisher.launch(&LaunchRequest::new("nope")).unwrap();
    publisher.launch(&LaunchRequest::new("dummy")).unwrap();

    let launched = subscriber.pump(&mut event_loop, &registry);
    assert_eq!(launched.len(), 1);
    assert_eq!(event_loop.object_count(), 1);
}

#[test]
fn malformed_request_is_skipped() {
    let (broker, _publisher, subscriber, mut event_loop, registry) = setup();

    broker.publish(LAUNCH_KEY, json!("not an object")).unwrap();
    assert!(subscriber.pump(&mut event_loop, &registry).is_empty());
}

#[test]
fn launched_process_runs_to_completion() {
    let (_broker, publisher, subscriber, mut event_loop, registry) = setup();

    publisher
        .launch(&LaunchRequest::new("dummy_with_output").with_pid("r1"))
        .unwrap();
    let launched = subscriber.pump(&mut event_loop, &registry);
    assert_eq!(launched.len(), 1);

    let cell = event_loop.monitor().find(&ProcessId::new("r1")).unwrap();
    while !cell.lock().has_terminated() {
        event_loop.tick();
    }
    assert_eq!(cell.lock().state(), ProcessState::Stopped);
    assert_eq!(cell.lock().outputs().get_int("default").unwrap(), 5);
}

#[test]
fn request_serialization_round_trips() {
    let request = LaunchRequest::new("demo")
        .with_inputs(json!({"k": "v"}))
        .with_pid("p1");
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["class"], "demo");
    assert_eq!(json["inputs"]["k"], "v");
    assert_eq!(json["pid"], "p1");

    let parsed: LaunchRequest = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.class, "demo");
    assert_eq!(parsed.pid.as_deref(), Some("p1"));
}
