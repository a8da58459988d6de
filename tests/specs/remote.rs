// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote adapters end to end: launch over the broker, status broadcast,
//! and the fanout status request.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wf_engine::test_support::DummyProcessWithOutput;
use wf_engine::{EventLoop, ProcessRegistry, ProcessState};
use wf_remote::{
    Broker, InMemoryBroker, LaunchPublisher, LaunchRequest, LaunchSubscriber, StatusPublisher,
    StatusRequester, StatusResponder,
};

#[test]
fn launch_run_and_observe_status_over_the_broker() {
    let broker = Arc::new(InMemoryBroker::new());
    let mut event_loop = EventLoop::new();
    let mut registry = ProcessRegistry::new();
    registry.register::<DummyProcessWithOutput>();

    // Status events stream out under <pid>.<event>
    StatusPublisher::attach(event_loop.monitor(), broker.clone());
    let status_sub = broker.subscribe("r1.#");

    // Launch arrives over the broker and is pumped into the loop
    let publisher = LaunchPublisher::new(broker.clone());
    let subscriber = LaunchSubscriber::new(broker.as_ref());
    publisher
        .launch(
            &LaunchRequest::new("dummy_with_output")
                .with_inputs(json!({"a": 1}))
                .with_pid("r1"),
        )
        .unwrap();
    let launched = subscriber.pump(&mut event_loop, &registry);
    assert_eq!(launched.len(), 1);

    // Drive the launched process to completion
    let cell = event_loop.monitor().find(&launched[0]).unwrap();
    while !cell.lock().has_terminated() {
        event_loop.tick();
    }
    assert_eq!(cell.lock().state(), ProcessState::Stopped);

    let keys: Vec<String> = status_sub
        .drain()
        .into_iter()
        .map(|m| m.routing_key)
        .collect();
    assert!(keys.contains(&"r1.created".to_string()));
    assert!(keys.contains(&"r1.emitted".to_string()));
    assert!(keys.contains(&"r1.finish".to_string()));
    assert!(keys.contains(&"r1.stop".to_string()));
}

#[test]
fn status_fanout_reaches_every_responder() {
    let broker = Arc::new(InMemoryBroker::new());

    // Two "hosts", each with its own loop and responder
    let mut loop_a = EventLoop::new();
    let mut loop_b = EventLoop::new();
    loop_a
        .create_process(DummyProcessWithOutput, None, Some("a1".into()))
        .unwrap();
    loop_b
        .create_process(DummyProcessWithOutput, None, Some("b1".into()))
        .unwrap();

    let responder_a =
        StatusResponder::new(Arc::clone(loop_a.monitor()), broker.clone(), "host-a");
    let responder_b =
        StatusResponder::new(Arc::clone(loop_b.monitor()), broker.clone(), "host-b");

    let requester = StatusRequester::new(broker);
    let replies = requester.request().unwrap();
    assert_eq!(responder_a.pump(), 1);
    assert_eq!(responder_b.pump(), 1);

    let mut reports = requester.collect(&replies, Duration::from_millis(50));
    reports.sort_by(|a, b| a.host.cmp(&b.host));
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].host, "host-a");
    assert!(reports[0].procs.contains_key("a1"));
    assert_eq!(reports[1].host, "host-b");
    assert!(reports[1].procs.contains_key("b1"));
}
