// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn literal_routing() {
    let broker = InMemoryBroker::new();
    let sub = broker.subscribe("launch");

    broker.publish("launch", json!({"n": 1})).unwrap();
    broker.publish("status", json!({"n": 2})).unwrap();

    let messages = sub.drain();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].routing_key, "launch");
    assert_eq!(messages[0].body["n"], 1);
}

#[test]
fn wildcard_routing() {
    let broker = InMemoryBroker::new();
    let sub = broker.subscribe("p1.*");

    broker.publish("p1.finish", json!(null)).unwrap();
    broker.publish("p2.finish", json!(null)).unwrap();
    broker.publish("p1.stop", json!(null)).unwrap();

    let keys: Vec<String> = sub.drain().into_iter().map(|m| m.routing_key).collect();
    assert_eq!(keys, vec!["p1.finish", "p1.stop"]);
}

#[test]
fn multiple_subscribers_each_get_a_copy() {
    let broker = InMemoryBroker::new();
    let sub_a = broker.subscribe("#");
    let sub_b = broker.subscribe("#");

    broker.publish("x", json!(1)).unwrap();
    assert_eq!(sub_a.drain().len(), 1);
    assert_eq!(sub_b.drain().len(), 1);
}

#[test]
fn dropped_subscription_is_pruned() {
    let broker = InMemoryBroker::new();
    let sub = broker.subscribe("#");
    drop(sub);

    // Publishing to a dead subscription cleans it up without error
    broker.publish("x", json!(1)).unwrap();
    broker.publish("y", json!(2)).unwrap();
}

#[test]
fn try_next_never_blocks() {
    let broker = InMemoryBroker::new();
    let sub = broker.subscribe("#");
    assert!(sub.try_next().is_none());
}

#[test]
fn next_timeout_returns_none_when_idle() {
    let broker = InMemoryBroker::new();
    let sub = broker.subscribe("#");
    assert!(sub.next_timeout(Duration::from_millis(10)).is_none());
}

#[test]
fn clones_share_subscriptions() {
    let broker = InMemoryBroker::new();
    let publisher = broker.clone();
    let sub = broker.subscribe("#");

    publisher.publish("x", json!(1)).unwrap();
    assert_eq!(sub.drain().len(), 1);
}
