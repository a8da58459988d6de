// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status broadcasting and fanout status requests.
//!
//! The publisher forwards every monitor-bus lifecycle event under the
//! routing key `<pid>.<event>`. Responders answer status requests with a
//! JSON report of all live processes on their monitor.

use crate::broker::{Broker, RemoteError, Subscription};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use wf_core::{split_process_event, ListenerError, ListenerId};
use wf_engine::ProcessMonitor;

/// Routing key status requests are published under.
pub const STATUS_REQUEST_KEY: &str = "status.request";

/// Snapshot of one live process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcStatus {
    pub creation_time: u64,
    pub state: String,
    pub playing: bool,
    pub waiting_on: Option<String>,
}

/// Reply body of a status request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub procs: IndexMap<String, ProcStatus>,
    pub host: String,
}

/// Snapshot every live process registered with a monitor.
pub fn gather_status(monitor: &ProcessMonitor, host: &str) -> StatusReport {
    let mut procs = IndexMap::new();
    for cell in monitor.processes() {
        let process = cell.lock();
        procs.insert(
            process.pid().to_string(),
            ProcStatus {
                creation_time: process.creation_time(),
                state: process.state().as_str().to_string(),
                playing: process.is_playing(),
                waiting_on: process.waiting_on().map(str::to_string),
            },
        );
    }
    StatusReport {
        procs,
        host: host.to_string(),
    }
}

/// Forwards monitor lifecycle events to a broker as `<pid>.<event>`.
pub struct StatusPublisher;

impl StatusPublisher {
    /// Subscribe the publisher to a monitor's bus. Returns the listener id
    /// for detaching.
    pub fn attach(monitor: &ProcessMonitor, broker: Arc<dyn Broker>) -> ListenerId {
        monitor.bus().start_listening("process.#", move |event, body| {
            let Some((pid, name)) = split_process_event(event) else {
                return Err(ListenerError::new(format!("unroutable event '{event}'")));
            };
            let body = match body {
                Some(body) => serde_json::to_value(body)
                    .map_err(|e| ListenerError::new(e.to_string()))?,
                None => Value::Null,
            };
            broker
                .publish(&format!("{pid}.{name}"), body)
                .map_err(|e| ListenerError::new(e.to_string()))
        })
    }
}

/// Answers status requests for one monitor.
pub struct StatusResponder {
    monitor: Arc<ProcessMonitor>,
    broker: Arc<dyn Broker>,
    sub: Subscription,
    host: String,
}

impl StatusResponder {
    pub fn new(monitor: Arc<ProcessMonitor>, broker: Arc<dyn Broker>, host: &str) -> Self {
        let sub = broker.subscribe(STATUS_REQUEST_KEY);
        Self {
            monitor,
            broker,
            sub,
            host: host.to_string(),
        }
    }

    /// Answer all pending requests. Returns how many replies were sent.
    pub fn pump(&self) -> usize {
        let mut replies = 0;
        while let Some(message) = self.sub.try_next() {
            let Some(reply_to) = message
                .body
                .get("reply_to")
                .and_then(Value::as_str)
                .map(str::to_string)
            else {
                tracing::warn!("status request without reply_to, dropping");
                continue;
            };
            let report = gather_status(&self.monitor, &self.host);
            match serde_json::to_value(&report) {
                Ok(body) => {
                    if let Err(e) = self.broker.publish(&reply_to, body) {
                        tracing::warn!(error = %e, "status reply publish failed");
                    } else {
                        replies += 1;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "status report serialization failed"),
            }
        }
        replies
    }
}

/// Issues fanout status requests and collects the replies.
pub struct StatusRequester {
    broker: Arc<dyn Broker>,
}

impl StatusRequester {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    /// Publish a request; every responder replies on the returned
    /// subscription.
    pub fn request(&self) -> Result<Subscription, RemoteError> {
        let reply_to = format!("status.reply.{}", uuid::Uuid::new_v4());
        let sub = self.broker.subscribe(&reply_to);
        self.broker.publish(
            STATUS_REQUEST_KEY,
            serde_json::json!({ "reply_to": reply_to }),
        )?;
        Ok(sub)
    }

    /// Collect replies until none arrive within `idle_timeout`.
    pub fn collect(&self, sub: &Subscription, idle_timeout: Duration) -> Vec<StatusReport> {
        let mut reports = Vec::new();
        while let Some(message) = sub.next_timeout(idle_timeout) {
            match serde_json::from_value::<StatusReport>(message.body) {
                Ok(report) => reports.push(report),
                Err(e) => tracing::warn!(error = %e, "malformed status reply, skipping"),
            }
        }
        reports
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
