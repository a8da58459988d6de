// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote process launching.
//!
//! A publisher posts `{class, inputs, pid?}` messages; a subscriber pumps
//! them into an event loop, instantiating the class through the process
//! registry.

use crate::broker::{Broker, RemoteError, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wf_core::{Bundle, ProcessId};
use wf_engine::{EventLoop, ProcessRegistry};

/// Routing key launch requests are published under.
pub const LAUNCH_KEY: &str = "launch";

/// A request to instantiate and run a registered process type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Registry kind string of the process type.
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
}

impl LaunchRequest {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            inputs: None,
            pid: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_pid(mut self, pid: impl Into<String>) -> Self {
        self.pid = Some(pid.into());
        self
    }
}

/// Publishing half of the launch channel.
pub struct LaunchPublisher {
    broker: std::sync::Arc<dyn Broker>,
}

impl LaunchPublisher {
    pub fn new(broker: std::sync::Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    pub fn launch(&self, request: &LaunchRequest) -> Result<(), RemoteError> {
        self.broker.publish(LAUNCH_KEY, serde_json::to_value(request)?)
    }
}

/// Subscribing half: drains launch requests into an event loop.
pub struct LaunchSubscriber {
    sub: Subscription,
}

impl LaunchSubscriber {
    pub fn new(broker: &dyn Broker) -> Self {
        Self {
            sub: broker.subscribe(LAUNCH_KEY),
        }
    }

    /// Instantiate every pending request into the loop. Malformed requests
    /// and unknown classes are logged and skipped; returns the pids of the
    /// processes that were created.
    pub fn pump(&self, event_loop: &mut EventLoop, registry: &ProcessRegistry) -> Vec<ProcessId> {
        let mut launched = Vec::new();
        while let Some(message) = self.sub.try_next() {
            let request: LaunchRequest = match serde_json::from_value(message.body) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(error = %e, "malformed launch request, skipping");
                    continue;
                }
            };
            let inputs = match request.inputs.clone().map(Bundle::from_json).transpose() {
                Ok(inputs) => inputs,
                Err(e) => {
                    tracing::warn!(class = %request.class, error = %e, "unusable launch inputs, skipping");
                    continue;
                }
            };
            let pid = request.pid.clone().map(ProcessId::new);
            match event_loop.create_from_registry(registry, &request.class, inputs, pid) {
                Ok(handle) => launched.push(handle.pid().clone()),
                Err(e) => {
                    tracing::warn!(class = %request.class, error = %e, "launch request rejected");
                }
            }
        }
        launched
    }
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
