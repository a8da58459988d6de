// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message broker abstraction.
//!
//! Routing keys are matched against subscription patterns with the same
//! `*`/`#` grammar the event bus uses. The in-memory broker delivers over
//! plain channels; a real broker binding would implement [`Broker`] against
//! its wire client.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use wf_core::Pattern;

/// Errors from broker operations
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A routed message.
#[derive(Debug, Clone)]
pub struct Message {
    pub routing_key: String,
    pub body: Value,
}

/// Receiving half of a subscription.
pub struct Subscription {
    rx: Receiver<Message>,
}

impl Subscription {
    /// Next pending message, if any. Never blocks.
    pub fn try_next(&self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next message.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Message> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drain everything currently pending.
    pub fn drain(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Some(message) = self.try_next() {
            messages.push(message);
        }
        messages
    }
}

/// Publish/subscribe transport with wildcard routing.
pub trait Broker: Send + Sync {
    fn publish(&self, routing_key: &str, body: Value) -> Result<(), RemoteError>;

    fn subscribe(&self, pattern: &str) -> Subscription;
}

struct BrokerSub {
    pattern: Pattern,
    tx: Sender<Message>,
}

/// Channel-backed broker for same-process use and tests.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    subs: Arc<Mutex<Vec<BrokerSub>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Broker for InMemoryBroker {
    fn publish(&self, routing_key: &str, body: Value) -> Result<(), RemoteError> {
        let mut subs = self.subs.lock();
        subs.retain(|sub| {
            if !sub.pattern.matches(routing_key) {
                return true;
            }
            sub.tx
                .send(Message {
                    routing_key: routing_key.to_string(),
                    body: body.clone(),
                })
                .is_ok()
        });
        Ok(())
    }

    fn subscribe(&self, pattern: &str) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.subs.lock().push(BrokerSub {
            pattern: Pattern::compile(pattern),
            tx,
        });
        Subscription { rx }
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
