// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wait primitive: a reified, serializable suspension condition.
//!
//! A [`WaitOn`] produces a [`Future`] bound to a loop via `make_future`; the
//! future resolves when the wait's outcome is decided. Only one unresolved
//! future may exist per wait at a time. Implementations embed a [`WaitCore`]
//! which carries the outcome and resolves the backing future, including when
//! the outcome was decided before the future was created (a reloaded,
//! already-done wait resolves immediately on re-arming).

use crate::error::{EngineError, Failure};
use crate::event_loop::LoopHandle;
use crate::future::Future;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wf_core::{Bundle, BundleValue};

/// Bundle key holding a wait's saved outcome.
pub const OUTCOME_KEY: &str = "outcome";

/// The decided outcome of a wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub message: Option<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// A condition a process can suspend on.
pub trait WaitOn: Send {
    /// Stable registry identifier for this wait type.
    fn kind(&self) -> &'static str;

    /// The outcome, or `None` while unresolved.
    fn outcome(&self) -> Option<Outcome>;

    /// Produce a future bound to the given loop that resolves when the wait
    /// does. A second simultaneous waiter is an error.
    fn make_future(&mut self, handle: &LoopHandle) -> Result<Future, EngineError>;

    /// Save this wait's state. Unsavable waits return
    /// [`EngineError::Unsupported`].
    fn save_state(&self, out: &mut Bundle) -> Result<(), EngineError>;
}

/// Save the common wait fields (kind + outcome) into a bundle.
pub fn save_outcome(kind: &str, outcome: Option<&Outcome>, out: &mut Bundle) {
    out.set_class_name(kind);
    match outcome {
        Some(outcome) => {
            let mut b = Bundle::new();
            b.set("success", outcome.success);
            b.set("message", outcome.message.clone());
            out.set(OUTCOME_KEY, b);
        }
        None => out.set(OUTCOME_KEY, BundleValue::Null),
    }
}

/// Load the common outcome field saved by [`save_outcome`].
pub fn load_outcome(bundle: &Bundle) -> Result<Option<Outcome>, EngineError> {
    match bundle.get(OUTCOME_KEY) {
        None | Some(BundleValue::Null) => Ok(None),
        Some(BundleValue::Map(b)) => Ok(Some(Outcome {
            success: b.get_bool("success")?,
            message: b.get_opt_str("message")?.map(str::to_string),
        })),
        Some(_) => Err(EngineError::Malformed(
            "wait outcome must be a map or null".to_string(),
        )),
    }
}

#[derive(Default)]
struct WaitCoreInner {
    outcome: Option<Outcome>,
    future: Option<Future>,
}

/// Shared resolution core embedded by wait-on implementations.
///
/// Clones share state, so external signallers (e.g. the user half of a
/// `WaitForSignal`) can decide the outcome after the engine took ownership
/// of the wait.
#[derive(Clone, Default)]
pub struct WaitCore {
    inner: Arc<Mutex<WaitCoreInner>>,
}

impl WaitCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A core whose outcome is already decided (e.g. a checkpoint, or a
    /// reloaded wait that was done when it was saved).
    pub fn with_outcome(outcome: Option<Outcome>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WaitCoreInner {
                outcome,
                future: None,
            })),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.inner.lock().outcome.clone()
    }

    pub fn is_done(&self) -> bool {
        self.inner.lock().outcome.is_some()
    }

    /// The currently armed future, if any.
    pub fn current_future(&self) -> Option<Future> {
        self.inner.lock().future.clone()
    }

    /// Decide the outcome, resolving the armed future if there is one.
    /// Deciding twice is an error.
    pub fn done(&self, success: bool, message: Option<String>) -> Result<(), EngineError> {
        let (outcome, future) = {
            let mut inner = self.inner.lock();
            if inner.outcome.is_some() {
                return Err(EngineError::AlreadyResolved);
            }
            let outcome = Outcome { success, message };
            inner.outcome = Some(outcome.clone());
            (outcome, inner.future.clone())
        };
        if let Some(future) = future {
            Self::resolve(&future, &outcome);
        }
        Ok(())
    }

    pub fn make_future(&self, handle: &LoopHandle) -> Result<Future, EngineError> {
        let (future, outcome) = {
            let mut inner = self.inner.lock();
            if let Some(existing) = &inner.future {
                if !existing.done() {
                    return Err(EngineError::AlreadyWaiting);
                }
            }
            let future = Future::new(handle.clone());
            inner.future = Some(future.clone());
            (future, inner.outcome.clone())
        };
        if let Some(outcome) = outcome {
            Self::resolve(&future, &outcome);
        }
        Ok(future)
    }

    fn resolve(future: &Future, outcome: &Outcome) {
        let result = if outcome.success {
            future.set_result(BundleValue::Null)
        } else {
            let message = outcome.message.clone().unwrap_or_default();
            future.set_failure(Failure::new("wait", message))
        };
        if result.is_err() {
            tracing::warn!("wait outcome decided but its future was already resolved");
        }
    }
}

#[cfg(test)]
#[path = "wait_tests.rs"]
mod tests;
