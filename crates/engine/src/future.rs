// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loop-bound future: holds a result, a failure, or a cancellation.
//!
//! A [`Future`] is a cheaply clonable handle. Done-callbacks fire exactly
//! once, in registration order, and always on the loop thread via the loop's
//! deferred queue. `result(timeout)` blocks on a condvar and is intended for
//! callers outside the loop thread; blocking on it from inside the loop
//! would deadlock.

use crate::error::{EngineError, Failure};
use crate::event_loop::{EventLoop, LoopHandle};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wf_core::BundleValue;

/// Handle identifying a registered done-callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackId(u64);

type DoneCallback = Box<dyn FnOnce(&mut EventLoop, Future) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FutureStatus {
    Pending,
    Cancelled,
    Finished,
}

struct FutureState {
    status: FutureStatus,
    result: Option<BundleValue>,
    failure: Option<Failure>,
    callbacks: Vec<(CallbackId, DoneCallback)>,
    next_callback: u64,
}

struct FutureShared {
    handle: LoopHandle,
    state: Mutex<FutureState>,
    done: Condvar,
}

/// A value that will be produced by work running on an event loop.
#[derive(Clone)]
pub struct Future {
    shared: Arc<FutureShared>,
}

impl Future {
    pub(crate) fn new(handle: LoopHandle) -> Self {
        Self {
            shared: Arc::new(FutureShared {
                handle,
                state: Mutex::new(FutureState {
                    status: FutureStatus::Pending,
                    result: None,
                    failure: None,
                    callbacks: Vec::new(),
                    next_callback: 0,
                }),
                done: Condvar::new(),
            }),
        }
    }

    pub fn done(&self) -> bool {
        self.shared.state.lock().status != FutureStatus::Pending
    }

    pub fn cancelled(&self) -> bool {
        self.shared.state.lock().status == FutureStatus::Cancelled
    }

    pub fn running(&self) -> bool {
        self.shared.state.lock().status == FutureStatus::Pending
    }

    /// Cancel the future. Returns true iff it was still pending; on success
    /// done-callbacks are scheduled.
    pub fn cancel(&self) -> bool {
        let callbacks = {
            let mut state = self.shared.state.lock();
            if state.status != FutureStatus::Pending {
                return false;
            }
            state.status = FutureStatus::Cancelled;
            std::mem::take(&mut state.callbacks)
        };
        self.finish(callbacks);
        true
    }

    /// Resolve with a result. Legal only while pending.
    pub fn set_result(&self, result: BundleValue) -> Result<(), EngineError> {
        self.resolve(|state| {
            state.result = Some(result);
        })
    }

    /// Resolve with a failure. Legal only while pending.
    pub fn set_failure(&self, failure: Failure) -> Result<(), EngineError> {
        self.resolve(|state| {
            state.failure = Some(failure);
        })
    }

    fn resolve(&self, fill: impl FnOnce(&mut FutureState)) -> Result<(), EngineError> {
        let callbacks = {
            let mut state = self.shared.state.lock();
            if state.status != FutureStatus::Pending {
                return Err(EngineError::AlreadyResolved);
            }
            state.status = FutureStatus::Finished;
            fill(&mut state);
            std::mem::take(&mut state.callbacks)
        };
        self.finish(callbacks);
        Ok(())
    }

    fn finish(&self, callbacks: Vec<(CallbackId, DoneCallback)>) {
        self.shared.done.notify_all();
        for (_, callback) in callbacks {
            self.schedule(callback);
        }
    }

    fn schedule(&self, callback: DoneCallback) {
        let future = self.clone();
        self.shared
            .handle
            .call_soon(move |event_loop| callback(event_loop, future));
    }

    /// Block until the future is done and return its result.
    ///
    /// Fails with [`EngineError::Cancelled`] if the future was cancelled,
    /// [`EngineError::Timeout`] if the deadline passes, and re-raises the
    /// failure (as [`EngineError::Failed`]) if the work failed.
    pub fn result(&self, timeout: Option<Duration>) -> Result<BundleValue, EngineError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.shared.state.lock();
        loop {
            match state.status {
                FutureStatus::Finished => {
                    return match &state.failure {
                        Some(failure) => Err(EngineError::Failed(failure.clone())),
                        None => Ok(state.result.clone().unwrap_or(BundleValue::Null)),
                    };
                }
                FutureStatus::Cancelled => return Err(EngineError::Cancelled),
                FutureStatus::Pending => match deadline {
                    Some(deadline) => {
                        if Instant::now() >= deadline {
                            return Err(EngineError::Timeout);
                        }
                        self.shared.done.wait_until(&mut state, deadline);
                    }
                    None => self.shared.done.wait(&mut state),
                },
            }
        }
    }

    /// Block until the future is done; `Ok(None)` on success, the failure on
    /// failure. Cancellation and timeout behave like [`result`](Self::result).
    pub fn failure(&self, timeout: Option<Duration>) -> Result<Option<Failure>, EngineError> {
        match self.result(timeout) {
            Ok(_) => Ok(None),
            Err(EngineError::Failed(failure)) => Ok(Some(failure)),
            Err(e) => Err(e),
        }
    }

    /// Register a callback to run on the loop thread when the future is done.
    ///
    /// If the future is already done the callback is enqueued on the loop's
    /// deferred queue immediately.
    pub fn add_done_callback<F>(&self, callback: F) -> CallbackId
    where
        F: FnOnce(&mut EventLoop, Future) + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        let id = CallbackId(state.next_callback);
        state.next_callback += 1;
        if state.status == FutureStatus::Pending {
            state.callbacks.push((id, Box::new(callback)));
        } else {
            drop(state);
            self.schedule(Box::new(callback));
        }
        id
    }

    /// Remove a not-yet-fired callback. Returns true if it was found.
    pub fn remove_done_callback(&self, id: CallbackId) -> bool {
        let mut state = self.shared.state.lock();
        let before = state.callbacks.len();
        state.callbacks.retain(|(cb_id, _)| *cb_id != id);
        state.callbacks.len() != before
    }

    /// Two handles referring to the same underlying future.
    pub fn same_as(&self, other: &Future) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Future {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Future")
            .field("status", &state.status)
            .field("callbacks", &state.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "future_tests.rs"]
mod tests;
