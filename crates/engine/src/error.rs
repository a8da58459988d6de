// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use crate::state::ProcessState;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use wf_core::bundle::BundleError;
use wf_core::spec::SpecError;

/// Serializable carrier of a process exception.
///
/// Stands in for the original error when a process fails: it survives
/// checkpointing (saved as a `[type, message, null]` triple, the third slot
/// being the never-persisted backtrace) and is cheap to clone into the
/// process's result future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub error_type: String,
    pub message: String,
}

impl Failure {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// A failure with the generic `error` type.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new("error", message)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

impl std::error::Error for Failure {}

impl From<EngineError> for Failure {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Failed(f) => f,
            other => Failure::new("engine", other.to_string()),
        }
    }
}

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid inputs: {0}")]
    InvalidInput(String),
    #[error("illegal transition from '{from}' to '{to}'")]
    IllegalTransition {
        from: ProcessState,
        to: ProcessState,
    },
    #[error("future was cancelled")]
    Cancelled,
    #[error("timed out")]
    Timeout,
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("class not found in registry: '{0}'")]
    ClassNotFound(String),
    #[error("unknown continuation: '{0}'")]
    UnknownContinuation(String),
    #[error("object is already in an event loop")]
    AlreadyInLoop,
    #[error("object is not in an event loop")]
    NotInLoop,
    #[error("a live process already exists with pid '{0}'")]
    DuplicatePid(String),
    #[error("future was already resolved")]
    AlreadyResolved,
    #[error("another waiter already holds this wait on's future")]
    AlreadyWaiting,
    #[error("controller worker is gone")]
    WorkerGone,
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),
    #[error("bad bundle: {0}")]
    Bundle(#[from] BundleError),
    #[error("malformed bundle: {0}")]
    Malformed(String),
    #[error("process failed: {0}")]
    Failed(Failure),
}
