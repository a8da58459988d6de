// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process lifecycle states and the allowed-transition table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The possible states of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Created,
    Running,
    Waiting,
    Stopped,
    Failed,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Created => "created",
            ProcessState::Running => "running",
            ProcessState::Waiting => "waiting",
            ProcessState::Stopped => "stopped",
            ProcessState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(ProcessState::Created),
            "running" => Some(ProcessState::Running),
            "waiting" => Some(ProcessState::Waiting),
            "stopped" => Some(ProcessState::Stopped),
            "failed" => Some(ProcessState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessState::Stopped | ProcessState::Failed)
    }

    /// The allowed-transition table of the lifecycle state machine.
    ///
    /// CREATED may go straight to STOPPED only via abort, which the STOPPED
    /// entry action enforces; every live state may fail.
    pub fn can_transition(self, to: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, to),
            (Created, Running)
                | (Created, Stopped)
                | (Created, Failed)
                | (Running, Running)
                | (Running, Waiting)
                | (Running, Stopped)
                | (Running, Failed)
                | (Waiting, Running)
                | (Waiting, Stopped)
                | (Waiting, Failed)
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
