// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process lifecycle event names and the `process.<pid>.<name>` grammar.

use crate::id::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle events a process emits on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessEvent {
    Start,
    Run,
    Wait,
    Resume,
    Finish,
    Stop,
    Fail,
    Emitted,
    Destroy,
}

impl ProcessEvent {
    pub const ALL: [ProcessEvent; 9] = [
        ProcessEvent::Start,
        ProcessEvent::Run,
        ProcessEvent::Wait,
        ProcessEvent::Resume,
        ProcessEvent::Finish,
        ProcessEvent::Stop,
        ProcessEvent::Fail,
        ProcessEvent::Emitted,
        ProcessEvent::Destroy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessEvent::Start => "start",
            ProcessEvent::Run => "run",
            ProcessEvent::Wait => "wait",
            ProcessEvent::Resume => "resume",
            ProcessEvent::Finish => "finish",
            ProcessEvent::Stop => "stop",
            ProcessEvent::Fail => "fail",
            ProcessEvent::Emitted => "emitted",
            ProcessEvent::Destroy => "destroy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }
}

impl fmt::Display for ProcessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build the event string for a process lifecycle event.
pub fn process_event(pid: &ProcessId, event: ProcessEvent) -> String {
    format!("process.{}.{}", pid, event.as_str())
}

/// Build a subscription pattern with `*` holes for the unspecified parts.
pub fn process_event_pattern(pid: Option<&ProcessId>, event: Option<ProcessEvent>) -> String {
    let pid = pid.map_or("*", ProcessId::as_str);
    let event = event.map_or("*", |e| e.as_str());
    format!("process.{pid}.{event}")
}

/// Split a `process.<pid>.<name>` event string into its pid and name parts.
///
/// The name is taken from the last dot-separated segment, so pids containing
/// dots are tolerated.
pub fn split_process_event(event: &str) -> Option<(&str, &str)> {
    let rest = event.strip_prefix("process.")?;
    let (pid, name) = rest.rsplit_once('.')?;
    if pid.is_empty() || name.is_empty() {
        return None;
    }
    Some((pid, name))
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
