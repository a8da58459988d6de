// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automatic checkpointing driven by monitor notifications.
//!
//! Saves a process on creation and on every run/wait/finish transition, and
//! releases the checkpoint into `finished/` or `failed/` on termination.
//! Save errors are logged, never propagated: a persistence hiccup must not
//! take the process down.

use crate::store::{CheckpointStore, PersistError, ReleaseDest};
use std::sync::Arc;
use wf_engine::{MonitorListener, MonitorListenerId, Process, ProcessMonitor};

/// Monitor listener that keeps checkpoints current for every live process.
pub struct AutoPersist {
    store: Arc<CheckpointStore>,
}

impl AutoPersist {
    pub fn new(store: Arc<CheckpointStore>) -> Arc<Self> {
        Arc::new(Self { store })
    }

    /// Subscribe to a monitor. Every process registered with it is
    /// persisted from then on.
    pub fn attach(self: &Arc<Self>, monitor: &ProcessMonitor) -> MonitorListenerId {
        monitor.add_listener(Arc::clone(self) as Arc<dyn MonitorListener>)
    }

    pub fn store(&self) -> &Arc<CheckpointStore> {
        &self.store
    }

    fn save(&self, process: &Process, moment: &str) {
        match self.store.save(process) {
            Ok(()) => {}
            Err(PersistError::Engine(wf_engine::EngineError::Unsupported(reason))) => {
                tracing::warn!(pid = %process.pid(), moment, %reason, "checkpoint skipped: unsavable wait");
            }
            Err(e) => {
                tracing::error!(pid = %process.pid(), moment, error = %e, "checkpoint save failed");
            }
        }
    }

    fn release(&self, process: &Process, dest: ReleaseDest) {
        match self.store.release(process.pid(), dest) {
            Ok(()) | Err(PersistError::NotFound(_)) => {}
            Err(e) => {
                tracing::error!(pid = %process.pid(), error = %e, "checkpoint release failed");
            }
        }
    }
}

impl MonitorListener for AutoPersist {
    fn on_monitored_process_created(&self, process: &Process) {
        self.save(process, "created");
    }

    fn on_monitored_process_registered(&self, process: &Process) {
        self.save(process, "registered");
    }

    fn on_monitored_process_run(&self, process: &Process) {
        self.save(process, "run");
    }

    fn on_monitored_process_wait(&self, process: &Process) {
        self.save(process, "wait");
    }

    fn on_monitored_process_finish(&self, process: &Process) {
        self.save(process, "finish");
    }

    fn on_monitored_process_stopped(&self, process: &Process) {
        self.release(process, ReleaseDest::Finished);
    }

    fn on_monitored_process_failed(&self, process: &Process) {
        self.release(process, ReleaseDest::Failed);
    }
}

#[cfg(test)]
#[path = "persister_tests.rs"]
mod tests;
