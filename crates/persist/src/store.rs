// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed checkpoint store.
//!
//! Layout under the store root:
//!
//! ```text
//! running/<pid>.json    live checkpoint, rewritten on each save
//! running/<pid>.lock    advisory lock while an adapter owns the pid
//! finished/<pid>.json   final checkpoint of a cleanly stopped process
//! failed/<pid>.json     final checkpoint of a failed process
//! ```
//!
//! Checkpoints are written to a temp file and renamed into place, so a
//! reader never observes a half-written file. On termination the running
//! file is atomically renamed into `finished/` or `failed/`.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wf_core::{Bundle, ProcessId};
use wf_engine::{EngineError, Process};

/// Errors from checkpoint storage
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("checkpoint for pid '{0}' is locked by another adapter")]
    Lock(String),
    #[error("no checkpoint found for pid '{0}'")]
    NotFound(String),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Where a terminated process's checkpoint is released to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseDest {
    Finished,
    Failed,
    /// Remove the checkpoint instead of archiving it.
    Delete,
}

/// File-backed store of process checkpoints with advisory pid locks.
pub struct CheckpointStore {
    running_dir: PathBuf,
    finished_dir: PathBuf,
    failed_dir: PathBuf,
    /// Pids whose lock file this store instance owns.
    owned_locks: Mutex<HashSet<String>>,
}

impl CheckpointStore {
    /// A store with the conventional `running/finished/failed` layout under
    /// the given root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self::with_dirs(
            root.join("running"),
            root.join("finished"),
            root.join("failed"),
        )
    }

    pub fn with_dirs(
        running_dir: PathBuf,
        finished_dir: PathBuf,
        failed_dir: PathBuf,
    ) -> Self {
        Self {
            running_dir,
            finished_dir,
            failed_dir,
            owned_locks: Mutex::new(HashSet::new()),
        }
    }

    pub fn running_dir(&self) -> &Path {
        &self.running_dir
    }

    pub fn finished_dir(&self) -> &Path {
        &self.finished_dir
    }

    pub fn failed_dir(&self) -> &Path {
        &self.failed_dir
    }

    /// Path of a live checkpoint.
    pub fn running_path(&self, pid: &ProcessId) -> PathBuf {
        self.running_dir.join(Self::checkpoint_filename(pid))
    }

    fn lock_path(&self, pid: &ProcessId) -> PathBuf {
        self.running_dir.join(format!("{pid}.lock"))
    }

    fn checkpoint_filename(pid: &ProcessId) -> String {
        format!("{pid}.json")
    }

    /// Take (or confirm) the advisory lock for a pid.
    ///
    /// A lock file held by a different adapter fails with
    /// [`PersistError::Lock`]; taking a lock this instance already owns is a
    /// no-op.
    pub fn acquire_lock(&self, pid: &ProcessId) -> Result<(), PersistError> {
        let mut owned = self.owned_locks.lock();
        if owned.contains(pid.as_str()) {
            return Ok(());
        }
        fs::create_dir_all(&self.running_dir)?;
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.lock_path(pid))
        {
            Ok(_) => {
                owned.insert(pid.to_string());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(PersistError::Lock(pid.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Release the advisory lock for a pid, if this instance owns it.
    pub fn release_lock(&self, pid: &ProcessId) {
        let mut owned = self.owned_locks.lock();
        if owned.remove(pid.as_str()) {
            if let Err(e) = fs::remove_file(self.lock_path(pid)) {
                tracing::warn!(pid = %pid, error = %e, "failed to remove lock file");
            }
        }
    }

    /// Save a process's checkpoint into `running/`, taking the pid lock.
    pub fn save(&self, process: &Process) -> Result<(), PersistError> {
        self.acquire_lock(process.pid())?;
        let mut bundle = Bundle::new();
        process.save_instance_state(&mut bundle)?;
        self.write_checkpoint(process.pid(), &bundle)
    }

    /// Write an already-serialized checkpoint bundle for a pid.
    pub fn write_checkpoint(&self, pid: &ProcessId, bundle: &Bundle) -> Result<(), PersistError> {
        fs::create_dir_all(&self.running_dir)?;
        let path = self.running_path(pid);
        let tmp_path = path.with_extension("tmp");

        let data = serde_json::to_vec_pretty(bundle)?;
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Load a checkpoint by pid, searching running, then failed, then
    /// finished.
    pub fn load_checkpoint(&self, pid: &ProcessId) -> Result<Bundle, PersistError> {
        let filename = Self::checkpoint_filename(pid);
        for dir in [&self.running_dir, &self.failed_dir, &self.finished_dir] {
            let path = dir.join(&filename);
            if path.is_file() {
                return Self::read_checkpoint(&path);
            }
        }
        Err(PersistError::NotFound(pid.to_string()))
    }

    /// Load every readable checkpoint from `running/`, skipping (and
    /// logging) corrupt files.
    pub fn load_all_checkpoints(&self) -> Result<Vec<Bundle>, PersistError> {
        let mut checkpoints = Vec::new();
        let entries = match fs::read_dir(&self.running_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(checkpoints),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_checkpoint(&path) {
                Ok(bundle) => checkpoints.push(bundle),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable checkpoint");
                }
            }
        }
        Ok(checkpoints)
    }

    fn read_checkpoint(path: &Path) -> Result<Bundle, PersistError> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Move a terminated process's checkpoint out of `running/` and drop
    /// the pid lock.
    pub fn release(&self, pid: &ProcessId, dest: ReleaseDest) -> Result<(), PersistError> {
        let from = self.running_path(pid);
        if !from.is_file() {
            self.release_lock(pid);
            return Err(PersistError::NotFound(pid.to_string()));
        }
        match dest {
            ReleaseDest::Finished => {
                fs::create_dir_all(&self.finished_dir)?;
                fs::rename(&from, self.finished_dir.join(Self::checkpoint_filename(pid)))?;
            }
            ReleaseDest::Failed => {
                fs::create_dir_all(&self.failed_dir)?;
                fs::rename(&from, self.failed_dir.join(Self::checkpoint_filename(pid)))?;
            }
            ReleaseDest::Delete => {
                fs::remove_file(&from)?;
            }
        }
        self.release_lock(pid);
        Ok(())
    }
}

impl Drop for CheckpointStore {
    fn drop(&mut self) {
        let owned: Vec<String> = self.owned_locks.lock().drain().collect();
        for pid in owned {
            let path = self.running_dir.join(format!("{pid}.lock"));
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(pid = %pid, error = %e, "failed to clean up lock file");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
