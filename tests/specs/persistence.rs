// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed persistence: auto-checkpointing, crash-style recovery, and
//! lock contention between adapters.

use crate::prelude::tick_until_state;
use std::sync::Arc;
use wf_core::ProcessId;
use wf_engine::test_support::{DummyProcess, ExceptionProcess, WaitForSignalProcess};
use wf_engine::{EventLoop, ProcessRegistry, ProcessState};
use wf_persist::{AutoPersist, CheckpointStore, PersistError};

#[test]
fn lifecycle_files_move_between_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CheckpointStore::new(dir.path()));
    let mut event_loop = EventLoop::new();
    AutoPersist::new(Arc::clone(&store)).attach(event_loop.monitor());

    let ok = event_loop
        .create_process(DummyProcess, None, Some("ok".into()))
        .unwrap();
    let bad = event_loop
        .create_process(ExceptionProcess, None, Some("bad".into()))
        .unwrap();
    assert!(store.running_path(&ProcessId::new("ok")).is_file());
    assert!(store.running_path(&ProcessId::new("bad")).is_file());

    event_loop.run_until_complete(ok.future(), None).unwrap();
    let _ = event_loop.run_until_complete(bad.future(), None);

    assert!(store.finished_dir().join("ok.json").is_file());
    assert!(store.failed_dir().join("bad.json").is_file());
    assert!(store.load_all_checkpoints().unwrap().is_empty());
}

#[test]
fn recovery_scans_running_and_resumes() {
    let dir = tempfile::tempdir().unwrap();

    // First engine: suspend a process mid-wait, then "crash" (drop it)
    {
        let store = Arc::new(CheckpointStore::new(dir.path()));
        let mut event_loop = EventLoop::new();
        AutoPersist::new(Arc::clone(&store)).attach(event_loop.monitor());

        let logic = WaitForSignalProcess::default();
        let handle = event_loop
            .create_process(logic, None, Some("w1".into()))
            .unwrap();
        tick_until_state(&mut event_loop, &handle, ProcessState::Waiting);
    }

    // Second engine: scan running/, restore, signal, finish
    let store = Arc::new(CheckpointStore::new(dir.path()));
    let mut registry = ProcessRegistry::new();
    registry.register::<WaitForSignalProcess>();
    let mut event_loop = EventLoop::new();
    AutoPersist::new(Arc::clone(&store)).attach(event_loop.monitor());

    let checkpoints = store.load_all_checkpoints().unwrap();
    assert_eq!(checkpoints.len(), 1);
    let restored = event_loop.restore(&registry, &checkpoints[0]).unwrap();
    assert_eq!(restored.pid().as_str(), "w1");
    assert_eq!(restored.state(), ProcessState::Waiting);

    // The original signaller is gone; the restored process carries a fresh
    // wait we can reach through the monitor
    let cell = event_loop.monitor().find(&ProcessId::new("w1")).unwrap();
    assert_eq!(cell.lock().waiting_on(), Some("wait_for_signal"));

    // Abort path still works for a restored process
    restored.abort(Some("recovered but not needed")).unwrap();
    event_loop.run_until_complete(restored.future(), None).unwrap();
    assert!(store.finished_dir().join("w1.json").is_file());
}

#[test]
fn second_adapter_persisting_same_pid_hits_lock_error() {
    let dir = tempfile::tempdir().unwrap();
    let store_a = CheckpointStore::new(dir.path());
    let store_b = CheckpointStore::new(dir.path());

    let mut event_loop = EventLoop::new();
    let handle = event_loop
        .create_process(DummyProcess, None, Some("p1".into()))
        .unwrap();

    handle.with_process(|p| store_a.save(p)).unwrap();
    let second = handle.with_process(|p| store_b.save(p));
    assert!(matches!(second, Err(PersistError::Lock(_))));
}
