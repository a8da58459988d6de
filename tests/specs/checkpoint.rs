// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint round trips: saved snapshots replay to identical histories.

use crate::prelude::check_against_snapshots;
use wf_engine::test_support::{
    ProcessSaver, ProcessWithCheckpoint, StateRecorder, TwoCheckpoint, TwoCheckpointNoFinish,
};
use wf_engine::{EventLoop, ProcessRegistry, ProcessState};

fn registry() -> ProcessRegistry {
    let mut registry = ProcessRegistry::new();
    registry.register::<ProcessWithCheckpoint>();
    registry.register::<TwoCheckpoint>();
    registry.register::<TwoCheckpointNoFinish>();
    registry
}

#[test]
fn checkpoint_run_passes_through_waiting_and_back() {
    let mut event_loop = EventLoop::new();
    let recorder = StateRecorder::new();
    event_loop.monitor().add_listener(recorder.clone());

    let handle = event_loop
        .create_process(ProcessWithCheckpoint, None, None)
        .unwrap();
    event_loop.run_until_complete(handle.future(), None).unwrap();

    assert_eq!(
        recorder.history(),
        vec![
            ProcessState::Created,
            ProcessState::Running,
            ProcessState::Waiting,
            ProcessState::Running,
            ProcessState::Stopped,
        ]
    );
}

#[test]
fn single_checkpoint_snapshots_replay_identically() {
    let mut event_loop = EventLoop::new();
    let saver = ProcessSaver::new();
    event_loop.monitor().add_listener(saver.clone());

    let handle = event_loop
        .create_process(ProcessWithCheckpoint, None, Some("cp-1".into()))
        .unwrap();
    event_loop.run_until_complete(handle.future(), None).unwrap();

    let snapshots = saver.snapshots();
    assert!(snapshots.len() >= 4);
    check_against_snapshots(&registry(), &snapshots);
}

#[test]
fn two_checkpoint_snapshots_replay_identically() {
    let mut event_loop = EventLoop::new();
    let saver = ProcessSaver::new();
    event_loop.monitor().add_listener(saver.clone());

    let handle = event_loop
        .create_process(TwoCheckpoint, None, Some("cp-2".into()))
        .unwrap();
    event_loop.run_until_complete(handle.future(), None).unwrap();

    check_against_snapshots(&registry(), &saver.snapshots());
}

#[test]
fn no_finish_checkpoint_snapshots_replay_identically() {
    let mut event_loop = EventLoop::new();
    let saver = ProcessSaver::new();
    event_loop.monitor().add_listener(saver.clone());

    let handle = event_loop
        .create_process(TwoCheckpointNoFinish, None, Some("cp-3".into()))
        .unwrap();
    event_loop.run_until_complete(handle.future(), None).unwrap();

    check_against_snapshots(&registry(), &saver.snapshots());
}

#[test]
fn reload_from_waiting_preserves_identity() {
    let mut event_loop = EventLoop::new();
    let handle = event_loop
        .create_process(TwoCheckpoint, None, Some("cp-4".into()))
        .unwrap();
    // CREATED -> RUNNING, then RUNNING -> WAITING
    event_loop.tick();
    event_loop.tick();
    assert_eq!(handle.state(), ProcessState::Waiting);
    let bundle = handle.save().unwrap();

    let mut fresh_loop = EventLoop::new();
    let restored = fresh_loop.restore(&registry(), &bundle).unwrap();

    assert_eq!(restored.pid(), handle.pid());
    assert_eq!(restored.state(), handle.state());
    assert_eq!(restored.outputs(), handle.outputs());
    assert_eq!(
        restored.with_process(|p| p.raw_inputs().clone()),
        handle.with_process(|p| p.raw_inputs().clone())
    );

    fresh_loop
        .run_until_complete(restored.future(), None)
        .unwrap();
    assert_eq!(restored.state(), ProcessState::Stopped);
    assert_eq!(restored.outputs().get_int("test").unwrap(), 5);
}
