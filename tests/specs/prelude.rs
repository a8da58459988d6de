// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the behavioral specs.

use wf_core::{Bundle, ProcessId};
use wf_engine::test_support::{ProcessSaver, Snapshot};
use wf_engine::{EventLoop, ProcessHandle, ProcessLogic, ProcessRegistry, ProcessState};

/// Run a process to termination on a fresh loop; returns the loop, the
/// handle, and the result.
pub fn run_process<L: ProcessLogic + 'static>(
    logic: L,
    inputs: Option<Bundle>,
    pid: Option<&str>,
) -> (
    EventLoop,
    ProcessHandle,
    Result<wf_core::BundleValue, wf_engine::EngineError>,
) {
    let mut event_loop = EventLoop::new();
    let handle = event_loop
        .create_process(logic, inputs, pid.map(ProcessId::new))
        .expect("create_process failed");
    let result = event_loop.run_until_complete(handle.future(), None);
    (event_loop, handle, result)
}

/// Tick until the process reaches the given state.
pub fn tick_until_state(event_loop: &mut EventLoop, handle: &ProcessHandle, state: ProcessState) {
    let mut remaining = 1000;
    while handle.state() != state {
        event_loop.tick();
        remaining -= 1;
        assert!(remaining > 0, "never reached {state}");
    }
}

/// Replay a process forward from each snapshot and check that the
/// subsequent snapshots match the original run's.
pub fn check_against_snapshots(
    registry: &ProcessRegistry,
    snapshots: &[Snapshot],
) {
    for (i, snapshot) in snapshots.iter().enumerate() {
        if snapshot.state.is_terminal() {
            continue;
        }
        let mut event_loop = EventLoop::new();
        let saver = ProcessSaver::new();
        event_loop.monitor().add_listener(saver.clone());

        let restored = event_loop
            .restore(registry, &snapshot.bundle)
            .unwrap_or_else(|e| panic!("restore from snapshot {i} failed: {e}"));
        let _ = event_loop.run_until_complete(restored.future(), None);

        let replayed = saver.snapshots();
        // Compare the common tail: the replay starts mid-history, so align
        // from the back
        let overlap = replayed.len().min(snapshots.len() - i);
        assert!(overlap > 0, "snapshot {i}: replay produced no snapshots");
        let original_tail = &snapshots[snapshots.len() - overlap..];
        let replayed_tail = &replayed[replayed.len() - overlap..];
        for (a, b) in original_tail.iter().zip(replayed_tail) {
            assert_eq!(a.state, b.state, "snapshot {i}: diverging state");
            assert_eq!(a.outputs, b.outputs, "snapshot {i}: diverging outputs");
            similar_asserts::assert_eq!(
                serde_json::to_string_pretty(&a.bundle).unwrap(),
                serde_json::to_string_pretty(&b.bundle).unwrap(),
            );
        }
    }
}
