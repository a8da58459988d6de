// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    star     = { "process.*" },
    hash     = { "process.#" },
    embedded = { "process.*.finish" },
)]
fn wildcard_detection(s: &str) {
    assert!(Pattern::is_wildcard(s));
}

#[test]
fn literal_is_not_wildcard() {
    assert!(!Pattern::is_wildcard("process.abc.finish"));
}

#[test]
fn literal_pattern_matches_exactly() {
    let p = Pattern::compile("process.abc.finish");
    assert!(p.matches("process.abc.finish"));
    assert!(!p.matches("process.abc.finished"));
    assert!(!p.matches("process.abc"));
}

#[yare::parameterized(
    empty_tail    = { "process.abc.*", "process.abc.", true },
    event_tail    = { "process.abc.*", "process.abc.finish", true },
    other_pid     = { "process.abc.*", "process.xyz.finish", false },
    pid_hole      = { "process.*.finish", "process.abc.finish", true },
    pid_hole_miss = { "process.*.finish", "process.abc.stop", false },
    full_star     = { "*", "anything.at.all", true },
)]
fn star_patterns(pattern: &str, event: &str, expected: bool) {
    assert_eq!(Pattern::compile(pattern).matches(event), expected);
}

#[yare::parameterized(
    one_or_more   = { "process.#", "process.x", true },
    empty_tail    = { "process.#", "process.", false },
    full_hash     = { "#", "x", true },
    full_hash_empty = { "#", "", false },
)]
fn hash_patterns(pattern: &str, event: &str, expected: bool) {
    assert_eq!(Pattern::compile(pattern).matches(event), expected);
}

#[test]
fn star_spans_segments() {
    // `*` is not segment-bounded; it may cross dots
    let p = Pattern::compile("process.*.finish");
    assert!(p.matches("process.a.b.finish"));
}

#[test]
fn pid_pattern_isolates_processes() {
    let p = Pattern::compile("process.pid-1.*");
    for event in ["start", "run", "wait", "resume", "finish", "stop"] {
        assert!(p.matches(&format!("process.pid-1.{event}")));
        assert!(!p.matches(&format!("process.pid-2.{event}")));
    }
}

#[test]
fn source_round_trips() {
    let p = Pattern::compile("process.*.finish");
    assert_eq!(p.source(), "process.*.finish");
    assert_eq!(p.to_string(), "process.*.finish");
}
