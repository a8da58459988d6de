// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bundle::{BundleValue, ValueKind};

fn inputs(pairs: &[(&str, BundleValue)]) -> Bundle {
    let mut b = Bundle::new();
    for (k, v) in pairs {
        b.set(*k, v.clone());
    }
    b
}

#[test]
fn unexpected_input_rejected_without_dynamic() {
    let mut spec = ProcessSpec::new();
    spec.input("a").unwrap();
    let err = spec
        .validate(&inputs(&[("b", BundleValue::Int(1))]))
        .unwrap_err();
    assert!(err.contains("unexpected input 'b'"));
}

#[test]
fn dynamic_input_allows_unknown_keys() {
    let mut spec = ProcessSpec::new();
    spec.dynamic_input().unwrap();
    let effective = spec
        .validate(&inputs(&[("anything", BundleValue::Int(1))]))
        .unwrap();
    assert_eq!(effective.get_int("anything").unwrap(), 1);
}

#[test]
fn missing_required_input_rejected() {
    let mut spec = ProcessSpec::new();
    spec.input("a").unwrap();
    let err = spec.validate(&Bundle::new()).unwrap_err();
    assert!(err.contains("required input 'a'"));
}

#[test]
fn default_substitution() {
    let mut spec = ProcessSpec::new();
    spec.input_port(InputPort::new("a").with_default(5)).unwrap();
    let effective = spec.validate(&Bundle::new()).unwrap();
    assert_eq!(effective.get_int("a").unwrap(), 5);
}

#[test]
fn kind_check_applied() {
    let mut spec = ProcessSpec::new();
    spec.input_port(InputPort::new("n").of_kind(ValueKind::Int))
        .unwrap();
    assert!(spec.validate(&inputs(&[("n", BundleValue::Int(1))])).is_ok());
    assert!(spec
        .validate(&inputs(&[("n", BundleValue::Str("x".into()))]))
        .is_err());
}

#[test]
fn user_validator_runs_last() {
    let mut spec = ProcessSpec::new();
    spec.input_port(InputPort::new("n").with_default(0)).unwrap();
    spec.validator(|_, effective| {
        // Defaults are already substituted by the time the validator runs
        if effective.get_int("n").map_err(|e| e.to_string())? < 0 {
            Err("n must be non-negative".to_string())
        } else {
            Ok(())
        }
    })
    .unwrap();

    assert!(spec.validate(&Bundle::new()).is_ok());
    let err = spec
        .validate(&inputs(&[("n", BundleValue::Int(-1))]))
        .unwrap_err();
    assert_eq!(err, "n must be non-negative");
}

#[test]
fn sealed_spec_rejects_mutation() {
    let mut spec = ProcessSpec::new();
    spec.input("a").unwrap();
    spec.seal();

    assert_eq!(spec.input("b"), Err(SpecError::Sealed));
    assert_eq!(spec.output("o"), Err(SpecError::Sealed));
    assert_eq!(spec.dynamic_input(), Err(SpecError::Sealed));
    assert_eq!(spec.remove_input("a"), Err(SpecError::Sealed));
    assert_eq!(spec.deterministic(), Err(SpecError::Sealed));
    assert!(spec.has_input("a"));
}

#[test]
fn seal_is_idempotent() {
    let mut spec = ProcessSpec::new();
    spec.seal();
    spec.seal();
    assert!(spec.sealed());
}

#[test]
fn validation_still_works_after_seal() {
    let mut spec = ProcessSpec::new();
    spec.input("a").unwrap();
    spec.seal();
    assert!(spec.validate(&inputs(&[("a", BundleValue::Int(1))])).is_ok());
}

#[test]
fn required_outputs_excludes_optional_and_dynamic() {
    let mut spec = ProcessSpec::new();
    spec.output("must").unwrap();
    spec.optional_output("may").unwrap();
    spec.dynamic_output().unwrap();

    let required: Vec<&str> = spec.required_outputs().collect();
    assert_eq!(required, vec!["must"]);
}

#[test]
fn input_group_takes_a_map() {
    let mut spec = ProcessSpec::new();
    spec.input_group("options").unwrap();

    let mut group = Bundle::new();
    group.set("verbose", true);
    let mut inputs = Bundle::new();
    inputs.set("options", group);
    assert!(spec.validate(&inputs).is_ok());

    let mut bad = Bundle::new();
    bad.set("options", 3);
    assert!(spec.validate(&bad).is_err());

    // Groups are optional by default
    assert!(spec.validate(&Bundle::new()).is_ok());
}

#[test]
fn deterministic_flag() {
    let mut spec = ProcessSpec::new();
    assert_eq!(spec.is_deterministic(), None);
    spec.not_deterministic().unwrap();
    assert_eq!(spec.is_deterministic(), Some(false));
}

#[test]
fn describe_lists_ports() {
    let mut spec = ProcessSpec::new();
    spec.input("a").unwrap();
    spec.output("b").unwrap();
    let desc = spec.describe();
    assert!(desc.contains("Inputs"));
    assert!(desc.contains("a:"));
    assert!(desc.contains("Outputs"));
}
