// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{DummyProcess, DummyProcessWithOutput};
use crate::wait::{save_outcome, Outcome, WaitOn as _};

#[test]
fn instantiate_unknown_kind_fails() {
    let registry = ProcessRegistry::new();
    assert!(matches!(
        registry.instantiate("nope"),
        Err(EngineError::ClassNotFound(_))
    ));
}

#[test]
fn registered_kind_instantiates_with_sealed_spec() {
    let mut registry = ProcessRegistry::new();
    registry.register::<DummyProcessWithOutput>();
    assert!(registry.contains("dummy_with_output"));

    let (logic, spec) = registry.instantiate("dummy_with_output").unwrap();
    assert_eq!(logic.kind(), "dummy_with_output");
    assert!(spec.sealed());
    assert!(spec.has_dynamic_output());
}

#[test]
fn register_is_chainable() {
    let mut registry = ProcessRegistry::new();
    registry
        .register::<DummyProcess>()
        .register::<DummyProcessWithOutput>();
    assert!(registry.contains("dummy"));
    assert!(registry.contains("dummy_with_output"));
}

#[test]
fn builtin_wait_ons_rehydrate() {
    let registry = ProcessRegistry::new();

    let mut bundle = Bundle::new();
    save_outcome(Checkpoint::KIND, Some(&Outcome::success()), &mut bundle);
    let wait = registry.load_wait_on(&bundle).unwrap();
    assert_eq!(wait.kind(), Checkpoint::KIND);
    assert_eq!(wait.outcome(), Some(Outcome::success()));

    let mut bundle = Bundle::new();
    save_outcome(WaitForSignal::KIND, None, &mut bundle);
    let wait = registry.load_wait_on(&bundle).unwrap();
    assert_eq!(wait.kind(), WaitForSignal::KIND);
    assert_eq!(wait.outcome(), None);
}

#[test]
fn unknown_wait_on_kind_fails() {
    let registry = ProcessRegistry::new();
    let mut bundle = Bundle::new();
    bundle.set_class_name("mystery_wait");
    assert!(matches!(
        registry.load_wait_on(&bundle),
        Err(EngineError::ClassNotFound(_))
    ));
}

#[test]
fn wait_on_bundle_without_class_name_fails() {
    let registry = ProcessRegistry::new();
    let bundle = Bundle::new();
    assert!(matches!(
        registry.load_wait_on(&bundle),
        Err(EngineError::Bundle(_))
    ));
}
