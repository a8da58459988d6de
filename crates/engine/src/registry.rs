// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Explicit type registry for checkpoint rehydration.
//!
//! Process and wait-on types are registered under stable string identifiers
//! at startup; a bundle's `class_name` is resolved against this registry.
//! Unknown identifiers fail with [`EngineError::ClassNotFound`] instead of
//! any reflective lookup.

use crate::error::EngineError;
use crate::process::ProcessLogic;
use crate::wait::WaitOn;
use crate::wait_ons::{Checkpoint, WaitForSignal};
use std::collections::HashMap;
use wf_core::{Bundle, ProcessSpec, SpecError};

type LogicFactory = Box<dyn Fn() -> Box<dyn ProcessLogic> + Send + Sync>;
type DefineFn = fn(&mut ProcessSpec) -> Result<(), SpecError>;
type WaitFactory = Box<dyn Fn(&Bundle) -> Result<Box<dyn WaitOn>, EngineError> + Send + Sync>;

struct LogicEntry {
    define: DefineFn,
    build: LogicFactory,
}

/// Maps stable kind strings to process and wait-on constructors.
pub struct ProcessRegistry {
    procs: HashMap<String, LogicEntry>,
    waits: HashMap<String, WaitFactory>,
}

impl ProcessRegistry {
    /// A registry with the built-in wait-ons pre-registered.
    pub fn new() -> Self {
        let mut registry = Self {
            procs: HashMap::new(),
            waits: HashMap::new(),
        };
        registry.register_wait_on(Checkpoint::KIND, |bundle| {
            Ok(Box::new(Checkpoint::load(bundle)?))
        });
        registry.register_wait_on(WaitForSignal::KIND, |bundle| {
            Ok(Box::new(WaitForSignal::load(bundle)?))
        });
        registry
    }

    /// Register a process type under its own kind string.
    pub fn register<L>(&mut self) -> &mut Self
    where
        L: ProcessLogic + Default,
    {
        let kind = L::default().kind();
        self.register_with(kind, L::define, || Box::new(L::default()))
    }

    /// Register a process type with an explicit factory.
    pub fn register_with(
        &mut self,
        kind: &str,
        define: DefineFn,
        build: impl Fn() -> Box<dyn ProcessLogic> + Send + Sync + 'static,
    ) -> &mut Self {
        if self.procs.contains_key(kind) {
            tracing::info!(kind, "overwriting existing process registration");
        }
        self.procs.insert(
            kind.to_string(),
            LogicEntry {
                define,
                build: Box::new(build),
            },
        );
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.procs.contains_key(kind)
    }

    /// Build a fresh logic instance and its sealed spec.
    pub fn instantiate(
        &self,
        kind: &str,
    ) -> Result<(Box<dyn ProcessLogic>, ProcessSpec), EngineError> {
        let entry = self
            .procs
            .get(kind)
            .ok_or_else(|| EngineError::ClassNotFound(kind.to_string()))?;
        let mut spec = ProcessSpec::new();
        (entry.define)(&mut spec)?;
        spec.seal();
        Ok(((entry.build)(), spec))
    }

    /// Register a wait-on rehydrator under its kind string.
    pub fn register_wait_on(
        &mut self,
        kind: &str,
        factory: impl Fn(&Bundle) -> Result<Box<dyn WaitOn>, EngineError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.waits.insert(kind.to_string(), Box::new(factory));
        self
    }

    /// Rehydrate a saved wait-on from its bundle.
    pub fn load_wait_on(&self, bundle: &Bundle) -> Result<Box<dyn WaitOn>, EngineError> {
        let kind = bundle.class_name()?;
        let factory = self
            .waits
            .get(kind)
            .ok_or_else(|| EngineError::ClassNotFound(kind.to_string()))?;
        factory(bundle)
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
