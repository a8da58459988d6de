// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process specification: declared inputs, outputs, and input validation.
//!
//! A spec is built once per process type and then sealed; any structural
//! change after sealing fails. Validation order is: unexpected keys (unless
//! a dynamic input is declared), per-port checks with default substitution,
//! then the user-supplied validator last.

use crate::bundle::Bundle;
use crate::port::{InputPort, OutputPort, DYNAMIC};
use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// Errors from spec construction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("cannot modify a process spec after it is sealed")]
    Sealed,
}

type Validator = Box<dyn Fn(&ProcessSpec, &Bundle) -> Result<(), String> + Send + Sync>;

/// Declarative description of a process's inputs and outputs.
#[derive(Default)]
pub struct ProcessSpec {
    inputs: IndexMap<String, InputPort>,
    outputs: IndexMap<String, OutputPort>,
    validator: Option<Validator>,
    deterministic: Option<bool>,
    sealed: bool,
}

impl ProcessSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seal this specification, disallowing further structural change.
    /// Sealing is idempotent.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn sealed(&self) -> bool {
        self.sealed
    }

    fn check_unsealed(&self) -> Result<(), SpecError> {
        if self.sealed {
            Err(SpecError::Sealed)
        } else {
            Ok(())
        }
    }

    // -- inputs --

    pub fn inputs(&self) -> impl Iterator<Item = (&str, &InputPort)> {
        self.inputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_input(&self, name: &str) -> Option<&InputPort> {
        self.inputs.get(name)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    /// Declare a required, untyped input.
    pub fn input(&mut self, name: &str) -> Result<(), SpecError> {
        self.input_port(InputPort::new(name))
    }

    /// Declare an input from a fully configured port.
    pub fn input_port(&mut self, port: InputPort) -> Result<(), SpecError> {
        self.check_unsealed()?;
        if self.inputs.contains_key(&port.name) {
            tracing::info!(input = %port.name, "overwriting existing input");
        }
        self.inputs.insert(port.name.clone(), port);
        Ok(())
    }

    /// Declare an input that is itself a map of values under one key.
    pub fn input_group(&mut self, name: &str) -> Result<(), SpecError> {
        self.input_port(
            InputPort::new(name)
                .of_kind(crate::bundle::ValueKind::Map)
                .optional(),
        )
    }

    /// Allow inputs not covered by any declared port.
    pub fn dynamic_input(&mut self) -> Result<(), SpecError> {
        self.input_port(InputPort::new(DYNAMIC).optional())
    }

    pub fn no_dynamic_input(&mut self) -> Result<(), SpecError> {
        self.check_unsealed()?;
        self.inputs.shift_remove(DYNAMIC);
        Ok(())
    }

    pub fn has_dynamic_input(&self) -> bool {
        self.inputs.contains_key(DYNAMIC)
    }

    pub fn remove_input(&mut self, name: &str) -> Result<(), SpecError> {
        self.check_unsealed()?;
        self.inputs.shift_remove(name);
        Ok(())
    }

    // -- outputs --

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &OutputPort)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_output(&self, name: &str) -> Option<&OutputPort> {
        self.outputs.get(name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    /// Declare a required, untyped output.
    pub fn output(&mut self, name: &str) -> Result<(), SpecError> {
        self.output_port(OutputPort::new(name))
    }

    pub fn optional_output(&mut self, name: &str) -> Result<(), SpecError> {
        self.output_port(OutputPort::new(name).optional())
    }

    pub fn output_port(&mut self, port: OutputPort) -> Result<(), SpecError> {
        self.check_unsealed()?;
        if self.outputs.contains_key(&port.name) {
            tracing::info!(output = %port.name, "overwriting existing output");
        }
        self.outputs.insert(port.name.clone(), port);
        Ok(())
    }

    /// Allow outputs not covered by any declared port.
    pub fn dynamic_output(&mut self) -> Result<(), SpecError> {
        self.output_port(OutputPort::new(DYNAMIC).optional())
    }

    pub fn no_dynamic_output(&mut self) -> Result<(), SpecError> {
        self.check_unsealed()?;
        self.outputs.shift_remove(DYNAMIC);
        Ok(())
    }

    pub fn has_dynamic_output(&self) -> bool {
        self.outputs.contains_key(DYNAMIC)
    }

    pub fn remove_output(&mut self, name: &str) -> Result<(), SpecError> {
        self.check_unsealed()?;
        self.outputs.shift_remove(name);
        Ok(())
    }

    // -- validator / determinism --

    /// Supply a validator run after all per-port checks pass.
    pub fn validator<F>(&mut self, f: F) -> Result<(), SpecError>
    where
        F: Fn(&ProcessSpec, &Bundle) -> Result<(), String> + Send + Sync + 'static,
    {
        self.check_unsealed()?;
        self.validator = Some(Box::new(f));
        Ok(())
    }

    pub fn deterministic(&mut self) -> Result<(), SpecError> {
        self.set_deterministic(true)
    }

    pub fn not_deterministic(&mut self) -> Result<(), SpecError> {
        self.set_deterministic(false)
    }

    pub fn is_deterministic(&self) -> Option<bool> {
        self.deterministic
    }

    fn set_deterministic(&mut self, to: bool) -> Result<(), SpecError> {
        self.check_unsealed()?;
        if self.deterministic == Some(false) && to {
            tracing::warn!(
                "a process spec that was not deterministic has been changed to deterministic"
            );
        }
        self.deterministic = Some(to);
        Ok(())
    }

    // -- validation --

    /// Validate an input bundle against this spec.
    ///
    /// On success returns the effective inputs: declared-port defaults are
    /// substituted for absent keys, and (when a dynamic input is declared)
    /// undeclared keys are passed through.
    pub fn validate(&self, inputs: &Bundle) -> Result<Bundle, String> {
        if !self.has_dynamic_input() {
            for key in inputs.keys() {
                if !self.inputs.contains_key(key) {
                    return Err(format!(
                        "unexpected input '{key}'; declare dynamic_input() to allow undeclared inputs"
                    ));
                }
            }
        }

        let mut effective = Bundle::new();
        for (name, port) in &self.inputs {
            if name == DYNAMIC {
                continue;
            }
            if let Some(value) = port.validate(inputs.get(name))? {
                effective.set(name.clone(), value);
            }
        }
        if self.has_dynamic_input() {
            for (key, value) in inputs.iter() {
                if !self.inputs.contains_key(key) {
                    effective.set(key, value.clone());
                }
            }
        }

        if let Some(validator) = &self.validator {
            validator(self, &effective)?;
        }

        Ok(effective)
    }

    /// Which declared output ports may be emitted only once and must be
    /// present on a clean stop.
    pub fn required_outputs(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .filter(|(name, port)| name.as_str() != DYNAMIC && port.required)
            .map(|(name, _)| name.as_str())
    }

    /// Text description of the declared ports.
    pub fn describe(&self) -> String {
        let mut desc = Vec::new();
        if !self.inputs.is_empty() {
            desc.push("Inputs".to_string());
            desc.push("======".to_string());
            for port in self.inputs.values() {
                desc.push(port.describe());
            }
        }
        if !self.outputs.is_empty() {
            desc.push("Outputs".to_string());
            desc.push("=======".to_string());
            for (name, port) in &self.outputs {
                let kind = port
                    .kind
                    .map(|k| format!(" {k}"))
                    .unwrap_or_default();
                desc.push(format!("{name}:{kind}"));
            }
        }
        desc.join("\n")
    }
}

impl fmt::Debug for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSpec")
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .field("has_validator", &self.validator.is_some())
            .field("deterministic", &self.deterministic)
            .field("sealed", &self.sealed)
            .finish()
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
