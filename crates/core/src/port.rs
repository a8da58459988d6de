// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input and output port descriptors for process specifications.

use crate::bundle::{BundleValue, ValueKind};
use serde::{Deserialize, Serialize};

/// Reserved port name for dynamic (undeclared) inputs/outputs.
pub const DYNAMIC: &str = "_dynamic";

/// Declares one named input of a process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPort {
    pub name: String,
    pub required: bool,
    pub default: Option<BundleValue>,
    pub kind: Option<ValueKind>,
    pub help: Option<String>,
}

impl InputPort {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            default: None,
            kind: None,
            help: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set a default; a port with a default is implicitly optional.
    pub fn with_default(mut self, value: impl Into<BundleValue>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    pub fn of_kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    /// Validate a supplied value, returning the effective value with the
    /// default substituted when the input was absent.
    pub fn validate(&self, value: Option<&BundleValue>) -> Result<Option<BundleValue>, String> {
        let effective = match value {
            Some(v) => Some(v.clone()),
            None => self.default.clone(),
        };
        match &effective {
            None if self.required => Err(format!("required input '{}' was not supplied", self.name)),
            None => Ok(None),
            Some(v) => {
                self.check_kind(v)?;
                Ok(effective)
            }
        }
    }

    fn check_kind(&self, value: &BundleValue) -> Result<(), String> {
        match self.kind {
            Some(kind) if value.kind() != kind => Err(format!(
                "input '{}' must be a {} but a {} was supplied",
                self.name,
                kind,
                value.kind()
            )),
            _ => Ok(()),
        }
    }

    pub fn describe(&self) -> String {
        let mut desc = format!("{}:", self.name);
        if let Some(kind) = self.kind {
            desc.push_str(&format!(" {kind}"));
        }
        desc.push_str(if self.required {
            " (required)"
        } else {
            " (optional)"
        });
        if let Some(default) = &self.default {
            desc.push_str(&format!(" [default: {default:?}]"));
        }
        if let Some(help) = &self.help {
            desc.push_str(&format!(" — {help}"));
        }
        desc
    }
}

/// Declares one named output of a process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPort {
    pub name: String,
    pub required: bool,
    pub kind: Option<ValueKind>,
}

impl OutputPort {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            kind: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn of_kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Check an emitted value against the declared kind.
    pub fn validate(&self, value: &BundleValue) -> Result<(), String> {
        match self.kind {
            Some(kind) if value.kind() != kind => Err(format!(
                "output '{}' must be a {} but a {} was emitted",
                self.name,
                kind,
                value.kind()
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod tests;
