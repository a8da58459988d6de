// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serializable key/value container used for process checkpoints.
//!
//! A [`Bundle`] is an ordered string-keyed map of [`BundleValue`]s. The
//! reserved key [`CLASS_NAME`] identifies the registered type that a saved
//! state belongs to, so a checkpoint can be rehydrated without reflective
//! lookups. Bundles round-trip losslessly through serde_json.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reserved bundle key naming the registered type to reconstruct.
pub const CLASS_NAME: &str = "class_name";

/// Errors from typed bundle access
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    #[error("missing bundle key '{0}'")]
    MissingKey(String),
    #[error("bundle key '{key}' is not a {expected}")]
    WrongType { key: String, expected: ValueKind },
}

/// The kind of a [`BundleValue`], used for port type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Null => write!(f, "null"),
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Str => write!(f, "string"),
            ValueKind::List => write!(f, "list"),
            ValueKind::Map => write!(f, "map"),
        }
    }
}

/// A value storable in a [`Bundle`]: a primitive, a list, or a nested bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<BundleValue>),
    Map(Bundle),
}

impl BundleValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            BundleValue::Null => ValueKind::Null,
            BundleValue::Bool(_) => ValueKind::Bool,
            BundleValue::Int(_) => ValueKind::Int,
            BundleValue::Float(_) => ValueKind::Float,
            BundleValue::Str(_) => ValueKind::Str,
            BundleValue::List(_) => ValueKind::List,
            BundleValue::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BundleValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BundleValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BundleValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            BundleValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BundleValue]> {
        match self {
            BundleValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Bundle> {
        match self {
            BundleValue::Map(b) => Some(b),
            _ => None,
        }
    }
}

impl From<bool> for BundleValue {
    fn from(v: bool) -> Self {
        BundleValue::Bool(v)
    }
}

impl From<i64> for BundleValue {
    fn from(v: i64) -> Self {
        BundleValue::Int(v)
    }
}

impl From<i32> for BundleValue {
    fn from(v: i32) -> Self {
        BundleValue::Int(v as i64)
    }
}

impl From<u64> for BundleValue {
    fn from(v: u64) -> Self {
        BundleValue::Int(v as i64)
    }
}

impl From<f64> for BundleValue {
    fn from(v: f64) -> Self {
        BundleValue::Float(v)
    }
}

impl From<&str> for BundleValue {
    fn from(v: &str) -> Self {
        BundleValue::Str(v.to_string())
    }
}

impl From<String> for BundleValue {
    fn from(v: String) -> Self {
        BundleValue::Str(v)
    }
}

impl From<Vec<BundleValue>> for BundleValue {
    fn from(v: Vec<BundleValue>) -> Self {
        BundleValue::List(v)
    }
}

impl From<Bundle> for BundleValue {
    fn from(v: Bundle) -> Self {
        BundleValue::Map(v)
    }
}

impl<T: Into<BundleValue>> From<Option<T>> for BundleValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => BundleValue::Null,
        }
    }
}

/// Ordered string-keyed container of [`BundleValue`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle {
    values: IndexMap<String, BundleValue>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<BundleValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&BundleValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Remove a value, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<BundleValue> {
        self.values.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BundleValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn require(&self, key: &str) -> Result<&BundleValue, BundleError> {
        self.values
            .get(key)
            .ok_or_else(|| BundleError::MissingKey(key.to_string()))
    }

    pub fn get_str(&self, key: &str) -> Result<&str, BundleError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| BundleError::WrongType {
                key: key.to_string(),
                expected: ValueKind::Str,
            })
    }

    /// Like [`get_str`](Self::get_str) but treats `Null` (and absence) as `None`.
    pub fn get_opt_str(&self, key: &str) -> Result<Option<&str>, BundleError> {
        match self.values.get(key) {
            None | Some(BundleValue::Null) => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| BundleError::WrongType {
                    key: key.to_string(),
                    expected: ValueKind::Str,
                }),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, BundleError> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| BundleError::WrongType {
                key: key.to_string(),
                expected: ValueKind::Bool,
            })
    }

    pub fn get_int(&self, key: &str) -> Result<i64, BundleError> {
        self.require(key)?
            .as_int()
            .ok_or_else(|| BundleError::WrongType {
                key: key.to_string(),
                expected: ValueKind::Int,
            })
    }

    pub fn get_list(&self, key: &str) -> Result<&[BundleValue], BundleError> {
        self.require(key)?
            .as_list()
            .ok_or_else(|| BundleError::WrongType {
                key: key.to_string(),
                expected: ValueKind::List,
            })
    }

    pub fn get_bundle(&self, key: &str) -> Result<&Bundle, BundleError> {
        self.require(key)?
            .as_map()
            .ok_or_else(|| BundleError::WrongType {
                key: key.to_string(),
                expected: ValueKind::Map,
            })
    }

    /// Set the reserved [`CLASS_NAME`] key.
    pub fn set_class_name(&mut self, name: impl Into<String>) {
        self.set(CLASS_NAME, name.into());
    }

    /// Read the reserved [`CLASS_NAME`] key.
    pub fn class_name(&self) -> Result<&str, BundleError> {
        self.get_str(CLASS_NAME)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

impl FromIterator<(String, BundleValue)> for Bundle {
    fn from_iter<I: IntoIterator<Item = (String, BundleValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
