// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Chained configuration scopes.
//!
//! A [`ScopedConfig`] is one node in a parent-linked chain. Lookups walk from
//! the receiver to the root and the first node holding the key wins, so a
//! child shadows its ancestors without touching them. The chain is built
//! root → platform → workload, one scope per resolution step.
//!
//! Parents are shared through `Arc` and have no interior mutability: once a
//! child exists its ancestors are frozen. [`ScopedConfig::merge_into`] is the
//! only way to add keys to a shared scope and it refuses when a child holds it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Keys starting with this prefix are private and hidden from snapshots.
const PRIVATE_PREFIX: char = '_';

/// A configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Name of the value's type, used in error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Values render the way they are substituted into SQL and command lines.
/// Lists use array-literal syntax, maps fall back to JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            Self::Map(map) => match serde_json::to_string(map) {
                Ok(json) => write!(f, "{}", json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        match i64::try_from(i) {
            Ok(i) => Self::Integer(i),
            Err(_) => Self::Float(i as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Self::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Result of walking the chain for a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// No scope in the chain holds the key.
    Absent,
    /// The nearest scope holding the key maps it to null.
    Null,
    /// The nearest scope holding the key maps it to a value.
    Value(&'a Value),
}

/// One node of a configuration scope chain.
#[derive(Debug, Default)]
pub struct ScopedConfig {
    values: BTreeMap<String, Value>,
    parent: Option<Arc<ScopedConfig>>,
}

impl ScopedConfig {
    /// Create a root scope with no parent.
    pub fn root() -> Self {
        Self::default()
    }

    /// Create an empty scope whose parent is `self`.
    ///
    /// The parent is fixed for the lifetime of the child.
    pub fn child(self: &Arc<Self>) -> ScopedConfig {
        ScopedConfig {
            values: BTreeMap::new(),
            parent: Some(Arc::clone(self)),
        }
    }

    /// Number of ancestors (0 for a root scope).
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }

    /// Set a key in this scope, shadowing any ancestor value.
    /// Returns the previous local value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Set several keys in this scope.
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// Set every field of a serializable struct as a key in this scope.
    pub fn extend_serialized<T: Serialize>(&mut self, fields: &T) -> Result<(), ConfigError> {
        let json = serde_json::to_value(fields).map_err(|e| ConfigError::InvalidFieldValue {
            field: "parameters",
            value: std::any::type_name::<T>().to_string(),
            reason: e.to_string(),
        })?;

        match Value::from(json) {
            Value::Map(map) => {
                self.values.extend(map);
                Ok(())
            }
            other => Err(ConfigError::TypeMismatch {
                key: std::any::type_name::<T>().to_string(),
                expected: "map",
                found: other.type_name(),
            }),
        }
    }

    /// Add keys to a scope that may already be shared.
    ///
    /// Fails with [`ConfigError::ScopeShared`] once a child (or any other
    /// holder) references the scope, so ancestors never change under a child.
    pub fn merge_into<I, K, V>(scope: &mut Arc<ScopedConfig>, entries: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let scope = Arc::get_mut(scope).ok_or(ConfigError::ScopeShared)?;
        scope.extend(entries);
        Ok(())
    }

    /// Walk the chain for `key`.
    pub fn lookup(&self, key: &str) -> Lookup<'_> {
        for scope in self.ancestors() {
            if let Some(value) = scope.values.get(key) {
                return if value.is_null() {
                    Lookup::Null
                } else {
                    Lookup::Value(value)
                };
            }
        }
        Lookup::Absent
    }

    /// Get the nearest value for `key`, which may be [`Value::Null`].
    pub fn get(&self, key: &str) -> Result<&Value, ConfigError> {
        self.ancestors()
            .find_map(|scope| scope.values.get(key))
            .ok_or_else(|| ConfigError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// Check whether `key` is present. A null value only counts when
    /// `allow_null` is set.
    pub fn has(&self, key: &str, allow_null: bool) -> bool {
        match self.lookup(key) {
            Lookup::Absent => false,
            Lookup::Null => allow_null,
            Lookup::Value(_) => true,
        }
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get(key)? {
            Value::String(s) => Ok(s),
            other => Err(Self::mismatch(key, "string", other)),
        }
    }

    /// Get a string that may be absent or null.
    pub fn get_opt_str(&self, key: &str) -> Result<Option<&str>, ConfigError> {
        match self.lookup(key) {
            Lookup::Absent | Lookup::Null => Ok(None),
            Lookup::Value(Value::String(s)) => Ok(Some(s)),
            Lookup::Value(other) => Err(Self::mismatch(key, "string", other)),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i64, ConfigError> {
        match self.get(key)? {
            Value::Integer(i) => Ok(*i),
            other => Err(Self::mismatch(key, "integer", other)),
        }
    }

    pub fn get_float(&self, key: &str) -> Result<f64, ConfigError> {
        match self.get(key)? {
            Value::Float(x) => Ok(*x),
            Value::Integer(i) => Ok(*i as f64),
            other => Err(Self::mismatch(key, "float", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get(key)? {
            Value::Bool(b) => Ok(*b),
            other => Err(Self::mismatch(key, "bool", other)),
        }
    }

    /// Get a list of strings, such as forwarded arguments.
    pub fn get_str_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        match self.get(key)? {
            Value::List(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(Self::mismatch(key, "list of strings", other)),
                })
                .collect(),
            other => Err(Self::mismatch(key, "list", other)),
        }
    }

    /// Flatten the chain into one mapping; descendants override ancestors.
    pub fn snapshot(&self, hide_private: bool) -> BTreeMap<String, Value> {
        let chain: Vec<&ScopedConfig> = self.ancestors().collect();
        let mut flat = BTreeMap::new();

        for scope in chain.into_iter().rev() {
            for (key, value) in &scope.values {
                if hide_private && Self::is_private(key) {
                    continue;
                }
                flat.insert(key.clone(), value.clone());
            }
        }

        flat
    }

    pub fn is_private(key: &str) -> bool {
        key.starts_with(PRIVATE_PREFIX)
    }

    /// This scope followed by each ancestor up to the root.
    fn ancestors(&self) -> impl Iterator<Item = &ScopedConfig> {
        std::iter::successors(Some(self), |scope| scope.parent.as_deref())
    }

    fn mismatch(key: &str, expected: &'static str, found: &Value) -> ConfigError {
        ConfigError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }
}
