//! Context variables threaded through every turn.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Reserved tool-parameter name that receives the context-variable map.
///
/// Stripped from every advertised tool schema so the model never sees or
/// supplies it.
pub const CTX_VARS_NAME: &str = "context_variables";

/// A string-keyed side channel merged across turns.
///
/// Agent-level defaults are overridden by caller-supplied values; tool
/// results contribute deltas that win over both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextVariables(HashMap<String, serde_json::Value>);

impl ContextVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Overlay `other` onto `self`; values in `other` win.
    pub fn merge(&mut self, other: &ContextVariables) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// `defaults` overlaid by `overrides`, as a new map.
    pub fn merged(defaults: &ContextVariables, overrides: &ContextVariables) -> Self {
        let mut merged = defaults.clone();
        merged.merge(overrides);
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for ContextVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
