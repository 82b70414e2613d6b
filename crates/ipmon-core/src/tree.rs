// Nested configuration document built from dotted field paths.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::value::Scalar;

/// The configuration as the backend stores it: nested JSON objects with
/// scalar leaves, addressed by dotted paths such as
/// `network_settings.ping_timeout`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTree(Map<String, Value>);

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CoreError::InvalidFile {
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(text).map_err(|e| CoreError::InvalidFile {
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Set the leaf at `path`, creating intermediate objects as needed.
    ///
    /// An intermediate that currently holds a scalar is replaced by an
    /// object.
    pub fn set(&mut self, path: &str, value: &Scalar) {
        let mut keys = path.split('.');
        let Some(mut key) = keys.next() else {
            return;
        };
        let mut current = &mut self.0;
        for next in keys {
            let slot = current
                .entry(key.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                return;
            };
            current = map;
            key = next;
        }
        current.insert(key.to_owned(), value.to_json());
    }

    /// Value at a dotted path (leaf or subtree).
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut keys = path.split('.');
        let mut value = self.0.get(keys.next()?)?;
        for key in keys {
            value = value.as_object()?.get(key)?;
        }
        Some(value)
    }

    /// Every non-object value with its dotted path, depth first.
    pub fn leaves(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        collect_leaves(&self.0, "", &mut out);
        out
    }

    /// Deepest nesting level; an empty tree has depth 0 and `{"a": 1}`
    /// has depth 1.
    pub fn depth(&self) -> usize {
        map_depth(&self.0)
    }

    /// Overlay `other` onto `self`, merging objects key by key.
    pub fn merge(&mut self, other: &ConfigTree) {
        merge_maps(&mut self.0, &other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Two-space indented JSON, the export file format.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".into())
    }
}

fn collect_leaves(map: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(child) => collect_leaves(child, &path, out),
            leaf => out.push((path, leaf.clone())),
        }
    }
}

fn map_depth(map: &Map<String, Value>) -> usize {
    if map.is_empty() {
        return 0;
    }
    1 + map
        .values()
        .filter_map(Value::as_object)
        .map(map_depth)
        .max()
        .unwrap_or(0)
}

fn merge_maps(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(dst)), Value::Object(src)) => merge_maps(dst, src),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
