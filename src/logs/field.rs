//! Structured fields attached to log records

use std::fmt;

use serde::Serialize;

/// Typed value carried by a [`Field`]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    /// Rendered error message
    Error(String),
    /// Arbitrary serializable value
    Json(serde_json::Value),
    /// Opens a nested object; every later field on the record lands inside it
    Namespace,
}

impl Value {
    /// JSON form of the value. `Namespace` has none.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        let value = match self {
            Value::Str(s) | Value::Error(s) => serde_json::Value::from(s.as_str()),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Uint(n) => serde_json::Value::from(*n),
            // NaN and infinities are not representable in JSON
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::from(n.to_string())),
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Json(v) => v.clone(),
            Value::Namespace => return None,
        };
        Some(value)
    }
}

/// A key/typed-value pair attached to a structured log record
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: Value,
}

impl Field {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, Value::Str(value.into()))
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, Value::Int(value))
    }

    pub fn uint(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, Value::Uint(value))
    }

    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, Value::Float(value))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, Value::Bool(value))
    }

    /// Field rendered through `Display`
    pub fn display(key: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(key, Value::Str(value.to_string()))
    }

    /// Field holding any serializable value. Serialization failures are
    /// recorded in place of the value.
    pub fn any(key: impl Into<String>, value: &impl Serialize) -> Self {
        let value = match serde_json::to_value(value) {
            Ok(v) => Value::Json(v),
            Err(e) => Value::Error(format!("failed to serialize field: {}", e)),
        };
        Self::new(key, value)
    }

    /// Error under the conventional `error` key
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::named_error("error", err)
    }

    pub fn named_error(key: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(key, Value::Error(err.to_string()))
    }

    /// Namespace marker: subsequent fields are nested under `name`
    pub fn namespace(name: impl Into<String>) -> Self {
        Self::new(name, Value::Namespace)
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self.value, Value::Namespace)
    }
}

/// Fold fields into a JSON object, nesting everything after a namespace
/// marker inside it.
pub(crate) fn fields_to_json<'a>(
    fields: impl IntoIterator<Item = &'a Field>,
) -> serde_json::Map<String, serde_json::Value> {
    // Stack of open objects: (key under which it nests, contents)
    let mut stack: Vec<(String, serde_json::Map<String, serde_json::Value>)> =
        vec![(String::new(), serde_json::Map::new())];

    for field in fields {
        match field.value.to_json() {
            Some(value) => {
                if let Some((_, map)) = stack.last_mut() {
                    map.insert(field.key.clone(), value);
                }
            }
            None => stack.push((field.key.clone(), serde_json::Map::new())),
        }
    }

    while stack.len() > 1 {
        if let (Some((key, inner)), Some((_, outer))) = (stack.pop(), stack.last_mut()) {
            outer.insert(key, serde_json::Value::Object(inner));
        }
    }

    stack.pop().map(|(_, map)| map).unwrap_or_default()
}
