//! Structural diff between two JSON-like values.
//!
//! The diff explains *why* two bodies differ rather than *how much*: a
//! string that changes value is fine, a string that turns into a number is
//! not. Only the first structural divergence is reported.

use serde_json::Value;

/// A closed representation of JSON values, plus the JavaScript-style
/// `undefined` for bodies that are absent altogether.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    /// No value at all (for example a `GET` request without a body).
    Undefined,
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Boolean(bool),
    /// JSON number.
    Number(serde_json::Number),
    /// JSON string.
    String(String),
    /// JSON array.
    Array(Vec<JsonValue>),
    /// JSON object, keys in insertion order.
    Object(Vec<(String, JsonValue)>),
}

impl JsonValue {
    /// Converts an optional body, mapping `None` to [`JsonValue::Undefined`].
    #[must_use]
    pub fn from_optional(value: Option<&Value>) -> Self {
        value.map_or(Self::Undefined, Self::from)
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Undefined | Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(entries) => {
                Value::Object(entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

impl From<&Value> for JsonValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.iter().map(|(k, v)| (k.clone(), Self::from(v))).collect())
            }
        }
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

/// Renders a value for a "became ..." message: `null`, `undefined`, or
/// `<type> <value>`.
#[must_use]
pub fn describe(value: &JsonValue) -> String {
    match value {
        JsonValue::Undefined => "undefined".to_string(),
        JsonValue::Null => "null".to_string(),
        JsonValue::String(s) => format!("string {s}"),
        JsonValue::Number(n) => format!("number {n}"),
        JsonValue::Boolean(b) => format!("boolean {b}"),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            format!("{} {}", value.type_name(), value.to_json())
        }
    }
}

/// Compares `previous` with `current` and describes the first structural
/// divergence, or returns `None` when the shapes agree.
#[must_use]
pub fn diff(previous: &JsonValue, current: &JsonValue) -> Option<String> {
    match previous {
        JsonValue::String(p) => match current {
            JsonValue::String(_) => None,
            other => Some(format!("string \"{p}\" became {}", describe(other))),
        },
        JsonValue::Number(p) => match current {
            JsonValue::Number(_) => None,
            other => Some(format!("number {p} became {}", describe(other))),
        },
        JsonValue::Array(p) => diff_array(p, current),
        JsonValue::Object(p) => diff_object(p, current),
        // booleans, null and undefined carry no structure to lose
        JsonValue::Boolean(_) | JsonValue::Null | JsonValue::Undefined => None,
    }
}

/// Convenience wrapper over [`diff`] for optional `serde_json` bodies.
#[must_use]
pub fn diff_json(previous: Option<&Value>, current: Option<&Value>) -> Option<String> {
    diff(&JsonValue::from_optional(previous), &JsonValue::from_optional(current))
}

fn diff_array(previous: &[JsonValue], current: &JsonValue) -> Option<String> {
    let JsonValue::Array(current) = current else {
        return Some(format!("array became {}", describe(current)));
    };

    if previous.len() != current.len() {
        let direction = if current.len() > previous.len() { "increased" } else { "decreased" };
        return Some(format!(
            "array {direction} its length from {} to {}",
            previous.len(),
            current.len()
        ));
    }

    previous.iter().zip(current).enumerate().find_map(|(index, (p, c))| {
        diff(p, c).map(|nested| format!("array element {index} changed: {nested}"))
    })
}

fn diff_object(previous: &[(String, JsonValue)], current: &JsonValue) -> Option<String> {
    let current = match current {
        JsonValue::Object(entries) => entries,
        JsonValue::Null => return Some("object became null".to_string()),
        other => return Some(format!("object became {}", describe(other))),
    };

    let added: Vec<&str> = current
        .iter()
        .map(|(k, _)| k.as_str())
        .filter(|k| !has_key(previous, *k))
        .collect();
    let lost: Vec<&str> = previous
        .iter()
        .map(|(k, _)| k.as_str())
        .filter(|k| !has_key(current, *k))
        .collect();

    if added.is_empty() && lost.is_empty() {
        return None;
    }

    let mut changes = Vec::new();
    if !added.is_empty() {
        changes.push(format!("added {} \"{}\"", key_label(added.len()), added.join(", ")));
    }
    if !lost.is_empty() {
        changes.push(format!("lost {} \"{}\"", key_label(lost.len()), lost.join(", ")));
    }
    Some(format!("object {}", changes.join(" and ")))
}

fn has_key(entries: &[(String, JsonValue)], key: &str) -> bool {
    entries.iter().any(|(k, _)| k == key)
}

fn key_label(count: usize) -> &'static str {
    if count == 1 {
        "key"
    } else {
        "keys"
    }
}
