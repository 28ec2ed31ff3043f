//! Conversion of raw source values into typed [`Value`]s.
//!
//! Environment variables and command-line flags arrive as text; the config
//! source arrives as loosely-typed JSON scalars. Both are converted to the
//! [`ValueKind`] the parameter declares.

use crate::{Value, ValueKind};

/// Parses the textual boolean forms.
///
/// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
///
/// # Examples
///
/// ```
/// use appconfig_core::parse_bool;
///
/// assert_eq!(parse_bool("True"), Some(true));
/// assert_eq!(parse_bool("0"), Some(false));
/// assert_eq!(parse_bool("yes"), None);
/// ```
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Converts text from the environment or command line.
pub(crate) fn from_text(kind: ValueKind, text: &str) -> Option<Value> {
    match kind {
        ValueKind::String => Some(Value::String(text.to_string())),
        ValueKind::Int => text.trim().parse::<i64>().ok().map(Value::Int),
        ValueKind::Bool => parse_bool(text.trim()).map(Value::Bool),
    }
}

/// Result of converting a JSON value.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum JsonCoercion {
    Value(Value),
    /// `null`: the source does not set the parameter.
    Unset,
    Invalid,
}

/// Converts a scalar from the structured config source.
pub(crate) fn from_json(kind: ValueKind, raw: &serde_json::Value) -> JsonCoercion {
    use serde_json::Value as Json;

    let converted = match (kind, raw) {
        (_, Json::Null) => return JsonCoercion::Unset,
        (_, Json::Array(_) | Json::Object(_)) => None,

        (ValueKind::String, Json::String(s)) => Some(Value::String(s.clone())),
        (ValueKind::String, Json::Number(n)) => Some(Value::String(n.to_string())),
        (ValueKind::String, Json::Bool(b)) => Some(Value::String(b.to_string())),

        (ValueKind::Int, Json::Number(n)) => n.as_i64().or_else(|| integral_f64(n)).map(Value::Int),
        (ValueKind::Int, Json::String(s)) => from_text(ValueKind::Int, s),
        (ValueKind::Int, Json::Bool(_)) => None,

        (ValueKind::Bool, Json::Bool(b)) => Some(Value::Bool(*b)),
        (ValueKind::Bool, Json::String(s)) => from_text(ValueKind::Bool, s),
        (ValueKind::Bool, Json::Number(_)) => None,
    };

    match converted {
        Some(value) => JsonCoercion::Value(value),
        None => JsonCoercion::Invalid,
    }
}

// JSON writers commonly emit whole numbers as floats (e.g. `250.0`).
fn integral_f64(n: &serde_json::Number) -> Option<i64> {
    let f = n.as_f64()?;
    // `i64::MAX as f64` rounds up to 2^63, which does not fit.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
