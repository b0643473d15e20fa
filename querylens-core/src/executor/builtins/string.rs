//! String builtin functions.
//!
//! Null stays null; any other value is converted to its display text first.

use crate::value::Value;

pub fn arity(name: &str) -> Option<usize> {
    match name {
        "lower" | "upper" | "trim" | "length" => Some(1),
        _ => None,
    }
}

/// Call a string function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> Option<Value> {
    let text = match args.first() {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.to_string()),
    };

    let result = match name {
        "lower" => text.map(|s| Value::String(s.to_lowercase())),
        "upper" => text.map(|s| Value::String(s.to_uppercase())),
        "trim" => text.map(|s| Value::String(s.trim().to_string())),
        // length in UTF-16 code units
        "length" => text.map(|s| Value::Number(s.encode_utf16().count() as f64)),
        _ => return None,
    };
    Some(result.unwrap_or(Value::Null))
}
