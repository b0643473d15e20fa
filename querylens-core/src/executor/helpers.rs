//! Value helpers for the querylens executor.
//!
//! This module contains the value-level semantics of the operators:
//! - add_values: numeric addition or string concatenation
//! - modulo: floored modulo
//! - to_int32: conversion for the bitwise operators
//! - strict_equals / loose_equals: `=` and `IN` equality
//! - compare_relational: ordering used by `<`, `between`, `min` and `max`
//! - compare_for_sort: total order used by `ORDER BY`
//! - like_to_regex: translation of SQL wildcards

use std::cmp::Ordering;

use crate::value::Value;

/// `+`: concatenation of the display forms if either side is a string,
/// numeric addition otherwise.
#[inline]
pub fn add_values(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::String(_), _) | (_, Value::String(_)) => Value::String(format!("{}{}", left, right)),
        _ => Value::Number(left.to_number() + right.to_number()),
    }
}

/// Modulo with the sign of the divisor.
#[inline]
pub fn modulo(dividend: f64, divisor: f64) -> f64 {
    dividend - (dividend / divisor).floor() * divisor
}

/// Truncate to a 32-bit signed integer, wrapping around. Non-finite values
/// become 0.
#[inline]
pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
    wrapped as u32 as i32
}

/// Equality of type and value. `NaN` equals nothing, null equals null.
pub fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

/// Equality with numeric conversion between numbers and strings. Null only
/// equals null.
pub fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        _ => left.to_number() == right.to_number(),
    }
}

/// Two strings compare as text, anything else as numbers. `None` when
/// either side is not a number.
pub fn compare_relational(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

/// Total order for sorting: null first, then numbers, then strings.
pub fn compare_for_sort(left: &Value, right: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
        }
    }

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Anchored, case-insensitive regex for a `LIKE` pattern: `%` matches any
/// run of characters, `_` any single character.
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push_str("(?i)^");
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            _ => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_values() {
        assert_eq!(add_values(&Value::Number(1.0), &Value::Number(2.0)), Value::Number(3.0));
        assert_eq!(add_values(&Value::string("a"), &Value::Number(2.0)), Value::string("a2"));
        assert_eq!(add_values(&Value::Null, &Value::string("x")), Value::string("nullx"));
        assert_eq!(add_values(&Value::Null, &Value::Number(4.0)), Value::Number(4.0));
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        assert_eq!(modulo(7.0, 3.0), 1.0);
        assert_eq!(modulo(-7.0, 3.0), 2.0);
        assert_eq!(modulo(7.0, -3.0), -2.0);
        assert!(modulo(1.0, 0.0).is_nan());
    }

    #[test]
    fn test_to_int32() {
        assert_eq!(to_int32(5.9), 5);
        assert_eq!(to_int32(-5.9), -5);
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(2_147_483_648.0), i32::MIN);
        assert_eq!(to_int32(f64::NAN), 0);
    }

    #[test]
    fn test_equality() {
        assert!(strict_equals(&Value::Null, &Value::Null));
        assert!(!strict_equals(&Value::Number(1.0), &Value::string("1")));
        assert!(!strict_equals(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));

        assert!(loose_equals(&Value::Number(1.0), &Value::string("1")));
        assert!(loose_equals(&Value::string(" 2 "), &Value::Number(2.0)));
        assert!(!loose_equals(&Value::Null, &Value::Number(0.0)));
    }

    #[test]
    fn test_compare_relational() {
        assert_eq!(
            compare_relational(&Value::string("10"), &Value::string("9")),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_relational(&Value::string("10"), &Value::Number(9.0)),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_relational(&Value::string("x"), &Value::Number(9.0)), None);
    }

    #[test]
    fn test_compare_for_sort() {
        let mut values = vec![
            Value::string("b"),
            Value::Number(2.0),
            Value::Null,
            Value::string("a"),
            Value::Number(-1.0),
        ];
        values.sort_by(compare_for_sort);
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Number(-1.0),
                Value::Number(2.0),
                Value::string("a"),
                Value::string("b"),
            ]
        );
    }

    #[test]
    fn test_like_to_regex() {
        assert_eq!(like_to_regex("a%b_"), "(?i)^a.*b.$");
        assert_eq!(like_to_regex("1.5*"), r"(?i)^1\.5\*$");
    }
}
