//! Builtin scalar functions for querylens queries.
//!
//! Function names are case-insensitive. Every function has a fixed arity
//! that the executor checks before evaluating any argument.

mod math;
mod string;

use crate::error::{QueryError, QueryResult};
use crate::value::Value;

/// Container for builtin function implementations.
pub struct BuiltinFunctions;

impl BuiltinFunctions {
    /// Names of every builtin function.
    pub const NAMES: &'static [&'static str] = &[
        "random", "abs", "ceil", "floor", "pow", "sqrt", "lower", "upper", "trim", "length",
    ];

    /// Number of arguments a builtin takes, None for unknown names.
    pub fn arity(name: &str) -> Option<usize> {
        let lower_name = name.to_lowercase();
        math::arity(&lower_name).or_else(|| string::arity(&lower_name))
    }

    /// Call a builtin function by name.
    pub fn call(name: &str, args: &[Value]) -> QueryResult<Value> {
        let lower_name = name.to_lowercase();

        let expected = Self::arity(&lower_name)
            .ok_or_else(|| QueryError::unlocated(format!("invalid function name '{}'", name)))?;
        if args.len() != expected {
            return Err(QueryError::unlocated(format!(
                "invalid number of arguments passed to function '{}'",
                name
            )));
        }

        // Math functions
        if let Some(result) = math::call(&lower_name, args) {
            return Ok(result);
        }

        // String functions
        if let Some(result) = string::call(&lower_name, args) {
            return Ok(result);
        }

        Err(QueryError::unlocated(format!("invalid function name '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_functions() {
        assert_eq!(
            BuiltinFunctions::call("UPPER", &[Value::string("hello")]).unwrap(),
            Value::string("HELLO")
        );
        assert_eq!(
            BuiltinFunctions::call("lower", &[Value::string("HELLO")]).unwrap(),
            Value::string("hello")
        );
        assert_eq!(
            BuiltinFunctions::call("Length", &[Value::string("hello")]).unwrap(),
            Value::Number(5.0)
        );
    }

    #[test]
    fn test_math_functions() {
        assert_eq!(
            BuiltinFunctions::call("abs", &[Value::Number(-5.0)]).unwrap(),
            Value::Number(5.0)
        );
        assert_eq!(
            BuiltinFunctions::call("pow", &[Value::Number(2.0), Value::Number(10.0)]).unwrap(),
            Value::Number(1024.0)
        );
    }

    #[test]
    fn test_arity() {
        assert_eq!(BuiltinFunctions::arity("RANDOM"), Some(0));
        assert_eq!(BuiltinFunctions::arity("sqrt"), Some(1));
        assert_eq!(BuiltinFunctions::arity("pow"), Some(2));
        assert_eq!(BuiltinFunctions::arity("concat"), None);
        assert!(BuiltinFunctions::NAMES
            .iter()
            .all(|name| BuiltinFunctions::arity(name).is_some()));
    }

    #[test]
    fn test_call_errors() {
        let err = BuiltinFunctions::call("nope", &[]).unwrap_err();
        assert_eq!(err.message, "invalid function name 'nope'");

        let err = BuiltinFunctions::call("abs", &[]).unwrap_err();
        assert_eq!(err.message, "invalid number of arguments passed to function 'abs'");
    }
}
