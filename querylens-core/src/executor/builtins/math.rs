//! Math builtin functions.

use crate::value::Value;

pub fn arity(name: &str) -> Option<usize> {
    match name {
        "random" => Some(0),
        "abs" | "ceil" | "floor" | "sqrt" => Some(1),
        "pow" => Some(2),
        _ => None,
    }
}

/// Call a math function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> Option<Value> {
    let number = |index: usize| args.get(index).map(Value::to_number).unwrap_or(f64::NAN);

    let result = match name {
        "random" => rand::random::<f64>(),
        "abs" => number(0).abs(),
        "ceil" => number(0).ceil(),
        "floor" => number(0).floor(),
        "sqrt" => number(0).sqrt(),
        "pow" => number(0).powf(number(1)),
        _ => return None,
    };
    Some(Value::Number(result))
}
