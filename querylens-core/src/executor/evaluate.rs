//! Expression evaluation.

use std::cmp::Ordering;

use regex::Regex;

use super::builtins::BuiltinFunctions;
use super::helpers::*;
use super::{DataSource, QueryExecutor};
use crate::ast::*;
use crate::error::{QueryError, QueryResult};
use crate::table::{find_field_index, only_one, FieldDescriptor, Row};
use crate::value::Value;

/// What an expression can see while it is evaluated.
///
/// `row` is absent for expressions evaluated once per query (`LIMIT`), and
/// `group` is only present where aggregate functions are allowed.
#[derive(Clone, Copy)]
pub(crate) struct Scope<'r> {
    pub fields: &'r [FieldDescriptor],
    pub row: Option<&'r [Value]>,
    pub group: Option<&'r [Row]>,
}

impl<'r> Scope<'r> {
    pub const EMPTY: Scope<'static> = Scope {
        fields: &[],
        row: None,
        group: None,
    };

    pub fn row(fields: &'r [FieldDescriptor], row: &'r [Value]) -> Self {
        Self {
            fields,
            row: Some(row),
            group: None,
        }
    }

    pub fn group(fields: &'r [FieldDescriptor], row: Option<&'r [Value]>, group: &'r [Row]) -> Self {
        Self {
            fields,
            row,
            group: Some(group),
        }
    }
}

impl<D: DataSource + ?Sized> QueryExecutor<'_, D> {
    pub(crate) fn value_of(&self, expr: &Expr, scope: &Scope) -> QueryResult<Value> {
        match &expr.kind {
            ExprKind::Literal(Literal::Number(n)) => Ok(Value::Number(*n)),
            ExprKind::Literal(Literal::String(s)) => Ok(Value::String(s.clone())),
            ExprKind::Field(reference) => self.field_value(reference, scope),
            ExprKind::Subquery(query) => self.scalar_subquery(query),
            ExprKind::Unary { op, operand, .. } => self.unary(*op, operand, expr.range, scope),
            ExprKind::Binary {
                op, left, right, ..
            } => self.binary(*op, left, right, expr.range, scope),
            ExprKind::Between {
                negated,
                value,
                min,
                max,
                ..
            } => {
                let value = self.value_of(value, scope)?;
                let min = self.value_of(min, scope)?;
                let max = self.value_of(max, scope)?;
                let inside = between(&value, min, max);
                Ok(Value::bool(inside != *negated))
            }
            ExprKind::In { value, source, .. } => {
                let value = self.value_of(value, scope)?;
                let found = self.any_of(source, scope, |element| Ok(loose_equals(&value, element)))?;
                Ok(Value::bool(found))
            }
            ExprKind::Quantified {
                value,
                op,
                all,
                source,
                ..
            } => {
                let value = self.value_of(value, scope)?;
                let compare = |element: &Value| {
                    self.apply_binary(*op, value.clone(), element.clone(), expr.range)
                        .map(|result| result.is_truthy())
                };
                let result = if *all {
                    !self.any_of(source, scope, |element| compare(element).map(|ok| !ok))?
                } else {
                    self.any_of(source, scope, compare)?
                };
                Ok(Value::bool(result))
            }
            ExprKind::Call(call) => match &call.callee {
                Callee::Aggregate { function, .. } => {
                    self.aggregate(*function, &call.args, expr.range, scope)
                }
                Callee::Scalar(name) => self.call_function(name, &call.args, expr.range, scope),
            },
        }
    }

    fn field_value(&self, reference: &FieldRef, scope: &Scope) -> QueryResult<Value> {
        let Some(row) = scope.row else {
            return Err(QueryError::new(
                "a field value is not valid in this expression",
                reference.range,
            ));
        };
        let index = find_field_index(scope.fields, reference)?;
        Ok(row.get(index).cloned().unwrap_or(Value::Null))
    }

    /// A subquery used as a value: exactly one row of exactly one field.
    fn scalar_subquery(&self, query: &Query) -> QueryResult<Value> {
        let table = self.run_query(query)?;
        let column = table.get_only_column().map_err(|err| err.at(query.range))?;
        only_one(column, "expected at least 1 row", "expected at most 1 row")
            .map_err(|err| err.at(query.range))
    }

    fn unary(
        &self,
        op: UnaryOperator,
        operand: &Expr,
        range: SourceRange,
        scope: &Scope,
    ) -> QueryResult<Value> {
        if op == UnaryOperator::Exists {
            let ExprKind::Subquery(query) = &operand.kind else {
                return Err(QueryError::new("expected subquery after exists", range));
            };
            let table = self.run_query(query)?;
            return Ok(Value::bool(table.row_count() > 0));
        }

        let value = self.value_of(operand, scope)?;
        let result = match op {
            UnaryOperator::BitNot => Value::Number(f64::from(!to_int32(value.to_number()))),
            UnaryOperator::Plus => Value::Number(value.to_number()),
            UnaryOperator::Minus => Value::Number(-value.to_number()),
            UnaryOperator::Not => Value::bool(!value.is_truthy()),
            UnaryOperator::IsNull => Value::bool(value.is_null()),
            UnaryOperator::IsNotNull => Value::bool(!value.is_null()),
            UnaryOperator::IsTrue => Value::bool(value.is_truthy()),
            UnaryOperator::IsNotTrue => Value::bool(!value.is_truthy()),
            UnaryOperator::IsFalse => Value::bool(!value.is_truthy() && !value.is_null()),
            UnaryOperator::IsNotFalse => Value::bool(value.is_truthy() || value.is_null()),
            UnaryOperator::Exists => Value::Null,
        };
        Ok(result)
    }

    fn binary(
        &self,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
        range: SourceRange,
        scope: &Scope,
    ) -> QueryResult<Value> {
        let left = self.value_of(left, scope)?;
        match op {
            BinaryOperator::And if !left.is_truthy() => Ok(left),
            BinaryOperator::Or if left.is_truthy() => Ok(left),
            _ => {
                let right = self.value_of(right, scope)?;
                self.apply_binary(op, left, right, range)
            }
        }
    }

    /// Apply a binary operator to two evaluated operands.
    fn apply_binary(
        &self,
        op: BinaryOperator,
        left: Value,
        right: Value,
        range: SourceRange,
    ) -> QueryResult<Value> {
        let result = match op {
            BinaryOperator::Add => add_values(&left, &right),
            BinaryOperator::Subtract => Value::Number(left.to_number() - right.to_number()),
            BinaryOperator::Multiply => Value::Number(left.to_number() * right.to_number()),
            BinaryOperator::Divide => Value::Number(left.to_number() / right.to_number()),
            BinaryOperator::Modulo => Value::Number(modulo(left.to_number(), right.to_number())),
            BinaryOperator::BitAnd => {
                Value::Number(f64::from(to_int32(left.to_number()) & to_int32(right.to_number())))
            }
            BinaryOperator::BitOr => {
                Value::Number(f64::from(to_int32(left.to_number()) | to_int32(right.to_number())))
            }
            BinaryOperator::BitXor => {
                Value::Number(f64::from(to_int32(left.to_number()) ^ to_int32(right.to_number())))
            }
            BinaryOperator::Equal => Value::bool(strict_equals(&left, &right)),
            BinaryOperator::NotEqual => Value::bool(!strict_equals(&left, &right)),
            BinaryOperator::Less => Value::bool(compare_relational(&left, &right) == Some(Ordering::Less)),
            BinaryOperator::Greater => {
                Value::bool(compare_relational(&left, &right) == Some(Ordering::Greater))
            }
            BinaryOperator::LessEqual => Value::bool(matches!(
                compare_relational(&left, &right),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOperator::GreaterEqual => Value::bool(matches!(
                compare_relational(&left, &right),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOperator::Like => Value::bool(self.like(&left, &right, range)?),
            BinaryOperator::NotLike => Value::bool(!self.like(&left, &right, range)?),
            BinaryOperator::And => {
                if left.is_truthy() {
                    right
                } else {
                    left
                }
            }
            BinaryOperator::Or => {
                if left.is_truthy() {
                    left
                } else {
                    right
                }
            }
        };
        Ok(result)
    }

    fn like(&self, value: &Value, pattern: &Value, range: SourceRange) -> QueryResult<bool> {
        let pattern = pattern.to_string();
        if let Some(regex) = self.like_patterns.borrow().get(&pattern) {
            return Ok(regex.is_match(&value.to_string()));
        }

        let regex = Regex::new(&like_to_regex(&pattern)).map_err(|err| {
            QueryError::new(format!("invalid like pattern '{}': {}", pattern, err), range)
        })?;
        let matched = regex.is_match(&value.to_string());
        self.like_patterns.borrow_mut().insert(pattern, regex);
        Ok(matched)
    }

    /// True if `test` holds for some element of a value list or of the only
    /// column of a subquery. List elements are evaluated lazily.
    fn any_of(
        &self,
        source: &ValueSource,
        scope: &Scope,
        mut test: impl FnMut(&Value) -> QueryResult<bool>,
    ) -> QueryResult<bool> {
        match source {
            ValueSource::List(list) => {
                for expr in &list.values {
                    if test(&self.value_of(expr, scope)?)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ValueSource::Query(query) => {
                let table = self.run_query(query)?;
                let column = table.get_only_column().map_err(|err| err.at(query.range))?;
                for value in &column {
                    if test(value)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn call_function(
        &self,
        name: &FieldRef,
        args: &[FunctionArg],
        range: SourceRange,
        scope: &Scope,
    ) -> QueryResult<Value> {
        let qualified = name.database.is_some() || name.table.is_some();
        let function = name.field.as_deref().unwrap_or_default().to_lowercase();

        let arity = if qualified {
            None
        } else {
            BuiltinFunctions::arity(&function)
        };
        let Some(arity) = arity else {
            return Err(QueryError::new(
                format!("invalid function name '{}'", name.qualified_name()),
                range,
            ));
        };
        if args.len() != arity {
            return Err(QueryError::new(
                format!("invalid number of arguments passed to function '{}'", function),
                range,
            ));
        }

        let values = args
            .iter()
            .map(|arg| self.value_of(&arg.expr, scope))
            .collect::<QueryResult<Vec<_>>>()?;
        BuiltinFunctions::call(&function, &values).map_err(|err| err.at(range))
    }
}

/// Inclusive range test; bounds given in reverse order are swapped.
fn between(value: &Value, min: Value, max: Value) -> bool {
    let (low, high) = if compare_relational(&min, &max) == Some(Ordering::Greater) {
        (max, min)
    } else {
        (min, max)
    };
    matches!(
        compare_relational(&low, value),
        Some(Ordering::Less | Ordering::Equal)
    ) && matches!(
        compare_relational(value, &high),
        Some(Ordering::Less | Ordering::Equal)
    )
}
