//! Aggregate functions over the rows of a group.

use std::cmp::Ordering;

use super::evaluate::Scope;
use super::helpers::{add_values, compare_relational};
use super::{DataSource, QueryExecutor};
use crate::ast::{AggregateFunction, ExprKind, FunctionArg, SourceRange};
use crate::error::{QueryError, QueryResult};
use crate::table::{find_every_field_index, only_one, remove_duplicate_rows, Row};
use crate::value::Value;

impl<D: DataSource + ?Sized> QueryExecutor<'_, D> {
    pub(crate) fn aggregate(
        &self,
        function: AggregateFunction,
        args: &[FunctionArg],
        range: SourceRange,
        scope: &Scope,
    ) -> QueryResult<Value> {
        let name = function.name();
        let Some(group) = scope.group else {
            return Err(QueryError::new(
                "aggregate functions are not valid in this expression",
                range,
            ));
        };

        let max_args = if function == AggregateFunction::List { 2 } else { 1 };
        if args.is_empty() || args.len() > max_args {
            return Err(QueryError::new(
                format!("invalid number of arguments passed to function '{}'", name),
                range,
            ));
        }

        let argument = &args[0];
        let ExprKind::Field(reference) = &argument.expr.kind else {
            return Err(QueryError::new(
                format!("expected field as argument of aggregate function '{}'", name),
                argument.range,
            ));
        };

        let indices = find_every_field_index(scope.fields, reference)?;
        let mut column: Vec<Row> = group
            .iter()
            .map(|row| indices.iter().map(|&index| row[index].clone()).collect())
            .collect();
        if argument.distinct {
            column = remove_duplicate_rows(column);
        }

        if function == AggregateFunction::Count {
            return Ok(Value::Number(column.len() as f64));
        }

        let values: Vec<Value> = column
            .into_iter()
            .map(|cells| {
                only_one(
                    cells,
                    format!("expected selected 1 field as argument of aggregate function '{}'", name),
                    format!("expected at most 1 field as argument of aggregate function '{}'", name),
                )
                .map_err(|err| err.at(argument.range))
            })
            .filter(|value| !matches!(value, Ok(Value::Null)))
            .collect::<QueryResult<_>>()?;

        tracing::trace!("Aggregate {} over {} values", name, values.len());

        let result = match function {
            AggregateFunction::Count => Value::Number(values.len() as f64),
            AggregateFunction::Sum => sum(&values),
            AggregateFunction::Avg => {
                if values.is_empty() {
                    Value::Null
                } else {
                    Value::Number(sum(&values).to_number() / values.len() as f64)
                }
            }
            AggregateFunction::Min => extreme(values, Ordering::Less),
            AggregateFunction::Max => extreme(values, Ordering::Greater),
            AggregateFunction::List => {
                let separator = match args.get(1) {
                    Some(arg) => self.value_of(&arg.expr, scope)?.to_string(),
                    None => ",".to_string(),
                };
                let parts: Vec<String> = values.iter().map(Value::to_string).collect();
                Value::String(parts.join(&separator))
            }
        };
        Ok(result)
    }
}

fn sum(values: &[Value]) -> Value {
    values
        .iter()
        .fold(Value::Number(0.0), |total, value| add_values(&total, value))
}

/// The value that orders `wanted` against every other, null when empty.
fn extreme(values: Vec<Value>, wanted: Ordering) -> Value {
    values
        .into_iter()
        .reduce(|best, value| {
            if compare_relational(&value, &best) == Some(wanted) {
                value
            } else {
                best
            }
        })
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_concatenates_strings() {
        assert_eq!(sum(&[Value::Number(1.0), Value::Number(2.5)]), Value::Number(3.5));
        assert_eq!(sum(&[Value::Number(1.0), Value::string("a")]), Value::string("1a"));
        assert_eq!(sum(&[]), Value::Number(0.0));
    }

    #[test]
    fn test_extreme() {
        let values = vec![Value::Number(3.0), Value::Number(-1.0), Value::Number(7.0)];
        assert_eq!(extreme(values.clone(), Ordering::Less), Value::Number(-1.0));
        assert_eq!(extreme(values, Ordering::Greater), Value::Number(7.0));
        assert_eq!(extreme(Vec::new(), Ordering::Less), Value::Null);
    }
}
