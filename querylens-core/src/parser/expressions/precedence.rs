//! Tree construction from a scanned expression.
//!
//! Each operator gets an effective precedence of `10000 * declared` shifted
//! by its position: right-associative operators gain with position,
//! left-associative ones lose, so equal declared precedences resolve by
//! associativity. A unary operator next to another operator is then raised
//! above that neighbor so it binds to its own operand first.
//!
//! The list is folded with an explicit stack. Before an operator is pushed,
//! the stack is reduced while the operator on top binds at least as tightly.

use std::vec::IntoIter;

use super::{Item, OperatorItem};
use crate::ast::{BinaryOperator, Expr, ExprKind, SourceRange};
use crate::error::{QueryError, QueryResult};
use crate::operators::OperatorKind;

const FAILED: &str = "failed to parse expression";

pub(super) fn build_tree(mut items: Vec<Item>, error_range: SourceRange) -> QueryResult<Expr> {
    assign_precedence(&mut items);
    let mut items = items.into_iter();
    create_tree(&mut items, error_range)
}

fn assign_precedence(items: &mut [Item]) {
    for (index, item) in items.iter_mut().enumerate() {
        if let Item::Operator(op) = item {
            let base = 10_000 * i64::from(op.operator.precedence);
            let index = index as i64;
            op.precedence = if op.operator.is_right_associative() {
                base + index
            } else {
                base - index
            };
        }
    }

    for _ in 0..2 * items.len() {
        for index in 0..items.len() {
            let Item::Operator(op) = &items[index] else {
                continue;
            };
            if op.operator.is_binary() {
                continue;
            }

            let neighbor = if op.operator.is_right_associative() {
                index.checked_sub(1)
            } else {
                Some(index + 1)
            };
            let Some(Item::Operator(next)) = neighbor.and_then(|n| items.get(n)) else {
                continue;
            };

            let raised = next.precedence + 1;
            if let Item::Operator(op) = &mut items[index] {
                if raised > op.precedence {
                    op.precedence = raised;
                }
            }
        }
    }
}

fn create_tree(items: &mut IntoIter<Item>, error_range: SourceRange) -> QueryResult<Expr> {
    let mut stack: Vec<Item> = Vec::new();

    while let Some(item) = items.next() {
        match item {
            Item::Open => {
                let group = create_tree(items, error_range)?;
                stack.push(Item::Value(group));
            }
            Item::Close => break,
            Item::Operator(op) => {
                reduce(&mut stack, op.precedence, error_range)?;
                stack.push(Item::Operator(op));
            }
            Item::Value(_) => stack.push(item),
        }
    }

    reduce(&mut stack, i64::MIN, error_range)?;

    match (stack.pop(), stack.is_empty()) {
        (Some(Item::Value(expr)), true) => Ok(expr),
        _ => Err(QueryError::new(FAILED, error_range)),
    }
}

/// Reduce the top of the stack while the operator there has an effective
/// precedence of at least `threshold`.
fn reduce(stack: &mut Vec<Item>, threshold: i64, error_range: SourceRange) -> QueryResult<()> {
    loop {
        let (pattern, precedence) = match stack.as_slice() {
            [.., Item::Value(_), Item::Operator(op), Item::Value(_)] => (Shape::Infix, op.precedence),
            [.., Item::Operator(op), Item::Value(_)] => (Shape::Prefix, op.precedence),
            [.., Item::Value(_), Item::Operator(op)] => (Shape::Postfix, op.precedence),
            _ => return Ok(()),
        };
        if precedence < threshold {
            return Ok(());
        }

        let node = match pattern {
            Shape::Infix => {
                let right = pop_value(stack);
                let op = pop_operator(stack);
                let left = pop_value(stack);
                match (op, left, right) {
                    (Some(op), Some(left), Some(right)) => infix(op, left, right)?,
                    _ => return Err(QueryError::new(FAILED, error_range)),
                }
            }
            Shape::Prefix => {
                let operand = pop_value(stack);
                let op = pop_operator(stack);
                match (op, operand) {
                    (Some(op), Some(operand)) => prefix(op, operand, error_range)?,
                    _ => return Err(QueryError::new(FAILED, error_range)),
                }
            }
            Shape::Postfix => {
                let op = pop_operator(stack);
                let operand = pop_value(stack);
                match (op, operand) {
                    (Some(op), Some(operand)) => postfix(op, operand, error_range)?,
                    _ => return Err(QueryError::new(FAILED, error_range)),
                }
            }
        };

        stack.push(Item::Value(node));
    }
}

#[derive(Clone, Copy)]
enum Shape {
    Infix,
    Prefix,
    Postfix,
}

fn pop_value(stack: &mut Vec<Item>) -> Option<Expr> {
    match stack.pop() {
        Some(Item::Value(expr)) => Some(expr),
        _ => None,
    }
}

fn pop_operator(stack: &mut Vec<Item>) -> Option<OperatorItem> {
    match stack.pop() {
        Some(Item::Operator(op)) => Some(op),
        _ => None,
    }
}

fn infix(op: OperatorItem, left: Expr, right: Expr) -> QueryResult<Expr> {
    match op.operator.kind {
        OperatorKind::Binary(binary) => {
            let range = SourceRange::new(left.range.start, right.range.end);
            Ok(Expr::new(
                ExprKind::Binary {
                    op: binary,
                    left: Box::new(left),
                    right: Box::new(right),
                    token: op.token,
                },
                range,
            ))
        }
        OperatorKind::Between { negated } => {
            let ExprKind::Binary {
                op: BinaryOperator::And,
                left: min,
                right: max,
                ..
            } = right.kind
            else {
                return Err(QueryError::new("invalid between syntax", op.token));
            };
            let range = SourceRange::new(left.range.start, max.range.end);
            Ok(Expr::new(
                ExprKind::Between {
                    negated,
                    value: Box::new(left),
                    min,
                    max,
                    token: op.token,
                },
                range,
            ))
        }
        OperatorKind::Unary(_) => Err(QueryError::new(FAILED, op.token)),
    }
}

fn prefix(op: OperatorItem, operand: Expr, error_range: SourceRange) -> QueryResult<Expr> {
    match op.operator.kind {
        OperatorKind::Unary(unary) if !unary.is_postfix() => {
            let range = SourceRange::new(op.token.start, operand.range.end);
            Ok(Expr::new(
                ExprKind::Unary {
                    op: unary,
                    operand: Box::new(operand),
                    token: op.token,
                },
                range,
            ))
        }
        _ => Err(QueryError::new(FAILED, error_range)),
    }
}

fn postfix(op: OperatorItem, operand: Expr, error_range: SourceRange) -> QueryResult<Expr> {
    match op.operator.kind {
        OperatorKind::Unary(unary) if unary.is_postfix() => {
            let range = SourceRange::new(operand.range.start, op.token.end);
            Ok(Expr::new(
                ExprKind::Unary {
                    op: unary,
                    operand: Box::new(operand),
                    token: op.token,
                },
                range,
            ))
        }
        _ => Err(QueryError::new(FAILED, error_range)),
    }
}
