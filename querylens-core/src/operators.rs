//! Operator table.
//!
//! Every operator the expression parser understands, with its declared
//! precedence, arity and associativity. A unary operator that associates to
//! the right is a prefix operator; one that associates to the left is a
//! postfix operator (`x IS NULL`).

use serde::Serialize;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::lexer::strings_equal_ignore_case;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    Unary,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Associativity {
    Left,
    Right,
}

/// What an operator turns into once it is reduced into a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperatorKind {
    Unary(UnaryOperator),
    Binary(BinaryOperator),
    /// `BETWEEN` / `NOT BETWEEN`, which consume an `AND` node on their right.
    Between { negated: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operator {
    pub symbol: &'static str,
    pub precedence: i32,
    pub arity: Arity,
    pub associativity: Associativity,
    pub kind: OperatorKind,
}

impl Operator {
    pub fn is_binary(&self) -> bool {
        self.arity == Arity::Binary
    }

    pub fn is_right_associative(&self) -> bool {
        self.associativity == Associativity::Right
    }
}

const fn prefix(symbol: &'static str, precedence: i32, op: UnaryOperator) -> Operator {
    Operator {
        symbol,
        precedence,
        arity: Arity::Unary,
        associativity: Associativity::Right,
        kind: OperatorKind::Unary(op),
    }
}

const fn postfix(symbol: &'static str, precedence: i32, op: UnaryOperator) -> Operator {
    Operator {
        symbol,
        precedence,
        arity: Arity::Unary,
        associativity: Associativity::Left,
        kind: OperatorKind::Unary(op),
    }
}

const fn binary(symbol: &'static str, precedence: i32, op: BinaryOperator) -> Operator {
    Operator {
        symbol,
        precedence,
        arity: Arity::Binary,
        associativity: Associativity::Left,
        kind: OperatorKind::Binary(op),
    }
}

const fn between(symbol: &'static str, negated: bool) -> Operator {
    Operator {
        symbol,
        precedence: -1,
        arity: Arity::Binary,
        associativity: Associativity::Right,
        kind: OperatorKind::Between { negated },
    }
}

/// Symbolic operators, matched by the lexer's operator rule.
pub static SYMBOL_OPERATORS: &[Operator] = &[
    prefix("~", 9, UnaryOperator::BitNot),
    prefix("+", 8, UnaryOperator::Plus),
    prefix("-", 8, UnaryOperator::Minus),
    binary("*", 7, BinaryOperator::Multiply),
    binary("/", 7, BinaryOperator::Divide),
    binary("%", 7, BinaryOperator::Modulo),
    binary("+", 6, BinaryOperator::Add),
    binary("-", 6, BinaryOperator::Subtract),
    binary("&", 6, BinaryOperator::BitAnd),
    binary("^", 6, BinaryOperator::BitXor),
    binary("|", 6, BinaryOperator::BitOr),
    binary("=", 5, BinaryOperator::Equal),
    binary("<>", 5, BinaryOperator::NotEqual),
    binary("!=", 5, BinaryOperator::NotEqual),
    binary("<", 5, BinaryOperator::Less),
    binary(">", 5, BinaryOperator::Greater),
    binary("<=", 5, BinaryOperator::LessEqual),
    binary(">=", 5, BinaryOperator::GreaterEqual),
];

/// Word operators, matched by the lexer's keyword-operator rule.
pub static KEYWORD_OPERATORS: &[Operator] = &[
    postfix("is null", 4, UnaryOperator::IsNull),
    postfix("is not null", 4, UnaryOperator::IsNotNull),
    postfix("is false", 4, UnaryOperator::IsFalse),
    postfix("is not false", 4, UnaryOperator::IsNotFalse),
    postfix("is true", 4, UnaryOperator::IsTrue),
    postfix("is not true", 4, UnaryOperator::IsNotTrue),
    binary("like", 3, BinaryOperator::Like),
    binary("not like", 3, BinaryOperator::NotLike),
    prefix("not", 2, UnaryOperator::Not),
    binary("and", 1, BinaryOperator::And),
    binary("or", 0, BinaryOperator::Or),
    between("between", false),
    between("not between", true),
    prefix("exists", -2, UnaryOperator::Exists),
];

/// Allowed (arity, associativity) shapes when looking an operator up.
pub type OperatorShape = (Arity, Associativity);

/// Operators accepted where a value is expected.
pub const PREFIX_SHAPES: &[OperatorShape] = &[(Arity::Unary, Associativity::Right)];

/// Operators accepted after a complete value.
pub const INFIX_OR_POSTFIX_SHAPES: &[OperatorShape] = &[
    (Arity::Binary, Associativity::Right),
    (Arity::Binary, Associativity::Left),
    (Arity::Unary, Associativity::Left),
];

/// Binary operators, used for quantified comparisons.
pub const BINARY_SHAPES: &[OperatorShape] = &[
    (Arity::Binary, Associativity::Left),
    (Arity::Binary, Associativity::Right),
];

pub fn all_operators() -> impl Iterator<Item = &'static Operator> {
    SYMBOL_OPERATORS.iter().chain(KEYWORD_OPERATORS.iter())
}

/// Find the operator spelled `symbol` whose shape is one of `shapes`.
///
/// `symbol` is the normalized token text (lower-cased, single spaces).
pub fn find_operator(symbol: &str, shapes: &[OperatorShape]) -> Option<&'static Operator> {
    all_operators().find(|op| {
        strings_equal_ignore_case(op.symbol, symbol)
            && shapes
                .iter()
                .any(|&(arity, associativity)| op.arity == arity && op.associativity == associativity)
    })
}
