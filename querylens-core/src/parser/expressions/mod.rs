//! Expression parsing.
//!
//! Expressions are parsed in two phases:
//! - scanning (this module): a two-state machine alternates between
//!   "expecting a value" and "after a value", collecting values, operators
//!   and parentheses into a flat list
//! - `precedence`: assigns effective precedences and folds the flat list
//!   into a tree
//! - `primary`: selector values (literals, field references, function
//!   calls, `IN` and quantified comparisons)

mod precedence;
mod primary;

use crate::ast::{Expr, ExprKind, SourceRange};
use crate::cursor::Pattern;
use crate::error::QueryResult;
use crate::lexer::TokenKind;
use crate::operators::{find_operator, Operator, INFIX_OR_POSTFIX_SHAPES, PREFIX_SHAPES};
use crate::parser::Parser;

/// One element of a scanned expression.
#[derive(Debug, Clone)]
pub(crate) enum Item {
    Value(Expr),
    Operator(OperatorItem),
    Open,
    Close,
}

#[derive(Debug, Clone)]
pub(crate) struct OperatorItem {
    pub operator: &'static Operator,
    pub token: SourceRange,
    /// Effective precedence, see `precedence::assign_precedence`.
    pub precedence: i64,
}

impl OperatorItem {
    fn new(operator: &'static Operator, token: SourceRange) -> Self {
        Self {
            operator,
            token,
            precedence: i64::from(operator.precedence),
        }
    }
}

impl Parser<'_> {
    /// Entry point for expression parsing
    pub(crate) fn parse_expression(&mut self) -> QueryResult<Expr> {
        let items = self.scan_expression()?;
        let error_range = self.cursor.current_range();
        precedence::build_tree(items, error_range)
    }

    fn scan_expression(&mut self) -> QueryResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut depth = 0usize;
        let mut expecting_value = true;

        while !self.cursor.is_at_end() {
            if expecting_value {
                if self.cursor.next_if(&Pattern::text("(")).is_some() {
                    if self.cursor.next_is(&Pattern::keyword("select"), 0) {
                        let query = self.parse_query()?;
                        self.cursor
                            .expect(&Pattern::text(")"), "expected closing parentheses")?;
                        let range = query.range;
                        items.push(Item::Value(Expr::new(
                            ExprKind::Subquery(Box::new(query)),
                            range,
                        )));
                        expecting_value = false;
                    } else {
                        depth += 1;
                        items.push(Item::Open);
                    }
                } else if self.cursor.next_is(&Pattern::kind(TokenKind::Operator), 0) {
                    let token = self.cursor.peek(0)?;
                    let operator = find_operator(token.text(), PREFIX_SHAPES)
                        .ok_or_else(|| self.cursor.error("invalid operator before value"))?;
                    let token = self.cursor.advance()?;
                    items.push(Item::Operator(OperatorItem::new(operator, token.range)));
                } else {
                    items.push(Item::Value(self.parse_selector_value()?));
                    expecting_value = false;
                }
            } else if depth > 0 && self.cursor.next_if(&Pattern::text(")")).is_some() {
                depth -= 1;
                items.push(Item::Close);
            } else if self.cursor.next_is(&Pattern::kind(TokenKind::Operator), 0) {
                let token = self.cursor.peek(0)?;
                let operator = find_operator(token.text(), INFIX_OR_POSTFIX_SHAPES)
                    .ok_or_else(|| self.cursor.error("invalid operator after value"))?;
                let token = self.cursor.advance()?;
                if operator.is_binary() {
                    expecting_value = true;
                }
                items.push(Item::Operator(OperatorItem::new(operator, token.range)));
            } else {
                break;
            }
        }

        if expecting_value {
            return Err(self.cursor.error("unexpected end of expression"));
        }
        if depth > 0 {
            return Err(self.cursor.error("expected closing parentheses"));
        }

        tracing::trace!("Scanned expression into {} items", items.len());
        Ok(items)
    }
}
