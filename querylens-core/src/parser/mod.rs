//! Parser for query statements.
//!
//! Statements and clauses are parsed by recursive descent over a
//! [`TokenCursor`]. Expressions use a two-phase approach: a small state
//! machine first flattens the expression into values, operators and
//! parentheses, then a precedence pass builds the tree (see
//! `expressions`).
//!
//! Every rule records the source range it consumed. Optional rules follow
//! one convention: a rule that fails without consuming any token counts as
//! absent, a rule that fails after consuming tokens is a syntax error.

mod clauses;
mod expressions;
#[cfg(test)]
mod tests;

use crate::ast::{Expr, QueryId, SourceRange, Statement};
use crate::cursor::{Pattern, TokenCursor};
use crate::error::QueryResult;
use crate::lexer::tokenize;

/// Parser over one statement text.
pub struct Parser<'a> {
    pub(crate) source: &'a str,
    pub(crate) cursor: TokenCursor,
    next_query_id: QueryId,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: TokenCursor::new(tokenize(source)),
            next_query_id: 0,
        }
    }

    /// Parse a complete statement; trailing tokens other than a single `;`
    /// are an error.
    pub fn parse_statement(&mut self) -> QueryResult<Statement> {
        let statement = self.parse_statement_kind()?;
        self.expect_end()?;
        Ok(statement)
    }

    /// Parse a standalone expression.
    pub fn parse_standalone_expression(&mut self) -> QueryResult<Expr> {
        let expr = self.parse_expression()?;
        self.expect_end()?;
        Ok(expr)
    }

    fn expect_end(&mut self) -> QueryResult<()> {
        self.cursor.next_if(&Pattern::text(";"));

        if !self.cursor.is_at_end() {
            return Err(self.cursor.error("expected end of input"));
        }
        Ok(())
    }

    /// Byte offset where the next rule starts.
    pub(crate) fn start(&self) -> usize {
        self.cursor.current_index()
    }

    /// Range from `start` to the end of the last consumed token.
    pub(crate) fn range_from(&self, start: usize) -> SourceRange {
        let end = self
            .cursor
            .previous_end()
            .filter(|&end| end >= start)
            .unwrap_or(start);
        SourceRange::new(start, end)
    }

    pub(crate) fn allocate_query_id(&mut self) -> QueryId {
        let id = self.next_query_id;
        self.next_query_id += 1;
        id
    }

    /// Run `rule`; a failure that consumed nothing means the construct is absent.
    pub(crate) fn optional<T>(
        &mut self,
        rule: impl FnOnce(&mut Self) -> QueryResult<T>,
    ) -> QueryResult<Option<T>> {
        let position = self.cursor.position();

        match rule(self) {
            Ok(value) => Ok(Some(value)),
            Err(_) if self.cursor.position() == position => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Comma-separated list of `item`. The item after a comma is optional,
    /// so a trailing comma is accepted.
    pub(crate) fn list_of<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> QueryResult<T>,
        can_be_empty: bool,
    ) -> QueryResult<Vec<T>> {
        let mut list = Vec::new();

        let first = if can_be_empty {
            self.optional(&mut item)?
        } else {
            Some(item(self)?)
        };
        let Some(first) = first else {
            return Ok(list);
        };
        list.push(first);

        while self.cursor.next_if(&Pattern::text(",")).is_some() {
            match self.optional(&mut item)? {
                Some(next) => list.push(next),
                None => break,
            }
        }

        Ok(list)
    }
}

/// Parse a statement.
pub fn parse(source: &str) -> QueryResult<Statement> {
    let statement = Parser::new(source).parse_statement();
    if let Err(err) = &statement {
        tracing::debug!("Parse error at {}..{}: {}", err.range.start, err.range.end, err);
    }
    statement
}

/// Parse a single expression, e.g. `1 + 2 * 3`.
pub fn parse_expression(source: &str) -> QueryResult<Expr> {
    Parser::new(source).parse_standalone_expression()
}
