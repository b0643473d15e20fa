//! Token cursor with lookahead and conditional consumption.

use crate::ast::SourceRange;
use crate::error::{QueryError, QueryResult};
use crate::lexer::{Token, TokenKind};

/// Token matcher: an optional value (compared case-insensitively against the
/// token text) and an optional kind. An empty pattern matches any token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pattern<'p> {
    pub value: Option<&'p str>,
    pub kind: Option<TokenKind>,
}

impl<'p> Pattern<'p> {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn text(value: &'p str) -> Self {
        Self {
            value: Some(value),
            kind: None,
        }
    }

    pub fn keyword(value: &'p str) -> Self {
        Self::exact(value, TokenKind::Keyword)
    }

    pub fn kind(kind: TokenKind) -> Self {
        Self {
            value: None,
            kind: Some(kind),
        }
    }

    pub fn exact(value: &'p str, kind: TokenKind) -> Self {
        Self {
            value: Some(value),
            kind: Some(kind),
        }
    }
}

/// Position in a token list. Every consuming operation advances past at most
/// the tokens it matched; a parser can save [`TokenCursor::position`] and
/// [`TokenCursor::rewind`] to backtrack.
#[derive(Debug, Clone)]
pub struct TokenCursor {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn rewind(&mut self, position: usize) {
        self.position = position.min(self.tokens.len());
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Byte offset of the next token, or the end of the last token once the
    /// input is exhausted.
    pub fn current_index(&self) -> usize {
        match self.tokens.get(self.position) {
            Some(token) => token.range.start,
            None => self.tokens.last().map_or(0, |token| token.range.end),
        }
    }

    /// Range of the next token, zero-width at the end of input.
    pub fn current_range(&self) -> SourceRange {
        match self.tokens.get(self.position) {
            Some(token) => token.range,
            None => SourceRange::empty_at(self.current_index()),
        }
    }

    /// End offset of the token most recently consumed.
    pub fn previous_end(&self) -> Option<usize> {
        self.position
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(|token| token.range.end)
    }

    pub fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::new(message, self.current_range())
    }

    fn end_of_input(&self) -> QueryError {
        self.error("unexpected end of input")
    }

    pub fn peek(&self, offset: usize) -> QueryResult<&Token> {
        self.tokens
            .get(self.position + offset)
            .ok_or_else(|| self.end_of_input())
    }

    pub fn advance(&mut self) -> QueryResult<Token> {
        let token = self.peek(0)?.clone();
        self.position += 1;
        Ok(token)
    }

    pub fn next_is(&self, pattern: &Pattern, offset: usize) -> bool {
        self.tokens
            .get(self.position + offset)
            .is_some_and(|token| token.is(pattern))
    }

    /// The next tokens match `patterns` one by one.
    pub fn next_is_all(&self, patterns: &[Pattern]) -> bool {
        patterns
            .iter()
            .enumerate()
            .all(|(offset, pattern)| self.next_is(pattern, offset))
    }

    /// Consume the next token if it matches.
    pub fn next_if(&mut self, pattern: &Pattern) -> Option<Token> {
        if self.next_is(pattern, 0) {
            self.advance().ok()
        } else {
            None
        }
    }

    /// Consume the next `patterns.len()` tokens if they all match.
    pub fn next_if_all(&mut self, patterns: &[Pattern]) -> Option<Vec<Token>> {
        if !self.next_is_all(patterns) {
            return None;
        }
        let tokens = self.tokens[self.position..self.position + patterns.len()].to_vec();
        self.position += patterns.len();
        Some(tokens)
    }

    /// Consume a matching token or fail with `message`.
    pub fn expect(&mut self, pattern: &Pattern, message: &str) -> QueryResult<Token> {
        if self.next_is(pattern, 0) {
            self.advance()
        } else {
            Err(self.error(message))
        }
    }
}
