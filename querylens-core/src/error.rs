//! Error type for querylens-core.
//!
//! Lexing, parsing and evaluation all fail with the same [`QueryError`]:
//! a human-readable message plus the source range it points at. Errors
//! raised below the evaluator (table lookups, builtin functions) start out
//! unlocated and get their range attached by the caller with [`QueryError::at`].

use serde::Serialize;
use thiserror::Error;

use crate::ast::SourceRange;

/// Query error carrying a message and the offending source range.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
    pub range: SourceRange,
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

impl QueryError {
    pub fn new(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }

    /// Error whose range is filled in later by the evaluator.
    pub fn unlocated(message: impl Into<String>) -> Self {
        Self::new(message, SourceRange::default())
    }

    /// Replace the range of this error.
    pub fn at(mut self, range: SourceRange) -> Self {
        self.range = range;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message() {
        let err = QueryError::new("expected end of input", SourceRange::new(4, 9));
        assert_eq!(err.to_string(), "expected end of input");
        assert_eq!(err.range, SourceRange::new(4, 9));
    }

    #[test]
    fn test_unlocated_error_gets_range() {
        let err = QueryError::unlocated("ambiguous field 'id'").at(SourceRange::new(7, 9));
        assert_eq!(err.range.start, 7);
        assert_eq!(err.range.end, 9);
    }

    #[test]
    fn test_error_serialization() {
        let err = QueryError::new("can not find table 'x' in database 'musik'", SourceRange::new(14, 15));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["message"], "can not find table 'x' in database 'musik'");
        assert_eq!(json["range"]["start"], 14);
        assert_eq!(json["range"]["end"], 15);
    }
}
