//! querylens core - storage-independent SQL lexer, parser and evaluator.
//!
//! This crate turns a SQL-like statement into a tagged AST and evaluates it
//! against in-memory tables. It knows nothing about files, terminals or
//! configuration; the `querylens` binary crate provides those.
//!
//! # Main Components
//!
//! - **Lexer**: first-match tokenizer that never fails
//! - **Cursor**: lookahead and conditional consumption over the token list
//! - **Parser**: recursive-descent statements plus a two-phase expression parser
//! - **Table**: fields, rows and values shared by inputs and results
//! - **Executor**: tree-walking evaluator against a [`DataSource`]
//!
//! # Example
//!
//! ```rust
//! use querylens_core::{FieldDescriptor, FieldType, InMemoryDataSource, QueryExecutor, Table, Value};
//!
//! let mut table = Table::new();
//! table.add_field(FieldDescriptor::new("shop", "items", "price", FieldType::Number));
//! table.add_row(vec![Value::Number(3.0)]);
//! table.add_row(vec![Value::Number(5.0)]);
//!
//! let mut source = InMemoryDataSource::new("shop");
//! source.insert_table("shop", "items", table);
//!
//! let result = QueryExecutor::new(&source)
//!     .execute("SELECT sum(price) AS total FROM items")
//!     .unwrap();
//! assert_eq!(result.rows(), &[vec![Value::Number(8.0)]]);
//! ```

pub mod ast;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod table;
pub mod value;

// Re-export main types for convenience
pub use ast::{
    AggregateFunction, BinaryOperator, Callee, CompoundOperator, DebugCommand, Expr, ExprKind,
    FieldRef, FieldSelector, JoinKind, Literal, Query, SelectBody, SelectQuery, Selector,
    SourceRange, Statement, StatementKind, TableRef, TableSelector, UnaryOperator,
};
pub use cursor::{Pattern, TokenCursor};
pub use error::{QueryError, QueryResult};
pub use executor::{
    BuiltinFunctions, DataSource, InMemoryDataSource, QueryExecutor, StepObserver,
    TraceRecorder, TraceStep, DEFAULT_DATABASE,
};
pub use lexer::{strings_equal_ignore_case, tokenize, Lexer, Token, TokenKind};
pub use parser::{parse, parse_expression, Parser};
pub use table::{FieldDescriptor, FieldType, Row, Table};
pub use value::Value;
