//! Executor module for querylens queries.
//!
//! This module provides a tree-walking evaluator that can run queries
//! against any table namespace implementing the [`DataSource`] trait.
//! Evaluation is a fixed pipeline per select: from, where, group by,
//! having, select, distinct, then order by and limit per query.

mod aggregation;
mod builtins;
mod evaluate;
mod helpers;
mod pipeline;
mod tables;
mod trace;

pub use builtins::BuiltinFunctions;
pub use helpers::*;
pub use trace::{StepObserver, TraceRecorder, TraceStep};

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use regex::Regex;

use crate::ast::{QueryId, SourceRange, StatementKind};
use crate::error::{QueryError, QueryResult};
use crate::parser;
use crate::table::Table;

/// Database that is active when nothing else was selected.
pub const DEFAULT_DATABASE: &str = "musik";

/// Trait for table namespaces that can be queried by the executor.
///
/// Names are returned as stored; the executor matches them
/// case-insensitively and reports ambiguous matches.
pub trait DataSource {
    /// List all database names.
    fn database_names(&self) -> Vec<String>;

    /// List the table names of a database.
    ///
    /// # Arguments
    /// * `database` - Database name exactly as returned by `database_names`
    ///
    /// # Returns
    /// Vec of table names, empty if the database does not exist
    fn table_names(&self, database: &str) -> Vec<String>;

    /// Get a table by its exact name.
    ///
    /// # Arguments
    /// * `database` - Database name
    /// * `table` - Table name
    ///
    /// # Returns
    /// The table if found, None otherwise
    fn table(&self, database: &str, table: &str) -> Option<&Table>;

    /// Database used for table references without a database qualifier.
    fn active_database(&self) -> &str;
}

/// Simple in-memory data source for testing and for the interactive shell.
#[derive(Debug, Clone)]
pub struct InMemoryDataSource {
    databases: BTreeMap<String, BTreeMap<String, Table>>,
    active: String,
}

impl Default for InMemoryDataSource {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}

impl InMemoryDataSource {
    pub fn new(active: impl Into<String>) -> Self {
        Self {
            databases: BTreeMap::new(),
            active: active.into(),
        }
    }

    /// Add or replace a table, creating its database if needed.
    pub fn insert_table(&mut self, database: &str, name: &str, table: Table) {
        self.databases
            .entry(database.to_string())
            .or_default()
            .insert(name.to_string(), table);
    }

    /// Add or replace a whole database.
    pub fn insert_database(&mut self, name: &str, tables: BTreeMap<String, Table>) {
        self.databases.insert(name.to_string(), tables);
    }

    pub fn set_active(&mut self, database: impl Into<String>) {
        self.active = database.into();
    }

    pub fn contains_database(&self, name: &str) -> bool {
        self.databases.contains_key(name)
    }

    /// Drop every loaded database. The active name is kept.
    pub fn clear(&mut self) {
        self.databases.clear();
    }
}

impl DataSource for InMemoryDataSource {
    fn database_names(&self) -> Vec<String> {
        self.databases.keys().cloned().collect()
    }

    fn table_names(&self, database: &str) -> Vec<String> {
        self.databases
            .get(database)
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn table(&self, database: &str, table: &str) -> Option<&Table> {
        self.databases.get(database)?.get(table)
    }

    fn active_database(&self) -> &str {
        &self.active
    }
}

/// Evaluates queries against a [`DataSource`].
///
/// One executor can run any number of queries. Subquery results are cached
/// by query id for the duration of a single top-level run.
pub struct QueryExecutor<'a, D: DataSource + ?Sized> {
    source: &'a D,
    cache: RefCell<HashMap<QueryId, Table>>,
    like_patterns: RefCell<HashMap<String, Regex>>,
    observer: Option<RefCell<&'a mut dyn StepObserver>>,
}

impl<'a, D: DataSource + ?Sized> QueryExecutor<'a, D> {
    /// Create a new executor over the given data source.
    pub fn new(source: &'a D) -> Self {
        Self {
            source,
            cache: RefCell::new(HashMap::new()),
            like_patterns: RefCell::new(HashMap::new()),
            observer: None,
        }
    }

    /// Report every pipeline step to `observer`. Observation never changes
    /// the result of a query.
    pub fn with_observer(mut self, observer: &'a mut dyn StepObserver) -> Self {
        self.observer = Some(RefCell::new(observer));
        self
    }

    /// Parse and run a query string.
    ///
    /// # Arguments
    /// * `text` - A single select statement
    ///
    /// # Returns
    /// The result table
    pub fn execute(&self, text: &str) -> QueryResult<Table> {
        let statement = parser::parse(text)?;
        match &statement.kind {
            StatementKind::Query(query) => self.run(query),
            _ => Err(QueryError::new("expected select query", statement.range)),
        }
    }

    /// Run a parsed query. The subquery cache starts out empty.
    pub fn run(&self, query: &crate::ast::Query) -> QueryResult<Table> {
        self.cache.borrow_mut().clear();
        let table = self.run_query(query)?;
        tracing::debug!(
            "Query produced {} rows and {} fields",
            table.row_count(),
            table.fields().len()
        );
        Ok(table)
    }

    /// Run `run` as a named pipeline step, reporting it to the observer.
    fn step(
        &self,
        name: &'static str,
        range: SourceRange,
        before: Option<&Table>,
        run: impl FnOnce() -> QueryResult<Table>,
    ) -> QueryResult<Table> {
        tracing::trace!("Step '{}' at {}..{}", name, range.start, range.end);
        if let Some(observer) = &self.observer {
            observer.borrow_mut().open_step(name, range, before);
        }
        let result = run();
        if let Some(observer) = &self.observer {
            observer.borrow_mut().close_step(result.as_ref().ok());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{FieldDescriptor, FieldType};
    use crate::value::Value;

    fn numbers(database: &str, table: &str, field: &str, values: &[f64]) -> Table {
        let mut result = Table::new();
        result.add_field(FieldDescriptor::new(database, table, field, FieldType::Number));
        for value in values {
            result.add_row(vec![Value::Number(*value)]);
        }
        result
    }

    #[test]
    fn test_in_memory_data_source() {
        let mut ds = InMemoryDataSource::default();
        assert_eq!(ds.active_database(), DEFAULT_DATABASE);
        assert!(ds.database_names().is_empty());

        ds.insert_table("musik", "songs", numbers("musik", "songs", "id", &[1.0]));
        assert!(ds.contains_database("musik"));
        assert_eq!(ds.table_names("musik"), vec!["songs".to_string()]);
        assert!(ds.table("musik", "songs").is_some());
        assert!(ds.table("musik", "albums").is_none());
        assert!(ds.table_names("other").is_empty());

        ds.clear();
        assert!(ds.database_names().is_empty());
        assert_eq!(ds.active_database(), "musik");
    }

    #[test]
    fn test_execute_rejects_commands() {
        let ds = InMemoryDataSource::default();
        let err = QueryExecutor::new(&ds).execute("load musik").unwrap_err();
        assert_eq!(err.message, "expected select query");
    }

    #[test]
    fn test_execute_without_from() {
        let ds = InMemoryDataSource::default();
        let result = QueryExecutor::new(&ds).execute("select 1 + 2 * 3").unwrap();
        assert_eq!(result.fields()[0].display_name(), "1 + 2 * 3");
        assert_eq!(result.rows(), &[vec![Value::Number(7.0)]]);
    }

    #[test]
    fn test_table_names_are_case_insensitive() {
        let mut ds = InMemoryDataSource::new("Shop");
        ds.insert_table("Shop", "Items", numbers("Shop", "Items", "price", &[2.0, 4.0]));
        let result = QueryExecutor::new(&ds)
            .execute("select PRICE from shop.items")
            .unwrap();
        assert_eq!(result.row_count(), 2);
    }
}
