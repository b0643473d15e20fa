//! An interactive session: the loaded databases, the active database and the
//! last result.
//!
//! Statements are either queries or shell commands:
//! - `load <name>` switches the active database
//! - `load new` rescans the data directory
//! - `clear cache` forgets every loaded database
//! - `save` writes the last result to `<data_dir>/<active>/result.txt`
//! - `debug <query>` runs a query and records its execution trace

use std::path::{Path, PathBuf};

use thiserror::Error;

use querylens_core::{
    parse, strings_equal_ignore_case, DataSource, DebugCommand, InMemoryDataSource, QueryError,
    QueryExecutor, StatementKind, Table, TraceRecorder, TraceStep,
};

use crate::loader::{load_data_dir, table_from_text, table_to_text, LoadError};

/// File name used by `save`.
pub const RESULT_FILE_NAME: &str = "result.txt";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("nothing to save, run a query first")]
    NothingToSave,

    #[error("failed to write '{path}': {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// What a statement did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Table(Table),
    Traced { table: Table, steps: Vec<TraceStep> },
    Switched(String),
    Loaded(Vec<String>),
    CacheCleared,
    Saved(PathBuf),
}

pub struct Session {
    data_dir: PathBuf,
    source: InMemoryDataSource,
    last_result: Option<Table>,
}

impl Session {
    /// Session with no databases loaded.
    pub fn new(data_dir: impl Into<PathBuf>, database: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            source: InMemoryDataSource::new(database),
            last_result: None,
        }
    }

    /// Session with every database of `data_dir` loaded.
    pub fn open(data_dir: impl Into<PathBuf>, database: &str) -> SessionResult<Self> {
        let mut session = Self::new(data_dir, database);
        session.reload()?;
        Ok(session)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn source(&self) -> &InMemoryDataSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut InMemoryDataSource {
        &mut self.source
    }

    pub fn active_database(&self) -> &str {
        self.source.active_database()
    }

    pub fn last_result(&self) -> Option<&Table> {
        self.last_result.as_ref()
    }

    /// Table names of the active database.
    pub fn table_names(&self) -> Vec<String> {
        self.source.table_names(self.source.active_database())
    }

    /// Run one statement. With `trace`, queries record their execution
    /// steps as if prefixed with `debug`.
    pub fn run(&mut self, text: &str, trace: bool) -> SessionResult<Outcome> {
        let statement = parse(text)?;

        match statement.kind {
            StatementKind::Load { name } => self.switch_database(&name),
            StatementKind::Command(DebugCommand::LoadNew) => {
                let names = self.reload()?;
                Ok(Outcome::Loaded(names))
            }
            StatementKind::Command(DebugCommand::ClearCache) => {
                self.source.clear();
                tracing::info!("Cleared all loaded databases");
                Ok(Outcome::CacheCleared)
            }
            StatementKind::Command(DebugCommand::Save) => self.save(),
            StatementKind::Query(query) => {
                let outcome = if statement.debug || trace {
                    let mut recorder = TraceRecorder::new();
                    let table = QueryExecutor::new(&self.source)
                        .with_observer(&mut recorder)
                        .run(&query)?;
                    Outcome::Traced {
                        table: table.clone(),
                        steps: recorder.finish(),
                    }
                } else {
                    Outcome::Table(QueryExecutor::new(&self.source).run(&query)?)
                };

                let table = match &outcome {
                    Outcome::Table(table) | Outcome::Traced { table, .. } => Some(table.clone()),
                    _ => None,
                };
                self.last_result = table;
                Ok(outcome)
            }
        }
    }

    fn switch_database(&mut self, name: &str) -> SessionResult<Outcome> {
        let found = self
            .source
            .database_names()
            .into_iter()
            .find(|database| strings_equal_ignore_case(database, name))
            .ok_or_else(|| LoadError::UnknownDatabase(name.to_string()))?;

        tracing::info!("Switched to database '{}'", found);
        self.source.set_active(found.clone());
        Ok(Outcome::Switched(found))
    }

    /// Load every database of the data directory, replacing databases with
    /// the same name. Returns the loaded names.
    fn reload(&mut self) -> SessionResult<Vec<String>> {
        let databases = load_data_dir(&self.data_dir)?;
        let names: Vec<String> = databases.keys().cloned().collect();
        for (name, tables) in databases {
            self.source.insert_database(&name, tables);
        }
        Ok(names)
    }

    /// Write the last result into the active database directory. The saved
    /// table is also available as `result` right away.
    fn save(&mut self) -> SessionResult<Outcome> {
        let table = self.last_result.as_ref().ok_or(SessionError::NothingToSave)?;
        let database = self.source.active_database().to_string();
        let dir = self.data_dir.join(&database);
        let path = dir.join(RESULT_FILE_NAME);

        let text = table_to_text(table);
        std::fs::create_dir_all(&dir)
            .and_then(|_| std::fs::write(&path, &text))
            .map_err(|source| SessionError::Save {
                path: path.clone(),
                source,
            })?;

        let saved = table_from_text(&database, "result", &text)?;
        self.source.insert_table(&database, "result", saved);
        tracing::info!("Saved {} rows to {}", table.row_count(), path.display());
        Ok(Outcome::Saved(path))
    }
}
