//! querylens - a miniature SQL query engine over in-memory tables.
//!
//! The engine itself lives in `querylens-core`. This crate adds what a tool
//! around it needs: table files on disk, configuration, result rendering,
//! a statement session and the interactive shell.

pub mod config;
pub mod loader;
pub mod render;
pub mod repl;
pub mod session;

pub use config::{Config, ConfigError, OutputFormat};
pub use loader::{load_data_dir, load_database, table_from_text, table_to_text, LoadError};
pub use session::{Outcome, Session, SessionError};
