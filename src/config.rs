//! Configuration handling for the querylens shell
//!
//! Manages the querylens.toml configuration file.
//!
//! ## Environment Variables
//!
//! The following environment variables can override config file settings:
//!
//! - `QUERYLENS_DATA_DIR` - Directory holding one sub-directory per database
//! - `QUERYLENS_DATABASE` - Database that is active at startup
//! - `QUERYLENS_FORMAT` - Output format, `table` or `json`
//!
//! These can be set in a `.env` file in the working directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use querylens_core::DEFAULT_DATABASE;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "querylens.toml";

/// Environment variable names
pub const ENV_DATA_DIR: &str = "QUERYLENS_DATA_DIR";
pub const ENV_DATABASE: &str = "QUERYLENS_DATABASE";
pub const ENV_FORMAT: &str = "QUERYLENS_FORMAT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid output format '{0}', expected 'table' or 'json'")]
    InvalidFormat(String),
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidFormat(s.to_string())),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory with one sub-directory per database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Database that is active at startup
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub repl: ReplConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

/// Output-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Maximum number of rows printed for a table result
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_max_rows() -> usize {
    200
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            max_rows: default_max_rows(),
        }
    }
}

/// Interactive shell configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplConfig {
    /// History file, `~/.querylens_history` when unset
    #[serde(default)]
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: default_database(),
            output: OutputConfig::default(),
            repl: ReplConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// Reads `path` if given, otherwise `querylens.toml` in the working
    /// directory when it exists, otherwise starts from the defaults. A `.env`
    /// file is loaded first and environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // Load .env if present (ignore errors)
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Read a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides looked up by environment variable name
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        // Override data directory if set
        if let Some(data_dir) = lookup(ENV_DATA_DIR).filter(|value| !value.is_empty()) {
            self.data_dir = PathBuf::from(data_dir);
        }

        // Override database if set
        if let Some(database) = lookup(ENV_DATABASE).filter(|value| !value.is_empty()) {
            self.database = database;
        }

        // Override output format if set
        if let Some(format) = lookup(ENV_FORMAT).filter(|value| !value.is_empty()) {
            self.output.format = format.parse()?;
        }

        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// History file for the interactive shell
    pub fn history_file(&self) -> PathBuf {
        if let Some(path) = &self.repl.history_file {
            return path.clone();
        }
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".querylens_history"))
            .unwrap_or_else(|_| PathBuf::from(".querylens_history"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.database, "musik");
        assert_eq!(config.output.format, OutputFormat::Table);
        assert_eq!(config.output.max_rows, 200);
    }

    #[test]
    fn test_config_file() {
        let config = Config::from_toml(
            r#"
            data_dir = "/srv/tables"
            database = "shop"

            [output]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/tables"));
        assert_eq!(config.database, "shop");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.max_rows, 200);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_str.contains("database = \"musik\""));
        assert!(toml_str.contains("format = \"table\""));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_DATA_DIR, "/tmp/data"),
            (ENV_DATABASE, ""),
            (ENV_FORMAT, "JSON"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|name| env.get(name).map(|value| value.to_string()))
            .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/data"));
        assert_eq!(config.database, "musik");
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_format_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|name| (name == ENV_FORMAT).then(|| "csv".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat(format) if format == "csv"));
    }
}
