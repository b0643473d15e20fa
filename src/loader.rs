//! Table files on disk.
//!
//! A table file is line oriented. The first line declares the fields as
//! `name:type` pairs; the character offset of each declaration is also the
//! start of that field's column in every following line:
//!
//! ```text
//! id:number title:string        year:number
//! 1         Blue Monday         1983
//! 2         Heroes              1977
//! ```
//!
//! A data directory holds one sub-directory per database and one file per
//! table; the file stem is the table name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use querylens_core::table::{FieldDescriptor, FieldType, Table};
use querylens_core::value::{format_number, Value};

static FIELD_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9_]+):([A-Za-z0-9_]+)").expect("Invalid regex"));

static NUMBER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").expect("Invalid regex")
});

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid type '{0}'")]
    InvalidType(String),

    #[error("table '{0}' has no field declarations")]
    MissingHeader(String),

    #[error("can not find database '{0}'")]
    UnknownDatabase(String),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// All databases of a data directory, by name.
pub type Databases = BTreeMap<String, BTreeMap<String, Table>>;

/// Parse the text of a table file.
pub fn table_from_text(database: &str, table: &str, text: &str) -> LoadResult<Table> {
    let mut lines = text.split('\n').filter(|line| !line.is_empty());
    let header = lines
        .next()
        .ok_or_else(|| LoadError::MissingHeader(table.to_string()))?;

    let mut columns: Vec<(usize, FieldType)> = Vec::new();
    let mut result = Table::new();
    for captures in FIELD_DECLARATION.captures_iter(header) {
        let (Some(declaration), Some(name), Some(type_name)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        let field_type = FieldType::parse(type_name.as_str())
            .ok_or_else(|| LoadError::InvalidType(type_name.as_str().to_string()))?;

        let offset = header[..declaration.start()].chars().count();
        columns.push((offset, field_type));
        result.add_field(FieldDescriptor::new(database, table, name.as_str(), field_type));
    }

    for line in lines {
        let chars: Vec<char> = line.chars().collect();
        let row = columns
            .iter()
            .enumerate()
            .map(|(index, &(start, field_type))| {
                let end = columns
                    .get(index + 1)
                    .map(|&(next, _)| next)
                    .unwrap_or(chars.len());
                let start = start.min(chars.len());
                let end = end.clamp(start, chars.len());
                let slice: String = chars[start..end].iter().collect();
                parse_cell(slice.trim(), field_type)
            })
            .collect();
        result.add_row(row);
    }

    Ok(result)
}

fn parse_cell(text: &str, field_type: FieldType) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    match field_type {
        FieldType::Number => Value::Number(parse_float(text)),
        FieldType::String | FieldType::Unknown => Value::String(text.to_string()),
    }
}

/// Parse the longest numeric prefix, `NaN` if there is none.
fn parse_float(text: &str) -> f64 {
    if let Some(rest) = text.strip_prefix('-') {
        if rest.starts_with("Infinity") {
            return f64::NEG_INFINITY;
        }
    }
    if text.trim_start_matches('+').starts_with("Infinity") {
        return f64::INFINITY;
    }
    NUMBER_PREFIX
        .find(text)
        .and_then(|found| found.as_str().parse().ok())
        .unwrap_or(f64::NAN)
}

/// Write a table in the format read by [`table_from_text`]. Null cells and
/// empty strings are written as blanks.
pub fn table_to_text(table: &Table) -> String {
    let names: Vec<String> = table
        .fields()
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let field_type = match field.field_type {
                FieldType::Unknown => infer_type(table, index),
                known => known,
            };
            format!("{}:{}", file_field_name(field.display_name()), field_type.name())
        })
        .collect();

    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| match value {
                    Value::Null => String::new(),
                    Value::Number(n) => format_number(*n),
                    Value::String(s) => s.replace(['\n', '\r'], " "),
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            cells
                .iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut text = String::new();
    push_line(&mut text, &names, &widths);
    for row in &cells {
        push_line(&mut text, row, &widths);
    }
    text
}

fn push_line(text: &mut String, cells: &[String], widths: &[usize]) {
    let last = cells.len().saturating_sub(1);
    for (index, (cell, width)) in cells.iter().zip(widths).enumerate() {
        text.push_str(cell);
        if index < last {
            let padding = width - cell.chars().count() + 1;
            text.extend(std::iter::repeat(' ').take(padding));
        }
    }
    text.push('\n');
}

fn infer_type(table: &Table, index: usize) -> FieldType {
    let all_numbers = table
        .rows()
        .iter()
        .all(|row| matches!(row[index], Value::Null | Value::Number(_)));
    if all_numbers {
        FieldType::Number
    } else {
        FieldType::String
    }
}

/// Field names in a table file are word characters only.
fn file_field_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "field".to_string()
    } else {
        cleaned
    }
}

/// Load every file of `dir` as a table. Returns the database name (the
/// directory name) and its tables.
pub fn load_database(dir: &Path) -> LoadResult<(String, BTreeMap<String, Table>)> {
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| LoadError::UnknownDatabase(dir.display().to_string()))?;

    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut tables = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            tracing::warn!("Skipping '{}': not a table file", path.display());
            continue;
        }

        let Some(table_name) = path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
        else {
            continue;
        };
        let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let table = table_from_text(&name, &table_name, &text)?;
        tracing::debug!(
            "Loaded table {}.{} with {} rows",
            name,
            table_name,
            table.row_count()
        );
        tables.insert(table_name, table);
    }

    tracing::info!("Loaded database '{}' with {} tables", name, tables.len());
    Ok((name, tables))
}

/// Load every sub-directory of `root` as a database. A missing root yields
/// no databases.
pub fn load_data_dir(root: &Path) -> LoadResult<Databases> {
    let mut databases = Databases::new();
    if !root.exists() {
        tracing::warn!("Data directory '{}' does not exist", root.display());
        return Ok(databases);
    }

    let entries = std::fs::read_dir(root).map_err(|source| LoadError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            tracing::warn!("Skipping '{}': not a database directory", path.display());
            continue;
        }
        let (name, tables) = load_database(&path)?;
        databases.insert(name, tables);
    }
    Ok(databases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float("12.5"), 12.5);
        assert_eq!(parse_float("12abc"), 12.0);
        assert_eq!(parse_float("-3e2x"), -300.0);
        assert_eq!(parse_float("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float("abc").is_nan());
    }

    #[test]
    fn test_file_field_name() {
        assert_eq!(file_field_name("count(x)"), "count_x_");
        assert_eq!(file_field_name("total"), "total");
        assert_eq!(file_field_name("  "), "field");
    }

    #[test]
    fn test_short_lines_yield_nulls() {
        let table = table_from_text("db", "t", "a:number b:string\n1\n").unwrap();
        assert_eq!(table.rows(), &[vec![Value::Number(1.0), Value::Null]]);
    }
}
