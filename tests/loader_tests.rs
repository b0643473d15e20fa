//! Table File Tests
//!
//! Tests for reading and writing table files and data directories.

use std::fs;

use querylens::{load_data_dir, load_database, table_from_text, table_to_text, LoadError};
use querylens_core::{FieldDescriptor, FieldType, Table, Value};
use tempfile::TempDir;

const SONGS: &str = "\
id:number title:string    year:number
1         Blue Monday     1983
2         Heroes          1977
3
";

const ITEMS: &str = "\
name:string price:number
pen         1.5
book        12
";

/// Create a data directory with two databases and a stray file
fn create_data_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir(dir.path().join("musik")).unwrap();
    fs::create_dir(dir.path().join("shop")).unwrap();
    fs::write(dir.path().join("musik").join("songs.txt"), SONGS).unwrap();
    fs::write(dir.path().join("shop").join("items.txt"), ITEMS).unwrap();
    fs::write(dir.path().join("readme.txt"), "not a database").unwrap();
    dir
}

#[test]
fn test_table_from_text() {
    let table = table_from_text("musik", "songs", SONGS).unwrap();

    let fields: Vec<(&str, FieldType)> = table
        .fields()
        .iter()
        .map(|field| (field.display_name(), field.field_type))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("id", FieldType::Number),
            ("title", FieldType::String),
            ("year", FieldType::Number),
        ]
    );
    assert_eq!(table.fields()[1].table.as_deref(), Some("songs"));
    assert_eq!(table.fields()[1].database.as_deref(), Some("musik"));

    assert_eq!(
        table.rows(),
        &[
            vec![Value::Number(1.0), Value::string("Blue Monday"), Value::Number(1983.0)],
            vec![Value::Number(2.0), Value::string("Heroes"), Value::Number(1977.0)],
            vec![Value::Number(3.0), Value::Null, Value::Null],
        ]
    );
}

#[test]
fn test_blank_lines_are_ignored() {
    let table = table_from_text("shop", "items", "\nname:string\n\npen\n\n").unwrap();
    assert_eq!(table.rows(), &[vec![Value::string("pen")]]);
}

#[test]
fn test_invalid_type() {
    let err = table_from_text("db", "t", "a:bool\n1\n").unwrap_err();
    assert!(matches!(err, LoadError::InvalidType(ref name) if name == "bool"));
    assert_eq!(err.to_string(), "invalid type 'bool'");
}

#[test]
fn test_missing_header() {
    let err = table_from_text("db", "t", "\n\n").unwrap_err();
    assert!(matches!(err, LoadError::MissingHeader(ref name) if name == "t"));
}

#[test]
fn test_table_to_text_layout() {
    let mut table = Table::new();
    table.add_field(FieldDescriptor::new("db", "t", "a", FieldType::Number));
    table.add_field(FieldDescriptor::new("db", "t", "b", FieldType::String));
    table.add_row(vec![Value::Number(1.0), Value::string("x")]);
    table.add_row(vec![Value::Null, Value::string("yy")]);

    assert_eq!(
        table_to_text(&table),
        "a:number b:string\n1        x\n         yy\n"
    );
}

#[test]
fn test_computed_fields_are_written_with_inferred_types() {
    let mut table = Table::new();
    table.add_column(
        FieldDescriptor::computed("count(x)"),
        vec![Value::Number(2.0), Value::Null],
    );
    table.add_column(
        FieldDescriptor::computed("label"),
        vec![Value::string("a\nb"), Value::Number(1.0)],
    );

    let text = table_to_text(&table);
    assert!(text.starts_with("count_x_:number label:string\n"));
    assert!(text.contains("a b"));
}

#[test]
fn test_written_tables_read_back() {
    let original = table_from_text("musik", "songs", SONGS).unwrap();
    let text = table_to_text(&original);
    let read = table_from_text("musik", "songs", &text).unwrap();

    assert_eq!(read.rows(), original.rows());
    assert_eq!(read.fields(), original.fields());
}

#[test]
fn test_load_database() {
    let dir = create_data_dir();
    let (name, tables) = load_database(&dir.path().join("shop")).unwrap();

    assert_eq!(name, "shop");
    assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["items"]);
    assert_eq!(
        tables["items"].rows()[0],
        vec![Value::string("pen"), Value::Number(1.5)]
    );
}

#[test]
fn test_load_data_dir() {
    let dir = create_data_dir();
    let databases = load_data_dir(dir.path()).unwrap();

    assert_eq!(databases.keys().collect::<Vec<_>>(), vec!["musik", "shop"]);
    assert_eq!(databases["musik"]["songs"].row_count(), 3);
}

#[test]
fn test_missing_data_dir_is_empty() {
    let dir = TempDir::new().unwrap();
    let databases = load_data_dir(&dir.path().join("nope")).unwrap();
    assert!(databases.is_empty());
}

#[test]
fn test_invalid_file_fails_load() {
    let dir = create_data_dir();
    fs::write(dir.path().join("shop").join("broken.txt"), "a:date\n").unwrap();

    let err = load_data_dir(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::InvalidType(_)));
}
