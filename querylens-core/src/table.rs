//! Tables: ordered field descriptors plus rows of values.
//!
//! Every row has exactly one value per field. Tables are treated as values
//! by the executor: each stage builds a new table instead of mutating one
//! that another stage still holds.

use std::collections::HashSet;

use serde::Serialize;

use crate::ast::FieldRef;
use crate::error::{QueryError, QueryResult};
use crate::lexer::strings_equal_ignore_case;
use crate::value::{Value, ValueKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    #[default]
    Unknown,
}

impl FieldType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Unknown => "unknown",
        }
    }
}

/// Where a column comes from and what it is displayed as.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FieldDescriptor {
    pub database: Option<String>,
    pub table: Option<String>,
    pub field: Option<String>,
    pub alias: Option<String>,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    /// Field of a stored table; the alias starts out as the field name.
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        field: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        let field = field.into();
        Self {
            database: Some(database.into()),
            table: Some(table.into()),
            alias: Some(field.clone()),
            field: Some(field),
            field_type,
        }
    }

    /// Column computed by an expression; only the alias is known.
    pub fn computed(alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    /// Display name: the alias, falling back to the field name.
    pub fn display_name(&self) -> &str {
        self.alias
            .as_deref()
            .or(self.field.as_deref())
            .unwrap_or_default()
    }

    fn matches(&self, reference: &FieldRef) -> bool {
        let part_matches = |wanted: &Option<String>, actual: &Option<String>| match wanted {
            None => true,
            Some(wanted) => actual
                .as_deref()
                .is_some_and(|actual| strings_equal_ignore_case(wanted, actual)),
        };

        let by_name = part_matches(&reference.database, &self.database)
            && part_matches(&reference.table, &self.table)
            && part_matches(&reference.field, &self.field);

        let by_alias = reference.database.is_none()
            && reference.table.is_none()
            && reference.field.is_some()
            && part_matches(&reference.field, &self.alias);

        by_name || by_alias
    }
}

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    fields: Vec<FieldDescriptor>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// No fields and a single empty row: the input of a select without `FROM`.
    pub fn seed() -> Self {
        Self {
            fields: Vec::new(),
            rows: vec![Vec::new()],
        }
    }

    pub fn from_parts(fields: Vec<FieldDescriptor>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == fields.len()));
        Self { fields, rows }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn into_parts(self) -> (Vec<FieldDescriptor>, Vec<Row>) {
        (self.fields, self.rows)
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Append a field; existing rows get a null in the new position.
    pub fn add_field(&mut self, field: FieldDescriptor) {
        self.fields.push(field);
        for row in &mut self.rows {
            row.push(Value::Null);
        }
    }

    pub fn add_row(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.fields.len(), "row length must match field count");
        self.rows.push(row);
    }

    /// Add a column of values, one per row.
    ///
    /// A column whose alias equals `field`'s alias (case-insensitively) is
    /// overwritten in place. Otherwise the field is appended; a table with no
    /// rows first gets one row per value.
    pub fn add_column(&mut self, field: FieldDescriptor, values: Vec<Value>) {
        let existing = field.alias.as_deref().and_then(|alias| {
            self.fields.iter().position(|existing| {
                existing
                    .alias
                    .as_deref()
                    .is_some_and(|existing| strings_equal_ignore_case(existing, alias))
            })
        });

        if let Some(index) = existing {
            for (row, value) in self.rows.iter_mut().zip(values) {
                row[index] = value;
            }
            return;
        }

        if self.rows.is_empty() {
            self.rows = vec![vec![Value::Null; self.fields.len()]; values.len()];
        }
        self.fields.push(field);
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.push(values.next().unwrap_or(Value::Null));
        }
    }

    pub fn get_column(&self, index: usize) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Values of the only column of this table.
    pub fn get_only_column(&self) -> QueryResult<Vec<Value>> {
        only_one(
            self.fields.iter().collect(),
            "expected table with at least 1 field",
            "expected table with only 1 field",
        )?;
        Ok(self.get_column(0))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.fields.is_empty()
    }

    /// Forget where the columns came from, keeping only their aliases.
    pub fn clear_qualifiers(&mut self) {
        for field in &mut self.fields {
            field.database = None;
            field.table = None;
            field.field = None;
        }
    }

    /// Re-label every field as belonging to table `alias`, named by its
    /// current alias.
    pub fn rename_table(&mut self, alias: &str) {
        for field in &mut self.fields {
            field.database = None;
            field.table = Some(alias.to_string());
            field.field = field.alias.clone();
        }
    }

    pub fn remove_duplicate_rows(&mut self) {
        self.rows = remove_duplicate_rows(std::mem::take(&mut self.rows));
    }
}

/// Indices of every field matching `reference`. A missing field name in the
/// reference matches every field of the qualified table.
pub fn find_every_field_index(
    fields: &[FieldDescriptor],
    reference: &FieldRef,
) -> QueryResult<Vec<usize>> {
    let indices: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.matches(reference))
        .map(|(index, _)| index)
        .collect();

    if indices.is_empty() {
        return Err(QueryError::new(
            format!("can not find field '{}'", reference.qualified_name()),
            reference.range,
        ));
    }
    Ok(indices)
}

/// Index of the single field matching `reference`.
pub fn find_field_index(fields: &[FieldDescriptor], reference: &FieldRef) -> QueryResult<usize> {
    let name = reference.qualified_name();
    only_one(
        find_every_field_index(fields, reference)?,
        format!("can not find field '{}'", name),
        format!("ambiguous field '{}'", name),
    )
    .map_err(|err| err.at(reference.range))
}

/// The single element of `items`, or an error naming what went wrong.
pub fn only_one<T>(
    items: Vec<T>,
    none: impl Into<String>,
    many: impl Into<String>,
) -> QueryResult<T> {
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (Some(item), None) => Ok(item),
        (None, _) => Err(QueryError::unlocated(none)),
        (Some(_), Some(_)) => Err(QueryError::unlocated(many)),
    }
}

/// Keep the first occurrence of every row, in order.
pub fn remove_duplicate_rows(rows: Vec<Row>) -> Vec<Row> {
    let mut seen: HashSet<Vec<ValueKey>> = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert(row_key(row)))
        .collect()
}

pub fn row_key(row: &[Value]) -> Vec<ValueKey> {
    row.iter().map(Value::key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceRange;

    fn field(table: &str, name: &str) -> FieldDescriptor {
        FieldDescriptor::new("db", table, name, FieldType::Number)
    }

    fn reference(table: Option<&str>, name: Option<&str>) -> FieldRef {
        FieldRef {
            database: None,
            table: table.map(String::from),
            field: name.map(String::from),
            range: SourceRange::new(0, 1),
        }
    }

    #[test]
    fn test_add_column_materializes_rows() {
        let mut table = Table::new();
        table.add_column(
            FieldDescriptor::computed("x"),
            vec![Value::Number(1.0), Value::Number(2.0)],
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.fields().len(), 1);
    }

    #[test]
    fn test_add_column_overwrites_same_alias() {
        let mut table = Table::new();
        table.add_column(FieldDescriptor::computed("x"), vec![Value::Number(1.0)]);
        table.add_column(FieldDescriptor::computed("X"), vec![Value::Number(2.0)]);
        assert_eq!(table.fields().len(), 1);
        assert_eq!(table.rows(), &[vec![Value::Number(2.0)]]);
    }

    #[test]
    fn test_field_lookup_by_qualifier_and_alias() {
        let mut renamed = FieldDescriptor::computed("total");
        renamed.field_type = FieldType::Number;
        let fields = vec![field("a", "id"), field("b", "id"), field("b", "name"), renamed];

        assert_eq!(find_field_index(&fields, &reference(Some("B"), Some("ID"))).unwrap(), 1);
        assert_eq!(find_field_index(&fields, &reference(None, Some("total"))).unwrap(), 3);
        assert_eq!(
            find_every_field_index(&fields, &reference(Some("b"), None)).unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_field_lookup_errors() {
        let fields = vec![field("a", "id"), field("b", "id")];

        let err = find_field_index(&fields, &reference(None, Some("id"))).unwrap_err();
        assert_eq!(err.message, "ambiguous field 'id'");

        let err = find_field_index(&fields, &reference(Some("c"), Some("id"))).unwrap_err();
        assert_eq!(err.message, "can not find field 'c.id'");
        assert_eq!(err.range, SourceRange::new(0, 1));
    }

    #[test]
    fn test_get_only_column() {
        let mut table = Table::new();
        let err = table.get_only_column().unwrap_err();
        assert_eq!(err.message, "expected table with at least 1 field");

        table.add_field(field("a", "x"));
        table.add_row(vec![Value::Number(1.0)]);
        assert_eq!(table.get_only_column().unwrap(), vec![Value::Number(1.0)]);

        table.add_field(field("a", "y"));
        let err = table.get_only_column().unwrap_err();
        assert_eq!(err.message, "expected table with only 1 field");
    }

    #[test]
    fn test_remove_duplicate_rows_is_stable() {
        let rows = vec![
            vec![Value::Number(2.0)],
            vec![Value::Number(1.0)],
            vec![Value::Number(2.0)],
            vec![Value::Null],
            vec![Value::Null],
        ];
        assert_eq!(
            remove_duplicate_rows(rows),
            vec![vec![Value::Number(2.0)], vec![Value::Number(1.0)], vec![Value::Null]]
        );
    }

    #[test]
    fn test_rename_table() {
        let mut table = Table::new();
        table.add_field(field("songs", "title").with_alias(Some("t".to_string())));
        table.rename_table("s");
        let renamed = &table.fields()[0];
        assert_eq!(renamed.database, None);
        assert_eq!(renamed.table.as_deref(), Some("s"));
        assert_eq!(renamed.field.as_deref(), Some("t"));
    }

    #[test]
    fn test_empty_table() {
        assert!(Table::new().is_empty());
        assert!(Table::seed().is_empty());
    }
}
