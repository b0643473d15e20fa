//! Table-valued parts of a query: table references, joins and compound
//! operators.

use std::collections::HashSet;

use super::evaluate::Scope;
use super::{DataSource, QueryExecutor};
use crate::ast::*;
use crate::error::{QueryError, QueryResult};
use crate::lexer::strings_equal_ignore_case;
use crate::table::{only_one, remove_duplicate_rows, row_key, Row, Table};
use crate::value::{Value, ValueKey};

impl<D: DataSource + ?Sized> QueryExecutor<'_, D> {
    /// Evaluate one entry of a `FROM` list.
    pub(crate) fn value_of_table(&self, selector: &TableSelector) -> QueryResult<Table> {
        match selector {
            TableSelector::Single(single) => self.value_of_single_table(single),
            TableSelector::Joined(joined) => {
                let left = self.value_of_table(&joined.left)?;
                let right = self.value_of_single_table(&joined.right)?;
                self.step("join", joined.range, None, || {
                    self.join_tables(
                        left,
                        right,
                        joined.kind.keeps_left(),
                        joined.kind.keeps_right(),
                        joined.on.as_ref(),
                    )
                })
            }
        }
    }

    fn value_of_single_table(&self, selector: &SingleTableSelector) -> QueryResult<Table> {
        let mut table = match &selector.source {
            TableSource::Table(reference) => self.resolve_table(reference)?,
            TableSource::Query(query) => self.run_query(query)?,
            TableSource::Nested(inner) => self.value_of_table(inner)?,
        };
        if let Some(alias) = &selector.alias {
            table.rename_table(alias);
        }
        Ok(table)
    }

    /// Look up a stored table. Names match case-insensitively; a reference
    /// without database uses the active one.
    pub(crate) fn resolve_table(&self, reference: &TableRef) -> QueryResult<Table> {
        let wanted = reference
            .database
            .as_deref()
            .unwrap_or_else(|| self.source.active_database());

        let databases: Vec<String> = self
            .source
            .database_names()
            .into_iter()
            .filter(|name| strings_equal_ignore_case(name, wanted))
            .collect();
        let database = only_one(
            databases,
            format!("can not find database '{}'", wanted),
            format!("ambiguous database '{}'", wanted),
        )
        .map_err(|err| err.at(reference.range))?;

        let tables: Vec<String> = self
            .source
            .table_names(&database)
            .into_iter()
            .filter(|name| strings_equal_ignore_case(name, &reference.table))
            .collect();
        let not_found = format!(
            "can not find table '{}' in database '{}'",
            reference.table, database
        );
        let name = only_one(
            tables,
            not_found.clone(),
            format!(
                "ambiguous table '{}' in database '{}'",
                reference.table, database
            ),
        )
        .map_err(|err| err.at(reference.range))?;

        tracing::trace!("Resolved table {}.{}", database, name);
        self.source
            .table(&database, &name)
            .cloned()
            .ok_or_else(|| QueryError::new(not_found, reference.range))
    }

    /// Pair every row of `left` with every row of `right`, keeping the pairs
    /// for which `on` is truthy. Unmatched rows of a kept side follow the
    /// matches, padded with nulls.
    pub(crate) fn join_tables(
        &self,
        left: Table,
        right: Table,
        keep_left: bool,
        keep_right: bool,
        on: Option<&Expr>,
    ) -> QueryResult<Table> {
        let (left_fields, left_rows) = left.into_parts();
        let (right_fields, right_rows) = right.into_parts();
        let fields: Vec<_> = left_fields.iter().chain(&right_fields).cloned().collect();

        let mut rows: Vec<Row> = Vec::new();
        let mut left_matched = vec![false; left_rows.len()];
        let mut right_matched = vec![false; right_rows.len()];

        for (i, left_row) in left_rows.iter().enumerate() {
            for (j, right_row) in right_rows.iter().enumerate() {
                let row: Row = left_row.iter().chain(right_row).cloned().collect();
                let keep = match on {
                    Some(on) => self.value_of(on, &Scope::row(&fields, &row))?.is_truthy(),
                    None => true,
                };
                if keep {
                    left_matched[i] = true;
                    right_matched[j] = true;
                    rows.push(row);
                }
            }
        }

        if keep_left {
            for (left_row, _) in left_rows
                .iter()
                .zip(&left_matched)
                .filter(|(_, matched)| !**matched)
            {
                let mut row = left_row.clone();
                row.resize(fields.len(), Value::Null);
                rows.push(row);
            }
        }

        if keep_right {
            for (right_row, _) in right_rows
                .iter()
                .zip(&right_matched)
                .filter(|(_, matched)| !**matched)
            {
                let mut row = vec![Value::Null; left_fields.len()];
                row.extend(right_row.iter().cloned());
                rows.push(row);
            }
        }

        tracing::trace!("Join produced {} rows", rows.len());
        Ok(Table::from_parts(fields, rows))
    }
}

/// Combine the rows of two tables with `UNION`, `INTERSECT` or `EXCEPT`.
/// Rows compare as whole tuples; without `ALL` duplicates are removed.
pub(crate) fn combine_tables(
    op: CompoundOperator,
    all: bool,
    left: Table,
    right: Table,
    range: SourceRange,
) -> QueryResult<Table> {
    if left.fields().len() != right.fields().len() {
        return Err(QueryError::new(
            "expected two tables with the same number of fields",
            range,
        ));
    }

    let (fields, left_rows) = left.into_parts();
    let right_rows = right.into_rows();

    let rows: Vec<Row> = match op {
        CompoundOperator::Union => left_rows.into_iter().chain(right_rows).collect(),
        CompoundOperator::Intersect | CompoundOperator::Except => {
            let right_keys: HashSet<Vec<ValueKey>> =
                right_rows.iter().map(|row| row_key(row)).collect();
            let keep_present = op == CompoundOperator::Intersect;
            left_rows
                .into_iter()
                .filter(|row| right_keys.contains(&row_key(row)) == keep_present)
                .collect()
        }
    };

    let rows = if all { rows } else { remove_duplicate_rows(rows) };
    Ok(Table::from_parts(fields, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{FieldDescriptor, FieldType};

    fn table(name: &str, values: &[f64]) -> Table {
        let mut table = Table::new();
        table.add_field(FieldDescriptor::new("db", name, "n", FieldType::Number));
        for value in values {
            table.add_row(vec![Value::Number(*value)]);
        }
        table
    }

    fn numbers(table: &Table) -> Vec<f64> {
        table
            .rows()
            .iter()
            .map(|row| row[0].to_number())
            .collect()
    }

    #[test]
    fn test_combine_tables() {
        let range = SourceRange::new(0, 1);
        let a = table("a", &[1.0, 2.0, 2.0, 3.0]);
        let b = table("b", &[2.0, 4.0]);

        let union = combine_tables(CompoundOperator::Union, false, a.clone(), b.clone(), range).unwrap();
        assert_eq!(numbers(&union), vec![1.0, 2.0, 3.0, 4.0]);

        let union_all = combine_tables(CompoundOperator::Union, true, a.clone(), b.clone(), range).unwrap();
        assert_eq!(numbers(&union_all), vec![1.0, 2.0, 2.0, 3.0, 2.0, 4.0]);

        let intersect = combine_tables(CompoundOperator::Intersect, false, a.clone(), b.clone(), range).unwrap();
        assert_eq!(numbers(&intersect), vec![2.0]);

        let except_all = combine_tables(CompoundOperator::Except, true, a, b, range).unwrap();
        assert_eq!(numbers(&except_all), vec![1.0, 3.0]);
    }

    #[test]
    fn test_combine_field_count_mismatch() {
        let mut wide = table("a", &[]);
        wide.add_field(FieldDescriptor::new("db", "a", "m", FieldType::Number));
        let err = combine_tables(
            CompoundOperator::Union,
            false,
            wide,
            table("b", &[]),
            SourceRange::new(3, 8),
        )
        .unwrap_err();
        assert_eq!(err.message, "expected two tables with the same number of fields");
        assert_eq!(err.range, SourceRange::new(3, 8));
    }
}
