//! The per-query pipeline.
//!
//! A select runs its clauses in a fixed order: from, where, group by and
//! having, select, distinct. The enclosing query then applies order by and
//! limit and strips the qualifiers from the result fields.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

use once_cell::unsync::OnceCell;

use super::evaluate::Scope;
use super::helpers::compare_for_sort;
use super::tables::combine_tables;
use super::{DataSource, QueryExecutor};
use crate::ast::*;
use crate::error::{QueryError, QueryResult};
use crate::table::{find_every_field_index, find_field_index, FieldDescriptor, Row, Table};
use crate::value::{Value, ValueKey};

/// A row the select clause sees, with the group it stands for.
struct VisibleRow<'t> {
    row: &'t [Value],
    group: &'t [Row],
}

impl<D: DataSource + ?Sized> QueryExecutor<'_, D> {
    /// Evaluate a query, reusing the result of an earlier evaluation of the
    /// same query in this run.
    pub(crate) fn run_query(&self, query: &Query) -> QueryResult<Table> {
        if let Some(table) = self.cache.borrow().get(&query.id) {
            tracing::trace!("Query {} served from cache", query.id);
            return Ok(table.clone());
        }

        let table = self.step("query", query.range, None, || self.evaluate_query(query))?;
        self.cache.borrow_mut().insert(query.id, table.clone());
        Ok(table)
    }

    fn evaluate_query(&self, query: &Query) -> QueryResult<Table> {
        let mut table = self.run_body(&query.body)?;

        if let Some(order_by) = &query.order_by {
            table = self.step("order by", order_by.range, Some(&table), || {
                self.order_by(&table, order_by)
            })?;
        }

        if let Some(limit) = &query.limit {
            table = self.step("limit", limit.range, Some(&table), || self.limit(&table, limit))?;
        }

        table.clear_qualifiers();
        Ok(table)
    }

    fn run_body(&self, body: &SelectBody) -> QueryResult<Table> {
        match body {
            SelectBody::Select(select) => self.run_select(select),
            SelectBody::Nested(query) => self.run_query(query),
            SelectBody::Compound(compound) => {
                let left = self.run_body(&compound.left)?;
                let right = self.run_body(&compound.right)?;
                self.step(compound_step_name(compound.op), compound.range, None, || {
                    combine_tables(compound.op, compound.all, left, right, compound.range)
                })
            }
        }
    }

    fn run_select(&self, select: &SelectQuery) -> QueryResult<Table> {
        tracing::debug!("Running select at {}..{}", select.range.start, select.range.end);

        let mut source = Table::seed();
        if let Some(from) = &select.from {
            let range = from
                .first()
                .zip(from.last())
                .map(|(first, last)| SourceRange::new(first.range().start, last.range().end))
                .unwrap_or(select.range);
            source = self.step("from", range, None, || self.from(from))?;
        }

        if let Some(predicate) = &select.where_clause {
            source = self.step("where", predicate.range, Some(&source), || {
                self.filter(&source, predicate)
            })?;
        }

        let aggregate = select.group_by.is_some()
            || select.selectors.iter().any(Selector::contains_aggregate);

        let mut groups = match &select.group_by {
            Some(keys) => self.group_by(&source, keys)?,
            None => vec![source.rows().to_vec()],
        };

        if let Some(having) = &select.having {
            groups = self.having(source.fields(), groups, having)?;
        }

        let visible: Vec<VisibleRow> = groups
            .iter()
            .flat_map(|group| {
                let count = if aggregate { 1 } else { group.len() };
                group.iter().take(count).map(move |row| VisibleRow {
                    row: row.as_slice(),
                    group: group.as_slice(),
                })
            })
            .collect();

        let mut result = self.step("select", select.range, Some(&source), || {
            self.project(select, source.fields(), &visible)
        })?;

        if select.distinct {
            result = self.step("distinct", select.range, Some(&result), || {
                let mut distinct = result.clone();
                distinct.remove_duplicate_rows();
                Ok(distinct)
            })?;
        }

        Ok(result)
    }

    /// Cross join every table of the `FROM` list, left to right.
    fn from(&self, selectors: &[TableSelector]) -> QueryResult<Table> {
        let mut table = Table::seed();
        for selector in selectors {
            let next = self.value_of_table(selector)?;
            table = self.join_tables(table, next, false, false, None)?;
        }
        Ok(table)
    }

    /// Keep the rows whose predicate is truthy. The predicate is evaluated
    /// for every row before any row is dropped.
    fn filter(&self, table: &Table, predicate: &Expr) -> QueryResult<Table> {
        let fields = table.fields();
        let keep = table
            .rows()
            .iter()
            .map(|row| {
                self.value_of(predicate, &Scope::row(fields, row))
                    .map(|value| value.is_truthy())
            })
            .collect::<QueryResult<Vec<bool>>>()?;

        let rows = table
            .rows()
            .iter()
            .zip(keep)
            .filter(|(_, keep)| *keep)
            .map(|(row, _)| row.clone())
            .collect();
        Ok(Table::from_parts(fields.to_vec(), rows))
    }

    /// Split rows into groups of equal key tuples, in order of first
    /// appearance.
    fn group_by(&self, table: &Table, keys: &[Expr]) -> QueryResult<Vec<Vec<Row>>> {
        let fields = table.fields();
        let mut groups: Vec<Vec<Row>> = Vec::new();
        let mut index_of: HashMap<Vec<ValueKey>, usize> = HashMap::new();

        for row in table.rows() {
            let scope = Scope::row(fields, row);
            let key = keys
                .iter()
                .map(|expr| self.value_of(expr, &scope).map(|value| value.key()))
                .collect::<QueryResult<Vec<_>>>()?;

            match index_of.get(&key) {
                Some(&index) => groups[index].push(row.clone()),
                None => {
                    index_of.insert(key, groups.len());
                    groups.push(vec![row.clone()]);
                }
            }
        }

        tracing::debug!("Grouped {} rows into {} groups", table.row_count(), groups.len());
        Ok(groups)
    }

    /// Keep the groups whose `HAVING` predicate is truthy. The predicate sees
    /// the first row of the group and aggregates over all of it.
    fn having(
        &self,
        fields: &[FieldDescriptor],
        groups: Vec<Vec<Row>>,
        having: &Expr,
    ) -> QueryResult<Vec<Vec<Row>>> {
        let mut kept = Vec::with_capacity(groups.len());
        for group in groups {
            let scope = Scope::group(fields, group.first().map(Vec::as_slice), &group);
            if self.value_of(having, &scope)?.is_truthy() {
                kept.push(group);
            }
        }
        Ok(kept)
    }

    fn project(
        &self,
        select: &SelectQuery,
        fields: &[FieldDescriptor],
        visible: &[VisibleRow],
    ) -> QueryResult<Table> {
        let mut result = Table::new();
        let copy_column = |result: &mut Table, index: usize, alias: Option<&String>| {
            let field = fields[index].clone();
            let alias = alias.cloned().or_else(|| field.alias.clone());
            let values = visible
                .iter()
                .map(|visible| visible.row.get(index).cloned().unwrap_or(Value::Null))
                .collect();
            result.add_column(field.with_alias(alias), values);
        };

        for selector in &select.selectors {
            match selector {
                Selector::Wildcard { table, range } => {
                    let reference = FieldRef::wildcard(table.clone(), *range);
                    for index in find_every_field_index(fields, &reference)? {
                        copy_column(&mut result, index, None);
                    }
                }
                Selector::Field(selector) => {
                    if let ExprKind::Field(reference) = &selector.expr.kind {
                        let index = find_field_index(fields, reference)?;
                        copy_column(&mut result, index, selector.alias.as_ref());
                        continue;
                    }

                    let values = visible
                        .iter()
                        .map(|visible| {
                            let scope = Scope::group(fields, Some(visible.row), visible.group);
                            self.value_of(&selector.expr, &scope)
                        })
                        .collect::<QueryResult<Vec<_>>>()?;
                    let alias = selector.alias.clone().unwrap_or_else(|| selector.label.clone());
                    result.add_column(FieldDescriptor::computed(alias), values);
                }
            }
        }

        Ok(result)
    }

    /// Stable sort by the order terms. Each key is computed at most once per
    /// row, on first comparison.
    fn order_by(&self, table: &Table, order_by: &OrderBy) -> QueryResult<Table> {
        let fields = table.fields();
        let rows = table.rows();
        let keys: Vec<Vec<OnceCell<Value>>> = rows
            .iter()
            .map(|_| order_by.terms.iter().map(|_| OnceCell::new()).collect())
            .collect();
        let failure: RefCell<Option<QueryError>> = RefCell::new(None);

        let key = |row: usize, term: usize| {
            keys[row][term]
                .get_or_try_init(|| {
                    self.value_of(&order_by.terms[term].expr, &Scope::row(fields, &rows[row]))
                })
                .map_err(|err| {
                    failure.borrow_mut().get_or_insert(err);
                })
                .ok()
        };

        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| {
            for (term_index, term) in order_by.terms.iter().enumerate() {
                let (Some(left), Some(right)) = (key(a, term_index), key(b, term_index)) else {
                    return Ordering::Equal;
                };
                let ordering = compare_for_sort(left, right);
                let ordering = if term.is_descending() {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        if let Some(err) = failure.into_inner() {
            return Err(err);
        }

        let sorted = order.into_iter().map(|index| rows[index].clone()).collect();
        Ok(Table::from_parts(fields.to_vec(), sorted))
    }

    /// Keep the first N rows. The limit expression is evaluated once and
    /// can not refer to fields.
    fn limit(&self, table: &Table, limit: &Limit) -> QueryResult<Table> {
        let count = self.value_of(&limit.expr, &Scope::EMPTY)?.to_number();
        let rows = table
            .rows()
            .iter()
            .enumerate()
            .take_while(|(index, _)| (*index as f64) < count)
            .map(|(_, row)| row.clone())
            .collect();
        Ok(Table::from_parts(table.fields().to_vec(), rows))
    }
}

fn compound_step_name(op: CompoundOperator) -> &'static str {
    match op {
        CompoundOperator::Union => "union",
        CompoundOperator::Intersect => "intersect",
        CompoundOperator::Except => "except",
    }
}
