//! Statement and clause rules.
//!
//! - statements: `debug` prefix, `load <name>`, bare debug commands, queries
//! - compound queries: `UNION`, `INTERSECT`, `EXCEPT` with optional `ALL`
//! - `SELECT` lists, `FROM` with joins, `WHERE`, `GROUP BY` / `HAVING`
//! - `ORDER BY` and `LIMIT`
//! - field and table references, aliases

use super::Parser;
use crate::ast::*;
use crate::cursor::Pattern;
use crate::error::{QueryError, QueryResult};
use crate::lexer::TokenKind;

/// Join spellings and the join they denote.
const JOIN_OPERATORS: &[(&str, JoinKind)] = &[
    ("join", JoinKind::Inner),
    ("inner join", JoinKind::Inner),
    ("left join", JoinKind::Left),
    ("left outer join", JoinKind::Left),
    ("right join", JoinKind::Right),
    ("right outer join", JoinKind::Right),
    ("full join", JoinKind::Full),
    ("full outer join", JoinKind::Full),
];

const COMPOUND_OPERATORS: &[(&str, CompoundOperator)] = &[
    ("union", CompoundOperator::Union),
    ("intersect", CompoundOperator::Intersect),
    ("except", CompoundOperator::Except),
];

impl Parser<'_> {
    pub(super) fn parse_statement_kind(&mut self) -> QueryResult<Statement> {
        let start = self.start();
        let debug = self.cursor.next_if(&Pattern::text("debug")).is_some();

        let kind = if self
            .cursor
            .next_if(&Pattern::exact("load", TokenKind::Debug))
            .is_some()
        {
            StatementKind::Load {
                name: self.parse_identifier()?,
            }
        } else if let Some(token) = self.cursor.next_if(&Pattern::kind(TokenKind::Debug)) {
            let command = DebugCommand::from_keyword(token.text()).ok_or_else(|| {
                QueryError::new(format!("unexpected '{}'", token.raw), token.range)
            })?;
            StatementKind::Command(command)
        } else {
            StatementKind::Query(self.parse_query()?)
        };

        Ok(Statement {
            debug,
            kind,
            range: self.range_from(start),
        })
    }

    /// `select_body [ORDER BY ...] [LIMIT expr]`
    pub(crate) fn parse_query(&mut self) -> QueryResult<Query> {
        let start = self.start();
        let id = self.allocate_query_id();

        let body = self.parse_select_body()?;
        let order_by = self.optional(Self::parse_order_by)?;
        let limit = self.optional(Self::parse_limit)?;

        Ok(Query {
            id,
            body,
            order_by,
            limit,
            range: self.range_from(start),
        })
    }

    /// A single select followed by any number of compound operators, nested
    /// to the left.
    fn parse_select_body(&mut self) -> QueryResult<SelectBody> {
        let start = self.start();
        let mut body = self.parse_single_select()?;

        while let Some(op) = self.parse_compound_operator() {
            let all = self.cursor.next_if(&Pattern::text("all")).is_some();
            let right = self.parse_single_select()?;

            body = SelectBody::Compound(Box::new(CompoundQuery {
                op,
                all,
                left: body,
                right,
                range: self.range_from(start),
            }));
        }

        Ok(body)
    }

    fn parse_compound_operator(&mut self) -> Option<CompoundOperator> {
        COMPOUND_OPERATORS.iter().find_map(|&(keyword, op)| {
            self.cursor
                .next_if(&Pattern::keyword(keyword))
                .map(|_| op)
        })
    }

    fn parse_single_select(&mut self) -> QueryResult<SelectBody> {
        let start = self.start();

        if self.cursor.next_if(&Pattern::text("(")).is_some() {
            let query = self.parse_query()?;
            self.cursor
                .expect(&Pattern::text(")"), "expected closing parentheses")?;
            return Ok(SelectBody::Nested(Box::new(query)));
        }

        self.cursor
            .expect(&Pattern::keyword("select"), "expected select")?;
        self.cursor.next_if(&Pattern::text("all"));
        let distinct = self
            .cursor
            .next_if(&Pattern::keyword("distinct"))
            .is_some();
        let selectors = self.list_of(Self::parse_field_selector, false)?;

        let from = self.optional(Self::parse_from)?;
        let where_clause = self.optional(Self::parse_where)?;
        let (group_by, having) = match self.optional(Self::parse_group_by_and_having)? {
            Some((group_by, having)) => (Some(group_by), having),
            None => (None, None),
        };

        Ok(SelectBody::Select(Box::new(SelectQuery {
            distinct,
            selectors,
            from,
            where_clause,
            group_by,
            having,
            range: self.range_from(start),
        })))
    }

    /// `*`, `table.*` or `expr [[AS] alias]`
    fn parse_field_selector(&mut self) -> QueryResult<Selector> {
        let start = self.start();

        if self.cursor.next_if(&Pattern::text("*")).is_some() {
            return Ok(Selector::Wildcard {
                table: None,
                range: self.range_from(start),
            });
        }

        let table_wildcard = [
            Pattern::kind(TokenKind::Identifier),
            Pattern::text("."),
            Pattern::text("*"),
        ];
        if self.cursor.next_is_all(&table_wildcard) {
            let table = self.parse_identifier()?;
            self.cursor.advance()?;
            self.cursor.advance()?;
            return Ok(Selector::Wildcard {
                table: Some(table),
                range: self.range_from(start),
            });
        }

        let expr = self.parse_expression()?;
        let alias = self.optional(Self::parse_alias)?;
        let label = expr
            .range
            .slice(self.source)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Selector::Field(FieldSelector {
            expr,
            alias,
            label,
            range: self.range_from(start),
        }))
    }

    fn parse_from(&mut self) -> QueryResult<Vec<TableSelector>> {
        self.cursor.expect(&Pattern::keyword("from"), "expected from")?;
        self.list_of(Self::parse_table_selector, false)
    }

    /// A single table selector followed by any number of joins.
    fn parse_table_selector(&mut self) -> QueryResult<TableSelector> {
        let start = self.start();
        let mut selector = TableSelector::Single(self.parse_single_table_selector()?);

        while let Some(kind) = self.parse_join_operator() {
            let right = self.parse_single_table_selector()?;
            let on = if self.cursor.next_if(&Pattern::keyword("on")).is_some() {
                Some(self.parse_expression()?)
            } else {
                None
            };

            selector = TableSelector::Joined(JoinedTables {
                left: Box::new(selector),
                right: Box::new(right),
                kind,
                on,
                range: self.range_from(start),
            });
        }

        Ok(selector)
    }

    fn parse_join_operator(&mut self) -> Option<JoinKind> {
        JOIN_OPERATORS
            .iter()
            .find_map(|&(spelling, kind)| self.cursor.next_if(&Pattern::text(spelling)).map(|_| kind))
    }

    /// `table_ref`, `( query )` or `( table_selector )`, with an optional alias.
    fn parse_single_table_selector(&mut self) -> QueryResult<SingleTableSelector> {
        let start = self.start();

        let source = if self.cursor.next_if(&Pattern::text("(")).is_some() {
            let source = if self.cursor.next_is(&Pattern::keyword("select"), 0) {
                TableSource::Query(Box::new(self.parse_query()?))
            } else {
                TableSource::Nested(Box::new(self.parse_table_selector()?))
            };
            self.cursor
                .expect(&Pattern::text(")"), "expected closing parentheses")?;
            source
        } else {
            TableSource::Table(self.parse_table_ref()?)
        };

        let alias = self.optional(Self::parse_alias)?;

        Ok(SingleTableSelector {
            source,
            alias,
            range: self.range_from(start),
        })
    }

    fn parse_where(&mut self) -> QueryResult<Expr> {
        self.cursor.expect(&Pattern::keyword("where"), "expected where")?;
        self.parse_expression()
    }

    fn parse_group_by_and_having(&mut self) -> QueryResult<(Vec<Expr>, Option<Expr>)> {
        self.cursor
            .expect(&Pattern::keyword("group by"), "expected group by")?;
        let group_by = self.list_of(Self::parse_expression, false)?;
        let having = self.optional(Self::parse_having)?;
        Ok((group_by, having))
    }

    fn parse_having(&mut self) -> QueryResult<Expr> {
        self.cursor
            .expect(&Pattern::keyword("having"), "expected having")?;
        self.parse_expression()
    }

    fn parse_order_by(&mut self) -> QueryResult<OrderBy> {
        let start = self.start();
        self.cursor
            .expect(&Pattern::keyword("order by"), "expected order by")?;
        let terms = self.list_of(Self::parse_order_term, false)?;
        Ok(OrderBy {
            terms,
            range: self.range_from(start),
        })
    }

    fn parse_order_term(&mut self) -> QueryResult<OrderTerm> {
        let start = self.start();
        let expr = self.parse_expression()?;

        let direction = if self.cursor.next_if(&Pattern::keyword("asc")).is_some() {
            Some(SortDirection::Asc)
        } else if self.cursor.next_if(&Pattern::keyword("desc")).is_some() {
            Some(SortDirection::Desc)
        } else {
            None
        };

        Ok(OrderTerm {
            expr,
            direction,
            range: self.range_from(start),
        })
    }

    fn parse_limit(&mut self) -> QueryResult<Limit> {
        let start = self.start();
        self.cursor.expect(&Pattern::keyword("limit"), "expected limit")?;
        let expr = self.parse_expression()?;
        Ok(Limit {
            expr,
            range: self.range_from(start),
        })
    }

    pub(crate) fn parse_identifier(&mut self) -> QueryResult<String> {
        let token = self
            .cursor
            .expect(&Pattern::kind(TokenKind::Identifier), "expected identifier")?;
        Ok(token.text_value().unwrap_or_default().to_string())
    }

    /// Identifier or string literal.
    fn parse_name(&mut self) -> QueryResult<String> {
        let token = match self.cursor.next_if(&Pattern::kind(TokenKind::Identifier)) {
            Some(token) => token,
            None => self
                .cursor
                .expect(&Pattern::kind(TokenKind::String), "expected name")?,
        };
        Ok(token.text_value().unwrap_or_default().to_string())
    }

    fn parse_alias(&mut self) -> QueryResult<String> {
        self.cursor.next_if(&Pattern::text("as"));
        self.parse_name()
    }

    /// `field`, `table.field` or `database.table.field`
    pub(crate) fn parse_field_ref(&mut self) -> QueryResult<FieldRef> {
        let start = self.start();
        let mut parts = vec![self.parse_identifier()?];

        while parts.len() < 3 && self.cursor.next_if(&Pattern::text(".")).is_some() {
            parts.push(self.parse_identifier()?);
        }

        let field = parts.pop();
        let table = parts.pop();
        let database = parts.pop();

        Ok(FieldRef {
            database,
            table,
            field,
            range: self.range_from(start),
        })
    }

    /// `table` or `database.table`
    fn parse_table_ref(&mut self) -> QueryResult<TableRef> {
        let start = self.start();
        let first = self.parse_identifier()?;

        let (database, table) = if self.cursor.next_if(&Pattern::text(".")).is_some() {
            (Some(first), self.parse_identifier()?)
        } else {
            (None, first)
        };

        Ok(TableRef {
            database,
            table,
            range: self.range_from(start),
        })
    }
}
