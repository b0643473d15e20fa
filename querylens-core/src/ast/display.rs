//! Canonical text form of the AST.
//!
//! Expressions are printed fully parenthesized so that the tree structure is
//! visible; re-parsing the output yields an equivalent tree.

use std::fmt::{self, Display, Formatter};

use super::*;
use crate::value::Value;

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || matches!(c, 'ä' | 'ö' | 'ü'))
        && !name.chars().all(|c| c.is_ascii_digit())
}

fn write_identifier(f: &mut Formatter<'_>, name: &str) -> fmt::Result {
    if is_plain_identifier(name) {
        f.write_str(name)
    } else {
        write!(f, "[{}]", name)
    }
}

fn write_string(f: &mut Formatter<'_>, text: &str) -> fmt::Result {
    if text.contains('\'') {
        write!(f, "\"{}\"", text)
    } else {
        write!(f, "'{}'", text)
    }
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.debug {
            f.write_str("debug ")?;
        }
        match &self.kind {
            StatementKind::Query(query) => write!(f, "{}", query),
            StatementKind::Load { name } => {
                f.write_str("load ")?;
                write_identifier(f, name)
            }
            StatementKind::Command(command) => f.write_str(command.keyword()),
        }
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)?;
        if let Some(order_by) = &self.order_by {
            f.write_str(" order by ")?;
            write_list(f, &order_by.terms)?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " limit {}", limit.expr)?;
        }
        Ok(())
    }
}

impl Display for OrderTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        match self.direction {
            Some(SortDirection::Asc) => f.write_str(" asc"),
            Some(SortDirection::Desc) => f.write_str(" desc"),
            None => Ok(()),
        }
    }
}

impl Display for SelectBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(select) => write!(f, "{}", select),
            Self::Compound(compound) => write!(f, "{}", compound),
            Self::Nested(query) => write!(f, "({})", query),
        }
    }
}

impl Display for CompoundOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Union => "union",
            Self::Intersect => "intersect",
            Self::Except => "except",
        })
    }
}

impl Display for CompoundQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.left, self.op)?;
        if self.all {
            f.write_str(" all")?;
        }
        write!(f, " {}", self.right)
    }
}

impl Display for SelectQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("select ")?;
        if self.distinct {
            f.write_str("distinct ")?;
        }
        write_list(f, &self.selectors)?;
        if let Some(from) = &self.from {
            f.write_str(" from ")?;
            write_list(f, from)?;
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " where {}", where_clause)?;
        }
        if let Some(group_by) = &self.group_by {
            f.write_str(" group by ")?;
            write_list(f, group_by)?;
        }
        if let Some(having) = &self.having {
            write!(f, " having {}", having)?;
        }
        Ok(())
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard { table: None, .. } => f.write_str("*"),
            Self::Wildcard {
                table: Some(table), ..
            } => {
                write_identifier(f, table)?;
                f.write_str(".*")
            }
            Self::Field(selector) => {
                write!(f, "{}", selector.expr)?;
                if let Some(alias) = &selector.alias {
                    f.write_str(" as ")?;
                    write_identifier(f, alias)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for FieldRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(database) = &self.database {
            write_identifier(f, database)?;
            f.write_str(".")?;
        }
        if let Some(table) = &self.table {
            write_identifier(f, table)?;
            f.write_str(".")?;
        }
        match &self.field {
            Some(field) => write_identifier(f, field),
            None => f.write_str("*"),
        }
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(database) = &self.database {
            write_identifier(f, database)?;
            f.write_str(".")?;
        }
        write_identifier(f, &self.table)
    }
}

impl Display for TableSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(single) => write!(f, "{}", single),
            Self::Joined(joined) => {
                write!(f, "{} {} {}", joined.left, joined.kind, joined.right)?;
                if let Some(on) = &joined.on {
                    write!(f, " on {}", on)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for SingleTableSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.source {
            TableSource::Table(table) => write!(f, "{}", table)?,
            TableSource::Query(query) => write!(f, "({})", query)?,
            TableSource::Nested(selector) => write!(f, "({})", selector)?,
        }
        if let Some(alias) = &self.alias {
            f.write_str(" as ")?;
            write_identifier(f, alias)?;
        }
        Ok(())
    }
}

impl Display for JoinKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inner => "join",
            Self::Left => "left join",
            Self::Right => "right join",
            Self::Full => "full join",
        })
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", Value::Number(*n)),
            Self::String(s) => write_string(f, s),
        }
    }
}

impl Display for ValueSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(query) => write!(f, "({})", query),
            Self::List(list) => {
                f.write_str("(")?;
                write_list(f, &list.values)?;
                f.write_str(")")
            }
        }
    }
}

impl Display for FunctionArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.distinct {
            f.write_str("distinct ")?;
        }
        write!(f, "{}", self.expr)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(literal) => write!(f, "{}", literal),
            ExprKind::Field(field) => write!(f, "{}", field),
            ExprKind::Subquery(query) => write!(f, "({})", query),
            ExprKind::Unary { op, operand, .. } if op.is_postfix() => {
                write!(f, "({} {})", operand, op.symbol())
            }
            ExprKind::Unary { op, operand, .. } => match op {
                UnaryOperator::Not | UnaryOperator::Exists => {
                    write!(f, "({} {})", op.symbol(), operand)
                }
                _ => write!(f, "({}{})", op.symbol(), operand),
            },
            ExprKind::Binary {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op.symbol(), right),
            ExprKind::Between {
                negated,
                value,
                min,
                max,
                ..
            } => {
                let keyword = if *negated { "not between" } else { "between" };
                write!(f, "({} {} {} and {})", value, keyword, min, max)
            }
            ExprKind::In { value, source, .. } => write!(f, "({} in {})", value, source),
            ExprKind::Quantified {
                value,
                op,
                all,
                source,
                ..
            } => {
                let quantifier = if *all { "all" } else { "any" };
                write!(f, "({} {} {} {})", value, op.symbol(), quantifier, source)
            }
            ExprKind::Call(call) => {
                match &call.callee {
                    Callee::Scalar(name) => write!(f, "{}", name)?,
                    Callee::Aggregate { function, .. } => f.write_str(function.name())?,
                }
                f.write_str("(")?;
                write_list(f, &call.args)?;
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{parse, parse_expression};

    fn canonical(text: &str) -> String {
        parse_expression(text).unwrap().to_string()
    }

    #[test]
    fn test_expression_is_fully_parenthesized() {
        assert_eq!(canonical("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(canonical("not a = 1 and b"), "((not (a = 1)) and b)");
        assert_eq!(canonical("x is not null"), "(x is not null)");
        assert_eq!(canonical("-x"), "(-x)");
    }

    #[test]
    fn test_special_forms() {
        assert_eq!(canonical("a between 1 and 2"), "(a between 1 and 2)");
        assert_eq!(canonical("a in (1, 'b')"), "(a in (1, 'b'))");
        assert_eq!(canonical("count(distinct a)"), "count(distinct a)");
        assert_eq!(canonical("count(*)"), "count(*)");
    }

    #[test]
    fn test_identifiers_are_bracketed_when_needed() {
        assert_eq!(canonical("[first name]"), "[first name]");
        assert_eq!(canonical("t.[x y]"), "t.[x y]");
    }

    #[test]
    fn test_canonical_form_reparses_to_same_text() {
        let statement = parse("select a, b as c from t left join u on t.id = u.id where a > 1 order by a desc limit 3").unwrap();
        let text = statement.to_string();
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed.to_string(), text);
    }
}
