//! Unit tests for the query parser.

use super::*;
use crate::ast::*;
use crate::error::QueryError;

fn query(source: &str) -> Query {
    match parse(source).unwrap().kind {
        StatementKind::Query(query) => query,
        other => panic!("expected query, got {:?}", other),
    }
}

fn select(source: &str) -> SelectQuery {
    match query(source).body {
        SelectBody::Select(select) => *select,
        other => panic!("expected select, got {:?}", other),
    }
}

fn error(source: &str) -> QueryError {
    parse(source).unwrap_err()
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_parse_simple_select() {
    let select = select("SELECT a, b FROM t");
    assert_eq!(select.selectors.len(), 2);
    assert!(select.from.is_some());
    assert!(select.where_clause.is_none());
}

#[test]
fn test_optional_is_absent_only_when_nothing_consumed() {
    let mut parser = Parser::new("select a");
    let start = parser.cursor.position();
    let absent = parser
        .optional(|p| p.cursor.expect(&Pattern::text("order"), "expected order"))
        .unwrap();
    assert!(absent.is_none());
    assert_eq!(parser.cursor.position(), start);

    let err = parser
        .optional(|p| {
            p.cursor.advance()?;
            p.cursor.expect(&Pattern::text("order"), "expected order")
        })
        .unwrap_err();
    assert_eq!(err.message, "expected order");
    assert_eq!(parser.cursor.position(), start + 1);

    assert!(parse("select a from t order by").is_err());
}

#[test]
fn test_trailing_semicolon() {
    assert!(parse("select 1;").is_ok());

    let err = error("select 1;;");
    assert_eq!(err.message, "expected end of input");
}

#[test]
fn test_trailing_tokens_rejected() {
    let err = error("select a from t t2 t3");
    assert_eq!(err.message, "expected end of input");
    assert_eq!(err.range, SourceRange::new(19, 21));
}

#[test]
fn test_debug_prefix() {
    let statement = parse("DEBUG select 1").unwrap();
    assert!(statement.debug);
    assert!(matches!(statement.kind, StatementKind::Query(_)));
}

#[test]
fn test_load_statement() {
    let statement = parse("load filme").unwrap();
    assert!(!statement.debug);
    assert_eq!(
        statement.kind,
        StatementKind::Load {
            name: "filme".to_string()
        }
    );

    let err = error("load 'x'");
    assert_eq!(err.message, "expected identifier");
}

#[test]
fn test_debug_commands() {
    let kind = |source: &str| parse(source).unwrap().kind;
    assert_eq!(kind("load new"), StatementKind::Command(DebugCommand::LoadNew));
    assert_eq!(kind("clear cache"), StatementKind::Command(DebugCommand::ClearCache));
    assert_eq!(kind("debug save"), StatementKind::Command(DebugCommand::Save));
}

#[test]
fn test_empty_input() {
    let err = error("");
    assert_eq!(err.message, "expected select");
}

// ============================================================================
// Select lists
// ============================================================================

#[test]
fn test_wildcards() {
    let select = select("select *, t.* from t");
    assert!(matches!(&select.selectors[0], Selector::Wildcard { table: None, .. }));
    assert!(matches!(
        &select.selectors[1],
        Selector::Wildcard { table: Some(t), .. } if t == "t"
    ));
}

#[test]
fn test_aliases_and_labels() {
    let select = select("select a  +  1 as total, b c, 'x' \"quoted name\", d from t");
    let Selector::Field(first) = &select.selectors[0] else {
        panic!("expected field selector");
    };
    assert_eq!(first.alias.as_deref(), Some("total"));
    assert_eq!(first.label, "a + 1");

    let Selector::Field(second) = &select.selectors[1] else {
        panic!("expected field selector");
    };
    assert_eq!(second.alias.as_deref(), Some("c"));

    let Selector::Field(third) = &select.selectors[2] else {
        panic!("expected field selector");
    };
    assert_eq!(third.alias.as_deref(), Some("quoted name"));
}

#[test]
fn test_trailing_comma_in_select_list() {
    let select = select("select a, b, from t");
    assert_eq!(select.selectors.len(), 2);
}

#[test]
fn test_select_all_and_distinct() {
    assert!(!select("select all a from t").distinct);
    assert!(select("select distinct a from t").distinct);
}

#[test]
fn test_field_reference_parts() {
    let select = select("select db.t.f, t.g, h from t");
    let refs: Vec<FieldRef> = select
        .selectors
        .iter()
        .map(|selector| match selector {
            Selector::Field(FieldSelector {
                expr: Expr {
                    kind: ExprKind::Field(field),
                    ..
                },
                ..
            }) => field.clone(),
            other => panic!("expected field, got {:?}", other),
        })
        .collect();

    assert_eq!(refs[0].database.as_deref(), Some("db"));
    assert_eq!(refs[0].table.as_deref(), Some("t"));
    assert_eq!(refs[0].field.as_deref(), Some("f"));
    assert_eq!(refs[1].table.as_deref(), Some("t"));
    assert_eq!(refs[2].qualified_name(), "h");
}

// ============================================================================
// FROM and joins
// ============================================================================

#[test]
fn test_join_spellings() {
    let kinds = [
        ("join", JoinKind::Inner),
        ("inner join", JoinKind::Inner),
        ("left join", JoinKind::Left),
        ("LEFT OUTER JOIN", JoinKind::Left),
        ("right join", JoinKind::Right),
        ("right outer join", JoinKind::Right),
        ("full join", JoinKind::Full),
        ("full   outer join", JoinKind::Full),
    ];

    for (spelling, expected) in kinds {
        let select = select(&format!("select * from a {} b on a.id = b.id", spelling));
        let from = select.from.unwrap();
        match &from[0] {
            TableSelector::Joined(joined) => {
                assert_eq!(joined.kind, expected, "{}", spelling);
                assert!(joined.on.is_some());
            }
            other => panic!("expected join for {}, got {:?}", spelling, other),
        }
    }
}

#[test]
fn test_joins_nest_to_the_left() {
    let select = select("select * from a join b join c");
    let from = select.from.unwrap();
    let TableSelector::Joined(outer) = &from[0] else {
        panic!("expected join");
    };
    assert!(matches!(outer.left.as_ref(), TableSelector::Joined(_)));
    assert!(outer.on.is_none());
}

#[test]
fn test_outer_join_alone_is_rejected() {
    let err = error("select * from a outer join b");
    assert_eq!(err.message, "expected end of input");
}

#[test]
fn test_from_subquery_and_alias() {
    let select = select("select * from (select 1 as x) sub, musik.lieder as l");
    let from = select.from.unwrap();
    assert_eq!(from.len(), 2);

    let TableSelector::Single(first) = &from[0] else {
        panic!("expected single table");
    };
    assert!(matches!(first.source, TableSource::Query(_)));
    assert_eq!(first.alias.as_deref(), Some("sub"));

    let TableSelector::Single(second) = &from[1] else {
        panic!("expected single table");
    };
    let TableSource::Table(table) = &second.source else {
        panic!("expected table");
    };
    assert_eq!(table.database.as_deref(), Some("musik"));
    assert_eq!(table.table, "lieder");
    assert_eq!(second.alias.as_deref(), Some("l"));
}

#[test]
fn test_unclosed_table_parenthesis() {
    let err = error("select * from (a join b");
    assert_eq!(err.message, "expected closing parentheses");
}

// ============================================================================
// Clauses
// ============================================================================

#[test]
fn test_group_by_having_order_limit() {
    let query = query("select a, count(*) from t group by a having count(*) > 1 order by a desc, 2 limit 5");
    let SelectBody::Select(select) = &query.body else {
        panic!("expected select");
    };
    assert_eq!(select.group_by.as_ref().map(Vec::len), Some(1));
    assert!(select.having.is_some());

    let order_by = query.order_by.unwrap();
    assert_eq!(order_by.terms.len(), 2);
    assert!(order_by.terms[0].is_descending());
    assert_eq!(order_by.terms[1].direction, None);
    assert!(query.limit.is_some());
}

#[test]
fn test_compound_queries_nest_to_the_left() {
    let query = query("select 1 union all select 2 except select 3");
    let SelectBody::Compound(outer) = &query.body else {
        panic!("expected compound");
    };
    assert_eq!(outer.op, CompoundOperator::Except);
    assert!(!outer.all);

    let SelectBody::Compound(inner) = &outer.left else {
        panic!("expected nested compound");
    };
    assert_eq!(inner.op, CompoundOperator::Union);
    assert!(inner.all);
}

#[test]
fn test_parenthesized_select_body() {
    let query = query("(select 1) union (select 2 order by 1) order by 1");
    assert!(query.order_by.is_some());
    let SelectBody::Compound(compound) = &query.body else {
        panic!("expected compound");
    };
    assert!(matches!(compound.left, SelectBody::Nested(_)));
    assert!(matches!(compound.right, SelectBody::Nested(_)));
}

#[test]
fn test_query_ids_are_unique() {
    let query = query("select (select 1) from (select 2) x where 1 in (select 3)");
    assert_eq!(query.id, 0);
    let text = format!("{:?}", query);
    for id in 1..=3 {
        assert!(text.contains(&format!("id: {}", id)), "missing id {}", id);
    }
}

// ============================================================================
// Expressions
// ============================================================================

fn expr(source: &str) -> Expr {
    parse_expression(source).unwrap()
}

#[test]
fn test_precedence() {
    assert_eq!(expr("1 + 2 * 3").to_string(), "(1 + (2 * 3))");
    assert_eq!(expr("1 - 2 - 3").to_string(), "((1 - 2) - 3)");
    assert_eq!(expr("a = 1 or b = 2 and c").to_string(), "((a = 1) or ((b = 2) and c))");
    assert_eq!(expr("not a and b").to_string(), "((not a) and b)");
    assert_eq!(expr("-2 * 3").to_string(), "((-2) * 3)");
    assert_eq!(expr("~1 + 1").to_string(), "((~1) + 1)");
}

#[test]
fn test_parentheses() {
    assert_eq!(expr("(1 + 2) * 3").to_string(), "((1 + 2) * 3)");
    assert_eq!(expr("((1))").to_string(), "1");
}

#[test]
fn test_unary_after_binary() {
    assert_eq!(expr("1 * -2").to_string(), "(1 * (-2))");
    assert_eq!(expr("a = not b").to_string(), "(a = (not b))");
    assert_eq!(expr("not not 1").to_string(), "(not (not 1))");
}

#[test]
fn test_postfix_operators() {
    assert_eq!(expr("a is null").to_string(), "(a is null)");
    assert_eq!(expr("a + 1 is not null").to_string(), "((a + 1) is not null)");
    assert_eq!(expr("a is true and b").to_string(), "((a is true) and b)");
}

#[test]
fn test_between() {
    let between = expr("x between 1 and 3");
    let ExprKind::Between {
        negated, min, max, ..
    } = &between.kind
    else {
        panic!("expected between");
    };
    assert!(!negated);
    assert_eq!(min.to_string(), "1");
    assert_eq!(max.to_string(), "3");

    assert_eq!(expr("x not between 1 and 3").to_string(), "(x not between 1 and 3)");
}

#[test]
fn test_invalid_between() {
    let err = parse_expression("x between 1").unwrap_err();
    assert_eq!(err.message, "invalid between syntax");
}

#[test]
fn test_in_and_quantified() {
    assert_eq!(expr("a in (1, 2,)").to_string(), "(a in (1, 2))");
    assert_eq!(expr("a in ()").to_string(), "(a in ())");
    assert_eq!(expr("a > all (1, 2)").to_string(), "(a > all (1, 2))");
    assert_eq!(expr("a = some (1)").to_string(), "(a = any (1))");
    assert!(matches!(
        expr("a in (select 1)").kind,
        ExprKind::In {
            source: ValueSource::Query(_),
            ..
        }
    ));
}

#[test]
fn test_quantified_requires_binary_operator() {
    let err = parse_expression("a between any (1)").unwrap_err();
    assert_eq!(err.message, "invalid operator in quantified comparison");
}

#[test]
fn test_function_calls() {
    let call = expr("pow(2, 3)");
    let ExprKind::Call(call) = &call.kind else {
        panic!("expected call");
    };
    assert_eq!(call.callee.name(), "pow");
    assert_eq!(call.args.len(), 2);

    assert_eq!(expr("random()").to_string(), "random()");
    assert_eq!(expr("COUNT(DISTINCT *)").to_string(), "count(distinct *)");
    assert_eq!(expr("list(name, ';')").to_string(), "list(name, ';')");
}

#[test]
fn test_bare_aggregate_name_is_field() {
    assert!(matches!(expr("count").kind, ExprKind::Field(_)));
}

#[test]
fn test_scalar_subquery() {
    let subquery = expr("(select max(x) from t) + 1");
    let ExprKind::Binary { left, .. } = &subquery.kind else {
        panic!("expected binary");
    };
    assert!(matches!(left.kind, ExprKind::Subquery(_)));
}

#[test]
fn test_expression_ranges() {
    let source = "  a +  b * 2  ";
    let tree = expr(source);
    assert_eq!(tree.range.slice(source), "a +  b * 2");

    let ExprKind::Binary { right, token, .. } = &tree.kind else {
        panic!("expected binary");
    };
    assert_eq!(right.range.slice(source), "b * 2");
    assert_eq!(token.slice(source), "+");
}

#[test]
fn test_expression_errors() {
    let cases = [
        ("1 +", "unexpected end of expression"),
        ("* 2", "invalid operator before value"),
        ("1 not 2", "invalid operator after value"),
        ("(1 + 2", "expected closing parentheses"),
        ("1 + )", "expected selector value"),
        ("f(1", "expected closing parentheses"),
        ("a in 1", "expected opening parentheses"),
        ("a.", "expected identifier"),
    ];

    for (source, message) in cases {
        let err = parse_expression(source).unwrap_err();
        assert_eq!(err.message, message, "for {:?}", source);
    }
}

#[test]
fn test_unclosed_parenthesis_before_keyword() {
    let err = error("select (1 + 2 from t");
    assert_eq!(err.message, "expected closing parentheses");
}

#[test]
fn test_error_range_at_end_of_input() {
    let err = parse_expression("1 +  ").unwrap_err();
    assert_eq!(err.range, SourceRange::new(3, 3));
}
