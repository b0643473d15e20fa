//! Query Parser Tests
//!
//! Properties of the lexer and parser over a set of representative
//! statements: lossless tokenizing, deterministic parsing and the canonical
//! printed form.

use querylens_core::{parse, parse_expression, Lexer, StatementKind};

const STATEMENTS: &[&str] = &[
    "select 1 + 2 * 3",
    "SELECT a FROM t WHERE b > 1 ORDER BY a DESC LIMIT 1",
    "select count(x), sum(x) from t group by y having count(x) > 1",
    "select * from a left join b on a.id = b.id",
    "select distinct t.* from musik.t as x, (select 1 as one) y",
    "select a from t union all select b from t except select c from u",
    "select list(distinct name, ';') from artists where name like 'D%'",
    "select a from t where a not between 1 and 3 or a in (select b from u)",
    "select a from t where a > all (1, 2) and exists (select 1)",
    "debug select [weird name] from t where x is not null",
    "load musik",
    "clear cache",
];

#[test]
fn test_lexing_is_lossless() {
    let inputs = STATEMENTS
        .iter()
        .copied()
        .chain(["", "  \n\t", "select 'unterminated", "§$ 12.5e3 ?? <>= !", "a--b"]);

    for input in inputs {
        let rebuilt: String = Lexer::new(input).map(|token| token.raw).collect();
        assert_eq!(rebuilt, input);
    }
}

#[test]
fn test_parsing_is_deterministic() {
    for source in STATEMENTS {
        let first = parse(source).unwrap_or_else(|err| panic!("{}: {}", source, err));
        let second = parse(source).unwrap();
        assert_eq!(first, second, "{}", source);
    }
}

#[test]
fn test_canonical_form_reparses_to_same_tree() {
    for source in STATEMENTS {
        let canonical = parse(source).unwrap().to_string();
        let reparsed = parse(&canonical).unwrap_or_else(|err| panic!("{}: {}", canonical, err));
        assert_eq!(reparsed.to_string(), canonical, "{}", source);
    }
}

#[test]
fn test_canonical_expressions() {
    let cases = [
        ("1 + 2 * 3", "(1 + (2 * 3))"),
        ("not not 1", "(not (not 1))"),
        ("a or b and c", "(a or (b and c))"),
        ("-a * b", "((-a) * b)"),
    ];
    for (source, expected) in cases {
        let expr = parse_expression(source).unwrap();
        assert_eq!(expr.to_string(), expected);
        assert_eq!(parse_expression(expected).unwrap().to_string(), expected);
    }
}

#[test]
fn test_statement_kinds() {
    assert!(matches!(parse("load musik").unwrap().kind, StatementKind::Load { .. }));
    assert!(matches!(parse("clear cache").unwrap().kind, StatementKind::Command(_)));
    assert!(parse("debug select 1").unwrap().debug);
}

#[test]
fn test_syntax_errors() {
    let err = parse("select 1 from").unwrap_err();
    assert_eq!((err.range.start, err.range.end), (13, 13));

    let err = parse("select 1 2").unwrap_err();
    assert_eq!(err.message, "expected end of input");
}
