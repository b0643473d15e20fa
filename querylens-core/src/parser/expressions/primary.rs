//! Selector values: literals, field references and function calls,
//! optionally followed by `IN (...)` or a quantified comparison.

use crate::ast::*;
use crate::cursor::Pattern;
use crate::error::{QueryError, QueryResult};
use crate::lexer::TokenKind;
use crate::operators::{find_operator, OperatorKind, BINARY_SHAPES};
use crate::parser::Parser;

const QUANTIFIERS: &[&str] = &["any", "some", "all"];

impl Parser<'_> {
    pub(super) fn parse_selector_value(&mut self) -> QueryResult<Expr> {
        let start = self.start();

        let value = if let Some(token) = self.cursor.next_if(&Pattern::kind(TokenKind::Number)) {
            let number = token.number().unwrap_or(f64::NAN);
            Expr::new(ExprKind::Literal(Literal::Number(number)), token.range)
        } else if let Some(token) = self.cursor.next_if(&Pattern::kind(TokenKind::String)) {
            let text = token.text_value().unwrap_or_default().to_string();
            Expr::new(ExprKind::Literal(Literal::String(text)), token.range)
        } else if self.cursor.next_is(&Pattern::kind(TokenKind::Identifier), 0) {
            let field = self.parse_field_ref()?;
            if self.cursor.next_if(&Pattern::text("(")).is_some() {
                self.parse_call(Callee::Scalar(field), start)?
            } else {
                let range = field.range;
                Expr::new(ExprKind::Field(field), range)
            }
        } else if let Some(token) = self.cursor.next_if(&Pattern::kind(TokenKind::AggregateFunction)) {
            match AggregateFunction::from_name(&token.raw) {
                Some(function) if self.cursor.next_if(&Pattern::text("(")).is_some() => {
                    let callee = Callee::Aggregate {
                        function,
                        range: token.range,
                    };
                    self.parse_call(callee, start)?
                }
                // without arguments an aggregate name is an ordinary column
                _ => Expr::new(ExprKind::Field(FieldRef::named(token.raw, token.range)), token.range),
            }
        } else {
            return Err(self.cursor.error("expected selector value"));
        };

        self.parse_value_suffix(value, start)
    }

    /// Arguments after the opening parenthesis of a call: `*`,
    /// `DISTINCT *`, or a possibly empty list of `[DISTINCT] expr`.
    fn parse_call(&mut self, callee: Callee, start: usize) -> QueryResult<Expr> {
        let wildcard = self.cursor.next_is(&Pattern::text("*"), 0)
            || self
                .cursor
                .next_is_all(&[Pattern::keyword("distinct"), Pattern::text("*")]);

        let args = if wildcard {
            let arg_start = self.start();
            let distinct = self
                .cursor
                .next_if(&Pattern::keyword("distinct"))
                .is_some();
            let star = self.cursor.advance()?;
            vec![FunctionArg {
                distinct,
                expr: Expr::new(ExprKind::Field(FieldRef::wildcard(None, star.range)), star.range),
                range: self.range_from(arg_start),
            }]
        } else {
            self.list_of(Self::parse_function_argument, true)?
        };

        self.cursor
            .expect(&Pattern::text(")"), "expected closing parentheses")?;

        Ok(Expr::new(
            ExprKind::Call(FunctionCall { callee, args }),
            self.range_from(start),
        ))
    }

    fn parse_function_argument(&mut self) -> QueryResult<FunctionArg> {
        let start = self.start();
        let distinct = self
            .cursor
            .next_if(&Pattern::keyword("distinct"))
            .is_some();
        let expr = self.parse_expression()?;
        Ok(FunctionArg {
            distinct,
            expr,
            range: self.range_from(start),
        })
    }

    /// `value IN (...)` or `value <op> ANY|SOME|ALL (...)`
    fn parse_value_suffix(&mut self, value: Expr, start: usize) -> QueryResult<Expr> {
        if let Some(token) = self.cursor.next_if(&Pattern::keyword("in")) {
            let source = self.parse_query_or_value_list()?;
            return Ok(Expr::new(
                ExprKind::In {
                    value: Box::new(value),
                    source,
                    token: token.range,
                },
                self.range_from(start),
            ));
        }

        let quantified = QUANTIFIERS.iter().find_map(|&quantifier| {
            self.cursor.next_if_all(&[
                Pattern::kind(TokenKind::Operator),
                Pattern::keyword(quantifier),
            ])
        });
        let Some(tokens) = quantified else {
            return Ok(value);
        };
        let (operator, quantifier) = (&tokens[0], &tokens[1]);

        let op = match find_operator(operator.text(), BINARY_SHAPES).map(|op| op.kind) {
            Some(OperatorKind::Binary(op)) => op,
            _ => {
                return Err(QueryError::new(
                    "invalid operator in quantified comparison",
                    operator.range,
                ))
            }
        };
        let all = quantifier.text() == "all";
        let token = SourceRange::new(operator.range.start, quantifier.range.end);
        let source = self.parse_query_or_value_list()?;

        Ok(Expr::new(
            ExprKind::Quantified {
                value: Box::new(value),
                op,
                all,
                source,
                token,
            },
            self.range_from(start),
        ))
    }

    fn parse_query_or_value_list(&mut self) -> QueryResult<ValueSource> {
        let start = self.start();
        self.cursor
            .expect(&Pattern::text("("), "expected opening parentheses")?;

        if self.cursor.next_is(&Pattern::keyword("select"), 0) {
            let query = self.parse_query()?;
            self.cursor
                .expect(&Pattern::text(")"), "expected closing parentheses")?;
            return Ok(ValueSource::Query(Box::new(query)));
        }

        let values = self.list_of(Self::parse_expression, true)?;
        self.cursor
            .expect(&Pattern::text(")"), "expected closing parentheses")?;

        Ok(ValueSource::List(ValueList {
            values,
            range: self.range_from(start),
        }))
    }
}
