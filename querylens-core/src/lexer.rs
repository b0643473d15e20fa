//! Tokenizer.
//!
//! The lexer walks the input trying an ordered list of rules at the current
//! offset; the first rule that matches wins. Multi-word keywords and
//! operators are tried longest first so that `is not null` beats `is`. The
//! last rule accepts any single character as [`TokenKind::Invalid`], so
//! lexing never fails and every byte of the input belongs to some token.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::ast::SourceRange;
use crate::cursor::Pattern;
use crate::operators::{KEYWORD_OPERATORS, SYMBOL_OPERATORS};

/// Words that structure a statement.
pub const KEYWORDS: &[&str] = &[
    "as",
    "asc",
    "desc",
    "distinct",
    "from",
    "full join",
    "outer join",
    "full outer join",
    "group by",
    "having",
    "inner join",
    "on",
    "join",
    "left join",
    "left outer join",
    "limit",
    "order by",
    "right join",
    "right outer join",
    "select",
    "union",
    "except",
    "intersect",
    "where",
    "in",
    "all",
    "any",
    "some",
];

pub const AGGREGATE_FUNCTIONS: &[&str] = &["count", "avg", "sum", "max", "min", "list"];

pub const DEBUG_WORDS: &[&str] = &["debug", "load new", "load", "clear cache", "save"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Whitespace,
    Debug,
    Keyword,
    Operator,
    Number,
    String,
    AggregateFunction,
    Identifier,
    Comma,
    Dot,
    Parenthesis,
    Semicolon,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TokenValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Text exactly as it appears in the input.
    pub raw: String,
    pub value: TokenValue,
    pub range: SourceRange,
}

impl Token {
    fn new(kind: TokenKind, raw: &str, range: SourceRange) -> Self {
        let value = match kind {
            TokenKind::Keyword | TokenKind::Operator => {
                TokenValue::Text(collapse_whitespace(&raw.to_lowercase()))
            }
            TokenKind::Number => TokenValue::Number(parse_number_literal(raw)),
            TokenKind::Identifier => {
                let unwrapped = raw
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .unwrap_or(raw);
                TokenValue::Text(unwrapped.to_string())
            }
            TokenKind::String => TokenValue::Text(raw[1..raw.len() - 1].to_string()),
            _ => TokenValue::Text(raw.to_lowercase()),
        };

        Self {
            kind,
            raw: raw.to_string(),
            value,
            range,
        }
    }

    /// Text the token is compared by: the normalized spelling for keywords,
    /// operators and debug words, the raw text otherwise.
    pub fn text(&self) -> &str {
        match (self.kind, &self.value) {
            (TokenKind::Keyword | TokenKind::Operator | TokenKind::Debug, TokenValue::Text(text)) => {
                text
            }
            _ => &self.raw,
        }
    }

    /// Normalized string value, if the token has one.
    pub fn text_value(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Text(text) => Some(text),
            TokenValue::Number(_) => None,
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self.value {
            TokenValue::Number(n) => Some(n),
            TokenValue::Text(_) => None,
        }
    }

    pub fn is(&self, pattern: &Pattern) -> bool {
        pattern.kind.map_or(true, |kind| kind == self.kind)
            && pattern
                .value
                .map_or(true, |value| strings_equal_ignore_case(value, self.text()))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_number_literal(raw: &str) -> f64 {
    let mut text = raw.to_string();
    if text.starts_with('.') {
        text.insert(0, '0');
    }
    if text.ends_with('.') {
        text.push('0');
    }
    text.parse().unwrap_or(f64::NAN)
}

/// Case-insensitive comparison that is position-sensitive: at every index
/// the two characters must be identical or differ by exactly the ASCII case
/// offset (0x20). Strings of different length never match.
pub fn strings_equal_ignore_case(a: &str, b: &str) -> bool {
    let mut left = a.chars();
    let mut right = b.chars();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) => {
                let distance = x as i64 - y as i64;
                if distance != 0 && distance != 0x20 && distance != -0x20 {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

struct Rule {
    kind: TokenKind,
    regex: Regex,
}

impl Rule {
    fn new(kind: TokenKind, pattern: &str) -> Self {
        Self {
            kind,
            regex: Regex::new(&format!(r"\A(?:{})", pattern)).expect("Invalid lexer rule"),
        }
    }
}

/// Alternation of words, longest first, with spaces matching any whitespace.
fn word_alternation<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    let mut words: Vec<&str> = words.into_iter().collect();
    words.sort_by_key(|word| std::cmp::Reverse(word.len()));
    words
        .iter()
        .map(|word| regex::escape(word).replace(' ', r"\s+?"))
        .collect::<Vec<_>>()
        .join("|")
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    let mut symbols: Vec<&str> = SYMBOL_OPERATORS.iter().map(|op| op.symbol).collect();
    symbols.sort_unstable();
    symbols.dedup();
    let keyword_operators = KEYWORD_OPERATORS.iter().map(|op| op.symbol);

    vec![
        Rule::new(
            TokenKind::Whitespace,
            r"\s+|(?:--|#)[^\n]*(?:\n|\z)|/\*(?s:.)*?\*/",
        ),
        Rule::new(
            TokenKind::Debug,
            r"(?i)(?-u:\b)(?:debug|load new|load|clear cache|save)(?-u:\b)",
        ),
        Rule::new(
            TokenKind::Keyword,
            &format!(r"(?i)(?-u:\b)(?:{})(?-u:\b)", word_alternation(KEYWORDS.iter().copied())),
        ),
        Rule::new(TokenKind::Operator, &word_alternation(symbols)),
        Rule::new(
            TokenKind::Operator,
            &format!(r"(?i)(?-u:\b)(?:{})(?-u:\b)", word_alternation(keyword_operators)),
        ),
        Rule::new(
            TokenKind::Number,
            r"[0-9]+\.[0-9]*|[0-9]*\.[0-9]+|[0-9]+",
        ),
        Rule::new(
            TokenKind::String,
            r"'[^\n\r\x{2028}\x{2029}]*?'|\x22[^\n\r\x{2028}\x{2029}]*?\x22",
        ),
        Rule::new(
            TokenKind::AggregateFunction,
            &format!(
                r"(?i)(?-u:\b)(?:{})(?-u:\b)",
                word_alternation(AGGREGATE_FUNCTIONS.iter().copied())
            ),
        ),
        Rule::new(
            TokenKind::Identifier,
            r"[A-Za-z0-9_äöü]+|\[[^\n\r\x{2028}\x{2029}]*?\]",
        ),
        Rule::new(TokenKind::Comma, ","),
        Rule::new(TokenKind::Dot, r"\."),
        Rule::new(TokenKind::Parenthesis, r"[()]"),
        Rule::new(TokenKind::Semicolon, ";"),
        Rule::new(TokenKind::Invalid, r"(?s:.)"),
    ]
});

/// Lossless token stream, whitespace and comments included.
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, offset: 0 }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let rest = self.source.get(self.offset..)?;
        if rest.is_empty() {
            return None;
        }

        let (kind, len) = RULES.iter().find_map(|rule| {
            rule.regex
                .find(rest)
                .filter(|m| !m.is_empty())
                .map(|m| (rule.kind, m.end()))
        })?;

        let range = SourceRange::new(self.offset, self.offset + len);
        self.offset += len;
        Some(Token::new(kind, &rest[..len], range))
    }
}

/// Tokens of `source` without whitespace and comments.
pub fn tokenize(source: &str) -> Vec<Token> {
    let tokens: Vec<Token> = Lexer::new(source)
        .filter(|token| token.kind != TokenKind::Whitespace)
        .collect();
    tracing::trace!("Tokenized {} bytes into {} tokens", source.len(), tokens.len());
    tokens
}
