//! Abstract syntax tree for query statements.
//!
//! Every node carries the [`SourceRange`] of the text its grammar rule
//! consumed, with trailing whitespace trimmed. Ranges are byte offsets into
//! the statement text.

mod display;

use serde::Serialize;

/// Half-open byte range `[start, end)` into the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width range at `offset`.
    pub fn empty_at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text covered by this range, or an empty string if it does not fit.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// Identity of a [`Query`] node within one parse, used by the result cache.
pub type QueryId = usize;

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// Leading `debug` keyword: collect an execution trace.
    pub debug: bool,
    pub kind: StatementKind,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StatementKind {
    Query(Query),
    /// `load <name>`: switch the active database.
    Load { name: String },
    /// Bare debug word handled by the embedding tool.
    Command(DebugCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugCommand {
    LoadNew,
    ClearCache,
    Save,
}

impl DebugCommand {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "load new" => Some(Self::LoadNew),
            "clear cache" => Some(Self::ClearCache),
            "save" => Some(Self::Save),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::LoadNew => "load new",
            Self::ClearCache => "clear cache",
            Self::Save => "save",
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub id: QueryId,
    pub body: SelectBody,
    pub order_by: Option<OrderBy>,
    pub limit: Option<Limit>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SelectBody {
    Select(Box<SelectQuery>),
    Compound(Box<CompoundQuery>),
    /// `( query )` used where a single select is expected.
    Nested(Box<Query>),
}

impl SelectBody {
    pub fn range(&self) -> SourceRange {
        match self {
            Self::Select(select) => select.range,
            Self::Compound(compound) => compound.range,
            Self::Nested(query) => query.range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundOperator {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundQuery {
    pub op: CompoundOperator,
    pub all: bool,
    pub left: SelectBody,
    pub right: SelectBody,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectQuery {
    pub distinct: bool,
    pub selectors: Vec<Selector>,
    pub from: Option<Vec<TableSelector>>,
    pub where_clause: Option<Expr>,
    pub group_by: Option<Vec<Expr>>,
    pub having: Option<Expr>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Selector {
    /// `*` or `table.*`
    Wildcard {
        table: Option<String>,
        range: SourceRange,
    },
    Field(FieldSelector),
}

impl Selector {
    pub fn range(&self) -> SourceRange {
        match self {
            Self::Wildcard { range, .. } => *range,
            Self::Field(selector) => selector.range,
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Wildcard { .. } => false,
            Self::Field(selector) => selector.expr.contains_aggregate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSelector {
    pub expr: Expr,
    pub alias: Option<String>,
    /// Source text of `expr` with whitespace runs collapsed, used as the
    /// column name when there is no alias.
    pub label: String,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBy {
    pub terms: Vec<OrderTerm>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderTerm {
    pub expr: Expr,
    pub direction: Option<SortDirection>,
    pub range: SourceRange,
}

impl OrderTerm {
    pub fn is_descending(&self) -> bool {
        self.direction == Some(SortDirection::Desc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Limit {
    pub expr: Expr,
    pub range: SourceRange,
}

// ============================================================================
// Names and tables
// ============================================================================

/// `field`, `table.field` or `database.table.field`. A missing `field`
/// means every field (`*`, `table.*`, `count(*)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRef {
    pub database: Option<String>,
    pub table: Option<String>,
    pub field: Option<String>,
    pub range: SourceRange,
}

impl FieldRef {
    pub fn named(field: impl Into<String>, range: SourceRange) -> Self {
        Self {
            database: None,
            table: None,
            field: Some(field.into()),
            range,
        }
    }

    pub fn wildcard(table: Option<String>, range: SourceRange) -> Self {
        Self {
            database: None,
            table,
            field: None,
            range,
        }
    }

    /// Dotted name used in error messages, `*` standing for a missing field.
    pub fn qualified_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(database) = &self.database {
            parts.push(database);
        }
        if let Some(table) = &self.table {
            parts.push(table);
        }
        parts.push(self.field.as_deref().unwrap_or("*"));
        parts.join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub database: Option<String>,
    pub table: String,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableSelector {
    Single(SingleTableSelector),
    Joined(JoinedTables),
}

impl TableSelector {
    pub fn range(&self) -> SourceRange {
        match self {
            Self::Single(single) => single.range,
            Self::Joined(joined) => joined.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleTableSelector {
    pub source: TableSource,
    pub alias: Option<String>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableSource {
    Table(TableRef),
    Query(Box<Query>),
    Nested(Box<TableSelector>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    /// Unmatched rows of the left table survive, padded with nulls.
    pub fn keeps_left(&self) -> bool {
        matches!(self, Self::Left | Self::Full)
    }

    /// Unmatched rows of the right table survive, padded with nulls.
    pub fn keeps_right(&self) -> bool {
        matches!(self, Self::Right | Self::Full)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedTables {
    pub left: Box<TableSelector>,
    pub right: Box<SingleTableSelector>,
    pub kind: JoinKind,
    pub on: Option<Expr>,
    pub range: SourceRange,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    Literal(Literal),
    Field(FieldRef),
    /// Scalar subquery, `( SELECT ... )`.
    Subquery(Box<Query>),
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
        token: SourceRange,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        token: SourceRange,
    },
    Between {
        negated: bool,
        value: Box<Expr>,
        min: Box<Expr>,
        max: Box<Expr>,
        token: SourceRange,
    },
    In {
        value: Box<Expr>,
        source: ValueSource,
        token: SourceRange,
    },
    /// `value <op> ANY|SOME|ALL (...)`
    Quantified {
        value: Box<Expr>,
        op: BinaryOperator,
        all: bool,
        source: ValueSource,
        token: SourceRange,
    },
    Call(FunctionCall),
}

impl Expr {
    pub fn new(kind: ExprKind, range: SourceRange) -> Self {
        Self { kind, range }
    }

    /// True if an aggregate call appears in this expression outside of
    /// nested subqueries.
    pub fn contains_aggregate(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Field(_) | ExprKind::Subquery(_) => false,
            ExprKind::Unary { operand, .. } => operand.contains_aggregate(),
            ExprKind::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            ExprKind::Between {
                value, min, max, ..
            } => value.contains_aggregate() || min.contains_aggregate() || max.contains_aggregate(),
            ExprKind::In { value, source, .. } | ExprKind::Quantified { value, source, .. } => {
                value.contains_aggregate() || source.contains_aggregate()
            }
            ExprKind::Call(call) => matches!(call.callee, Callee::Aggregate { .. }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Number(f64),
    String(String),
}

/// Right-hand side of `IN` and quantified comparisons.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValueSource {
    Query(Box<Query>),
    List(ValueList),
}

impl ValueSource {
    fn contains_aggregate(&self) -> bool {
        match self {
            Self::Query(_) => false,
            Self::List(list) => list.values.iter().any(Expr::contains_aggregate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueList {
    pub values: Vec<Expr>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub callee: Callee,
    pub args: Vec<FunctionArg>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Callee {
    /// Scalar function named by an identifier.
    Scalar(FieldRef),
    Aggregate {
        function: AggregateFunction,
        range: SourceRange,
    },
}

impl Callee {
    /// Lower-cased function name.
    pub fn name(&self) -> String {
        match self {
            Self::Scalar(name) => name.field.as_deref().unwrap_or_default().to_lowercase(),
            Self::Aggregate { function, .. } => function.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionArg {
    pub distinct: bool,
    pub expr: Expr,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Count,
    Avg,
    Sum,
    Min,
    Max,
    List,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "count" => Some(Self::Count),
            "avg" => Some(Self::Avg),
            "sum" => Some(Self::Sum),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "list" => Some(Self::List),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::List => "list",
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    BitNot,
    Plus,
    Minus,
    Not,
    Exists,
    IsNull,
    IsNotNull,
    IsTrue,
    IsNotTrue,
    IsFalse,
    IsNotFalse,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::BitNot => "~",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "not",
            Self::Exists => "exists",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
            Self::IsTrue => "is true",
            Self::IsNotTrue => "is not true",
            Self::IsFalse => "is false",
            Self::IsNotFalse => "is not false",
        }
    }

    /// Written after its operand (`x IS NULL`).
    pub fn is_postfix(&self) -> bool {
        matches!(
            self,
            Self::IsNull
                | Self::IsNotNull
                | Self::IsTrue
                | Self::IsNotTrue
                | Self::IsFalse
                | Self::IsNotFalse
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    BitXor,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Like,
    NotLike,
    And,
    Or,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}
