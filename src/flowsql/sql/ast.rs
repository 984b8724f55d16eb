/*!
# Streaming SQL Abstract Syntax Tree (AST)

This module defines the query node types consumed by the semantic
analyzer. The AST is produced by an upstream parser (an external
collaborator) and covers the streaming SELECT surface: FROM with
optional JOIN, wildcard and single-column select items, WHERE,
GROUP BY, PARTITION BY, WINDOW, HAVING and LIMIT.

## Design

- **Immutable**: nodes are plain data; the analyzer never mutates them
- **Closed**: every node kind is an enum variant, so adding a kind
  forces a matching-arm update everywhere the nodes are visited
- **Composable**: expressions nest freely; the analyzer walks them
  depth-first
*/

use std::fmt;
use std::time::Duration;

/// Result materialization for streaming query output.
///
/// `Changes` emits a continuous stream of change events (push
/// semantics); `Final` emits point-in-time results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMaterialization {
    /// Emit changes as they occur (continuous/push)
    Changes,
    /// Emit finalized results only
    Final,
}

/// A parsed streaming SELECT query.
///
/// Clause order here mirrors the order the analyzer visits them:
/// FROM, SELECT, WHERE, GROUP BY, PARTITION BY, WINDOW, HAVING, LIMIT.
/// Later clauses may need schema context established by earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Items in the SELECT clause (wildcards or single columns)
    pub select_items: Vec<SelectItem>,
    /// FROM clause: a single aliased source or a two-way join
    pub from: Relation,
    /// Optional WHERE clause
    pub where_clause: Option<Expr>,
    /// Optional GROUP BY expressions
    pub group_by: Vec<Expr>,
    /// Optional PARTITION BY expression
    pub partition_by: Option<Expr>,
    /// Optional window specification
    pub window: Option<WindowSpec>,
    /// Optional HAVING clause
    pub having: Option<Expr>,
    /// Optional LIMIT row cap
    pub limit: Option<u64>,
    /// Streaming vs point-in-time result semantics
    pub result_materialization: ResultMaterialization,
    /// Whether this is a pull (point-in-time lookup) query
    pub pull_query: bool,
}

/// FROM clause relation: one source, or a join of exactly two.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// Single aliased source: `FROM orders o`
    Source(AliasedRelation),
    /// Two-way join: `FROM orders o JOIN customers c ON ...`
    Join(Join),
}

/// A named source with its query-scoped alias.
///
/// Parsers that allow omitting the alias fill it in with the source
/// name, so the analyzer always sees a concrete alias.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasedRelation {
    /// Catalog name of the source
    pub source_name: String,
    /// Alias the query refers to the source by
    pub alias: String,
}

/// JOIN node: type, both sides, the ON criteria, and an optional
/// within-window bound for stream-stream joins.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Syntactic join kind as written in the query
    pub kind: JoinKind,
    /// Left side of the join
    pub left: AliasedRelation,
    /// Right side of the join
    pub right: AliasedRelation,
    /// ON clause criteria
    pub criteria: Expr,
    /// Optional WITHIN window bound
    pub within: Option<JoinWindow>,
}

/// Syntactic join kinds the parser can produce.
///
/// The analyzer maps these onto a closed semantic set; kinds outside
/// that set are rejected during analysis, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Outer,
    Right,
    FullOuter,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Outer => "OUTER",
            JoinKind::Right => "RIGHT",
            JoinKind::FullOuter => "FULL OUTER",
        };
        write!(f, "{}", name)
    }
}

/// WITHIN bound for stream-stream joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinWindow {
    /// Time window for join matching
    pub time_window: Duration,
    /// Grace period for late arrivals
    pub grace_period: Option<Duration>,
}

/// Item in the SELECT clause.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// Wildcard selection, optionally qualified: `*` or `alias.*`
    AllColumns { source: Option<String> },
    /// Single expression with its output column name: `expr AS alias`.
    /// Parsers that allow omitting the alias derive one, so the
    /// analyzer always sees a concrete output name.
    SingleColumn { expr: Expr, alias: String },
}

/// Window specifications for streaming queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSpec {
    /// Fixed-size tumbling window
    Tumbling { size: Duration },
    /// Hopping window with advance interval
    Hopping { size: Duration, advance: Duration },
    /// Session window with inactivity gap
    Session { gap: Duration },
}

/// A reference to a column, optionally qualified by a source alias.
///
/// `Ord` is derived so reference sets iterate in a stable order; the
/// analysis output must not depend on hash iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnRef {
    /// Source alias qualifier, if written: `o.amount`
    pub source: Option<String>,
    /// Column name
    pub name: String,
}

impl ColumnRef {
    /// Unqualified reference: `amount`
    pub fn new(name: impl Into<String>) -> Self {
        ColumnRef {
            source: None,
            name: name.into(),
        }
    }

    /// Qualified reference: `o.amount`
    pub fn qualified(source: impl Into<String>, name: impl Into<String>) -> Self {
        ColumnRef {
            source: Some(source.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}.{}", source, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// SQL expressions for select items, filters and join criteria.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference, qualified or not
    Column(ColumnRef),
    /// Literal value
    Literal(LiteralValue),
    /// Binary operation: `expr op expr`
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Unary operation: `op expr`
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },
    /// Function call: `name(args...)`
    Function { name: String, args: Vec<Expr> },
    /// CASE expression
    Case {
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },
    /// BETWEEN: `expr BETWEEN low AND high`
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// List for IN operators: `(expr1, expr2, ...)`
    List(Vec<Expr>),
}

impl Expr {
    /// Shorthand for an unqualified column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    /// Shorthand for a qualified column reference.
    pub fn qualified_column(source: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::qualified(source, name))
    }

    /// Collect every column reference in this expression subtree.
    pub fn get_columns(&self) -> Vec<ColumnRef> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns(&self, out: &mut Vec<ColumnRef>) {
        match self {
            Expr::Column(column_ref) => out.push(column_ref.clone()),
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::UnaryOp { expr, .. } => expr.collect_columns(out),
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
            Expr::Case {
                when_clauses,
                else_clause,
            } => {
                for (condition, result) in when_clauses {
                    condition.collect_columns(out);
                    result.collect_columns(out);
                }
                if let Some(else_expr) = else_clause {
                    else_expr.collect_columns(out);
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.collect_columns(out);
                low.collect_columns(out);
                high.collect_columns(out);
            }
            Expr::List(items) => {
                for item in items {
                    item.collect_columns(out);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    /// Renders SQL-ish text for error messages; not a lossless
    /// round-trip of the parsed source.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(column_ref) => write!(f, "{}", column_ref),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expr::UnaryOp { op, expr } => match op {
                UnaryOperator::Not => write!(f, "(NOT {})", expr),
                UnaryOperator::Minus => write!(f, "(-{})", expr),
                UnaryOperator::Plus => write!(f, "(+{})", expr),
                UnaryOperator::IsNull => write!(f, "({} IS NULL)", expr),
                UnaryOperator::IsNotNull => write!(f, "({} IS NOT NULL)", expr),
            },
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Case {
                when_clauses,
                else_clause,
            } => {
                write!(f, "CASE")?;
                for (condition, result) in when_clauses {
                    write!(f, " WHEN {} THEN {}", condition, result)?;
                }
                if let Some(else_expr) = else_clause {
                    write!(f, " ELSE {}", else_expr)?;
                }
                write!(f, " END")
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "({} {}BETWEEN {} AND {})", expr, not, low, high)
            }
            Expr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Literal values in SQL
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    /// Time intervals: INTERVAL '5' MINUTE
    Interval { value: i64, unit: TimeUnit },
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => write!(f, "'{}'", s),
            LiteralValue::Integer(i) => write!(f, "{}", i),
            LiteralValue::Float(v) => write!(f, "{}", v),
            LiteralValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            LiteralValue::Null => write!(f, "NULL"),
            LiteralValue::Interval { value, unit } => {
                write!(f, "INTERVAL '{}' {:?}", value, unit)
            }
        }
    }
}

/// Time units for intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// Convert a value in this unit to a Duration
    pub fn to_duration(&self, value: i64) -> Duration {
        match self {
            TimeUnit::Millisecond => Duration::from_millis(value as u64),
            TimeUnit::Second => Duration::from_secs(value as u64),
            TimeUnit::Minute => Duration::from_secs(value as u64 * 60),
            TimeUnit::Hour => Duration::from_secs(value as u64 * 3600),
            TimeUnit::Day => Duration::from_secs(value as u64 * 86400),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Logical
    And,
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        write!(f, "{}", symbol)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
    IsNull,
    IsNotNull,
}

impl Relation {
    /// The sources of this relation in left-to-right order.
    pub fn sources(&self) -> Vec<&AliasedRelation> {
        match self {
            Relation::Source(relation) => vec![relation],
            Relation::Join(join) => vec![&join.left, &join.right],
        }
    }
}

impl WindowSpec {
    /// Window size, where the type has one (session windows do not).
    pub fn size(&self) -> Option<Duration> {
        match self {
            WindowSpec::Tumbling { size } => Some(*size),
            WindowSpec::Hopping { size, .. } => Some(*size),
            WindowSpec::Session { .. } => None,
        }
    }
}
