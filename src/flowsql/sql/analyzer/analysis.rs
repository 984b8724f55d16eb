//! The analysis record: the validated, enriched output of one
//! analyzer pass, consumed read-only by the downstream planner.
//!
//! An `Analysis` is built incrementally during a single traversal of
//! the query and handed off whole; it is never mutated afterwards and
//! owns no resources requiring release.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::flowsql::catalog::{DataSource, Topic};
use crate::flowsql::schema;
use crate::flowsql::serialization::SerdeOption;
use crate::flowsql::sql::ast::{ColumnRef, Expr, JoinWindow, ResultMaterialization, WindowSpec};
use crate::flowsql::sql::error::{AnalysisError, AnalysisResult};

use super::SinkProperties;

/// A catalog source with the alias the query binds it to.
/// Read-only view; the analyzer never mutates the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasedDataSource {
    pub alias: String,
    pub data_source: Arc<DataSource>,
}

/// One select item: an expression and its output column name.
/// Insertion order across the select list is the output column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpression {
    pub expression: Expr,
    pub alias: String,
}

/// Semantic join type. A closed set: syntactic kinds outside it are
/// rejected during join validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Outer,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Outer => "OUTER",
        };
        write!(f, "{}", name)
    }
}

/// Validated join information. The key expressions are normalized:
/// `left_key` always references the left source and `right_key` the
/// right one, regardless of how the user wrote the equality.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinInfo {
    pub left_key: Expr,
    pub right_key: Expr,
    pub join_type: JoinType,
    pub within: Option<JoinWindow>,
}

/// Resolved output sink: where the query writes its results.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkTarget {
    /// Sink (stream/table) name
    pub name: String,
    /// Whether the topic is to be created, or an existing target is
    /// being written into
    pub create_sink: bool,
    /// Fully resolved topic: name, key format, value format
    pub topic: Topic,
}

/// The structured output of semantic analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Streaming vs point-in-time result semantics
    pub result_materialization: ResultMaterialization,
    /// Whether the analyzed query is a pull (point-in-time) query
    pub pull_query: bool,
    /// Sources in FROM order: one entry, or two for a join
    pub from_sources: Vec<AliasedDataSource>,
    /// Select items in output column order
    pub select_items: Vec<SelectExpression>,
    /// Every column referenced anywhere in the select list; ordered
    /// set so downstream lineage checks are deterministic
    pub select_column_refs: BTreeSet<ColumnRef>,
    pub where_expression: Option<Expr>,
    /// Group-by expressions in first-seen order, duplicates dropped
    pub group_by_expressions: Vec<Expr>,
    pub partition_by: Option<Expr>,
    pub window_expression: Option<WindowSpec>,
    pub having_expression: Option<Expr>,
    pub limit: Option<u64>,
    /// Present iff the FROM clause was a join
    pub join_info: Option<JoinInfo>,
    /// Resolved output sink; populated only after sink resolution
    pub into: Option<SinkTarget>,
    /// Table-valued function calls in the select list, in order
    pub table_functions: Vec<Expr>,
    /// Effective serde options for the output
    pub serde_options: BTreeSet<SerdeOption>,
    /// Sink configuration carried through from the statement
    pub properties: SinkProperties,
}

impl Analysis {
    pub(crate) fn new(result_materialization: ResultMaterialization, pull_query: bool) -> Self {
        Analysis {
            result_materialization,
            pull_query,
            from_sources: Vec::new(),
            select_items: Vec::new(),
            select_column_refs: BTreeSet::new(),
            where_expression: None,
            group_by_expressions: Vec::new(),
            partition_by: None,
            window_expression: None,
            having_expression: None,
            limit: None,
            join_info: None,
            into: None,
            table_functions: Vec::new(),
            serde_options: BTreeSet::new(),
            properties: SinkProperties::default(),
        }
    }

    /// Whether the FROM clause was a join.
    pub fn is_join(&self) -> bool {
        self.from_sources.len() > 1
    }

    pub(crate) fn add_data_source(&mut self, alias: impl Into<String>, source: Arc<DataSource>) {
        self.from_sources.push(AliasedDataSource {
            alias: alias.into(),
            data_source: source,
        });
    }

    /// Record a select item, enforcing output-name rules: persistent
    /// queries may not emit an unaliased system-reserved name, and
    /// output names must be unique.
    pub(crate) fn add_select_item(
        &mut self,
        expression: Expr,
        alias: String,
        persistent: bool,
    ) -> AnalysisResult<()> {
        if persistent && schema::is_system_column(&alias) {
            return Err(AnalysisError::ReservedColumnName { name: alias });
        }

        if self.select_items.iter().any(|item| item.alias == alias) {
            return Err(AnalysisError::DuplicateColumnName { name: alias });
        }

        self.select_column_refs.extend(expression.get_columns());
        self.select_items.push(SelectExpression { expression, alias });
        Ok(())
    }

    pub(crate) fn add_group_by_expression(&mut self, expression: Expr) {
        if !self.group_by_expressions.contains(&expression) {
            self.group_by_expressions.push(expression);
        }
    }

    /// Output column names, in output order.
    pub fn select_column_names(&self) -> Vec<&str> {
        self.select_items.iter().map(|s| s.alias.as_str()).collect()
    }
}
