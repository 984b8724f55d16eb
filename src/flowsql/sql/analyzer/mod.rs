/*!
# Semantic Analyzer

Validates a parsed query against the catalog and produces the
[`Analysis`] record the downstream planner consumes. The analyzer is
the single place where free-form identifiers become resolved schema
references: after it succeeds, every source exists, every column
reference resolves, join shape and windowing are validated, and the
output sink (if any) is fully described.

Analysis visits clauses in a fixed order so later clauses see the
scope established by earlier ones: FROM, SELECT, WHERE, GROUP BY,
PARTITION BY, WINDOW, HAVING, LIMIT. Column validation and format
gating run after the full walk, once the complete picture is known.
*/

pub mod analysis;
pub mod column_validator;
pub mod join_validator;
pub mod select_expander;

pub use analysis::{
    AliasedDataSource, Analysis, JoinInfo, JoinType, SelectExpression, SinkTarget,
};
pub use column_validator::ColumnReferenceValidator;

use log::debug;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::flowsql::catalog::{Catalog, DataSource, FunctionRegistry, Topic};
use crate::flowsql::serialization::{
    Format, FormatInfo, KeyFormat, SerdeOption, SerdeOptions, ValueFormat, WindowInfo, WindowType,
};
use crate::flowsql::sql::ast::{Expr, Query, Relation, SelectItem, WindowSpec};
use crate::flowsql::sql::error::{AnalysisError, AnalysisResult};

/// Advisory appended to errors caused by the KAFKA value format, which
/// cannot back repartition or changelog topics.
const KAFKA_VALUE_FORMAT_LIMITATION_DETAILS: &str = "The KAFKA value format is \
    not supported by this operation because it requires an internal \
    repartition or changelog topic. Consider using a different value \
    format, e.g. by recreating the source with VALUE_FORMAT='JSON'.";

/// Sink configuration carried on a CREATE ... AS statement's WITH
/// clause. Absent fields fall back to inherited or default values
/// during sink resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SinkProperties {
    /// Explicit backing topic name
    pub kafka_topic: Option<String>,
    /// Explicit value format override
    pub value_format: Option<Format>,
    /// Explicit single-field wrapping directive
    pub wrap_single_values: Option<bool>,
    /// Partition count for a created topic
    pub partitions: Option<u32>,
    /// Replication factor for a created topic
    pub replicas: Option<u16>,
    /// Format-specific properties, e.g. a schema name or delimiter
    pub format_properties: HashMap<String, String>,
}

/// The output sink of a persistent query, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSpec {
    /// Name of the sink stream or table
    pub name: String,
    /// True when the statement creates the sink, false when it inserts
    /// into an existing one
    pub create_sink: bool,
    /// WITH-clause configuration
    pub properties: SinkProperties,
}

impl SinkSpec {
    /// Sink for a CREATE ... AS SELECT statement
    pub fn create(name: impl Into<String>, properties: SinkProperties) -> Self {
        SinkSpec {
            name: name.into(),
            create_sink: true,
            properties,
        }
    }

    /// Sink for an INSERT INTO statement targeting an existing source
    pub fn insert_into(name: impl Into<String>) -> Self {
        SinkSpec {
            name: name.into(),
            create_sink: false,
            properties: SinkProperties::default(),
        }
    }
}

/// Semantic analyzer: resolves and validates queries against a
/// catalog, producing [`Analysis`] records for the planner.
pub struct Analyzer {
    catalog: Arc<dyn Catalog>,
    functions: Arc<dyn FunctionRegistry>,
    /// Prefix for topics created implicitly for sinks
    topic_prefix: String,
    /// Engine-level serde option defaults, applied when the statement
    /// carries no explicit directive
    default_serde_options: BTreeSet<SerdeOption>,
}

impl Analyzer {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        functions: Arc<dyn FunctionRegistry>,
        topic_prefix: impl Into<String>,
    ) -> Self {
        Analyzer {
            catalog,
            functions,
            topic_prefix: topic_prefix.into(),
            default_serde_options: BTreeSet::new(),
        }
    }

    /// Replace the engine-level serde option defaults.
    pub fn with_default_serde_options(mut self, defaults: BTreeSet<SerdeOption>) -> Self {
        self.default_serde_options = defaults;
        self
    }

    /// Analyze a query, optionally writing into a sink.
    ///
    /// A `sink` makes the query persistent; transient queries pass
    /// `None`. On success the returned [`Analysis`] is fully resolved
    /// and validated; on failure the first error in clause order is
    /// returned.
    pub fn analyze(&self, query: &Query, sink: Option<&SinkSpec>) -> AnalysisResult<Analysis> {
        let mut visitor = Visitor {
            analyzer: self,
            analysis: Analysis::new(query.result_materialization, query.pull_query),
            persistent: sink.is_some(),
            is_join: false,
            is_group_by: false,
        };

        visitor.process(query)?;

        if let Some(sink) = sink {
            visitor.analyze_sink(sink)?;
        }

        visitor.validate_format_features()?;

        debug!(
            "analyzed query over [{}]: {} select items, join={}, sink={:?}",
            visitor
                .analysis
                .from_sources
                .iter()
                .map(|s| s.data_source.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            visitor.analysis.select_items.len(),
            visitor.is_join,
            visitor.analysis.into.as_ref().map(|i| i.name.as_str()),
        );

        Ok(visitor.analysis)
    }
}

/// One analysis pass over a single query.
struct Visitor<'a> {
    analyzer: &'a Analyzer,
    analysis: Analysis,
    persistent: bool,
    is_join: bool,
    is_group_by: bool,
}

impl Visitor<'_> {
    fn process(&mut self, query: &Query) -> AnalysisResult<()> {
        self.visit_from(&query.from)?;
        self.visit_select_items(&query.select_items)?;

        if let Some(where_clause) = &query.where_clause {
            self.analysis.where_expression = Some(where_clause.clone());
        }

        if !query.group_by.is_empty() {
            self.is_group_by = true;
            for expression in &query.group_by {
                self.analysis.add_group_by_expression(expression.clone());
            }
        }

        if let Some(partition_by) = &query.partition_by {
            self.analysis.partition_by = Some(partition_by.clone());
        }

        if let Some(window) = &query.window {
            self.analysis.window_expression = Some(window.clone());
        }

        if let Some(having) = &query.having {
            self.analysis.having_expression = Some(having.clone());
        }

        self.analysis.limit = query.limit;

        self.validate_column_references()?;

        Ok(())
    }

    fn visit_from(&mut self, relation: &Relation) -> AnalysisResult<()> {
        for aliased in relation.sources() {
            let source = self
                .analyzer
                .catalog
                .get_source(&aliased.source_name)
                .ok_or_else(|| AnalysisError::unknown_source(&aliased.source_name))?;
            self.analysis.add_data_source(&aliased.alias, source);
        }

        if let Relation::Join(join) = relation {
            self.is_join = true;
            let join_info = join_validator::validate_join(
                join,
                &self.analysis.from_sources[0],
                &self.analysis.from_sources[1],
            )?;
            self.analysis.join_info = Some(join_info);
        }

        Ok(())
    }

    fn visit_select_items(&mut self, items: &[SelectItem]) -> AnalysisResult<()> {
        for item in items {
            match item {
                SelectItem::AllColumns { source } => {
                    let expanded = select_expander::expand_select_star(
                        source.as_deref(),
                        &self.analysis.from_sources,
                        self.is_join,
                        self.persistent,
                        self.analysis.pull_query,
                    );
                    for select in expanded {
                        self.analysis
                            .add_select_item(select.expression, select.alias, self.persistent)?;
                    }
                }
                SelectItem::SingleColumn { expr, alias } => {
                    self.visit_table_functions(expr, None)?;
                    self.analysis
                        .add_select_item(expr.clone(), alias.clone(), self.persistent)?;
                }
            }
        }
        Ok(())
    }

    /// Record table function calls in the select list. Table functions
    /// may not appear inside the arguments of another table function;
    /// `enclosing` carries the name of the table function currently
    /// being descended into, if any.
    fn visit_table_functions(
        &mut self,
        expression: &Expr,
        enclosing: Option<&str>,
    ) -> AnalysisResult<()> {
        match expression {
            Expr::Function { name, args } => {
                let is_table_function = self.analyzer.functions.is_table_function(name);

                if is_table_function {
                    if let Some(outer) = enclosing {
                        return Err(AnalysisError::NestedTableFunction {
                            outer: outer.to_string(),
                            inner: name.clone(),
                        });
                    }
                    self.analysis.table_functions.push(expression.clone());
                }

                let inner_enclosing = if is_table_function {
                    Some(name.as_str())
                } else {
                    enclosing
                };
                for arg in args {
                    self.visit_table_functions(arg, inner_enclosing)?;
                }
            }
            Expr::Column(_) | Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                self.visit_table_functions(left, enclosing)?;
                self.visit_table_functions(right, enclosing)?;
            }
            Expr::UnaryOp { expr, .. } => self.visit_table_functions(expr, enclosing)?,
            Expr::Case {
                when_clauses,
                else_clause,
            } => {
                for (condition, result) in when_clauses {
                    self.visit_table_functions(condition, enclosing)?;
                    self.visit_table_functions(result, enclosing)?;
                }
                if let Some(else_expr) = else_clause {
                    self.visit_table_functions(else_expr, enclosing)?;
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.visit_table_functions(expr, enclosing)?;
                self.visit_table_functions(low, enclosing)?;
                self.visit_table_functions(high, enclosing)?;
            }
            Expr::List(items) => {
                for item in items {
                    self.visit_table_functions(item, enclosing)?;
                }
            }
        }
        Ok(())
    }

    /// Resolve every column reference in the WHERE, GROUP BY, HAVING
    /// and SELECT clauses against the in-scope sources.
    fn validate_column_references(&self) -> AnalysisResult<()> {
        let validator = ColumnReferenceValidator::new(&self.analysis.from_sources);

        if let Some(where_expression) = &self.analysis.where_expression {
            validator.analyze_expression(where_expression)?;
        }
        for expression in &self.analysis.group_by_expressions {
            validator.analyze_expression(expression)?;
        }
        if let Some(having_expression) = &self.analysis.having_expression {
            validator.analyze_expression(having_expression)?;
        }
        for select in &self.analysis.select_items {
            validator.analyze_expression(&select.expression)?;
        }

        Ok(())
    }

    fn analyze_sink(&mut self, sink: &SinkSpec) -> AnalysisResult<()> {
        self.analysis.properties = sink.properties.clone();

        let topic = if sink.create_sink {
            self.build_sink_topic(sink)?
        } else {
            // Inserting into an existing source reuses its topic
            // exactly as registered.
            let existing = self
                .analyzer
                .catalog
                .get_source(&sink.name)
                .ok_or_else(|| AnalysisError::unknown_source(&sink.name))?;
            existing.topic.clone()
        };

        let serde_options = SerdeOptions::build_for_create_as(
            self.analysis.select_items.len(),
            topic.value_format.format(),
            sink.properties.wrap_single_values,
            &self.analyzer.default_serde_options,
        )?;

        self.analysis.serde_options = serde_options;
        self.analysis.into = Some(SinkTarget {
            name: sink.name.clone(),
            create_sink: sink.create_sink,
            topic,
        });

        Ok(())
    }

    /// Build the topic of a sink being created: topic name, key
    /// format (windowed when the query has a WINDOW clause), and value
    /// format with inherited properties.
    fn build_sink_topic(&self, sink: &SinkSpec) -> AnalysisResult<Topic> {
        let topic_name = sink
            .properties
            .kafka_topic
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.analyzer.topic_prefix, sink.name));

        let primary = &self.analysis.from_sources[0].data_source;

        let key_format = match &self.analysis.window_expression {
            Some(window) => KeyFormat::windowed(
                FormatInfo::of(Format::Kafka),
                window_info_of(window),
            ),
            None => KeyFormat::non_windowed(primary.topic.key_format.format_info.clone()),
        };

        let value_format = self.build_sink_value_format(sink, primary);

        Ok(Topic::new(topic_name, key_format, value_format))
    }

    fn build_sink_value_format(&self, sink: &SinkSpec, primary: &DataSource) -> ValueFormat {
        let source_format = &primary.topic.value_format.format_info;
        let format = sink.properties.value_format.unwrap_or(source_format.format);

        // Inherit format-specific properties only when sink and source
        // share the format; explicit WITH-clause properties win.
        let mut properties = HashMap::new();
        if format == source_format.format {
            for &key in format.inheritable_properties() {
                if let Some(value) = source_format.properties.get(key) {
                    properties.insert(key.to_string(), value.clone());
                }
            }
        }
        for (key, value) in &sink.properties.format_properties {
            properties.insert(key.clone(), value.clone());
        }

        ValueFormat::of(FormatInfo::with_properties(format, properties))
    }

    /// The KAFKA value format cannot back the repartition and
    /// changelog topics joins and aggregations need. Runs after the
    /// full walk so both flags are final.
    fn validate_format_features(&self) -> AnalysisResult<()> {
        let kafka_sources: Vec<&str> = self
            .analysis
            .from_sources
            .iter()
            .filter(|s| s.data_source.topic.value_format.format() == Format::Kafka)
            .map(|s| s.alias.as_str())
            .collect();

        if kafka_sources.is_empty() {
            return Ok(());
        }

        let operation = if self.is_join {
            Some("JOIN")
        } else if self.is_group_by {
            Some("GROUP BY")
        } else {
            None
        };

        if let Some(operation) = operation {
            return Err(AnalysisError::UnsupportedFormatFeature {
                sources: kafka_sources.join(", "),
                operation: operation.to_string(),
                details: KAFKA_VALUE_FORMAT_LIMITATION_DETAILS.to_string(),
            });
        }

        Ok(())
    }
}

/// Map a query's WINDOW clause onto the window metadata carried by a
/// windowed key format. Session windows have no fixed size.
fn window_info_of(window: &WindowSpec) -> WindowInfo {
    match window {
        WindowSpec::Tumbling { size } => WindowInfo {
            window_type: WindowType::Tumbling,
            size: Some(*size),
        },
        WindowSpec::Hopping { size, .. } => WindowInfo {
            window_type: WindowType::Hopping,
            size: Some(*size),
        },
        WindowSpec::Session { .. } => WindowInfo {
            window_type: WindowType::Session,
            size: None,
        },
    }
}
