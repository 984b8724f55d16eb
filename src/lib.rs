//! # flowsql
//!
//! Semantic analysis for streaming SQL. This crate takes a parsed query
//! (an abstract syntax tree) plus a catalog of known data sources and
//! produces a fully validated, enriched [`Analysis`] that a downstream
//! logical/physical planner consumes to build an executable streaming
//! query.
//!
//! ## What lives here
//!
//! - **AST**: the query node types the analyzer consumes ([`flowsql::sql::ast`])
//! - **Analyzer**: clause walking, column resolution, join validation,
//!   wildcard expansion, sink/format resolution ([`flowsql::sql::analyzer`])
//! - **Schema**: logical schemas with key/value/system column
//!   classification ([`flowsql::schema`])
//! - **Serialization descriptors**: formats, key/value format info,
//!   serde options ([`flowsql::serialization`])
//! - **Catalog**: data source and function registry interfaces plus an
//!   in-memory metastore ([`flowsql::catalog`])
//!
//! ## What does not
//!
//! Parsing SQL text, plan building, query execution, row serde, and
//! transport are external collaborators. Analysis is pure synchronous
//! compute: one pass over an immutable AST against a catalog snapshot,
//! failing fast on the first violated invariant.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowsql::{Analyzer, MetaStore};
//! # fn parsed_query() -> flowsql::flowsql::sql::ast::Query { unimplemented!() }
//!
//! let metastore = Arc::new(MetaStore::new());
//! let analyzer = Analyzer::new(metastore.clone(), metastore, "_flowsql_");
//!
//! let analysis = analyzer.analyze(&parsed_query(), None)?;
//! assert_eq!(analysis.from_sources.len(), 1);
//! # Ok::<(), flowsql::AnalysisError>(())
//! ```

pub mod flowsql;

// Re-export main API
pub use crate::flowsql::catalog::{Catalog, DataSource, FunctionRegistry, MetaStore, Topic};
pub use crate::flowsql::schema::{Column, ColumnNamespace, DataType, Schema};
pub use crate::flowsql::serialization::{
    Format, FormatInfo, KeyFormat, SerdeOption, ValueFormat, WindowInfo, WindowType,
};
pub use crate::flowsql::sql::analyzer::{
    Analysis, Analyzer, JoinInfo, JoinType, SinkProperties, SinkSpec, SinkTarget,
};
pub use crate::flowsql::sql::error::{AnalysisError, AnalysisResult};
