// Streaming SQL semantic analysis
// Consumes a parsed AST and a catalog snapshot, produces a validated Analysis

pub mod analyzer;
pub mod ast;
pub mod error;

// Re-export main API
pub use analyzer::{Analysis, Analyzer};
pub use ast::Query;
pub use error::{AnalysisError, AnalysisResult};
