//! Column Reference Validation
//!
//! Resolves every column reference in an expression against the
//! schemas currently in scope and reports which sources an expression
//! touches. Unresolved references fail with the reference as written;
//! ambiguous unqualified references fail the same way, since the
//! query cannot be planned either way.

use std::collections::BTreeSet;

use crate::flowsql::sql::ast::{ColumnRef, Expr};
use crate::flowsql::sql::error::{AnalysisError, AnalysisResult};

use super::analysis::AliasedDataSource;

/// Validates column references against a fixed set of in-scope
/// source schemas.
pub struct ColumnReferenceValidator<'a> {
    sources: &'a [AliasedDataSource],
}

impl<'a> ColumnReferenceValidator<'a> {
    pub fn new(sources: &'a [AliasedDataSource]) -> Self {
        ColumnReferenceValidator { sources }
    }

    /// Validate every column reference in `expression`, returning the
    /// set of source aliases it touches. System columns are always in
    /// scope for explicit references; window bound columns only for
    /// windowed sources.
    pub fn analyze_expression(&self, expression: &Expr) -> AnalysisResult<BTreeSet<String>> {
        let mut touched = BTreeSet::new();
        for column_ref in expression.get_columns() {
            touched.insert(self.resolve(&column_ref)?);
        }
        Ok(touched)
    }

    /// Resolve one reference to the alias of the source it belongs to.
    fn resolve(&self, column_ref: &ColumnRef) -> AnalysisResult<String> {
        match &column_ref.source {
            Some(qualifier) => {
                let source = self
                    .sources
                    .iter()
                    .find(|s| &s.alias == qualifier)
                    .ok_or_else(|| AnalysisError::unknown_column(column_ref.to_string()))?;

                let windowed = source.data_source.is_windowed();
                if !source.data_source.schema.has_column(&column_ref.name, windowed) {
                    return Err(AnalysisError::unknown_column(column_ref.to_string()));
                }
                Ok(source.alias.clone())
            }
            None => {
                let matches: Vec<&AliasedDataSource> = self
                    .sources
                    .iter()
                    .filter(|s| {
                        s.data_source
                            .schema
                            .has_column(&column_ref.name, s.data_source.is_windowed())
                    })
                    .collect();

                // zero matches is unknown; more than one is ambiguous,
                // which is just as unresolvable
                match matches.as_slice() {
                    [source] => Ok(source.alias.clone()),
                    _ => Err(AnalysisError::unknown_column(column_ref.to_string())),
                }
            }
        }
    }
}
