/*!
# Analysis Error Handling

Error types for the semantic-analysis stage. Every violated invariant
aborts the whole analysis with one of these; nothing is recoverable
inside the analyzer and no partial analysis escapes to callers.

All variants carry enough context to diagnose the offending SQL
fragment: alias names, rendered expression text, format and window
type names. Callers surface the message verbatim as the
query-compilation failure.
*/

use std::fmt;

/// Terminal errors raised during semantic analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A sink or FROM target was not found in the catalog.
    UnknownSource {
        /// Name the query referenced
        name: String,
    },

    /// A column reference does not resolve against in-scope schemas.
    UnknownColumn {
        /// The reference as written, e.g. `o.amount` or `amount`
        reference: String,
    },

    /// Join predicate is not a single equality comparison.
    UnsupportedJoinCriteria {
        /// Rendered criteria expression
        criteria: String,
    },

    /// A join-equality side references zero, two, or the wrong set of
    /// sources.
    AmbiguousJoinSide {
        /// Description of what each side actually referenced
        message: String,
    },

    /// Both join sides resolve to the same underlying source.
    SelfJoin {
        /// Underlying source name on the left
        left: String,
        /// Underlying source name on the right
        right: String,
    },

    /// Windowed/non-windowed or incompatible window-type pairing
    /// across a join.
    IncompatibleWindowing { message: String },

    /// Join kind outside the supported set.
    UnsupportedJoinType {
        /// The syntactic kind as written
        kind: String,
    },

    /// A persistent query's select list uses a system-reserved output
    /// name without aliasing.
    ReservedColumnName {
        /// The reserved name
        name: String,
    },

    /// Two select items resolved to the same output column name.
    DuplicateColumnName {
        /// The colliding output name
        name: String,
    },

    /// A table function call appears inside another table function
    /// call's arguments.
    NestedTableFunction {
        /// The enclosing table function
        outer: String,
        /// The nested table function
        inner: String,
    },

    /// Join or group-by used against a value format that forbids it.
    UnsupportedFormatFeature {
        /// Comma-separated offending source aliases
        sources: String,
        /// The operation that is not supported (JOIN, GROUP BY)
        operation: String,
        /// Fixed advisory text with a reformatting workaround
        details: String,
    },

    /// Contradictory or inapplicable serde option directives.
    InvalidSerdeOptions { message: String },
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::UnknownSource { name } => {
                write!(f, "Unknown source: {}. Source does not exist.", name)
            }
            AnalysisError::UnknownColumn { reference } => {
                write!(f, "Column '{}' cannot be resolved.", reference)
            }
            AnalysisError::UnsupportedJoinCriteria { criteria } => {
                write!(
                    f,
                    "Only equality join criteria is supported. Found: {}",
                    criteria
                )
            }
            AnalysisError::AmbiguousJoinSide { message } => write!(f, "{}", message),
            AnalysisError::SelfJoin { left, right } => {
                write!(
                    f,
                    "Can not join '{}' to '{}': self joins are not yet supported.",
                    left, right
                )
            }
            AnalysisError::IncompatibleWindowing { message } => write!(f, "{}", message),
            AnalysisError::UnsupportedJoinType { kind } => {
                write!(f, "Join type is not supported: {}", kind)
            }
            AnalysisError::ReservedColumnName { name } => {
                write!(
                    f,
                    "Reserved column name in select: {}. Please remove or alias the column.",
                    name
                )
            }
            AnalysisError::DuplicateColumnName { name } => {
                write!(
                    f,
                    "Duplicate column name in select: {}. Please alias the column.",
                    name
                )
            }
            AnalysisError::NestedTableFunction { outer, inner } => {
                write!(
                    f,
                    "Table functions cannot be nested: {}({}())",
                    outer, inner
                )
            }
            AnalysisError::UnsupportedFormatFeature {
                sources,
                operation,
                details,
            } => {
                write!(
                    f,
                    "Source(s) {} are using the 'KAFKA' value format. \
                     This format does not yet support {}.\n{}",
                    sources, operation, details
                )
            }
            AnalysisError::InvalidSerdeOptions { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl AnalysisError {
    /// Create an unknown-source error
    pub fn unknown_source(name: impl Into<String>) -> Self {
        AnalysisError::UnknownSource { name: name.into() }
    }

    /// Create an unknown-column error
    pub fn unknown_column(reference: impl Into<String>) -> Self {
        AnalysisError::UnknownColumn {
            reference: reference.into(),
        }
    }

    /// Create an ambiguous-join-side error
    pub fn ambiguous_join_side(message: impl Into<String>) -> Self {
        AnalysisError::AmbiguousJoinSide {
            message: message.into(),
        }
    }

    /// Create an incompatible-windowing error
    pub fn incompatible_windowing(message: impl Into<String>) -> Self {
        AnalysisError::IncompatibleWindowing {
            message: message.into(),
        }
    }

    /// Create an invalid-serde-options error
    pub fn invalid_serde_options(message: impl Into<String>) -> Self {
        AnalysisError::InvalidSerdeOptions {
            message: message.into(),
        }
    }
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_column_message_names_reference() {
        let err = AnalysisError::unknown_column("o.amount");
        assert_eq!(err.to_string(), "Column 'o.amount' cannot be resolved.");
    }

    #[test]
    fn test_nested_table_function_message_names_both() {
        let err = AnalysisError::NestedTableFunction {
            outer: "EXPLODE".to_string(),
            inner: "SPLIT_TO_ROWS".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Table functions cannot be nested: EXPLODE(SPLIT_TO_ROWS())"
        );
    }
}
