//! Join Validation
//!
//! Enforces the legality rules for streaming joins and produces the
//! normalized [`JoinInfo`]. Rules are checked in a fixed order and
//! the first violation wins:
//!
//! 1. the criterion must be a single equality comparison
//! 2. each side of the equality must reference exactly one source,
//!    and the two sides together must cover both sources
//! 3. no self-joins, alias notwithstanding
//! 4. windowed sources only join compatible windowed sources
//!
//! On success the key expressions are reordered so the first always
//! belongs to the left source, however the user wrote the equality.
//! The reorder goes purely by alias match, exactly as written.

use crate::flowsql::sql::ast::{BinaryOperator, Expr, Join, JoinKind};
use crate::flowsql::sql::error::{AnalysisError, AnalysisResult};

use super::analysis::{AliasedDataSource, JoinInfo, JoinType};
use super::column_validator::ColumnReferenceValidator;

/// Validate a join node against its two resolved sources.
pub fn validate_join(
    join: &Join,
    left: &AliasedDataSource,
    right: &AliasedDataSource,
) -> AnalysisResult<JoinInfo> {
    let (left_expr, right_expr) = match &join.criteria {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Equal,
            right,
        } => (left.as_ref(), right.as_ref()),
        other => {
            return Err(AnalysisError::UnsupportedJoinCriteria {
                criteria: other.to_string(),
            })
        }
    };

    let sources = [left.clone(), right.clone()];
    let validator = ColumnReferenceValidator::new(&sources);

    let left_expr_source = only_source_for_side(&validator, left_expr, &join.criteria)?;
    let right_expr_source = only_source_for_side(&validator, right_expr, &join.criteria)?;

    let covered = (left_expr_source == left.alias && right_expr_source == right.alias)
        || (left_expr_source == right.alias && right_expr_source == left.alias);
    if !covered {
        return Err(AnalysisError::ambiguous_join_side(format!(
            "Each side of the join must reference exactly one source and not the same source. \
             Left side references {} and right references {}",
            left_expr_source, right_expr_source
        )));
    }

    if left.data_source.name == right.data_source.name {
        return Err(AnalysisError::SelfJoin {
            left: left.data_source.name.clone(),
            right: right.data_source.name.clone(),
        });
    }

    check_source_windowing(left, right)?;

    let join_type = join_type_of(join.kind)?;

    // Normalize a flipped equality back to left/right source order.
    let flipped = left_expr_source == right.alias;
    let (left_key, right_key) = if flipped {
        (right_expr.clone(), left_expr.clone())
    } else {
        (left_expr.clone(), right_expr.clone())
    };

    Ok(JoinInfo {
        left_key,
        right_key,
        join_type,
        within: join.within.clone(),
    })
}

/// Resolve one side of the join equality to the single source it
/// references.
fn only_source_for_side(
    validator: &ColumnReferenceValidator<'_>,
    side: &Expr,
    criteria: &Expr,
) -> AnalysisResult<String> {
    let touched = validator.analyze_expression(side)?;
    if touched.len() != 1 {
        return Err(AnalysisError::ambiguous_join_side(format!(
            "Invalid comparison expression '{}' in join '{}'. Each side of the join \
             comparison must contain references from exactly one source.",
            side, criteria
        )));
    }
    Ok(touched.into_iter().next().unwrap_or_default())
}

fn check_source_windowing(
    left: &AliasedDataSource,
    right: &AliasedDataSource,
) -> AnalysisResult<()> {
    use crate::flowsql::serialization::WindowType;

    let left_window = left.data_source.topic.key_format.window_type();
    let right_window = right.data_source.topic.key_format.window_type();

    match (left_window, right_window) {
        (None, None) => Ok(()),
        (Some(_), None) | (None, Some(_)) => {
            let describe = |w: Option<WindowType>| match w {
                Some(t) => t.to_string(),
                None => "not".to_string(),
            };
            Err(AnalysisError::incompatible_windowing(format!(
                "Can not join windowed source to non-windowed source.\n\
                 {} is {} windowed\n\
                 {} is {} windowed",
                left.alias,
                describe(left_window),
                right.alias,
                describe(right_window)
            )))
        }
        (Some(left_type), Some(right_type)) => {
            let compatible = match left_type {
                WindowType::Session => right_type == WindowType::Session,
                WindowType::Hopping | WindowType::Tumbling => {
                    right_type == WindowType::Hopping || right_type == WindowType::Tumbling
                }
            };

            if compatible {
                Ok(())
            } else {
                Err(AnalysisError::incompatible_windowing(format!(
                    "Incompatible windowed sources.\n\
                     Left source: {}\n\
                     Right source: {}\n\
                     Session windowed sources can only be joined to other session windowed \
                     sources, and may still not result in expected behaviour as session bounds \
                     must be an exact match for the join to work.\n\
                     Hopping and tumbling windowed sources can only be joined to other hopping \
                     and tumbling windowed sources",
                    left_type, right_type
                )))
            }
        }
    }
}

/// Map the syntactic join kind onto the closed semantic set.
fn join_type_of(kind: JoinKind) -> AnalysisResult<JoinType> {
    match kind {
        JoinKind::Inner => Ok(JoinType::Inner),
        JoinKind::Left => Ok(JoinType::Left),
        JoinKind::Outer | JoinKind::FullOuter => Ok(JoinType::Outer),
        JoinKind::Right => Err(AnalysisError::UnsupportedJoinType {
            kind: kind.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowsql::catalog::{DataSource, Topic};
    use crate::flowsql::schema::{Column, DataType, Schema};
    use crate::flowsql::serialization::{
        Format, FormatInfo, KeyFormat, ValueFormat, WindowInfo, WindowType,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn source(alias: &str, name: &str, column: &str, window: Option<WindowType>) -> AliasedDataSource {
        let key_format = match window {
            Some(window_type) => KeyFormat::windowed(
                FormatInfo::of(Format::Kafka),
                WindowInfo {
                    window_type,
                    size: Some(Duration::from_secs(30)),
                },
            ),
            None => KeyFormat::non_windowed(FormatInfo::of(Format::Kafka)),
        };
        AliasedDataSource {
            alias: alias.to_string(),
            data_source: Arc::new(DataSource::new(
                name,
                Schema::new(vec![
                    Column::key("ID", DataType::Bigint),
                    Column::value(column, DataType::String),
                ]),
                Topic::new(
                    name.to_lowercase(),
                    key_format,
                    ValueFormat::of(FormatInfo::of(Format::Json)),
                ),
            )),
        }
    }

    fn equality(left: Expr, right: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(left),
            op: BinaryOperator::Equal,
            right: Box::new(right),
        }
    }

    fn join_node(criteria: Expr) -> Join {
        Join {
            kind: JoinKind::Inner,
            left: crate::flowsql::sql::ast::AliasedRelation {
                source_name: "ORDERS".to_string(),
                alias: "O".to_string(),
            },
            right: crate::flowsql::sql::ast::AliasedRelation {
                source_name: "CUSTOMERS".to_string(),
                alias: "C".to_string(),
            },
            criteria,
            within: None,
        }
    }

    #[test]
    fn test_non_equality_criteria_rejected() {
        let left = source("O", "ORDERS", "F0", None);
        let right = source("C", "CUSTOMERS", "F1", None);
        let join = join_node(Expr::BinaryOp {
            left: Box::new(Expr::qualified_column("O", "ID")),
            op: BinaryOperator::LessThan,
            right: Box::new(Expr::qualified_column("C", "ID")),
        });

        let err = validate_join(&join, &left, &right).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedJoinCriteria { .. }));
    }

    #[test]
    fn test_side_referencing_both_sources_rejected() {
        let left = source("O", "ORDERS", "F0", None);
        let right = source("C", "CUSTOMERS", "F1", None);
        let both = Expr::BinaryOp {
            left: Box::new(Expr::qualified_column("O", "ID")),
            op: BinaryOperator::Add,
            right: Box::new(Expr::qualified_column("C", "ID")),
        };
        let join = join_node(equality(both, Expr::qualified_column("C", "ID")));

        let err = validate_join(&join, &left, &right).unwrap_err();
        assert!(matches!(err, AnalysisError::AmbiguousJoinSide { .. }));
    }

    #[test]
    fn test_both_sides_referencing_same_source_rejected() {
        let left = source("O", "ORDERS", "F0", None);
        let right = source("C", "CUSTOMERS", "F1", None);
        let join = join_node(equality(
            Expr::qualified_column("O", "ID"),
            Expr::qualified_column("O", "F0"),
        ));

        let err = validate_join(&join, &left, &right).unwrap_err();
        assert!(matches!(err, AnalysisError::AmbiguousJoinSide { .. }));
        assert!(err.to_string().contains("Left side references O"));
    }

    #[test]
    fn test_self_join_rejected() {
        let left = source("A1", "ORDERS", "F0", None);
        let right = source("A2", "ORDERS", "F0", None);
        let join = join_node(equality(
            Expr::qualified_column("A1", "ID"),
            Expr::qualified_column("A2", "ID"),
        ));

        let err = validate_join(&join, &left, &right).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::SelfJoin {
                left: "ORDERS".to_string(),
                right: "ORDERS".to_string(),
            }
        );
    }

    #[test]
    fn test_windowed_to_non_windowed_rejected() {
        let left = source("O", "ORDERS", "F0", Some(WindowType::Tumbling));
        let right = source("C", "CUSTOMERS", "F1", None);
        let join = join_node(equality(
            Expr::qualified_column("O", "ID"),
            Expr::qualified_column("C", "ID"),
        ));

        let err = validate_join(&join, &left, &right).unwrap_err();
        assert!(err.to_string().contains("windowed source to non-windowed"));
    }

    #[test]
    fn test_session_to_hopping_rejected_session_to_session_allowed() {
        let criteria = equality(
            Expr::qualified_column("O", "ID"),
            Expr::qualified_column("C", "ID"),
        );

        let left = source("O", "ORDERS", "F0", Some(WindowType::Session));
        let hopping = source("C", "CUSTOMERS", "F1", Some(WindowType::Hopping));
        let err = validate_join(&join_node(criteria.clone()), &left, &hopping).unwrap_err();
        assert!(err.to_string().contains("SESSION"));
        assert!(err.to_string().contains("HOPPING"));

        let session = source("C", "CUSTOMERS", "F1", Some(WindowType::Session));
        assert!(validate_join(&join_node(criteria), &left, &session).is_ok());
    }

    #[test]
    fn test_hopping_to_tumbling_allowed() {
        let left = source("O", "ORDERS", "F0", Some(WindowType::Hopping));
        let right = source("C", "CUSTOMERS", "F1", Some(WindowType::Tumbling));
        let join = join_node(equality(
            Expr::qualified_column("O", "ID"),
            Expr::qualified_column("C", "ID"),
        ));

        assert!(validate_join(&join, &left, &right).is_ok());
    }

    #[test]
    fn test_flipped_equality_normalized_to_source_order() {
        let left = source("O", "ORDERS", "F0", None);
        let right = source("C", "CUSTOMERS", "F1", None);
        // written right-to-left: C.ID = O.ID
        let join = join_node(equality(
            Expr::qualified_column("C", "ID"),
            Expr::qualified_column("O", "ID"),
        ));

        let info = validate_join(&join, &left, &right).unwrap();
        assert_eq!(info.left_key, Expr::qualified_column("O", "ID"));
        assert_eq!(info.right_key, Expr::qualified_column("C", "ID"));
    }

    #[test]
    fn test_right_join_kind_unsupported() {
        let left = source("O", "ORDERS", "F0", None);
        let right = source("C", "CUSTOMERS", "F1", None);
        let mut join = join_node(equality(
            Expr::qualified_column("O", "ID"),
            Expr::qualified_column("C", "ID"),
        ));
        join.kind = JoinKind::Right;

        let err = validate_join(&join, &left, &right).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UnsupportedJoinType {
                kind: "RIGHT".to_string(),
            }
        );
    }
}
