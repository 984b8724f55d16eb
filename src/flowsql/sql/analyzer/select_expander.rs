//! Wildcard Expansion
//!
//! Expands `SELECT *` (optionally qualified by a source alias) into
//! concrete select items, one per expanded column:
//!
//! - joins prefix every output name with `<alias>_`
//! - persistent non-join queries expand only value columns; key and
//!   metadata columns are implicit and carried by the execution layer
//! - joins and transient queries expand the full schema, with system
//!   and key columns moved to the front of the list
//! - pull queries exclude metadata columns from expansion entirely
//! - windowed sources materialize their window bound columns

use crate::flowsql::schema::{is_meta_column, Column, ColumnNamespace};
use crate::flowsql::sql::ast::{ColumnRef, Expr};

use super::analysis::{AliasedDataSource, SelectExpression};

/// Expand a wildcard select item over the in-scope sources.
///
/// The returned items still pass through the analyzer's normal
/// select-item recording, so they obey the same uniqueness and
/// reserved-name rules as explicit items.
pub fn expand_select_star(
    qualifier: Option<&str>,
    from_sources: &[AliasedDataSource],
    is_join: bool,
    persistent: bool,
    pull_query: bool,
) -> Vec<SelectExpression> {
    let mut expanded = Vec::new();

    for source in from_sources {
        if let Some(prefix) = qualifier {
            if prefix != source.alias {
                continue;
            }
        }

        let alias_prefix = if is_join {
            format!("{}_", source.alias)
        } else {
            String::new()
        };

        let schema = &source.data_source.schema;
        let windowed = source.data_source.is_windowed();

        // Non-join persistent queries only require value columns on
        // SELECT *; joins and transient queries require all columns.
        let columns = if persistent && !is_join {
            schema.value_columns()
        } else {
            system_columns_to_the_front(schema.columns_with_meta_and_key(windowed))
        };

        for column in columns {
            if pull_query && is_meta_column(&column.name) {
                continue;
            }

            expanded.push(SelectExpression {
                expression: Expr::Column(ColumnRef::qualified(&source.alias, &column.name)),
                alias: format!("{}{}", alias_prefix, column.name),
            });
        }
    }

    expanded
}

/// Full-schema projections carry the system and key columns at the
/// back for storage reasons; a `SELECT *` wants them at the front.
fn system_columns_to_the_front(columns: Vec<Column>) -> Vec<Column> {
    let (front, back): (Vec<Column>, Vec<Column>) = columns
        .into_iter()
        .partition(|c| c.namespace != ColumnNamespace::Value);

    let mut all = front;
    all.extend(back);
    all
}
