//! Logical Schema Model
//!
//! Schemas describe the ordered columns of a data source, with each
//! column classified as a key, value, or system column. The analyzer
//! resolves column references against these and drives wildcard
//! expansion from them.
//!
//! System columns are engine-provided: `ROWTIME` (record timestamp) is
//! always in scope, and windowed sources additionally expose the
//! `WINDOWSTART`/`WINDOWEND` bound columns.

use serde::{Deserialize, Serialize};

/// Implicit record-timestamp column, present on every source.
pub const ROWTIME: &str = "ROWTIME";

/// Reserved legacy key column name.
pub const ROWKEY: &str = "ROWKEY";

/// Window lower-bound column, exposed by windowed sources.
pub const WINDOWSTART: &str = "WINDOWSTART";

/// Window upper-bound column, exposed by windowed sources.
pub const WINDOWEND: &str = "WINDOWEND";

/// Check whether a name is reserved for an engine-provided column.
pub fn is_system_column(name: &str) -> bool {
    matches!(name, ROWTIME | ROWKEY | WINDOWSTART | WINDOWEND)
}

/// Check whether a name is a metadata column. Metadata columns are
/// suppressed from wildcard expansion in pull queries; window bounds
/// and key columns are not.
pub fn is_meta_column(name: &str) -> bool {
    name == ROWTIME
}

/// Data types supported in streaming SQL schemas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Bigint,
    Float,
    String,
    Boolean,
    Timestamp,
    /// Array of elements of a specific type
    Array(Box<DataType>),
    /// Map with key-value pairs of specific types
    Map(Box<DataType>, Box<DataType>),
}

/// Classification of a column within its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnNamespace {
    /// Part of the record key
    Key,
    /// Part of the record value
    Value,
    /// Engine-provided metadata (row timestamp, window bounds)
    System,
}

/// A single named, typed, classified column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub namespace: ColumnNamespace,
}

impl Column {
    /// A key column
    pub fn key(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
            namespace: ColumnNamespace::Key,
        }
    }

    /// A value column
    pub fn value(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
            namespace: ColumnNamespace::Value,
        }
    }

    fn system(name: &str, data_type: DataType) -> Self {
        Column {
            name: name.to_string(),
            data_type,
            namespace: ColumnNamespace::System,
        }
    }
}

/// Ordered columns of a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build a schema from declared key and value columns.
    /// Column order is preserved; it defines wildcard expansion order.
    pub fn new(columns: Vec<Column>) -> Self {
        Schema { columns }
    }

    /// All declared columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Declared value columns only, in declaration order.
    pub fn value_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .filter(|c| c.namespace == ColumnNamespace::Value)
            .cloned()
            .collect()
    }

    /// Declared key columns only, in declaration order.
    pub fn key_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .filter(|c| c.namespace == ColumnNamespace::Key)
            .cloned()
            .collect()
    }

    /// Whether a reference to `name` resolves against this schema.
    ///
    /// System columns are always in scope for explicit references;
    /// the window bound columns only when the source is windowed.
    pub fn has_column(&self, name: &str, windowed: bool) -> bool {
        if name == ROWTIME {
            return true;
        }
        if windowed && (name == WINDOWSTART || name == WINDOWEND) {
            return true;
        }
        self.columns.iter().any(|c| c.name == name)
    }

    /// Full column list for `SELECT *` over a join or transient query:
    /// declared value columns first, then the implicit system and key
    /// columns at the back. The expander moves non-value columns to
    /// the front of the select list afterwards.
    pub fn columns_with_meta_and_key(&self, windowed: bool) -> Vec<Column> {
        let mut columns = self.value_columns();
        columns.push(Column::system(ROWTIME, DataType::Bigint));
        columns.extend(self.key_columns());
        if windowed {
            columns.push(Column::system(WINDOWSTART, DataType::Bigint));
            columns.push(Column::system(WINDOWEND, DataType::Bigint));
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_schema() -> Schema {
        Schema::new(vec![
            Column::key("ID", DataType::Bigint),
            Column::value("AMOUNT", DataType::Float),
            Column::value("ITEM", DataType::String),
        ])
    }

    #[test]
    fn test_value_columns_exclude_keys() {
        let schema = orders_schema();
        let names: Vec<_> = schema.value_columns().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["AMOUNT", "ITEM"]);
    }

    #[test]
    fn test_rowtime_always_in_scope() {
        let schema = orders_schema();
        assert!(schema.has_column(ROWTIME, false));
        assert!(!schema.has_column(WINDOWSTART, false));
        assert!(schema.has_column(WINDOWSTART, true));
    }

    #[test]
    fn test_full_columns_append_meta_and_key_at_back() {
        let schema = orders_schema();
        let names: Vec<_> = schema
            .columns_with_meta_and_key(true)
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(
            names,
            vec!["AMOUNT", "ITEM", "ROWTIME", "ID", "WINDOWSTART", "WINDOWEND"]
        );
    }

    #[test]
    fn test_is_system_column() {
        assert!(is_system_column("ROWTIME"));
        assert!(is_system_column("WINDOWEND"));
        assert!(!is_system_column("AMOUNT"));
    }
}
