//! Catalog Interfaces
//!
//! The analyzer resolves free-form identifiers against a catalog of
//! known data sources and asks a function registry whether a function
//! call is table-valued. Both are read-only collaborators: the
//! analyzer never mutates the catalog and assumes a consistent
//! snapshot for the duration of one analysis.
//!
//! [`MetaStore`] is the bundled in-memory implementation of both
//! interfaces, suitable for engines that register sources as DDL
//! statements execute, and for tests.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::flowsql::schema::Schema;
use crate::flowsql::serialization::{KeyFormat, ValueFormat};

/// The topic backing a data source: name plus key and value formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub key_format: KeyFormat,
    pub value_format: ValueFormat,
}

impl Topic {
    pub fn new(name: impl Into<String>, key_format: KeyFormat, value_format: ValueFormat) -> Self {
        Topic {
            name: name.into(),
            key_format,
            value_format,
        }
    }
}

/// A registered data source: name, logical schema, backing topic.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub name: String,
    pub schema: Schema,
    pub topic: Topic,
}

impl DataSource {
    pub fn new(name: impl Into<String>, schema: Schema, topic: Topic) -> Self {
        DataSource {
            name: name.into(),
            schema,
            topic,
        }
    }

    /// Whether the source's key encoding embeds a time window
    pub fn is_windowed(&self) -> bool {
        self.topic.key_format.is_windowed()
    }
}

/// Read-only lookup of registered data sources.
pub trait Catalog: Send + Sync {
    /// Look up a source by name; absent names return `None`, never an
    /// error, so callers decide how absence is reported.
    fn get_source(&self, name: &str) -> Option<Arc<DataSource>>;
}

/// Lookup of table-valued functions.
pub trait FunctionRegistry: Send + Sync {
    /// Whether `name` is a table function (can produce multiple
    /// output rows per input row). Case-insensitive.
    fn is_table_function(&self, name: &str) -> bool;
}

/// In-memory catalog and function registry.
#[derive(Debug, Default)]
pub struct MetaStore {
    sources: HashMap<String, Arc<DataSource>>,
    table_functions: HashSet<String>,
}

impl MetaStore {
    pub fn new() -> Self {
        MetaStore::default()
    }

    /// Register a data source, replacing any previous registration
    /// under the same name.
    pub fn register_source(&mut self, source: DataSource) {
        self.sources.insert(source.name.clone(), Arc::new(source));
    }

    /// Register a function name as table-valued.
    pub fn register_table_function(&mut self, name: impl Into<String>) {
        self.table_functions.insert(name.into().to_uppercase());
    }

    /// Names of all registered sources, in stable sorted order.
    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Catalog for MetaStore {
    fn get_source(&self, name: &str) -> Option<Arc<DataSource>> {
        self.sources.get(name).cloned()
    }
}

impl FunctionRegistry for MetaStore {
    fn is_table_function(&self, name: &str) -> bool {
        self.table_functions.contains(&name.to_uppercase())
    }
}
