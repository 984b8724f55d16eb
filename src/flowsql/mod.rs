pub mod catalog;
pub mod schema;
pub mod serialization;
pub mod sql;
