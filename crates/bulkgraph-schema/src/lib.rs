//! Schema resolution for bulkgraph.
//!
//! `bulkgraph-schema` turns an entity type into a [`TableMapping`]: the
//! destination table, its ordered columns with a bound field accessor each,
//! and the navigation edges the graph walker follows.
//!
//! Column metadata comes from a [`SchemaCatalog`]. [`ModelCatalog`] derives it
//! from the entity's own declaration; [`StaticCatalog`] holds descriptions the
//! caller registered (for example from database introspection).
//!
//! Mappings depend only on the type and are cached by [`SchemaResolver`].

pub mod catalog;
pub mod mapping;
pub mod resolver;

pub use bulkgraph_core::TableName;
pub use catalog::{ModelCatalog, SchemaCatalog, StaticCatalog};
pub use mapping::{ColumnDescriptor, MappedColumn, TableDescription, TableMapping};
pub use resolver::SchemaResolver;
