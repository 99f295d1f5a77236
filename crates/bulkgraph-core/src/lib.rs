//! Core types and traits for bulkgraph.
//!
//! `bulkgraph-core` is the **foundation layer** for the workspace. It defines the
//! data model and the collaborator contracts that the schema, load, and driver
//! crates build on.
//!
//! # Role In The Architecture
//!
//! - **Entity description**: `Entity` is implemented by user types; it exposes a
//!   precompiled accessor table (`Field`, `Navigation`) instead of runtime
//!   member lookup.
//! - **Data model**: `Value`, `FieldValue`, and `SemanticType` describe what a
//!   column holds; `ColumnBatch` is what travels to a bulk-transfer sink.
//! - **Collaborators**: `UnitOfWork`, `ConnectionProvider`, and `BulkTransfer`
//!   are implemented by database backends (see `bulkgraph-postgres`).
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync so
//!   every async operation is cancel-correct.
//!
//! Most applications should use the `bulkgraph` facade.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod batch;
pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod identifiers;
pub mod relationship;
pub mod types;
pub mod value;

pub use batch::{BatchColumn, BulkRequest, ColumnBatch};
pub use config::LoadConfig;
pub use connection::{BulkTransfer, ConnectionProvider, UnitOfWork};
pub use entity::{Entity, EntityModel, EntityRef, EntityType, ErasedField, Field, FieldInfo};
pub use error::{
    ConfigError, Error, ErrorKind, MaterializationError, MaterializationErrorKind, Result,
    SchemaError, TransferError, TransferErrorKind, TraversalError, UnitOfWorkError,
};
pub use identifiers::{TableName, quote_ident};
pub use relationship::{
    Cardinality, Lazy, Navigation, NavigationEdge, NavigationError, NavigationResult,
};
pub use types::SemanticType;
pub use value::{FieldValue, ToFieldValue, Value};
