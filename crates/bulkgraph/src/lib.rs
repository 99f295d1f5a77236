//! Bulk-load in-memory entity graphs into relational tables.
//!
//! `bulkgraph` walks an object graph from a set of roots, groups every
//! reachable instance by type and depth, and streams each group into its table
//! through the database's native bulk-copy channel. The whole cascade runs in
//! one unit of work: parents land before children, every instance is written
//! once, and any failure rolls everything back.
//!
//! This crate is a facade. The pieces live in:
//!
//! - `bulkgraph-core`: values, the [`Entity`] trait, errors, [`LoadConfig`],
//!   and the backend contracts ([`UnitOfWork`], [`ConnectionProvider`],
//!   [`BulkTransfer`])
//! - `bulkgraph-schema`: [`SchemaResolver`] and the schema catalogs
//! - `bulkgraph-load`: [`GraphWalker`], [`BatchLoader`] and [`BulkLoader`]
//! - `bulkgraph-postgres` (feature `postgres`): `COPY FROM STDIN` backend
//!
//! # Example
//!
//! ```ignore
//! use bulkgraph::prelude::*;
//!
//! struct Customer { id: i64, orders: Vec<Arc<Order>> }
//! struct Order { id: i64, customer_id: i64 }
//!
//! impl Entity for Customer {
//!     const TABLE_NAME: &'static str = "customers";
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![Field::new("id", SemanticType::Long, |c: &Customer| c.id.to_field_value())]
//!     }
//!     fn navigations() -> Vec<Navigation<Self>> {
//!         vec![Navigation::to_many("orders", |c: &Customer| Ok(c.orders.clone()))]
//!     }
//! }
//!
//! let loader = BulkLoader::new(PgCopyTransfer::new())
//!     .with_config(LoadConfig::new().batch_size(5_000));
//! let rows = loader.bulk_insert(&cx, &mut session, &customers).await;
//! ```

pub use bulkgraph_core::{
    BatchColumn, BulkRequest, BulkTransfer, Cardinality, ColumnBatch, ConfigError,
    ConnectionProvider, Cx, Entity, EntityModel, EntityRef, EntityType, Error, ErrorKind, Field,
    FieldValue, Lazy, LoadConfig, MaterializationError, MaterializationErrorKind, Navigation,
    NavigationEdge, NavigationError, NavigationResult, Outcome, Result, SchemaError, SemanticType,
    TableName, ToFieldValue, TransferError, TransferErrorKind, TraversalError, UnitOfWork,
    UnitOfWorkError, Value, quote_ident,
};
pub use bulkgraph_load::{
    BatchLoader, BulkLoader, ChannelOf, GraphWalker, LoadReport, LoadUnit, RowMaterializer,
    UnitReport,
};
pub use bulkgraph_schema::{
    ColumnDescriptor, MappedColumn, ModelCatalog, SchemaCatalog, SchemaResolver, StaticCatalog,
    TableDescription, TableMapping,
};

#[cfg(feature = "postgres")]
pub use bulkgraph_postgres as postgres;

/// Everything needed to describe entities and run a load.
pub mod prelude {
    pub use std::sync::Arc;

    pub use bulkgraph_core::{
        BulkTransfer, ConnectionProvider, Cx, Entity, Error, Field, Lazy, LoadConfig, Navigation,
        Outcome, SemanticType, TableName, ToFieldValue, UnitOfWork, Value,
    };
    pub use bulkgraph_load::{BulkLoader, LoadReport};
    pub use bulkgraph_schema::{SchemaResolver, StaticCatalog};

    #[cfg(feature = "postgres")]
    pub use bulkgraph_postgres::{PgCopyTransfer, PgSession};
}
