//! Sources of table and column metadata.

use std::collections::HashMap;

use bulkgraph_core::{Entity, EntityModel, EntityType, Result, SchemaError, TableName};

use crate::mapping::{ColumnDescriptor, TableDescription};

/// Produces table metadata for an entity type.
pub trait SchemaCatalog: Send + Sync {
    /// Describe the destination table of `model`.
    fn describe(&self, model: &EntityModel) -> Result<TableDescription>;
}

impl<T: SchemaCatalog + ?Sized> SchemaCatalog for &T {
    fn describe(&self, model: &EntityModel) -> Result<TableDescription> {
        (**self).describe(model)
    }
}

/// Describes tables from the entity declarations themselves.
///
/// Columns take their declaration order as ordinal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelCatalog;

impl SchemaCatalog for ModelCatalog {
    fn describe(&self, model: &EntityModel) -> Result<TableDescription> {
        if model.table_name().is_empty() {
            return Err(
                SchemaError::new(model.entity_type().name(), "entity has no table name").into(),
            );
        }
        let table = match model.schema() {
            Some(schema) => TableName::qualified(schema, model.table_name()),
            None => TableName::new(model.table_name()),
        };
        let columns = model
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| {
                ColumnDescriptor::new(f.info.column_name, f.info.semantic_type, i as u32)
                    .nullable(f.info.nullable)
                    .generated(f.info.generated_on_insert)
            })
            .collect();
        Ok(TableDescription { table, columns })
    }
}

/// Caller-registered table descriptions keyed by entity type.
///
/// Types that were never registered fail to describe.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tables: HashMap<EntityType, TableDescription>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the description of `E`.
    #[must_use]
    pub fn with_table<E: Entity>(mut self, description: TableDescription) -> Self {
        self.register::<E>(description);
        self
    }

    /// Register (or replace) the description of `E`.
    pub fn register<E: Entity>(&mut self, description: TableDescription) {
        self.tables.insert(EntityType::of::<E>(), description);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl SchemaCatalog for StaticCatalog {
    fn describe(&self, model: &EntityModel) -> Result<TableDescription> {
        let entity = model.entity_type();
        self.tables.get(&entity).cloned().ok_or_else(|| {
            SchemaError::new(entity.name(), "entity type is not registered in the catalog").into()
        })
    }
}
