//! Resolved table mappings.

use bulkgraph_core::{
    BatchColumn, EntityRef, EntityType, ErasedField, FieldValue, NavigationEdge, SemanticType,
    TableName,
};

/// Catalog metadata for one destination column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    pub nullable: bool,
    /// Assigned by the database on insert (identity, serial, default).
    pub generated_on_insert: bool,
    /// Position in the catalog; mapped columns are ordered by it.
    pub ordinal: u32,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType, ordinal: u32) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            nullable: false,
            generated_on_insert: false,
            ordinal,
        }
    }

    #[must_use]
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    #[must_use]
    pub const fn generated(mut self, value: bool) -> Self {
        self.generated_on_insert = value;
        self
    }

    /// The batch column this descriptor transfers as.
    pub fn batch_column(&self) -> BatchColumn {
        BatchColumn {
            name: self.name.clone(),
            semantic_type: self.semantic_type,
            nullable: self.nullable,
        }
    }
}

/// What a catalog knows about a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub table: TableName,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescription {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }
}

/// A column paired with the accessor that reads it.
#[derive(Debug, Clone)]
pub struct MappedColumn {
    pub descriptor: ColumnDescriptor,
    field: ErasedField,
}

impl MappedColumn {
    pub(crate) fn new(descriptor: ColumnDescriptor, field: ErasedField) -> Self {
        Self { descriptor, field }
    }

    /// Read this column's field from `instance`; `None` if the instance has
    /// another type.
    pub fn read(&self, instance: &EntityRef) -> Option<FieldValue> {
        self.field.read(instance)
    }
}

/// The resolved mapping of one entity type.
#[derive(Debug, Clone)]
pub struct TableMapping {
    pub entity: EntityType,
    pub table: TableName,
    pub columns: Vec<MappedColumn>,
    pub edges: Vec<NavigationEdge>,
}

impl TableMapping {
    /// Columns that are sent on insert, in mapping order.
    ///
    /// Generated columns are left to the database unless `include_generated`.
    pub fn insert_columns(&self, include_generated: bool) -> Vec<&MappedColumn> {
        self.columns
            .iter()
            .filter(|c| include_generated || !c.descriptor.generated_on_insert)
            .collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&MappedColumn> {
        self.columns.iter().find(|c| c.descriptor.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.descriptor.name.as_str())
            .collect()
    }
}
