//! Entity descriptions and type-erased entity handles.
//!
//! An [`Entity`] describes itself statically: its table, its columns with a
//! bound field accessor each, and its navigation edges. [`EntityModel`] is the
//! type-erased form of that description, built once per type, and
//! [`EntityRef`] is a shared handle to one caller-owned instance.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bulkgraph_core::{Entity, Field, Navigation, SemanticType, ToFieldValue};
//!
//! struct Team {
//!     id: i64,
//!     name: String,
//!     heroes: Vec<Arc<Hero>>,
//! }
//!
//! struct Hero {
//!     id: i64,
//!     team_id: i64,
//!     nickname: Option<String>,
//! }
//!
//! impl Entity for Team {
//!     const TABLE_NAME: &'static str = "teams";
//!
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![
//!             Field::new("id", SemanticType::Long, |t: &Team| t.id.to_field_value()).primary_key(),
//!             Field::new("name", SemanticType::String, |t: &Team| t.name.to_field_value()),
//!         ]
//!     }
//!
//!     fn navigations() -> Vec<Navigation<Self>> {
//!         vec![Navigation::to_many("heroes", |t: &Team| Ok(t.heroes.clone()))]
//!     }
//! }
//!
//! impl Entity for Hero {
//!     const TABLE_NAME: &'static str = "heroes";
//!
//!     fn fields() -> Vec<Field<Self>> {
//!         vec![
//!             Field::new("id", SemanticType::Long, |h: &Hero| h.id.to_field_value()),
//!             Field::new("team_id", SemanticType::Long, |h: &Hero| h.team_id.to_field_value()),
//!             Field::new("nickname", SemanticType::String, |h: &Hero| h.nickname.to_field_value())
//!                 .nullable(),
//!         ]
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::relationship::{Navigation, NavigationEdge};
use crate::types::SemanticType;
use crate::value::FieldValue;

/// Identity of an entity type: its `TypeId` plus a readable name.
#[derive(Clone, Copy)]
pub struct EntityType {
    id: TypeId,
    name: &'static str,
}

impl EntityType {
    /// The entity type of `E`.
    #[must_use]
    pub fn of<E: 'static>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: short_type_name(std::any::type_name::<E>()),
        }
    }

    /// The underlying `TypeId`.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Short type name (last path segment), used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Column metadata declared by an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Database column name.
    pub column_name: &'static str,
    /// Semantic type of the column.
    pub semantic_type: SemanticType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the database assigns this column on insert (identity, serial).
    pub generated_on_insert: bool,
    /// Whether this column is (part of) the primary key.
    pub primary_key: bool,
}

impl FieldInfo {
    /// Create field metadata with the given column name and type.
    pub const fn new(column_name: &'static str, semantic_type: SemanticType) -> Self {
        Self {
            column_name,
            semantic_type,
            nullable: false,
            generated_on_insert: false,
            primary_key: false,
        }
    }
}

/// A typed column accessor: metadata plus a function reading the field.
pub struct Field<E> {
    pub info: FieldInfo,
    read: Arc<dyn Fn(&E) -> FieldValue + Send + Sync>,
}

impl<E: 'static> Field<E> {
    /// Declare a column backed by `read`.
    pub fn new<F>(column_name: &'static str, semantic_type: SemanticType, read: F) -> Self
    where
        F: Fn(&E) -> FieldValue + Send + Sync + 'static,
    {
        Self {
            info: FieldInfo::new(column_name, semantic_type),
            read: Arc::new(read),
        }
    }

    /// Mark the column nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.info.nullable = true;
        self
    }

    /// Mark the column as assigned by the database on insert.
    #[must_use]
    pub fn generated(mut self) -> Self {
        self.info.generated_on_insert = true;
        self
    }

    /// Mark the column as a primary key column.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.info.primary_key = true;
        self
    }

    /// Read this field from an instance.
    pub fn read(&self, entity: &E) -> FieldValue {
        (self.read)(entity)
    }

    fn erase(self) -> ErasedField
    where
        E: Entity,
    {
        let read = self.read;
        ErasedField {
            info: self.info,
            reader: Arc::new(move |obj: &EntityRef| obj.downcast_ref::<E>().map(|e| read(e))),
        }
    }
}

type FieldReader = Arc<dyn Fn(&EntityRef) -> Option<FieldValue> + Send + Sync>;

/// A field accessor with the entity type erased.
#[derive(Clone)]
pub struct ErasedField {
    pub info: FieldInfo,
    reader: FieldReader,
}

impl ErasedField {
    /// Read the field from `instance`.
    ///
    /// Returns `None` when `instance` is not of the type this field belongs to.
    pub fn read(&self, instance: &EntityRef) -> Option<FieldValue> {
        (self.reader)(instance)
    }
}

impl fmt::Debug for ErasedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedField")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// A type that can be bulk-loaded.
///
/// Implementations describe the destination table and provide the accessor
/// table used to read columns and follow relationships. The description must
/// depend only on the type, never on instance data.
pub trait Entity: Send + Sync + Sized + 'static {
    /// Destination table name.
    const TABLE_NAME: &'static str;

    /// Destination schema qualifier, if any.
    const SCHEMA: Option<&'static str> = None;

    /// Columns in declaration order.
    fn fields() -> Vec<Field<Self>>;

    /// Outgoing navigation edges.
    fn navigations() -> Vec<Navigation<Self>> {
        Vec::new()
    }
}

/// The type-erased description of an [`Entity`] type.
#[derive(Clone)]
pub struct EntityModel {
    entity: EntityType,
    table_name: &'static str,
    schema: Option<&'static str>,
    fields: Vec<ErasedField>,
    navigations: Vec<NavigationEdge>,
}

impl EntityModel {
    /// Build the model for `E`.
    #[must_use]
    pub fn of<E: Entity>() -> Self {
        Self {
            entity: EntityType::of::<E>(),
            table_name: E::TABLE_NAME,
            schema: E::SCHEMA,
            fields: E::fields().into_iter().map(Field::erase).collect(),
            navigations: E::navigations()
                .into_iter()
                .map(Navigation::erase)
                .collect(),
        }
    }

    pub const fn entity_type(&self) -> EntityType {
        self.entity
    }

    pub const fn table_name(&self) -> &'static str {
        self.table_name
    }

    pub const fn schema(&self) -> Option<&'static str> {
        self.schema
    }

    pub fn fields(&self) -> &[ErasedField] {
        &self.fields
    }

    /// Look up a field by column name.
    pub fn field(&self, column_name: &str) -> Option<&ErasedField> {
        self.fields
            .iter()
            .find(|f| f.info.column_name == column_name)
    }

    pub fn navigations(&self) -> &[NavigationEdge] {
        &self.navigations
    }
}

impl fmt::Debug for EntityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityModel")
            .field("entity", &self.entity)
            .field("table_name", &self.table_name)
            .field("schema", &self.schema)
            .field("fields", &self.fields.len())
            .field("navigations", &self.navigations.len())
            .finish()
    }
}

/// A shared handle to one caller-owned entity instance.
///
/// Equality and hashing are by identity (the allocation address), never by
/// field values: two distinct objects with identical fields are distinct rows.
#[derive(Clone)]
pub struct EntityRef {
    entity: EntityType,
    model: fn() -> EntityModel,
    object: Arc<dyn Any + Send + Sync>,
}

impl EntityRef {
    /// Wrap a shared instance.
    pub fn new<E: Entity>(instance: Arc<E>) -> Self {
        let object: Arc<dyn Any + Send + Sync> = instance;
        Self {
            entity: EntityType::of::<E>(),
            model: EntityModel::of::<E>,
            object,
        }
    }

    pub const fn entity_type(&self) -> EntityType {
        self.entity
    }

    /// Build the model describing this instance's type.
    pub fn model(&self) -> EntityModel {
        (self.model)()
    }

    /// Factory for this instance's model, for deferred resolution.
    pub const fn model_fn(&self) -> fn() -> EntityModel {
        self.model
    }

    /// Identity of the referenced instance.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.object).cast::<()>() as usize
    }

    /// Borrow the instance as `E`.
    pub fn downcast_ref<E: 'static>(&self) -> Option<&E> {
        self.object.downcast_ref::<E>()
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for EntityRef {}

impl Hash for EntityRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityRef({}@{:#x})", self.entity, self.identity())
    }
}
