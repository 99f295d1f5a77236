//! Navigation edges between entity types.
//!
//! A navigation is a named, typed accessor from an instance of one entity type
//! to zero, one, or many instances of another. Reading a navigation may fail
//! (for example a [`Lazy`] relationship that was never loaded), and that
//! failure aborts the whole load.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::entity::{Entity, EntityModel, EntityRef, EntityType};

/// Result type returned by navigation accessors.
pub type NavigationResult<T> = std::result::Result<T, NavigationError>;

/// How many instances a navigation yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Zero or one related instance (many-to-one, one-to-one).
    ToOne,
    /// Any number of related instances (one-to-many).
    ToMany,
}

/// Failure reported by a navigation accessor.
#[derive(Debug)]
pub struct NavigationError {
    pub message: String,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl NavigationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for NavigationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

type EdgeReader = Arc<dyn Fn(&EntityRef) -> NavigationResult<Vec<EntityRef>> + Send + Sync>;

/// A typed navigation declared by entity `E`.
pub struct Navigation<E> {
    name: &'static str,
    cardinality: Cardinality,
    target: EntityType,
    target_model: fn() -> EntityModel,
    read: Box<dyn Fn(&E) -> NavigationResult<Vec<EntityRef>> + Send + Sync>,
}

impl<E: Entity> Navigation<E> {
    /// A navigation yielding at most one `T`.
    pub fn to_one<T, F>(name: &'static str, read: F) -> Self
    where
        T: Entity,
        F: Fn(&E) -> NavigationResult<Option<Arc<T>>> + Send + Sync + 'static,
    {
        Self {
            name,
            cardinality: Cardinality::ToOne,
            target: EntityType::of::<T>(),
            target_model: EntityModel::of::<T>,
            read: Box::new(move |e: &E| -> NavigationResult<Vec<EntityRef>> {
                Ok(read(e)?.into_iter().map(EntityRef::new).collect())
            }),
        }
    }

    /// A navigation yielding any number of `T`, in collection order.
    pub fn to_many<T, F>(name: &'static str, read: F) -> Self
    where
        T: Entity,
        F: Fn(&E) -> NavigationResult<Vec<Arc<T>>> + Send + Sync + 'static,
    {
        Self {
            name,
            cardinality: Cardinality::ToMany,
            target: EntityType::of::<T>(),
            target_model: EntityModel::of::<T>,
            read: Box::new(move |e: &E| -> NavigationResult<Vec<EntityRef>> {
                Ok(read(e)?.into_iter().map(EntityRef::new).collect())
            }),
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub(crate) fn erase(self) -> NavigationEdge {
        let read = self.read;
        let owner = EntityType::of::<E>();
        NavigationEdge {
            name: self.name,
            cardinality: self.cardinality,
            target: self.target,
            target_model: self.target_model,
            read: Arc::new(move |obj: &EntityRef| match obj.downcast_ref::<E>() {
                Some(e) => read(e),
                None => Err(NavigationError::new(format!(
                    "instance of {} read through a navigation of {}",
                    obj.entity_type(),
                    owner
                ))),
            }),
        }
    }
}

/// A navigation with its owning entity type erased.
#[derive(Clone)]
pub struct NavigationEdge {
    name: &'static str,
    cardinality: Cardinality,
    target: EntityType,
    target_model: fn() -> EntityModel,
    read: EdgeReader,
}

impl NavigationEdge {
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// The entity type this edge points at.
    pub const fn target(&self) -> EntityType {
        self.target
    }

    /// Build the model of the target entity type.
    pub fn target_model(&self) -> EntityModel {
        (self.target_model)()
    }

    /// Factory for the target model, for deferred resolution.
    pub const fn target_model_fn(&self) -> fn() -> EntityModel {
        self.target_model
    }

    /// Instances reachable from `instance` through this edge.
    pub fn related(&self, instance: &EntityRef) -> NavigationResult<Vec<EntityRef>> {
        (self.read)(instance)
    }
}

impl fmt::Debug for NavigationEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationEdge")
            .field("name", &self.name)
            .field("cardinality", &self.cardinality)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// A relationship value that may not have been loaded.
///
/// Reading an unloaded relationship through a navigation fails with a
/// [`NavigationError`] instead of silently yielding nothing.
#[derive(Debug, Clone, Default)]
pub enum Lazy<T> {
    Loaded(T),
    #[default]
    Unloaded,
}

impl<T> Lazy<T> {
    pub const fn loaded(value: T) -> Self {
        Lazy::Loaded(value)
    }

    pub const fn unloaded() -> Self {
        Lazy::Unloaded
    }

    pub const fn is_loaded(&self) -> bool {
        matches!(self, Lazy::Loaded(_))
    }

    /// Borrow the loaded value.
    pub fn get(&self) -> NavigationResult<&T> {
        match self {
            Lazy::Loaded(v) => Ok(v),
            Lazy::Unloaded => Err(NavigationError::new("relationship not loaded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Field;
    use crate::types::SemanticType;
    use crate::value::ToFieldValue;

    struct Customer {
        id: i64,
        orders: Lazy<Vec<Arc<Order>>>,
    }

    struct Order {
        id: i64,
        customer: Option<Arc<Customer>>,
    }

    impl Entity for Customer {
        const TABLE_NAME: &'static str = "customers";

        fn fields() -> Vec<Field<Self>> {
            vec![Field::new("id", SemanticType::Long, |c: &Customer| {
                c.id.to_field_value()
            })]
        }

        fn navigations() -> Vec<Navigation<Self>> {
            vec![Navigation::to_many("orders", |c: &Customer| {
                Ok(c.orders.get()?.clone())
            })]
        }
    }

    impl Entity for Order {
        const TABLE_NAME: &'static str = "orders";

        fn fields() -> Vec<Field<Self>> {
            vec![Field::new("id", SemanticType::Long, |o: &Order| {
                o.id.to_field_value()
            })]
        }

        fn navigations() -> Vec<Navigation<Self>> {
            vec![Navigation::to_one("customer", |o: &Order| {
                Ok(o.customer.clone())
            })]
        }
    }

    #[test]
    fn test_to_many_yields_in_collection_order() {
        let a = Arc::new(Order { id: 1, customer: None });
        let b = Arc::new(Order { id: 2, customer: None });
        let customer = EntityRef::new(Arc::new(Customer {
            id: 9,
            orders: Lazy::loaded(vec![Arc::clone(&a), Arc::clone(&b)]),
        }));
        let model = EntityModel::of::<Customer>();
        let edge = &model.navigations()[0];
        assert_eq!(edge.cardinality(), Cardinality::ToMany);
        assert_eq!(edge.target(), EntityType::of::<Order>());

        let related = edge.related(&customer).unwrap();
        assert_eq!(related, vec![EntityRef::new(a), EntityRef::new(b)]);
    }

    #[test]
    fn test_to_one_none_yields_nothing() {
        let order = EntityRef::new(Arc::new(Order { id: 1, customer: None }));
        let model = EntityModel::of::<Order>();
        let edge = &model.navigations()[0];
        assert_eq!(edge.cardinality(), Cardinality::ToOne);
        assert!(edge.related(&order).unwrap().is_empty());
    }

    #[test]
    fn test_unloaded_lazy_fails() {
        let customer = EntityRef::new(Arc::new(Customer {
            id: 9,
            orders: Lazy::unloaded(),
        }));
        let model = EntityModel::of::<Customer>();
        let err = model.navigations()[0].related(&customer).unwrap_err();
        assert_eq!(err.message, "relationship not loaded");
    }

    #[test]
    fn test_foreign_instance_is_rejected() {
        let order = EntityRef::new(Arc::new(Order { id: 1, customer: None }));
        let model = EntityModel::of::<Customer>();
        assert!(model.navigations()[0].related(&order).is_err());
    }
}
