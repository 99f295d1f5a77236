//! Cached schema resolution.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use bulkgraph_core::{Entity, EntityModel, EntityType, Result, SchemaError};

use crate::catalog::{ModelCatalog, SchemaCatalog};
use crate::mapping::{MappedColumn, TableDescription, TableMapping};

/// Resolves entity types to [`TableMapping`]s and caches the results.
///
/// A mapping depends only on the entity type, so each type is described by
/// the catalog at most once until [`invalidate`](Self::invalidate) is called.
pub struct SchemaResolver<C = ModelCatalog> {
    catalog: C,
    cache: RwLock<HashMap<EntityType, Arc<TableMapping>>>,
}

impl Default for SchemaResolver<ModelCatalog> {
    fn default() -> Self {
        Self::new(ModelCatalog)
    }
}

impl<C: SchemaCatalog> SchemaResolver<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Resolve the mapping of `E`.
    pub fn resolve_entity<E: Entity>(&self) -> Result<Arc<TableMapping>> {
        self.resolve_type(EntityType::of::<E>(), EntityModel::of::<E>)
    }

    /// Resolve the mapping described by `model`.
    pub fn resolve(&self, model: &EntityModel) -> Result<Arc<TableMapping>> {
        let entity = model.entity_type();
        if let Some(mapping) = self.cached(entity) {
            return Ok(mapping);
        }
        self.build_and_cache(model)
    }

    /// Resolve `entity`, building its model with `model` only on a cache miss.
    pub fn resolve_type(
        &self,
        entity: EntityType,
        model: fn() -> EntityModel,
    ) -> Result<Arc<TableMapping>> {
        if let Some(mapping) = self.cached(entity) {
            return Ok(mapping);
        }
        self.build_and_cache(&model())
    }

    /// Resolve `root` and every type reachable from it through navigation
    /// edges, in breadth-first discovery order.
    ///
    /// Works on types only; no instance is touched. Used to surface schema
    /// errors before any data moves.
    #[tracing::instrument(level = "debug", skip(self, root), fields(root = %root.entity_type()))]
    pub fn resolve_closure(&self, root: &EntityModel) -> Result<Vec<Arc<TableMapping>>> {
        let first = self.resolve(root)?;
        let mut seen: HashSet<EntityType> = HashSet::from([first.entity]);
        let mut queue: VecDeque<Arc<TableMapping>> = VecDeque::from([Arc::clone(&first)]);
        let mut resolved = vec![first];

        while let Some(mapping) = queue.pop_front() {
            for edge in &mapping.edges {
                if !seen.insert(edge.target()) {
                    continue;
                }
                let target = self.resolve_type(edge.target(), edge.target_model_fn())?;
                queue.push_back(Arc::clone(&target));
                resolved.push(target);
            }
        }

        tracing::debug!(types = resolved.len(), "Resolved schema closure");
        Ok(resolved)
    }

    /// Drop every cached mapping.
    pub fn invalidate(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached mappings.
    pub fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cached(&self, entity: EntityType) -> Option<Arc<TableMapping>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&entity)
            .cloned()
    }

    fn build_and_cache(&self, model: &EntityModel) -> Result<Arc<TableMapping>> {
        let description = self.catalog.describe(model)?;
        let mapping = Arc::new(bind(model, description)?);

        tracing::debug!(
            entity = %mapping.entity,
            table = %mapping.table,
            columns = mapping.columns.len(),
            edges = mapping.edges.len(),
            "Resolved table mapping"
        );

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(mapping.entity).or_insert(mapping)))
    }
}

/// Pair every described column with its field accessor.
fn bind(model: &EntityModel, description: TableDescription) -> Result<TableMapping> {
    let entity = model.entity_type();
    let table = description.table;
    let schema_error =
        |message: String| SchemaError::new(entity.name(), message).table(table.to_string());

    if description.columns.is_empty() {
        return Err(schema_error("catalog describes no columns".to_string()).into());
    }

    let mut names = HashSet::new();
    for column in &description.columns {
        if !names.insert(column.name.as_str()) {
            return Err(schema_error(format!("duplicate column {}", column.name)).into());
        }
    }

    let mut descriptors = description.columns;
    descriptors.sort_by_key(|c| c.ordinal);

    let mut columns = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let Some(field) = model.field(&descriptor.name) else {
            return Err(
                schema_error(format!("column {} has no field accessor", descriptor.name)).into(),
            );
        };
        columns.push(MappedColumn::new(descriptor, field.clone()));
    }

    Ok(TableMapping {
        entity,
        table,
        columns,
        edges: model.navigations().to_vec(),
    })
}
