//! Level-order traversal of entity graphs into load units.
//!
//! The walker turns a set of root instances into a sequence of [`LoadUnit`]s:
//! one per entity type per level, parents strictly before the instances they
//! reference. Every instance is emitted at most once, which also guarantees
//! termination on cyclic graphs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use bulkgraph_core::{EntityModel, EntityRef, EntityType, Result, TraversalError};
use bulkgraph_schema::{SchemaCatalog, SchemaResolver, TableMapping};

/// A batch of same-type instances bound for one table.
#[derive(Debug, Clone)]
pub struct LoadUnit {
    pub entity: EntityType,
    pub mapping: Arc<TableMapping>,
    /// Instances in first-discovered order.
    pub instances: Vec<EntityRef>,
    /// Distance from the roots; roots are level 0.
    pub level: usize,
}

impl LoadUnit {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

struct PendingGroup {
    entity: EntityType,
    model: fn() -> EntityModel,
    instances: Vec<EntityRef>,
}

/// Instances discovered for the next level, grouped by type in discovery order.
#[derive(Default)]
struct LevelBuilder {
    groups: Vec<PendingGroup>,
    index: HashMap<EntityType, usize>,
}

impl LevelBuilder {
    fn push(&mut self, instance: EntityRef, model: fn() -> EntityModel) {
        let entity = instance.entity_type();
        let slot = *self.index.entry(entity).or_insert_with(|| {
            self.groups.push(PendingGroup {
                entity,
                model,
                instances: Vec::new(),
            });
            self.groups.len() - 1
        });
        self.groups[slot].instances.push(instance);
    }

    fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Iterator over the load units of an entity graph.
///
/// Yields `Err` at most once; iteration ends after an error.
pub struct GraphWalker<'r, C> {
    resolver: &'r SchemaResolver<C>,
    current: VecDeque<LoadUnit>,
    next: LevelBuilder,
    next_level: usize,
    /// Holds a handle to every instance seen so its address cannot be reused
    /// by a later allocation while the walk is in progress.
    visited: HashMap<EntityType, HashSet<EntityRef>>,
    done: bool,
}

impl<'r, C: SchemaCatalog> GraphWalker<'r, C> {
    /// Walk the graph reachable from `roots`.
    ///
    /// Roots may mix entity types; repeated roots are collapsed.
    pub fn new(resolver: &'r SchemaResolver<C>, roots: impl IntoIterator<Item = EntityRef>) -> Self {
        let mut walker = Self {
            resolver,
            current: VecDeque::new(),
            next: LevelBuilder::default(),
            next_level: 0,
            visited: HashMap::new(),
            done: false,
        };
        for root in roots {
            let model = root.model_fn();
            walker.discover(root, model);
        }
        walker
    }

    /// Queue `instance` for the next level unless it was seen before.
    fn discover(&mut self, instance: EntityRef, model: fn() -> EntityModel) {
        let first_visit = self
            .visited
            .entry(instance.entity_type())
            .or_default()
            .insert(instance.clone());
        if first_visit {
            self.next.push(instance, model);
        }
    }

    /// Follow every edge of `unit`, queueing unseen targets.
    fn expand(&mut self, unit: &LoadUnit) -> Result<()> {
        for edge in &unit.mapping.edges {
            for instance in &unit.instances {
                let related = edge.related(instance).map_err(|e| {
                    TraversalError::new(unit.entity.name(), edge.name(), e.message.clone())
                        .source(e)
                })?;
                for target in related {
                    self.discover(target, edge.target_model_fn());
                }
            }
        }
        Ok(())
    }

    /// Turn the pending level into load units.
    fn promote(&mut self) -> Result<()> {
        let level = self.next_level;
        self.next_level += 1;
        for group in std::mem::take(&mut self.next).groups {
            let mapping = self.resolver.resolve_type(group.entity, group.model)?;
            self.current.push_back(LoadUnit {
                entity: group.entity,
                mapping,
                instances: group.instances,
                level,
            });
        }
        tracing::debug!(level, units = self.current.len(), "Walker advanced a level");
        Ok(())
    }
}

impl<C: SchemaCatalog> Iterator for GraphWalker<'_, C> {
    type Item = Result<LoadUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.current.is_empty() {
            if self.next.is_empty() {
                self.done = true;
                return None;
            }
            if let Err(e) = self.promote() {
                self.done = true;
                return Some(Err(e));
            }
        }
        let unit = self.current.pop_front()?;
        if let Err(e) = self.expand(&unit) {
            self.done = true;
            return Some(Err(e));
        }
        Some(Ok(unit))
    }
}
