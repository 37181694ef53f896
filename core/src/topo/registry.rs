use super::{EntityId, IdGenerator};
use crate::entity::{BooleanOutcome, Entity, EntityBuilder, EntityKind};
use crate::error::ModelResult;
use crate::kernel::GeometryKernel;
use std::collections::BTreeMap;
use tracing::debug;

/// The set of entities in a model, keyed by identity.
///
/// Every entity built through [`EntityRegistry::create`] draws its identity
/// from the registry's own generator.
#[derive(Debug)]
pub struct EntityRegistry<K: GeometryKernel> {
    ids: IdGenerator,
    entities: BTreeMap<EntityId, Entity<K>>,
}

impl<K: GeometryKernel> Default for EntityRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: GeometryKernel> EntityRegistry<K> {
    pub fn new() -> Self {
        Self::with_generator(IdGenerator::new())
    }

    /// Share an existing generator, e.g. across several registries.
    pub fn with_generator(ids: IdGenerator) -> Self {
        Self {
            ids,
            entities: BTreeMap::new(),
        }
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Build and register an entity.
    pub fn create(&mut self, kernel: &K, builder: EntityBuilder<K>) -> ModelResult<EntityId> {
        let entity = builder.build(kernel, &self.ids)?;
        Ok(self.register(entity))
    }

    /// Register an already-built entity, replacing any with the same id.
    pub fn register(&mut self, entity: Entity<K>) -> EntityId {
        let id = entity.id();
        if self.entities.insert(id, entity).is_some() {
            debug!(%id, "replaced registered entity");
        }
        id
    }

    pub fn resolve(&self, id: EntityId) -> Option<&Entity<K>> {
        self.entities.get(&id)
    }

    pub fn resolve_mut(&mut self, id: EntityId) -> Option<&mut Entity<K>> {
        self.entities.get_mut(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity<K>> {
        self.entities.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity<K>> {
        self.entities.values()
    }

    pub fn by_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Entity<K>> + 'a {
        self.iter().filter(move |e| e.label() == label)
    }

    pub fn by_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity<K>> {
        self.iter().filter(move |e| e.kind() == kind)
    }

    pub fn with_metadata_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Entity<K>> + 'a {
        self.iter().filter(move |e| e.get_metadata(key).is_some())
    }

    /// Split `target` with `tool`, both registered. Returns `None` when
    /// either id is unknown or both name the same entity.
    pub fn split_pair(
        &mut self,
        kernel: &K,
        target: EntityId,
        tool: EntityId,
        split_both: bool,
    ) -> Option<BooleanOutcome> {
        if target == tool || !self.contains(target) {
            return None;
        }
        let mut tool_entity = self.entities.remove(&tool)?;
        let outcome = self
            .entities
            .get_mut(&target)
            .map(|entity| entity.split(kernel, &mut tool_entity, split_both));
        self.entities.insert(tool, tool_entity);
        outcome
    }

    /// Split every pair of `parts` against each other, each pair once and
    /// in the order given. Returns the outcome of every attempted pair.
    pub fn split_parts(&mut self, kernel: &K, parts: &[EntityId]) -> Vec<((EntityId, EntityId), BooleanOutcome)> {
        let mut outcomes = Vec::new();
        for (i, &a) in parts.iter().enumerate() {
            for &b in &parts[i + 1..] {
                if let Some(outcome) = self.split_pair(kernel, a, b, true) {
                    outcomes.push(((a, b), outcome));
                }
            }
        }
        outcomes
    }
}
