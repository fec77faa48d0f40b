//! World wrapper providing helper methods for entity management

use super::components::{GlobalTransform, Parent, Transform};
use hecs::Entity;
use tracing::debug;

/// Wrapper around hecs::World providing additional helper methods
pub struct World {
    inner: hecs::World,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.inner.len())
            .finish()
    }
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn a new entity with the given components
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Get a reference to a component on an entity
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Query a single entity for a mutable component reference
    pub fn query_one_mut<Q: hecs::Query>(
        &mut self,
        entity: Entity,
    ) -> Result<Q::Item<'_>, hecs::QueryOneError> {
        self.inner.query_one_mut::<Q>(entity)
    }

    /// Insert a component into an entity
    pub fn insert_one(
        &mut self,
        entity: Entity,
        component: impl hecs::Component,
    ) -> Result<(), hecs::NoSuchEntity> {
        self.inner.insert_one(entity, component)
    }

    /// Remove a component from an entity
    pub fn remove_one<T: hecs::Component>(&mut self, entity: Entity) -> Result<T, hecs::ComponentError> {
        self.inner.remove_one::<T>(entity)
    }

    /// Query entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query()
    }

    /// Despawn an entity and all its components
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Helper method to spawn an entity with required transform components
    /// This ensures that entities have both Transform and GlobalTransform
    pub fn spawn_with_transform(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        let entity = self.spawn(components);

        // Auto-add Transform if missing
        if self.get::<Transform>(entity).is_err() {
            let _ = self.insert_one(entity, Transform::default());
            debug!(entity = ?entity, "Auto-added Transform component");
        }

        // Auto-add GlobalTransform if missing
        if self.get::<GlobalTransform>(entity).is_err() {
            let _ = self.insert_one(entity, GlobalTransform::default());
            debug!(entity = ?entity, "Auto-added GlobalTransform component");
        }

        entity
    }

    /// Spawn an entity with a local transform as a child of `parent`
    ///
    /// The new node is appended to the parent; existing children are untouched.
    pub fn spawn_child(
        &mut self,
        parent: Entity,
        transform: Transform,
        components: impl hecs::DynamicBundle,
    ) -> Entity {
        let entity = self.spawn(components);
        let _ = self.insert_one(entity, transform);
        let _ = self.insert_one(entity, GlobalTransform::default());
        let _ = self.insert_one(entity, Parent(parent));
        entity
    }

    /// Parent of an entity, if it has one
    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.get::<Parent>(entity).ok().map(|parent| parent.0)
    }

    /// Re-parent an entity; `None` detaches it into a root
    pub fn set_parent(
        &mut self,
        entity: Entity,
        parent: Option<Entity>,
    ) -> Result<(), hecs::NoSuchEntity> {
        match parent {
            Some(parent) => self.insert_one(entity, Parent(parent)),
            None => {
                if !self.contains(entity) {
                    return Err(hecs::NoSuchEntity);
                }
                let _ = self.remove_one::<Parent>(entity);
                Ok(())
            }
        }
    }

    /// Direct children of an entity, in no particular order
    pub fn children_of(&self, entity: Entity) -> Vec<Entity> {
        self.inner
            .query::<&Parent>()
            .iter()
            .filter(|(_, parent)| parent.0 == entity)
            .map(|(child, _)| child)
            .collect()
    }

    /// Local transform of an entity, identity when it has none
    pub fn local_transform(&self, entity: Entity) -> Transform {
        self.get::<Transform>(entity)
            .map(|transform| *transform)
            .unwrap_or_default()
    }

    /// Overwrite the local transform of an entity
    pub fn set_local_transform(
        &mut self,
        entity: Entity,
        transform: Transform,
    ) -> Result<(), hecs::NoSuchEntity> {
        match self.inner.query_one_mut::<&mut Transform>(entity) {
            Ok(current) => {
                *current = transform;
                Ok(())
            }
            Err(_) => self.insert_one(entity, transform),
        }
    }

    /// Get mutable access to the inner hecs::World for advanced operations
    pub fn inner_mut(&mut self) -> &mut hecs::World {
        &mut self.inner
    }
}
