//! Hierarchy queries and the global transform update system

use super::components::{GlobalTransform, Parent, Transform};
use super::world::World;
use glam::Mat4;
use hecs::Entity;
use std::collections::HashSet;
use tracing::{error, trace};

/// Longest parent chain accepted before a walk is treated as corrupt
pub const MAX_HIERARCHY_DEPTH: usize = 1024;

/// Errors raised by parent-chain walks
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("cyclic parent chain detected at entity {0:?}")]
    Cycle(Entity),

    #[error("parent chain of entity {0:?} is deeper than the hierarchy limit")]
    TooDeep(Entity),

    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),
}

/// Ancestors of `entity`, nearest parent first and the root last
pub fn ancestors(world: &World, entity: Entity) -> Result<Vec<Entity>, HierarchyError> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(entity);

    let mut current = entity;
    while let Some(parent) = world.parent_of(current) {
        if !visited.insert(parent) {
            return Err(HierarchyError::Cycle(parent));
        }
        if chain.len() >= MAX_HIERARCHY_DEPTH {
            return Err(HierarchyError::TooDeep(entity));
        }
        chain.push(parent);
        current = parent;
    }
    Ok(chain)
}

/// Whether `entity` is a strict descendant of `ancestor`
pub fn is_descendant_of(
    world: &World,
    entity: Entity,
    ancestor: Entity,
) -> Result<bool, HierarchyError> {
    if entity == ancestor {
        return Ok(false);
    }
    Ok(ancestors(world, entity)?.contains(&ancestor))
}

/// Whether `entity` is `ancestor` or one of its descendants
pub fn is_descendant_or_self(
    world: &World,
    entity: Entity,
    ancestor: Entity,
) -> Result<bool, HierarchyError> {
    Ok(entity == ancestor || is_descendant_of(world, entity, ancestor)?)
}

/// Number of ancestors above `entity`
pub fn depth(world: &World, entity: Entity) -> Result<usize, HierarchyError> {
    ancestors(world, entity).map(|chain| chain.len())
}

/// World matrix of `entity`, composed from the local transforms along its parent chain
pub fn world_matrix(world: &World, entity: Entity) -> Result<Mat4, HierarchyError> {
    if !world.contains(entity) {
        return Err(HierarchyError::NoSuchEntity(entity));
    }
    let chain = ancestors(world, entity)?;
    let parent_matrix = chain
        .iter()
        .rev()
        .fold(Mat4::IDENTITY, |acc, ancestor| {
            acc * world.local_transform(*ancestor).to_matrix()
        });
    Ok(parent_matrix * world.local_transform(entity).to_matrix())
}

/// World matrix of the parent of `entity`, identity for roots
pub fn parent_world_matrix(world: &World, entity: Entity) -> Result<Mat4, HierarchyError> {
    match world.parent_of(entity) {
        Some(parent) => world_matrix(world, parent),
        None => Ok(Mat4::IDENTITY),
    }
}

/// Give `entity` the world matrix `matrix` by rewriting its local transform
pub fn set_world_matrix(
    world: &mut World,
    entity: Entity,
    matrix: Mat4,
) -> Result<(), HierarchyError> {
    let parent = parent_world_matrix(world, entity)?;
    let local = Transform::from_matrix(parent.inverse() * matrix);
    world
        .set_local_transform(entity, local)
        .map_err(|_| HierarchyError::NoSuchEntity(entity))
}

/// Update the hierarchy system, calculating global transforms from local transforms
/// and parent relationships using breadth-first traversal.
pub fn update_hierarchy_system(world: &mut World) {
    let mut queue = Vec::with_capacity(1024);
    let mut visited = HashSet::with_capacity(1024);
    let mut next_level = Vec::new();

    let inner = world.inner_mut();

    // Find root entities (entities with Transform but no Parent)
    let mut root_updates = Vec::new();
    for (entity, (transform,)) in inner.query::<(&Transform,)>().without::<&Parent>().iter() {
        root_updates.push((entity, transform.to_matrix()));
        visited.insert(entity);
    }

    queue.extend(root_updates.iter().copied());
    trace!(root_count = queue.len(), "Starting hierarchy update");

    let mut updates = root_updates;
    while !queue.is_empty() {
        for (parent_entity, parent_world_matrix) in queue.drain(..) {
            for (child_entity, parent) in inner.query::<&Parent>().iter() {
                if parent.0 != parent_entity {
                    continue;
                }

                if visited.contains(&child_entity) {
                    error!(
                        parent = ?parent_entity,
                        child = ?child_entity,
                        "Cyclic parent-child relationship detected in hierarchy"
                    );
                    continue;
                }
                visited.insert(child_entity);

                let child_world_matrix = match inner.get::<&Transform>(child_entity) {
                    Ok(child_transform) => parent_world_matrix * child_transform.to_matrix(),
                    Err(_) => parent_world_matrix,
                };

                updates.push((child_entity, child_world_matrix));
                next_level.push((child_entity, child_world_matrix));
            }
        }

        std::mem::swap(&mut queue, &mut next_level);
    }

    for (entity, matrix) in &updates {
        match inner.query_one_mut::<&mut GlobalTransform>(*entity) {
            Ok(global) => global.matrix = *matrix,
            Err(_) => {
                let _ = inner.insert_one(*entity, GlobalTransform::from_matrix(*matrix));
            }
        }
    }

    trace!(processed_count = visited.len(), "Hierarchy update completed");
}
