//! Islands: the maximal antichain of a selection
//!
//! An island set contains no member that descends from another member, and
//! every candidate is covered by exactly one island.

use hecs::Entity;
use scene_engine::core::entity::hierarchy::{is_descendant_of, is_descendant_or_self};
use scene_engine::core::entity::{HierarchyError, World};
use tracing::trace;

/// Islands of `candidates`, in candidate order
pub fn compute_islands(world: &World, candidates: &[Entity]) -> Result<Vec<Entity>, HierarchyError> {
    let mut islands = IslandSet::default();
    for candidate in candidates {
        islands.insert(world, *candidate)?;
    }
    Ok(islands.islands)
}

/// Incrementally maintained islands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IslandSet {
    islands: Vec<Entity>,
}

impl IslandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Islands of `source`
    pub fn from_source(world: &World, source: &[Entity]) -> Result<Self, HierarchyError> {
        Ok(Self {
            islands: compute_islands(world, source)?,
        })
    }

    pub fn islands(&self) -> &[Entity] {
        &self.islands
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.islands.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.islands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    pub fn first(&self) -> Option<Entity> {
        self.islands.first().copied()
    }

    pub fn last(&self) -> Option<Entity> {
        self.islands.last().copied()
    }

    /// Add `item`; returns `false` when an existing island already covers it
    ///
    /// Islands that descend from `item` are pruned.
    pub fn insert(&mut self, world: &World, item: Entity) -> Result<bool, HierarchyError> {
        for island in &self.islands {
            if is_descendant_or_self(world, item, *island)? {
                trace!(item = ?item, island = ?island, "Discarding covered island candidate");
                return Ok(false);
            }
        }

        let mut kept = Vec::with_capacity(self.islands.len() + 1);
        for island in &self.islands {
            if !is_descendant_of(world, *island, item)? {
                kept.push(*island);
            }
        }
        kept.push(item);
        self.islands = kept;
        Ok(true)
    }

    /// Remove `item`, hoisting the `source` members it covered
    ///
    /// `source` is the list the islands are derived from, after the removal.
    /// Returns whether `item` was an island.
    pub fn remove(&mut self, world: &World, item: Entity, source: &[Entity]) -> Result<bool, HierarchyError> {
        let Some(index) = self.islands.iter().position(|island| *island == item) else {
            return Ok(false);
        };

        let mut orphans = Vec::new();
        for candidate in source {
            if *candidate != item && is_descendant_of(world, *candidate, item)? {
                orphans.push(*candidate);
            }
        }
        self.islands.remove(index);

        for orphan in compute_islands(world, &orphans)? {
            self.insert(world, orphan)?;
        }
        trace!(item = ?item, islands = self.islands.len(), "Removed island");
        Ok(true)
    }

    /// Recompute from scratch, after a reparent for example
    pub fn rebuild(&mut self, world: &World, source: &[Entity]) -> Result<(), HierarchyError> {
        self.islands = compute_islands(world, source)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.islands.clear();
    }
}
