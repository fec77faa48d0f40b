//! Per-object listener registries
//!
//! Listeners live in a side table keyed by entity instead of on the scene
//! objects themselves. Handles are generational, so a stale entry can never
//! be reached through a recycled entity; [`EventRegistry::prune`] drops the
//! entries of despawned objects.

use super::event::{EventKind, ListenerPhase, SceneEvent};
use hecs::Entity;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// Event callback; `C` is the context handed to listeners during dispatch
pub type Listener<C> = Rc<dyn Fn(&mut C, &mut SceneEvent)>;

/// Handle returned by [`EventRegistry::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry<C> {
    id: ListenerId,
    kind: EventKind,
    phase: ListenerPhase,
    listener: Listener<C>,
}

/// Listener side table
pub struct EventRegistry<C> {
    entries: HashMap<Entity, Vec<Entry<C>>>,
    owners: HashMap<ListenerId, Entity>,
    next_id: u64,
}

impl<C> Default for EventRegistry<C> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            owners: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<C> std::fmt::Debug for EventRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("objects", &self.entries.len())
            .field("listeners", &self.owners.len())
            .finish()
    }
}

impl<C> EventRegistry<C> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind` events on `entity`
    ///
    /// Listeners for the same object, kind and phase run in registration order.
    pub fn add_listener(
        &mut self,
        entity: Entity,
        kind: EventKind,
        phase: ListenerPhase,
        listener: impl Fn(&mut C, &mut SceneEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.entry(entity).or_default().push(Entry {
            id,
            kind,
            phase,
            listener: Rc::new(listener),
        });
        self.owners.insert(id, entity);
        trace!(entity = ?entity, kind = ?kind, phase = ?phase, "Added listener");
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let Some(entity) = self.owners.remove(&id) else {
            return false;
        };
        if let Some(entries) = self.entries.get_mut(&entity) {
            entries.retain(|entry| entry.id != id);
            if entries.is_empty() {
                self.entries.remove(&entity);
            }
        }
        true
    }

    /// Snapshot of the listeners for one object, kind and phase
    pub fn listeners(&self, entity: Entity, kind: EventKind, phase: ListenerPhase) -> Vec<Listener<C>> {
        self.entries
            .get(&entity)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.kind == kind && entry.phase == phase)
                    .map(|entry| Rc::clone(&entry.listener))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `entity` has any listener for `kind`
    pub fn has_listeners(&self, entity: Entity, kind: EventKind) -> bool {
        self.entries
            .get(&entity)
            .is_some_and(|entries| entries.iter().any(|entry| entry.kind == kind))
    }

    /// Remove every listener of `entity`
    pub fn clear_entity(&mut self, entity: Entity) -> usize {
        let removed = self.entries.remove(&entity).unwrap_or_default();
        for entry in &removed {
            self.owners.remove(&entry.id);
        }
        removed.len()
    }

    /// Drop the registries of objects for which `alive` is false
    pub fn prune(&mut self, alive: impl Fn(Entity) -> bool) -> usize {
        let dead: Vec<Entity> = self
            .entries
            .keys()
            .copied()
            .filter(|entity| !alive(*entity))
            .collect();
        dead.into_iter().map(|entity| self.clear_entity(entity)).sum()
    }

    /// Total number of registered listeners
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
