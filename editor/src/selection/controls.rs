//! Scope registry and selection mutation

use super::{Resolution, ScopeId, SelectableInfo, SelectableOptions, SelectionMode};
use crate::effects::{Effect, EffectQueue};
use crate::error::{EditorError, EditorResult};
use crate::islands::compute_islands;
use crate::observable::{ListEvent, Membership, ObservableList, SubscriptionId, SubsetSync};
use hecs::Entity;
use scene_engine::core::entity::hierarchy::{ancestors, is_descendant_of, MAX_HIERARCHY_DEPTH};
use scene_engine::core::entity::{HierarchyError, World};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Result of delivering a click to a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click does not belong to this scope
    Ignored,
    /// Selection is locked or the click follows a drag release
    Suppressed,
    /// The same input was already handled by this scope
    Duplicate,
    /// The selection was updated
    Applied,
}

impl ClickOutcome {
    /// Whether the scope consumed the click
    pub fn consumed(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

struct ScopeRecord {
    info: SelectableInfo,
    up: Option<SubsetSync<Entity>>,
    down: Option<SubsetSync<Entity>>,
    counter: SubscriptionId,
    last_input: Option<u64>,
}

type MembershipCounts = Rc<RefCell<HashMap<Entity, usize>>>;

/// Root selection state: every registered scope plus the root scope
///
/// The root scope's container is the scene root. It is isolated and its list
/// aggregates every non-isolated top-level scope.
pub struct SelectControls {
    scopes: Vec<ScopeRecord>,
    root: ScopeId,
    next_scope: u64,
    mode: SelectionMode,
    disabled: bool,
    release_pending: bool,
    suppressed_input: Option<u64>,
    counts: MembershipCounts,
    effects: EffectQueue,
    bindings: HashMap<Entity, Membership<Entity>>,
}

impl std::fmt::Debug for SelectControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectControls")
            .field("scopes", &self.scopes.len())
            .field("mode", &self.mode)
            .field("disabled", &self.disabled)
            .field("release_pending", &self.release_pending)
            .finish()
    }
}

/// Feed 0 to 1 and 1 to 0 membership transitions into the effect queue
fn track_transitions(list: &ObservableList<Entity>, counts: &MembershipCounts, effects: &EffectQueue) -> SubscriptionId {
    let counts = Rc::clone(counts);
    let effects = effects.clone();
    list.subscribe(move |_, event| match event {
        ListEvent::Insert(entity) => {
            let mut counts = counts.borrow_mut();
            let count = counts.entry(*entity).or_insert(0);
            *count += 1;
            if *count == 1 {
                effects.push(Effect::Selected(*entity));
            }
        }
        ListEvent::Delete(entity) => {
            let mut counts = counts.borrow_mut();
            if let Some(count) = counts.get_mut(entity) {
                *count -= 1;
                if *count == 0 {
                    counts.remove(entity);
                    effects.push(Effect::Deselected(*entity));
                }
            }
        }
        ListEvent::Reorder => {}
    })
}

impl SelectControls {
    /// Create the root scope around `scene_root`
    pub fn new(scene_root: Entity, effects: EffectQueue) -> Self {
        let counts: MembershipCounts = Rc::default();
        let root = ScopeId::new(0);
        let selection = ObservableList::new();
        let counter = track_transitions(&selection, &counts, &effects);

        Self {
            scopes: vec![ScopeRecord {
                info: SelectableInfo {
                    id: root,
                    container: scene_root,
                    parent: None,
                    isolate_selections: true,
                    selection,
                },
                up: None,
                down: None,
                counter,
                last_input: None,
            }],
            root,
            next_scope: 1,
            mode: SelectionMode::default(),
            disabled: false,
            release_pending: false,
            suppressed_input: None,
            counts,
            effects,
            bindings: HashMap::new(),
        }
    }

    pub fn root_scope(&self) -> ScopeId {
        self.root
    }

    /// The aggregated selection of every non-isolated top-level scope
    pub fn root_selection(&self) -> ObservableList<Entity> {
        self.scopes[0].info.selection.clone()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        debug!(mode = ?mode, "Selection mode changed");
        self.mode = mode;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Lock selection for the duration of a drag
    pub fn begin_interaction(&mut self) {
        self.disabled = true;
    }

    /// Unlock selection; the click produced by the release is swallowed
    pub fn end_interaction(&mut self) {
        self.disabled = false;
        self.release_pending = true;
    }

    /// Unlock selection without arming the release guard
    pub fn abort_interaction(&mut self) {
        self.disabled = false;
    }

    pub fn is_release_pending(&self) -> bool {
        self.release_pending
    }

    /// Called for every incoming click; consumes a pending release
    pub fn note_click(&mut self, input: u64) {
        if self.release_pending {
            trace!(input, "Suppressing click that follows a drag release");
            self.release_pending = false;
            self.suppressed_input = Some(input);
        }
    }

    /// Per-frame reset of the release guard
    pub fn end_frame(&mut self) {
        self.release_pending = false;
        self.suppressed_input = None;
    }

    /// Whether selection changes caused by `input` are currently blocked
    pub fn blocks(&self, input: Option<u64>) -> bool {
        self.disabled || (input.is_some() && input == self.suppressed_input)
    }

    fn index(&self, scope: ScopeId) -> EditorResult<usize> {
        self.scopes
            .iter()
            .position(|record| record.info.id == scope)
            .ok_or(EditorError::UnknownScope(scope))
    }

    fn record(&self, scope: ScopeId) -> EditorResult<&ScopeRecord> {
        self.index(scope).map(|index| &self.scopes[index])
    }

    pub fn info(&self, scope: ScopeId) -> EditorResult<&SelectableInfo> {
        self.record(scope).map(|record| &record.info)
    }

    pub fn selection(&self, scope: ScopeId) -> EditorResult<ObservableList<Entity>> {
        self.info(scope).map(|info| info.selection.clone())
    }

    /// Every scope in registration order, the root scope first
    pub fn scopes(&self) -> impl Iterator<Item = &SelectableInfo> {
        self.scopes.iter().map(|record| &record.info)
    }

    pub fn scope_for_container(&self, container: Entity) -> Option<ScopeId> {
        self.scopes
            .iter()
            .find(|record| record.info.container == container)
            .map(|record| record.info.id)
    }

    /// Closest scope whose container is a strict ancestor of `object`
    ///
    /// Falls back to the root scope for objects outside every registered
    /// container.
    pub fn local_selectable(&self, world: &World, object: Entity) -> EditorResult<ScopeId> {
        for ancestor in ancestors(world, object)? {
            if let Some(scope) = self.scope_for_container(ancestor) {
                return Ok(scope);
            }
        }
        Ok(self.root)
    }

    /// First isolated scope at or above `scope`, or the root scope
    pub fn global_selectable(&self, scope: ScopeId) -> EditorResult<ScopeId> {
        let mut current = self.info(scope)?;
        for _ in 0..=self.scopes.len() {
            match current.parent {
                Some(parent) if !current.isolate_selections => current = self.info(parent)?,
                _ => return Ok(current.id),
            }
        }
        Err(HierarchyError::Cycle(current.container).into())
    }

    /// Register a scope around `container`
    ///
    /// Already-registered containers keep their existing scope.
    pub fn register(&mut self, world: &World, container: Entity, options: SelectableOptions) -> EditorResult<ScopeId> {
        if !world.contains(container) {
            return Err(EditorError::NoSuchEntity(container));
        }
        if let Some(existing) = self.scope_for_container(container) {
            warn!(container = ?container, scope = ?existing, "Container already has a selectable scope");
            return Ok(existing);
        }

        let parent = self.local_selectable(world, container)?;
        let id = ScopeId::new(self.next_scope);
        self.next_scope += 1;

        let selection = ObservableList::new();
        let counter = track_transitions(&selection, &self.counts, &self.effects);
        self.scopes.push(ScopeRecord {
            info: SelectableInfo {
                id,
                container,
                parent: Some(parent),
                isolate_selections: options.isolate_selections,
                selection,
            },
            up: None,
            down: None,
            counter,
            last_input: None,
        });
        self.link(id, parent)?;

        // Scopes registered earlier inside the new container now nest in it
        let mut adopted = Vec::new();
        for record in &self.scopes {
            if record.info.parent == Some(parent)
                && record.info.id != id
                && is_descendant_of(world, record.info.container, container)?
            {
                adopted.push(record.info.id);
            }
        }
        for child in adopted {
            self.link(child, id)?;
        }

        debug!(
            scope = ?id,
            container = ?container,
            parent = ?parent,
            isolated = options.isolate_selections,
            "Registered selectable scope"
        );
        Ok(id)
    }

    /// Point `scope` at `parent` and rewire its list syncs
    fn link(&mut self, scope: ScopeId, parent: ScopeId) -> EditorResult<()> {
        let parent_list = self.selection(parent)?;
        let index = self.index(scope)?;
        let record = &mut self.scopes[index];

        record.up = None;
        record.down = None;
        record.info.parent = Some(parent);
        if !record.info.isolate_selections {
            record.up = Some(SubsetSync::mirror(&record.info.selection, &parent_list));
            record.down = Some(SubsetSync::follow_removals(&parent_list, &record.info.selection));
        }
        trace!(scope = ?scope, parent = ?parent, "Linked scope");
        Ok(())
    }

    /// Remove a scope, clearing its selection and re-linking its children
    pub fn unregister(&mut self, scope: ScopeId) -> EditorResult<SelectableInfo> {
        if scope == self.root {
            return Err(EditorError::UnknownScope(scope));
        }
        let index = self.index(scope)?;
        let parent = self.scopes[index].info.parent.unwrap_or(self.root);
        let parent_list = self.selection(parent)?;

        // Detach every sync touching the outgoing list before it empties
        let mut children = Vec::new();
        let mut kept = Vec::new();
        for record in &mut self.scopes {
            if record.info.parent == Some(scope) {
                record.up = None;
                record.down = None;
                if !record.info.isolate_selections {
                    kept.extend(record.info.selection.to_vec());
                }
                children.push(record.info.id);
            }
        }
        let outgoing = &mut self.scopes[index];
        outgoing.up = None;
        outgoing.down = None;
        let isolated = outgoing.info.isolate_selections;
        let items = outgoing.info.selection.to_vec();

        if !isolated {
            for item in items.iter().filter(|item| !kept.contains(item)) {
                parent_list.remove(item);
            }
        }
        self.scopes[index].info.selection.clear();
        for child in children {
            self.link(child, parent)?;
        }

        let index = self.index(scope)?;
        let record = self.scopes.remove(index);
        record.info.selection.unsubscribe(record.counter);
        debug!(scope = ?scope, container = ?record.info.container, "Unregistered selectable scope");
        Ok(record.info)
    }

    /// The direct child of `container` on the path from `target` up to it
    ///
    /// `None` when `target` is the container itself or lies outside it.
    pub fn clicked_item(&self, world: &World, container: Entity, target: Entity) -> EditorResult<Option<Entity>> {
        if target == container {
            return Ok(None);
        }
        let mut current = target;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match world.parent_of(current) {
                Some(parent) if parent == container => return Ok(Some(current)),
                Some(parent) if parent == target => return Err(HierarchyError::Cycle(parent).into()),
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
        Err(HierarchyError::TooDeep(target).into())
    }

    /// Apply the current mode to a click on `target` inside `scope`
    pub fn handle_click(
        &mut self,
        world: &World,
        scope: ScopeId,
        target: Entity,
        input: Option<u64>,
    ) -> EditorResult<ClickOutcome> {
        let container = self.info(scope)?.container;
        let Some(item) = self.clicked_item(world, container, target)? else {
            return Ok(ClickOutcome::Ignored);
        };
        if self.blocks(input) {
            trace!(scope = ?scope, item = ?item, "Selection click suppressed");
            return Ok(ClickOutcome::Suppressed);
        }

        let index = self.index(scope)?;
        if input.is_some() && self.scopes[index].last_input == input {
            debug!(scope = ?scope, item = ?item, "Ignoring repeated delivery of the same click");
            return Ok(ClickOutcome::Duplicate);
        }
        self.scopes[index].last_input = input;

        self.apply(scope, item, self.mode)?;
        Ok(ClickOutcome::Applied)
    }

    /// Apply `mode` to `item` in `scope`
    ///
    /// Inserts go to the scope's own list, removals go through its global
    /// list so they reach every scope that mirrors the item.
    pub fn apply(&self, scope: ScopeId, item: Entity, mode: SelectionMode) -> EditorResult<()> {
        let local = self.selection(scope)?;
        let global = self.selection(self.global_selectable(scope)?)?;

        match mode {
            SelectionMode::Replace => {
                for selected in global.to_vec() {
                    if selected != item {
                        global.remove(&selected);
                    }
                }
                if !local.contains(&item) {
                    local.push(item);
                }
            }
            SelectionMode::Toggle => {
                if global.contains(&item) {
                    global.remove(&item);
                } else {
                    local.push(item);
                }
            }
            SelectionMode::Add => {
                if !local.contains(&item) {
                    local.push(item);
                }
            }
            SelectionMode::Remove => {
                global.remove(&item);
            }
        }
        trace!(scope = ?scope, item = ?item, mode = ?mode, "Applied selection change");
        Ok(())
    }

    /// Apply `mode` to `object` in its closest enclosing scope
    pub fn select(&self, world: &World, object: Entity, mode: SelectionMode) -> EditorResult<()> {
        if !world.contains(object) {
            return Err(EditorError::NoSuchEntity(object));
        }
        let scope = self.local_selectable(world, object)?;
        self.apply(scope, object, mode)
    }

    /// Declaratively bind `object` into its closest scope's list
    pub fn set_selected(&mut self, world: &World, object: Entity, selected: bool) -> EditorResult<()> {
        if !world.contains(object) {
            return Err(EditorError::NoSuchEntity(object));
        }
        let list = self.selection(self.local_selectable(world, object)?)?;
        match self.bindings.get(&object) {
            Some(binding) => binding.set_present(selected),
            None => {
                self.bindings.insert(object, Membership::new(list, object, selected));
            }
        }
        Ok(())
    }

    /// Drop the declarative binding of `object`, removing it from its list
    pub fn release_binding(&mut self, object: Entity) -> bool {
        self.bindings.remove(&object).is_some()
    }

    /// Clear the selection of every root island among registered containers
    ///
    /// Nested scopes are cleared through their island's list. The root scope
    /// takes no part.
    pub fn handle_background(&self, world: &World, input: Option<u64>) -> EditorResult<bool> {
        if self.blocks(input) {
            trace!("Background click suppressed");
            return Ok(false);
        }

        let containers: Vec<Entity> = self.scopes[1..].iter().map(|record| record.info.container).collect();
        let islands = compute_islands(world, &containers)?;
        for container in &islands {
            if let Some(scope) = self.scope_for_container(*container) {
                self.selection(scope)?.clear();
            }
        }
        // Objects selected programmatically outside every container live only here
        self.root_selection().clear();
        debug!(islands = islands.len(), "Background click cleared selection");
        Ok(true)
    }

    /// Empty every scope's list
    pub fn clear_all(&self) {
        for record in &self.scopes {
            record.info.selection.clear();
        }
    }

    /// Membership test against the local or global list of `object`
    pub fn is_selected(&self, world: &World, object: Entity, resolution: Resolution) -> EditorResult<bool> {
        let local = self.local_selectable(world, object)?;
        let scope = match resolution {
            Resolution::Local => local,
            Resolution::Global => self.global_selectable(local)?,
        };
        Ok(self.selection(scope)?.contains(&object))
    }

    /// Whether `object` is in any scope's list
    pub fn is_selected_anywhere(&self, object: Entity) -> bool {
        self.counts.borrow().contains_key(&object)
    }

    /// Re-derive scope parents and drop items that left their container
    ///
    /// Run after the hierarchy changed.
    pub fn hierarchy_changed(&mut self, world: &World) -> EditorResult<()> {
        let mut relinks = Vec::new();
        for record in &self.scopes[1..] {
            let parent = match world.parent_of(record.info.container) {
                Some(_) => self.local_selectable(world, record.info.container)?,
                None => self.root,
            };
            if record.info.parent != Some(parent) {
                relinks.push((record.info.id, parent));
            }
        }
        for (scope, parent) in relinks {
            self.link(scope, parent)?;
        }

        for record in &self.scopes[1..] {
            for item in record.info.selection.to_vec() {
                if !is_descendant_of(world, item, record.info.container)? {
                    debug!(item = ?item, scope = ?record.info.id, "Dropping item that left its scope");
                    record.info.selection.remove(&item);
                }
            }
        }
        Ok(())
    }

    /// Forget despawned objects and the scopes of despawned containers
    pub fn prune(&mut self, world: &World) -> EditorResult<()> {
        let dead_scopes: Vec<ScopeId> = self.scopes[1..]
            .iter()
            .filter(|record| !world.contains(record.info.container))
            .map(|record| record.info.id)
            .collect();
        for scope in dead_scopes {
            self.unregister(scope)?;
        }

        self.bindings.retain(|object, _| world.contains(*object));
        for record in &self.scopes {
            for item in record.info.selection.to_vec() {
                if !world.contains(item) {
                    record.info.selection.remove(&item);
                }
            }
        }
        Ok(())
    }
}
