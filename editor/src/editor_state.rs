//! Main editor state management
//!
//! This module contains the [`Editor`] struct, which is mounted around a
//! scene and owns every piece of overlay state: listener registries,
//! selectable scopes, gizmos and geometry edit proxies.

use crate::effects::{Effect, EffectQueue};
use crate::error::{EditorError, EditorResult};
use crate::events::{dispatch, EventHost, EventKind, EventRegistry, ListenerId, ListenerPhase, PointerInput, SceneEvent};
use crate::geometry_edit::{EditProxy, GeometryEdit, GeometryMap};
use crate::observable::{ListEvent, ObjectRef, ObservableList, ObserverId};
use crate::selection::{Resolution, ScopeId, SelectControls, SelectableOptions, SelectionMode};
use crate::settings::EditorSettings;
use crate::toolbar::ToolbarChoice;
use crate::transform::{Gizmo, GizmoHelper, GizmoId, GizmoOptions, PivotHelper, TransformNotice};
use glam::{Mat4, Vec3};
use hecs::Entity;
use scene_engine::core::entity::hierarchy::{ancestors, is_descendant_or_self};
use scene_engine::core::entity::{update_hierarchy_system, HierarchyError, World};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info, trace, warn};

/// Pointer kinds the canvas forwards into the scene
const CANVAS_KINDS: [EventKind; 6] = [
    EventKind::Click,
    EventKind::PointerDown,
    EventKind::PointerUp,
    EventKind::PointerMove,
    EventKind::PointerEnter,
    EventKind::PointerLeave,
];

/// Scene editor overlay
///
/// The host hands over its world and scene root, forwards pointer input
/// through [`Editor::handle_pointer`] and calls [`Editor::tick`] once per
/// frame. Reactive effects are drained before every public operation returns.
pub struct Editor {
    world: World,
    scene_root: Entity,
    registry: EventRegistry<Editor>,
    selection: SelectControls,
    effects: EffectQueue,
    scope_listeners: HashMap<ScopeId, ListenerId>,
    gizmos: Vec<Gizmo>,
    next_gizmo: u64,
    geometry: HashMap<Entity, GeometryEdit>,
    settings: EditorSettings,
    pending_refs: Vec<(ObjectRef, ObserverId)>,
    listener_error: Option<EditorError>,
    flushing: bool,
    frame: u64,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("world", &self.world)
            .field("scene_root", &self.scene_root)
            .field("registry", &self.registry)
            .field("selection", &self.selection)
            .field("gizmos", &self.gizmos.len())
            .field("geometry", &self.geometry.len())
            .field("frame", &self.frame)
            .finish()
    }
}

impl EventHost for Editor {
    fn registry(&self) -> &EventRegistry<Self> {
        &self.registry
    }

    fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.world.parent_of(entity)
    }
}

impl Editor {
    /// Mount the editor around `scene_root` with default settings
    pub fn new(world: World, scene_root: Entity) -> EditorResult<Self> {
        Self::with_settings(world, scene_root, EditorSettings::default())
    }

    /// Mount the editor around `scene_root`
    pub fn with_settings(world: World, scene_root: Entity, settings: EditorSettings) -> EditorResult<Self> {
        if !world.contains(scene_root) {
            return Err(EditorError::NoSuchEntity(scene_root));
        }
        info!(scene_root = ?scene_root, "Mounting scene editor");

        let effects = EffectQueue::new();
        let mut selection = SelectControls::new(scene_root, effects.clone());
        selection.set_mode(settings.selection.default_mode);

        let mut editor = Self {
            world,
            scene_root,
            registry: EventRegistry::new(),
            selection,
            effects,
            scope_listeners: HashMap::new(),
            gizmos: Vec::new(),
            next_gizmo: 0,
            geometry: HashMap::new(),
            settings,
            pending_refs: Vec::new(),
            listener_error: None,
            flushing: false,
            frame: 0,
        };
        editor.install_root_listeners();
        Ok(editor)
    }

    fn install_root_listeners(&mut self) {
        // Gizmo helpers are hit-testable; their clicks never reach selection
        for kind in [EventKind::Click, EventKind::PointerDown, EventKind::PointerUp] {
            self.registry
                .add_listener(self.scene_root, kind, ListenerPhase::Capture, |editor: &mut Editor, event| {
                    if editor.is_gizmo_node(event.target()) {
                        trace!(target = ?event.target(), "Intercepted pointer event on gizmo");
                        event.stop_propagation();
                    }
                });
        }

        self.registry.add_listener(
            self.scene_root,
            EventKind::PointerMissed,
            ListenerPhase::Bubble,
            |editor: &mut Editor, event| {
                let input = event.native().map(PointerInput::id);
                if let Err(e) = editor.selection.handle_background(&editor.world, input) {
                    editor.record_error(e);
                }
            },
        );
    }

    fn record_error(&mut self, error: EditorError) {
        warn!(error = %error, "Editor listener failed");
        self.listener_error.get_or_insert(error);
    }

    fn take_listener_error(&mut self) -> EditorResult<()> {
        match self.listener_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable scene access for the host
    ///
    /// Call [`Editor::reparent`] for hierarchy changes so scopes and islands
    /// stay consistent.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn scene_root(&self) -> Entity {
        self.scene_root
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn selection(&self) -> &SelectControls {
        &self.selection
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Register a host listener
    pub fn add_listener(
        &mut self,
        entity: Entity,
        kind: EventKind,
        phase: ListenerPhase,
        listener: impl Fn(&mut Editor, &mut SceneEvent) + 'static,
    ) -> ListenerId {
        self.registry.add_listener(entity, kind, phase, listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.registry.remove_listener(id)
    }

    /// Route canvas pointer input into the scene
    ///
    /// Input with a hit object bubbles from the hit object; the scene root also
    /// hears it, without bubbling, when the bubble phase did not reach it.
    /// Input without a hit goes to the scene root only, and a click without a
    /// hit is followed by a pointer-missed event.
    pub fn handle_pointer(&mut self, input: PointerInput) -> EditorResult<()> {
        if !CANVAS_KINDS.contains(&input.kind) {
            warn!(kind = ?input.kind, "Ignoring non-canvas pointer input");
            return Ok(());
        }
        let native = Rc::new(input);
        let kind = native.kind;
        if kind == EventKind::Click {
            self.selection.note_click(native.id());
        }

        match native.hit.filter(|hit| self.world.contains(*hit)) {
            Some(hit) => {
                let mut event = SceneEvent::from_pointer(Rc::clone(&native), kind, hit, true);
                let report = dispatch(self, &mut event)?;
                // Root listeners see each native event once: a bubble pass that
                // got to the root already delivered it there
                if !report.reached(self.scene_root) {
                    let mut root_event = SceneEvent::from_pointer(Rc::clone(&native), kind, self.scene_root, false);
                    dispatch(self, &mut root_event)?;
                }
            }
            None => {
                let mut root_event = SceneEvent::from_pointer(Rc::clone(&native), kind, self.scene_root, false);
                dispatch(self, &mut root_event)?;
                if kind == EventKind::Click {
                    let mut missed =
                        SceneEvent::from_pointer(Rc::clone(&native), EventKind::PointerMissed, self.scene_root, false);
                    dispatch(self, &mut missed)?;
                }
            }
        }

        self.take_listener_error()?;
        self.flush()
    }

    /// Whether `entity` is, or descends from, a gizmo helper
    pub fn is_gizmo_node(&self, entity: Entity) -> bool {
        let is_helper =
            |node: Entity| self.world.get::<GizmoHelper>(node).is_ok() || self.world.get::<PivotHelper>(node).is_ok();
        if is_helper(entity) {
            return true;
        }
        match ancestors(&self.world, entity) {
            Ok(chain) => chain.into_iter().any(is_helper),
            Err(e) => {
                warn!(entity = ?entity, error = %e, "Cannot walk ancestors of hit object");
                false
            }
        }
    }

    /// Drain the effect queue
    ///
    /// Runs after every public operation; calling it directly is only needed
    /// after mutating an observable list from outside the editor.
    pub fn flush(&mut self) -> EditorResult<()> {
        if self.flushing {
            return Ok(());
        }
        self.flushing = true;
        let result = self.drain_effects();
        self.flushing = false;
        result
    }

    fn drain_effects(&mut self) -> EditorResult<()> {
        let mut first_error = None;
        while !self.effects.is_empty() {
            let mut changed_gizmos = Vec::new();
            while let Some(effect) = self.effects.pop() {
                trace!(effect = ?effect, "Applying effect");
                let result = match effect {
                    Effect::Selected(entity) => self.on_selected(entity),
                    Effect::Deselected(entity) => self.on_deselected(entity),
                    Effect::GroupChanged { gizmo, change } => {
                        if !changed_gizmos.contains(&gizmo) {
                            changed_gizmos.push(gizmo);
                        }
                        self.apply_group_change(gizmo, &change)
                    }
                    Effect::Register { container, options } => self.register_scope(container, options).map(|_| ()),
                };
                if let Err(e) = result {
                    warn!(error = %e, "Effect failed");
                    first_error.get_or_insert(e);
                }
            }
            for gizmo in changed_gizmos {
                if let Err(e) = self.sync_gizmo(gizmo) {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn on_selected(&mut self, entity: Entity) -> EditorResult<()> {
        if !self.world.contains(entity) {
            return Ok(());
        }
        debug!(entity = ?entity, "Selected");
        let mut event = SceneEvent::new(EventKind::Selected, entity, true);
        dispatch(self, &mut event)?;
        if self.settings.geometry.enabled {
            if let Some(edit) = self.geometry.get_mut(&entity) {
                edit.mount(&mut self.world)?;
            }
        }
        self.take_listener_error()
    }

    fn on_deselected(&mut self, entity: Entity) -> EditorResult<()> {
        if let Some(edit) = self.geometry.get_mut(&entity) {
            edit.unmount(&mut self.world);
        }
        if !self.world.contains(entity) {
            return Ok(());
        }
        debug!(entity = ?entity, "Deselected");
        let mut event = SceneEvent::new(EventKind::Deselected, entity, true);
        dispatch(self, &mut event)?;
        self.take_listener_error()
    }

    fn apply_group_change(&mut self, gizmo: GizmoId, change: &ListEvent<Entity>) -> EditorResult<()> {
        let Some(index) = self.gizmo_index(gizmo) else {
            return Ok(());
        };
        self.gizmos[index].apply_change(&self.world, change)?;
        Ok(())
    }

    // Selection

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection.mode()
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection.set_mode(mode);
    }

    /// Register a selectable scope around `container`
    pub fn register_selectable(&mut self, container: Entity, options: SelectableOptions) -> EditorResult<ScopeId> {
        let scope = self.register_scope(container, options)?;
        self.flush()?;
        Ok(scope)
    }

    fn register_scope(&mut self, container: Entity, options: SelectableOptions) -> EditorResult<ScopeId> {
        let scope = self.selection.register(&self.world, container, options)?;
        if !self.scope_listeners.contains_key(&scope) {
            let listener = self.registry.add_listener(
                container,
                EventKind::Click,
                ListenerPhase::Bubble,
                move |editor: &mut Editor, event| editor.on_scope_click(scope, event),
            );
            self.scope_listeners.insert(scope, listener);
        }
        Ok(scope)
    }

    /// Register a scope once `container` resolves
    pub fn register_selectable_when(&mut self, container: &ObjectRef, options: SelectableOptions) -> EditorResult<()> {
        let effects = self.effects.clone();
        let observer = container.on_resolved(move |entity| {
            effects.push(Effect::Register {
                container: *entity,
                options,
            });
        });
        if container.is_resolved() {
            return self.flush();
        }
        self.pending_refs.push((container.clone(), observer));
        Ok(())
    }

    /// Deferred registrations still waiting on their reference
    pub fn pending_registrations(&self) -> usize {
        self.pending_refs
            .iter()
            .filter(|(reference, _)| !reference.is_resolved())
            .count()
    }

    fn on_scope_click(&mut self, scope: ScopeId, event: &mut SceneEvent) {
        let input = event.native().map(PointerInput::id);
        match self.selection.handle_click(&self.world, scope, event.target(), input) {
            Ok(outcome) => {
                if outcome.consumed() {
                    event.stop_propagation();
                }
            }
            Err(e) => self.record_error(e),
        }
    }

    pub fn unregister_selectable(&mut self, scope: ScopeId) -> EditorResult<()> {
        self.selection.unregister(scope)?;
        if let Some(listener) = self.scope_listeners.remove(&scope) {
            self.registry.remove_listener(listener);
        }
        self.flush()
    }

    /// Apply `mode` to `object` as if it had been clicked
    pub fn select(&mut self, object: Entity, mode: SelectionMode) -> EditorResult<()> {
        self.selection.select(&self.world, object, mode)?;
        self.flush()
    }

    /// Bind `object` into or out of its scope's selection
    pub fn set_selected(&mut self, object: Entity, selected: bool) -> EditorResult<()> {
        self.selection.set_selected(&self.world, object, selected)?;
        self.flush()
    }

    pub fn clear_selection(&mut self) -> EditorResult<()> {
        self.selection.clear_all();
        self.flush()
    }

    pub fn is_selected(&self, object: Entity, resolution: Resolution) -> EditorResult<bool> {
        self.selection.is_selected(&self.world, object, resolution)
    }

    /// The aggregated root selection
    pub fn selected(&self) -> Vec<Entity> {
        self.selection.root_selection().to_vec()
    }

    pub fn selection_of(&self, scope: ScopeId) -> EditorResult<Vec<Entity>> {
        Ok(self.selection.selection(scope)?.to_vec())
    }

    /// Move `entity` under `parent`, or make it a root
    pub fn reparent(&mut self, entity: Entity, parent: Option<Entity>) -> EditorResult<()> {
        if !self.world.contains(entity) {
            return Err(EditorError::NoSuchEntity(entity));
        }
        if let Some(parent) = parent {
            if !self.world.contains(parent) {
                return Err(EditorError::NoSuchEntity(parent));
            }
            if is_descendant_or_self(&self.world, parent, entity)? {
                return Err(HierarchyError::Cycle(entity).into());
            }
        }
        self.world
            .set_parent(entity, parent)
            .map_err(|_| EditorError::NoSuchEntity(entity))?;
        debug!(entity = ?entity, parent = ?parent, "Reparented");

        self.selection.hierarchy_changed(&self.world)?;
        self.flush()?;
        for index in 0..self.gizmos.len() {
            self.gizmos[index].rebuild(&self.world)?;
            let id = self.gizmos[index].id();
            self.sync_gizmo(id)?;
        }
        Ok(())
    }

    // Gizmos

    /// Add a gizmo over the root selection
    pub fn add_gizmo(&mut self, options: GizmoOptions) -> EditorResult<GizmoId> {
        let source = self.selection.root_selection();
        self.add_gizmo_for(source, options)
    }

    /// Add a gizmo using the configured placement, space and mode
    pub fn add_default_gizmo(&mut self) -> EditorResult<GizmoId> {
        self.add_gizmo(self.settings.transform.gizmo_options())
    }

    /// Add a gizmo over an arbitrary observed list
    pub fn add_gizmo_for(&mut self, source: ObservableList<Entity>, options: GizmoOptions) -> EditorResult<GizmoId> {
        let id = GizmoId::new(self.next_gizmo);
        self.next_gizmo += 1;
        let gizmo = Gizmo::new(&self.world, id, options, source, &self.effects)?;
        self.gizmos.push(gizmo);
        self.sync_gizmo(id)?;
        debug!(gizmo = ?id, options = ?options, "Added gizmo");
        Ok(id)
    }

    pub fn remove_gizmo(&mut self, id: GizmoId) -> EditorResult<()> {
        let index = self.gizmo_index(id).ok_or(EditorError::UnknownGizmo(id))?;
        let mut gizmo = self.gizmos.remove(index);
        if gizmo.is_dragging() && !self.any_gizmo_dragging() {
            self.selection.abort_interaction();
        }
        gizmo.despawn_helpers(&mut self.world);
        Ok(())
    }

    fn gizmo_index(&self, id: GizmoId) -> Option<usize> {
        self.gizmos.iter().position(|gizmo| gizmo.id() == id)
    }

    pub fn gizmo(&self, id: GizmoId) -> EditorResult<&Gizmo> {
        self.gizmo_index(id)
            .map(|index| &self.gizmos[index])
            .ok_or(EditorError::UnknownGizmo(id))
    }

    pub fn gizmos(&self) -> impl Iterator<Item = &Gizmo> {
        self.gizmos.iter()
    }

    pub fn set_gizmo_options(&mut self, id: GizmoId, options: GizmoOptions) -> EditorResult<()> {
        let index = self.gizmo_index(id).ok_or(EditorError::UnknownGizmo(id))?;
        self.gizmos[index].set_options(options);
        self.sync_gizmo(id)
    }

    fn sync_gizmo(&mut self, id: GizmoId) -> EditorResult<()> {
        let Some(index) = self.gizmo_index(id) else {
            return Ok(());
        };
        self.gizmos[index].sync(&mut self.world, self.scene_root)
    }

    fn any_gizmo_dragging(&self) -> bool {
        self.gizmos.iter().any(Gizmo::is_dragging)
    }

    /// Pivots and helper positions of every gizmo, except what a session drives
    fn refresh_gizmos(&mut self) -> EditorResult<()> {
        for gizmo in &self.gizmos {
            gizmo.update_pivot(&mut self.world)?;
            gizmo.refresh_helpers(&mut self.world)?;
        }
        Ok(())
    }

    fn dispatch_notice(&mut self, notice: &TransformNotice) -> EditorResult<()> {
        for target in &notice.targets {
            if !self.world.contains(*target) {
                continue;
            }
            let mut event = SceneEvent::new(notice.kind, *target, true).with_delta(notice.delta);
            dispatch(self, &mut event)?;
        }
        self.take_listener_error()
    }

    /// Start dragging the widget on `helper`
    ///
    /// Fails with [`EditorError::SessionConflict`] when another active session
    /// already tracks part of the group.
    pub fn begin_gizmo_drag(&mut self, id: GizmoId, helper: Entity) -> EditorResult<()> {
        let index = self.gizmo_index(id).ok_or(EditorError::UnknownGizmo(id))?;
        let (direct, tracked) = self.gizmos[index].drag_group(helper)?;
        for entity in tracked.iter().copied().chain(std::iter::once(direct)) {
            let conflict = self.gizmos.iter().any(|gizmo| {
                if gizmo.id() == id {
                    gizmo.tracks_outside(entity, helper)
                } else {
                    gizmo.tracks(entity)
                }
            });
            if conflict {
                return Err(EditorError::SessionConflict(entity));
            }
        }

        let notice = self.gizmos[index].begin_drag(&self.world, helper)?;
        self.selection.begin_interaction();
        self.dispatch_notice(&notice)?;
        self.flush()
    }

    /// Apply an incremental delta from the widget on `helper`
    pub fn drag_gizmo(&mut self, id: GizmoId, helper: Entity, delta: Mat4) -> EditorResult<()> {
        let index = self.gizmo_index(id).ok_or(EditorError::UnknownGizmo(id))?;
        let notice = self.gizmos[index].drag(&mut self.world, helper, delta)?;
        self.refresh_gizmos()?;
        self.dispatch_notice(&notice)?;
        self.flush()
    }

    /// Apply the last delta and finish the drag
    ///
    /// The click the release produces does not change the selection.
    pub fn end_gizmo_drag(&mut self, id: GizmoId, helper: Entity, delta: Mat4) -> EditorResult<()> {
        let index = self.gizmo_index(id).ok_or(EditorError::UnknownGizmo(id))?;
        let notices = self.gizmos[index].end_drag(&mut self.world, self.scene_root, helper, delta)?;
        if !self.any_gizmo_dragging() {
            self.selection.end_interaction();
        }
        self.refresh_gizmos()?;
        for notice in &notices {
            self.dispatch_notice(notice)?;
        }
        self.flush()
    }

    /// Revert the drag of the widget on `helper`
    pub fn cancel_gizmo_drag(&mut self, id: GizmoId, helper: Entity) -> EditorResult<()> {
        let index = self.gizmo_index(id).ok_or(EditorError::UnknownGizmo(id))?;
        let notice = self.gizmos[index].cancel_drag(&mut self.world, self.scene_root, helper)?;
        if !self.any_gizmo_dragging() {
            self.selection.abort_interaction();
        }
        self.refresh_gizmos()?;
        self.dispatch_notice(&notice)?;
        self.flush()
    }

    // Geometry editing

    /// Make `entity` editable through `map`
    ///
    /// Proxies are mounted right away when the entity is selected and
    /// geometry editing is on.
    pub fn register_geometry(&mut self, entity: Entity, map: Box<dyn GeometryMap>) -> EditorResult<()> {
        if !self.world.contains(entity) {
            return Err(EditorError::NoSuchEntity(entity));
        }
        let geometry = &self.settings.geometry;
        let mut edit = GeometryEdit::new(entity, map, geometry.feature, geometry.colors);
        if geometry.enabled && self.selection.is_selected_anywhere(entity) {
            edit.mount(&mut self.world)?;
        }
        if let Some(mut previous) = self.geometry.insert(entity, edit) {
            previous.unmount(&mut self.world);
        }
        Ok(())
    }

    pub fn unregister_geometry(&mut self, entity: Entity) -> Option<Box<dyn GeometryMap>> {
        let mut edit = self.geometry.remove(&entity)?;
        edit.unmount(&mut self.world);
        Some(edit.into_map())
    }

    pub fn geometry(&self, entity: Entity) -> Option<&GeometryEdit> {
        self.geometry.get(&entity)
    }

    pub fn geometry_editing(&self) -> bool {
        self.settings.geometry.enabled
    }

    /// Turn geometry editing on or off for every selected editable mesh
    pub fn set_geometry_editing(&mut self, enabled: bool) -> EditorResult<()> {
        self.settings.geometry.enabled = enabled;
        for (entity, edit) in self.geometry.iter_mut() {
            if enabled && self.selection.is_selected_anywhere(*entity) {
                edit.mount(&mut self.world)?;
            } else {
                edit.unmount(&mut self.world);
            }
        }
        debug!(enabled, "Geometry editing toggled");
        Ok(())
    }

    /// Notify that the geometry behind `entity` changed
    pub fn geometry_updated(&mut self, entity: Entity) -> EditorResult<()> {
        match self.geometry.get_mut(&entity) {
            Some(edit) => edit.geometry_updated(&mut self.world),
            None => Ok(()),
        }
    }

    fn proxy_owner(&self, proxy: Entity) -> EditorResult<Entity> {
        self.world
            .get::<EditProxy>(proxy)
            .map(|info| info.owner)
            .map_err(|_| EditorError::UnknownProxy(proxy))
    }

    pub fn begin_proxy_drag(&mut self, proxy: Entity) -> EditorResult<()> {
        let owner = self.proxy_owner(proxy)?;
        let edit = self.geometry.get_mut(&owner).ok_or(EditorError::UnknownProxy(proxy))?;
        edit.begin_drag(&mut self.world, proxy)?;
        self.selection.begin_interaction();
        Ok(())
    }

    /// Move a dragged proxy to `position`, in the mesh entity's local space
    pub fn drag_proxy(&mut self, proxy: Entity, position: Vec3) -> EditorResult<()> {
        let owner = self.proxy_owner(proxy)?;
        let edit = self.geometry.get_mut(&owner).ok_or(EditorError::UnknownProxy(proxy))?;
        edit.drag_to(&mut self.world, proxy, position)
    }

    pub fn end_proxy_drag(&mut self, proxy: Entity) -> EditorResult<()> {
        let owner = self.proxy_owner(proxy)?;
        let edit = self.geometry.get_mut(&owner).ok_or(EditorError::UnknownProxy(proxy))?;
        edit.end_drag(&mut self.world, proxy)?;
        if !self.any_gizmo_dragging() {
            self.selection.end_interaction();
        }
        Ok(())
    }

    /// Apply a value picked in the toolbar
    pub fn apply_toolbar_choice(&mut self, choice: ToolbarChoice) -> EditorResult<()> {
        debug!(choice = ?choice, "Toolbar choice");
        match choice {
            ToolbarChoice::SelectionMode(mode) => {
                self.settings.selection.default_mode = mode;
                self.selection.set_mode(mode);
            }
            ToolbarChoice::GizmoMode(mode) => {
                self.settings.transform.mode = mode;
                self.update_gizmo_options(|options| options.mode = mode)?;
            }
            ToolbarChoice::Space(space) => {
                self.settings.transform.space = space;
                self.update_gizmo_options(|options| options.space = space)?;
            }
            ToolbarChoice::Position(position) => {
                self.settings.transform.position = position;
                self.update_gizmo_options(|options| options.position = position)?;
            }
            ToolbarChoice::Feature(kind) => {
                self.settings.geometry.feature = kind;
                for edit in self.geometry.values_mut() {
                    edit.set_kind(&mut self.world, kind)?;
                }
            }
            ToolbarChoice::GeometryEditing(enabled) => self.set_geometry_editing(enabled)?,
        }
        Ok(())
    }

    fn update_gizmo_options(&mut self, change: impl Fn(&mut GizmoOptions)) -> EditorResult<()> {
        let ids: Vec<GizmoId> = self.gizmos.iter().map(Gizmo::id).collect();
        for id in ids {
            if let Some(index) = self.gizmo_index(id) {
                let mut options = self.gizmos[index].options();
                change(&mut options);
                self.gizmos[index].set_options(options);
                self.sync_gizmo(id)?;
            }
        }
        Ok(())
    }

    /// Per-frame update
    ///
    /// Clears the drag-release guard, forgets despawned objects, recomputes
    /// pivots and helper positions and refreshes global transforms.
    pub fn tick(&mut self) -> EditorResult<()> {
        self.frame += 1;
        self.selection.end_frame();

        let world = &self.world;
        let pruned = self.registry.prune(|entity| world.contains(entity));
        if pruned > 0 {
            trace!(pruned, "Dropped listeners of despawned objects");
        }
        self.selection.prune(&self.world)?;
        let selection = &self.selection;
        self.scope_listeners.retain(|scope, _| selection.info(*scope).is_ok());
        self.pending_refs.retain(|(reference, _)| !reference.is_resolved());
        let dead: Vec<Entity> = self
            .geometry
            .keys()
            .copied()
            .filter(|entity| !self.world.contains(*entity))
            .collect();
        for entity in dead {
            self.unregister_geometry(entity);
        }

        self.flush()?;
        self.refresh_gizmos()?;
        update_hierarchy_system(&mut self.world);
        Ok(())
    }

    /// Tear the editor down and hand the scene back
    ///
    /// Every helper node the editor spawned is despawned and pending deferred
    /// registrations are cancelled.
    pub fn unmount(mut self) -> World {
        for (reference, observer) in self.pending_refs.drain(..) {
            reference.cancel(observer);
        }
        for gizmo in &mut self.gizmos {
            gizmo.despawn_helpers(&mut self.world);
        }
        self.gizmos.clear();
        for edit in self.geometry.values_mut() {
            edit.unmount(&mut self.world);
        }
        self.geometry.clear();
        info!("Unmounted scene editor");
        std::mem::take(&mut self.world)
    }
}
