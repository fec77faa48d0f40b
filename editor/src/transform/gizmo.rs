//! Gizmo placement over a tracked group

use super::transformer::{ObjectTransformer, TransformNotice};
use super::CoordinateSpace;
use crate::effects::{Effect, EffectQueue};
use crate::error::{EditorError, EditorResult};
use crate::islands::IslandSet;
use crate::observable::{ListEvent, ObservableList, SubscriptionId, SubsetSync};
use glam::{Mat4, Quat, Vec3, Vec4};
use hecs::Entity;
use scene_engine::core::entity::hierarchy::{set_world_matrix, world_matrix};
use scene_engine::core::entity::{HierarchyError, Name, Transform, World};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Identity of a gizmo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GizmoId(u64);

impl GizmoId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Where gizmos attach within the tracked group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformControlsPosition {
    /// One gizmo on the first island
    First,
    /// One gizmo on the last island
    Last,
    /// One independent gizmo per island
    Each,
    /// One gizmo on a pivot at the mean transform of the group
    #[default]
    Average,
}

/// Manipulation the gizmo widget offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GizmoOptions {
    #[serde(default)]
    pub position: TransformControlsPosition,
    #[serde(default)]
    pub space: CoordinateSpace,
    #[serde(default)]
    pub mode: GizmoMode,
}

/// Component on the scene node that carries one gizmo widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GizmoHelper {
    pub gizmo: GizmoId,
    /// Object the widget manipulates directly
    pub object: Entity,
}

/// Component on a gizmo's average pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotHelper {
    pub gizmo: GizmoId,
}

/// One widget of a gizmo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GizmoHandle {
    pub helper: Entity,
    pub object: Entity,
}

/// Mean position, normalized mean rotation and mean scale
///
/// Rotations are flipped into the hemisphere of the first one before
/// averaging, since `q` and `-q` are the same rotation.
pub fn average_transform(matrices: &[Mat4]) -> Option<Transform> {
    let transforms: Vec<Transform> = matrices.iter().map(|matrix| Transform::from_matrix(*matrix)).collect();
    let reference = transforms.first()?.rotation;
    let count = transforms.len() as f32;

    let mut position = Vec3::ZERO;
    let mut scale = Vec3::ZERO;
    let mut rotation = Vec4::ZERO;
    for transform in &transforms {
        position += transform.position;
        scale += transform.scale;
        let quat = if transform.rotation.dot(reference) < 0.0 {
            -transform.rotation
        } else {
            transform.rotation
        };
        rotation += Vec4::from(quat);
    }

    let rotation = if rotation.length_squared() > f32::EPSILON {
        Quat::from_vec4(rotation).normalize()
    } else {
        reference
    };
    Some(Transform {
        position: position / count,
        rotation,
        scale: scale / count,
    })
}

/// Transformer owned by one widget helper, kept for the helper's lifetime
struct HelperSession {
    transformer: ObjectTransformer,
    _feed: Option<SubsetSync<Entity>>,
}

impl HelperSession {
    fn is_dragging(&self) -> bool {
        self.transformer.is_dragging()
    }
}

/// Gizmo attached to an observed list
///
/// Islands of the observed list form the tracked group. The observed list
/// feeds changes through the effect queue; [`Gizmo::apply_change`] folds
/// them into the islands and the live `group` list that widget sessions
/// follow.
pub struct Gizmo {
    id: GizmoId,
    options: GizmoOptions,
    source: ObservableList<Entity>,
    subscription: SubscriptionId,
    islands: IslandSet,
    group: ObservableList<Entity>,
    handles: Vec<GizmoHandle>,
    pivot: Option<Entity>,
    sessions: HashMap<Entity, HelperSession>,
}

impl std::fmt::Debug for Gizmo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gizmo")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("islands", &self.islands)
            .field("handles", &self.handles)
            .field("pivot", &self.pivot)
            .field("sessions", &self.sessions.len())
            .field("dragging", &self.is_dragging())
            .finish()
    }
}

impl Gizmo {
    pub fn new(
        world: &World,
        id: GizmoId,
        options: GizmoOptions,
        source: ObservableList<Entity>,
        effects: &EffectQueue,
    ) -> Result<Self, HierarchyError> {
        let islands = IslandSet::from_source(world, &source.to_vec())?;
        let queue = effects.clone();
        let subscription = source.subscribe(move |_, change| {
            queue.push(Effect::GroupChanged {
                gizmo: id,
                change: change.clone(),
            });
        });

        let group = ObservableList::from_vec(islands.islands().to_vec());
        Ok(Self {
            id,
            options,
            source,
            subscription,
            islands,
            group,
            handles: Vec::new(),
            pivot: None,
            sessions: HashMap::new(),
        })
    }

    pub fn id(&self) -> GizmoId {
        self.id
    }

    pub fn options(&self) -> GizmoOptions {
        self.options
    }

    /// Change placement, space or mode; takes effect on the next sync
    pub fn set_options(&mut self, options: GizmoOptions) {
        self.options = options;
        // Idle transformers were built for the old placement
        self.sessions.retain(|_, session| session.is_dragging());
    }

    pub fn source(&self) -> &ObservableList<Entity> {
        &self.source
    }

    pub fn islands(&self) -> &[Entity] {
        self.islands.islands()
    }

    /// Live tracked group, kept equal to the islands
    pub fn group(&self) -> &ObservableList<Entity> {
        &self.group
    }

    pub fn handles(&self) -> &[GizmoHandle] {
        &self.handles
    }

    pub fn handle(&self, helper: Entity) -> Option<GizmoHandle> {
        self.handles.iter().find(|handle| handle.helper == helper).copied()
    }

    /// Handle whose widget manipulates `object`
    pub fn handle_for(&self, object: Entity) -> Option<GizmoHandle> {
        self.handles.iter().find(|handle| handle.object == object).copied()
    }

    pub fn pivot(&self) -> Option<Entity> {
        self.pivot
    }

    pub fn is_dragging(&self) -> bool {
        self.sessions.values().any(HelperSession::is_dragging)
    }

    fn is_dragging_on(&self, helper: Entity) -> bool {
        self.sessions.get(&helper).is_some_and(HelperSession::is_dragging)
    }

    /// Transformer of the widget on `helper`, once it has been dragged
    pub fn transformer(&self, helper: Entity) -> Option<&ObjectTransformer> {
        self.sessions.get(&helper).map(|session| &session.transformer)
    }

    /// Whether an active session of this gizmo tracks `entity`
    pub fn tracks(&self, entity: Entity) -> bool {
        self.sessions
            .values()
            .any(|session| session.is_dragging() && session.transformer.tracks(entity))
    }

    /// Whether a session other than the one on `helper` tracks `entity`
    pub fn tracks_outside(&self, entity: Entity, helper: Entity) -> bool {
        self.sessions.iter().any(|(owner, session)| {
            *owner != helper && session.is_dragging() && session.transformer.tracks(entity)
        })
    }

    /// Fold one change of the observed list into the islands
    pub fn apply_change(&mut self, world: &World, change: &ListEvent<Entity>) -> Result<(), HierarchyError> {
        match change {
            // Changes are applied late; skip inserts that were already undone
            ListEvent::Insert(entity) if self.source.contains(entity) => {
                self.islands.insert(world, *entity)?;
            }
            ListEvent::Insert(_) => {}
            ListEvent::Delete(entity) => {
                self.islands.remove(world, *entity, &self.source.to_vec())?;
            }
            ListEvent::Reorder => self.islands.rebuild(world, &self.source.to_vec())?,
        }
        self.sync_group();
        trace!(gizmo = ?self.id, islands = self.islands.len(), "Gizmo group changed");
        Ok(())
    }

    /// Recompute islands from the observed list
    pub fn rebuild(&mut self, world: &World) -> Result<(), HierarchyError> {
        self.islands.rebuild(world, &self.source.to_vec())?;
        self.sync_group();
        Ok(())
    }

    /// Bring the live group list in line with the islands
    fn sync_group(&self) {
        let islands = self.islands.islands();
        for entity in self.group.to_vec() {
            if !islands.contains(&entity) {
                self.group.remove(&entity);
            }
        }
        for (index, island) in islands.iter().enumerate() {
            if !self.group.contains(island) {
                self.group.insert(index.min(self.group.len()), *island);
            }
        }
    }

    /// Direct object and tracked group for the widget on `helper`
    pub fn drag_group(&self, helper: Entity) -> EditorResult<(Entity, Vec<Entity>)> {
        let handle = self.handle(helper).ok_or(EditorError::NoSuchEntity(helper))?;
        let tracked = match self.options.position {
            TransformControlsPosition::Each => vec![handle.object],
            _ => self.islands.islands().to_vec(),
        };
        Ok((handle.object, tracked))
    }

    fn targets(&self) -> Vec<Entity> {
        match self.options.position {
            TransformControlsPosition::First => self.islands.first().into_iter().collect(),
            TransformControlsPosition::Last => self.islands.last().into_iter().collect(),
            TransformControlsPosition::Each => self.islands.islands().to_vec(),
            TransformControlsPosition::Average => self.pivot.into_iter().collect(),
        }
    }

    fn pivot_dragged(&self) -> bool {
        self.pivot.is_some_and(|pivot| {
            self.sessions
                .values()
                .any(|session| session.is_dragging() && session.transformer.is_direct(pivot))
        })
    }

    /// Bring pivot and widget helpers in line with the islands
    pub fn sync(&mut self, world: &mut World, scene_root: Entity) -> EditorResult<()> {
        let wants_pivot = self.options.position == TransformControlsPosition::Average && !self.islands.is_empty();
        match (wants_pivot, self.pivot) {
            (true, None) => {
                let pivot = world.spawn_child(
                    scene_root,
                    Transform::default(),
                    (PivotHelper { gizmo: self.id }, Name::new("gizmo pivot")),
                );
                debug!(gizmo = ?self.id, pivot = ?pivot, "Spawned average pivot");
                self.pivot = Some(pivot);
            }
            (false, Some(pivot)) if !self.pivot_dragged() => {
                let _ = world.despawn(pivot);
                self.pivot = None;
            }
            _ => {}
        }
        self.update_pivot(world)?;

        let targets = self.targets();
        let mut kept = Vec::with_capacity(targets.len());
        for handle in std::mem::take(&mut self.handles) {
            let live = world.contains(handle.object) && targets.contains(&handle.object);
            if live || self.is_dragging_on(handle.helper) {
                kept.push(handle);
            } else {
                trace!(gizmo = ?self.id, helper = ?handle.helper, "Removing gizmo widget");
                self.sessions.remove(&handle.helper);
                let _ = world.despawn(handle.helper);
            }
        }
        for object in targets {
            if kept.iter().any(|handle| handle.object == object) || !world.contains(object) {
                continue;
            }
            let helper = world.spawn_child(
                scene_root,
                Transform::default(),
                (GizmoHelper { gizmo: self.id, object }, Name::new("gizmo")),
            );
            trace!(gizmo = ?self.id, helper = ?helper, object = ?object, "Spawned gizmo widget");
            kept.push(GizmoHandle { helper, object });
        }
        self.handles = kept;
        self.refresh_helpers(world)
    }

    /// Move each widget helper onto its object
    pub fn refresh_helpers(&self, world: &mut World) -> EditorResult<()> {
        for handle in &self.handles {
            if world.contains(handle.object) && world.contains(handle.helper) {
                let matrix = world_matrix(world, handle.object)?;
                set_world_matrix(world, handle.helper, matrix)?;
            }
        }
        Ok(())
    }

    /// Recompute the average pivot unless a session is dragging it
    pub fn update_pivot(&self, world: &mut World) -> EditorResult<()> {
        let Some(pivot) = self.pivot else {
            return Ok(());
        };
        if self.pivot_dragged() {
            return Ok(());
        }
        let mut matrices = Vec::with_capacity(self.islands.len());
        for island in self.islands.islands() {
            if world.contains(*island) {
                matrices.push(world_matrix(world, *island)?);
            }
        }
        if let Some(average) = average_transform(&matrices) {
            set_world_matrix(world, pivot, average.to_matrix())?;
        }
        Ok(())
    }

    /// Start a session for the widget on `helper`
    ///
    /// The widget's transformer is created on first use. Outside `Each`
    /// placement its list mirrors the live group, so objects that join
    /// the group mid-drag follow from the step after they join.
    pub fn begin_drag(&mut self, world: &World, helper: Entity) -> EditorResult<TransformNotice> {
        let handle = self.handle(helper).ok_or(EditorError::NoSuchEntity(helper))?;
        let space = self.options.space;
        let per_island = self.options.position == TransformControlsPosition::Each;
        let group = &self.group;
        let session = self.sessions.entry(helper).or_insert_with(|| {
            let transformed = ObservableList::new();
            let feed = if per_island {
                transformed.push(handle.object);
                None
            } else {
                Some(SubsetSync::mirror(group, &transformed))
            };
            HelperSession {
                transformer: ObjectTransformer::with_list(transformed, space),
                _feed: feed,
            }
        });
        session.transformer.start(world, handle.object, space)
    }

    /// Apply an incremental delta from the widget on `helper`
    pub fn drag(&mut self, world: &mut World, helper: Entity, delta: Mat4) -> EditorResult<TransformNotice> {
        let handle = self.handle(helper).ok_or(EditorError::NoSuchEntity(helper))?;
        let session = self.sessions.get_mut(&helper).ok_or(EditorError::NoActiveSession)?;
        let notice = session.transformer.transform(world, delta)?;
        session.transformer.drive_direct(world, handle.object)?;
        self.refresh_helpers(world)?;
        Ok(notice)
    }

    /// Apply the final delta and close the session on `helper`
    pub fn end_drag(
        &mut self,
        world: &mut World,
        scene_root: Entity,
        helper: Entity,
        delta: Mat4,
    ) -> EditorResult<Vec<TransformNotice>> {
        let handle = self.handle(helper).ok_or(EditorError::NoSuchEntity(helper))?;
        let session = self.sessions.get_mut(&helper).ok_or(EditorError::NoActiveSession)?;
        let moved = session.transformer.transform(world, delta)?;
        session.transformer.drive_direct(world, handle.object)?;
        let completed = session.transformer.complete(world, Mat4::IDENTITY)?;
        self.sync(world, scene_root)?;
        Ok(vec![moved, completed])
    }

    /// Revert the session on `helper`
    pub fn cancel_drag(&mut self, world: &mut World, scene_root: Entity, helper: Entity) -> EditorResult<TransformNotice> {
        let session = self.sessions.get_mut(&helper).ok_or(EditorError::NoActiveSession)?;
        let notice = session.transformer.cancel(world)?;
        self.sync(world, scene_root)?;
        Ok(notice)
    }

    /// Despawn every helper node this gizmo owns
    pub fn despawn_helpers(&mut self, world: &mut World) {
        for handle in self.handles.drain(..) {
            let _ = world.despawn(handle.helper);
        }
        if let Some(pivot) = self.pivot.take() {
            let _ = world.despawn(pivot);
        }
        self.sessions.clear();
    }
}

impl Drop for Gizmo {
    fn drop(&mut self) {
        self.source.unsubscribe(self.subscription);
    }
}
