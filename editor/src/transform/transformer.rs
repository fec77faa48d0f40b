//! Manipulation sessions that propagate a gizmo delta to followers

use super::CoordinateSpace;
use crate::error::{EditorError, EditorResult};
use crate::events::EventKind;
use crate::observable::ObservableList;
use glam::{Mat4, Vec4};
use hecs::Entity;
use scene_engine::core::entity::hierarchy::{depth, set_world_matrix, world_matrix};
use scene_engine::core::entity::{HierarchyError, Transform, World};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Dragging,
}

/// Event the editor must dispatch after a session step
#[derive(Debug, Clone, PartialEq)]
pub struct TransformNotice {
    pub kind: EventKind,
    pub targets: Vec<Entity>,
    /// Delta accumulated since the session started
    pub delta: Mat4,
}

/// `matrix` with its translation removed
pub fn strip_translation(matrix: Mat4) -> Mat4 {
    let mut stripped = matrix;
    stripped.w_axis = Vec4::W;
    stripped
}

/// Express a world-space `delta` in the frame of an object whose
/// session-start world matrix is `start_world`
pub fn local_frame_delta(start_world: Mat4, delta: Mat4) -> Mat4 {
    let rotation_scale = strip_translation(start_world);
    rotation_scale.inverse() * delta * rotation_scale
}

/// One manipulation session
///
/// Snapshots are taken once, when the session leaves `Idle`. Every step
/// recomputes followers from those snapshots and the accumulated delta, so
/// the outcome depends only on the composed delta. Objects that enter the
/// tracked list mid-session are snapshotted at the next step and follow
/// only the deltas applied from then on.
#[derive(Debug)]
pub struct ObjectTransformer {
    directly_transformed: Vec<Entity>,
    start_transforms: HashMap<Entity, Mat4>,
    /// Accumulated delta at the moment a late object joined
    joined_at: HashMap<Entity, Mat4>,
    space: CoordinateSpace,
    transformed: ObservableList<Entity>,
    accumulated: Mat4,
    state: SessionState,
}

impl ObjectTransformer {
    pub fn new(space: CoordinateSpace) -> Self {
        Self::with_list(ObservableList::new(), space)
    }

    /// Track the objects in `transformed`
    pub fn with_list(transformed: ObservableList<Entity>, space: CoordinateSpace) -> Self {
        Self {
            directly_transformed: Vec::new(),
            start_transforms: HashMap::new(),
            joined_at: HashMap::new(),
            space,
            transformed,
            accumulated: Mat4::IDENTITY,
            state: SessionState::Idle,
        }
    }

    /// The tracked group
    pub fn transformed(&self) -> &ObservableList<Entity> {
        &self.transformed
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        self.state == SessionState::Dragging
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    pub fn accumulated(&self) -> Mat4 {
        self.accumulated
    }

    pub fn is_direct(&self, entity: Entity) -> bool {
        self.directly_transformed.contains(&entity)
    }

    /// Whether `entity` is tracked or directly transformed
    pub fn tracks(&self, entity: Entity) -> bool {
        self.is_direct(entity) || self.transformed.contains(&entity)
    }

    /// Tracked objects followed by direct objects not already tracked
    pub fn tracked(&self) -> Vec<Entity> {
        let mut tracked = self.transformed.to_vec();
        for entity in &self.directly_transformed {
            if !tracked.contains(entity) {
                tracked.push(*entity);
            }
        }
        tracked
    }

    fn snapshot(&mut self, world: &World, entity: Entity) -> Result<(), HierarchyError> {
        if self.start_transforms.contains_key(&entity) {
            return Ok(());
        }
        let matrix = match self.space {
            CoordinateSpace::Local => world.local_transform(entity).to_matrix(),
            CoordinateSpace::Global => world_matrix(world, entity)?,
        };
        self.start_transforms.insert(entity, matrix);
        Ok(())
    }

    /// Start (or join) the session with `object` as a directly transformed object
    pub fn start(&mut self, world: &World, object: Entity, space: CoordinateSpace) -> EditorResult<TransformNotice> {
        if self.state == SessionState::Idle {
            self.space = space;
            self.accumulated = Mat4::IDENTITY;
            self.start_transforms.clear();
            self.joined_at.clear();
            for entity in self.transformed.to_vec() {
                self.snapshot(world, entity)?;
            }
            self.state = SessionState::Dragging;
            debug!(object = ?object, space = ?space, "Manipulation session started");
        } else if space != self.space {
            warn!(object = ?object, space = ?space, "Ignoring coordinate space of a joining object");
        }

        if !self.is_direct(object) {
            self.directly_transformed.push(object);
        }
        self.join(world, object)?;

        Ok(self.notice(EventKind::TransformStart))
    }

    /// Snapshot `entity` if it is new to the running session
    fn join(&mut self, world: &World, entity: Entity) -> Result<(), HierarchyError> {
        if self.start_transforms.contains_key(&entity) || !world.contains(entity) {
            return Ok(());
        }
        self.snapshot(world, entity)?;
        if self.accumulated != Mat4::IDENTITY {
            self.joined_at.insert(entity, self.accumulated);
        }
        Ok(())
    }

    fn join_late_members(&mut self, world: &World) -> Result<(), HierarchyError> {
        for entity in self.transformed.to_vec() {
            self.join(world, entity)?;
        }
        Ok(())
    }

    /// Delta `entity` has seen since it joined
    fn delta_for(&self, entity: Entity) -> Mat4 {
        match self.joined_at.get(&entity) {
            Some(joined) => self.accumulated * joined.inverse(),
            None => self.accumulated,
        }
    }

    /// Accumulate `delta` and move every follower
    pub fn transform(&mut self, world: &mut World, delta: Mat4) -> EditorResult<TransformNotice> {
        if !self.is_dragging() {
            return Err(EditorError::NoActiveSession);
        }
        self.join_late_members(world)?;
        self.accumulated = delta * self.accumulated;
        self.propagate(world)?;
        Ok(self.notice(EventKind::Transform))
    }

    /// Final step; returns the session to `Idle`
    pub fn complete(&mut self, world: &mut World, delta: Mat4) -> EditorResult<TransformNotice> {
        if !self.is_dragging() {
            return Err(EditorError::NoActiveSession);
        }
        self.join_late_members(world)?;
        self.accumulated = delta * self.accumulated;
        self.propagate(world)?;
        let notice = self.notice(EventKind::TransformComplete);
        self.reset();
        debug!(targets = notice.targets.len(), "Manipulation session completed");
        Ok(notice)
    }

    /// Restore every snapshot, direct objects included, and return to `Idle`
    pub fn cancel(&mut self, world: &mut World) -> EditorResult<TransformNotice> {
        if !self.is_dragging() {
            return Err(EditorError::NoActiveSession);
        }
        // Parents before children so world matrices resolve against restored parents
        let mut snapshots = Vec::with_capacity(self.start_transforms.len());
        for (entity, matrix) in &self.start_transforms {
            if world.contains(*entity) {
                snapshots.push((depth(world, *entity)?, *entity, *matrix));
            }
        }
        snapshots.sort_by_key(|(level, _, _)| *level);
        for (_, entity, matrix) in snapshots {
            match self.space {
                CoordinateSpace::Local => world
                    .set_local_transform(entity, Transform::from_matrix(matrix))
                    .map_err(|_| EditorError::NoSuchEntity(entity))?,
                CoordinateSpace::Global => set_world_matrix(world, entity, matrix)?,
            }
        }
        self.accumulated = Mat4::IDENTITY;
        let notice = self.notice(EventKind::TransformCancel);
        self.reset();
        debug!(targets = notice.targets.len(), "Manipulation session cancelled");
        Ok(notice)
    }

    /// Apply the accumulated delta to a directly transformed object
    pub fn drive_direct(&self, world: &mut World, object: Entity) -> EditorResult<()> {
        if !self.is_dragging() {
            return Err(EditorError::NoActiveSession);
        }
        self.apply_to(world, object)
    }

    fn propagate(&self, world: &mut World) -> EditorResult<()> {
        for entity in self.transformed.to_vec() {
            if self.is_direct(entity) {
                continue;
            }
            self.apply_to(world, entity)?;
        }
        Ok(())
    }

    fn apply_to(&self, world: &mut World, entity: Entity) -> EditorResult<()> {
        let Some(start) = self.start_transforms.get(&entity).copied() else {
            trace!(entity = ?entity, "Skipping object without a session snapshot");
            return Ok(());
        };
        if !world.contains(entity) {
            return Ok(());
        }
        let delta = self.delta_for(entity);
        match self.space {
            CoordinateSpace::Local => {
                let local = Transform::from_matrix(start * delta);
                world
                    .set_local_transform(entity, local)
                    .map_err(|_| EditorError::NoSuchEntity(entity))?;
            }
            CoordinateSpace::Global => {
                let target = start * local_frame_delta(start, delta);
                set_world_matrix(world, entity, target)?;
            }
        }
        Ok(())
    }

    fn notice(&self, kind: EventKind) -> TransformNotice {
        TransformNotice {
            kind,
            targets: self.tracked(),
            delta: self.accumulated,
        }
    }

    fn reset(&mut self) {
        self.directly_transformed.clear();
        self.start_transforms.clear();
        self.joined_at.clear();
        self.state = SessionState::Idle;
    }
}
