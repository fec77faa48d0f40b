//! Capture and bubble dispatch over the scene hierarchy

use super::event::{ListenerPhase, Phase, SceneEvent};
use super::registry::EventRegistry;
use hecs::Entity;
use scene_engine::core::entity::hierarchy::MAX_HIERARCHY_DEPTH;
use scene_engine::core::entity::HierarchyError;
use std::collections::HashSet;
use tracing::trace;

/// Context an event is dispatched through
///
/// The host owns the registry and answers parent queries. Listeners receive
/// the host mutably, so lookups are re-done for every node visited.
pub trait EventHost: Sized {
    fn registry(&self) -> &EventRegistry<Self>;

    fn parent_of(&self, entity: Entity) -> Option<Entity>;
}

/// What happened during one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Propagation was stopped by a listener
    pub stopped: bool,
    /// Nodes whose bubble-phase listeners were reached, target first
    pub bubbled: Vec<Entity>,
}

impl DispatchReport {
    /// Whether the bubble phase reached `entity`
    pub fn reached(&self, entity: Entity) -> bool {
        self.bubbled.contains(&entity)
    }
}

/// Ancestors of `entity` through the host, nearest first
///
/// A node without a parent ends the chain. Cycles and chains deeper than
/// [`MAX_HIERARCHY_DEPTH`] are errors.
pub fn ancestor_path<C: EventHost>(host: &C, entity: Entity) -> Result<Vec<Entity>, HierarchyError> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(entity);

    let mut current = entity;
    while let Some(parent) = host.parent_of(current) {
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

/// Deliver `event` to its target and, if it bubbles, the target's ancestors
///
/// Capture listeners run root-most first down to the target, then bubble
/// listeners run from the target up to the root. A non-bubbling event only
/// visits the target. The ancestor path is computed once before any
/// listener runs.
pub fn dispatch<C: EventHost>(host: &mut C, event: &mut SceneEvent) -> Result<DispatchReport, HierarchyError> {
    let target = event.target();
    let path = if event.bubbles() {
        ancestor_path(host, target)?
    } else {
        Vec::new()
    };
    trace!(kind = ?event.kind(), target = ?target, depth = path.len(), "Dispatching scene event");

    let mut report = DispatchReport::default();

    for node in path.iter().rev() {
        if run_listeners(host, event, *node, Phase::Capture, ListenerPhase::Capture) {
            report.stopped = true;
            return Ok(report);
        }
    }

    if run_listeners(host, event, target, Phase::Target, ListenerPhase::Capture) {
        report.stopped = true;
        return Ok(report);
    }
    report.bubbled.push(target);
    if run_listeners(host, event, target, Phase::Target, ListenerPhase::Bubble) {
        report.stopped = true;
        return Ok(report);
    }

    for node in &path {
        report.bubbled.push(*node);
        if run_listeners(host, event, *node, Phase::Bubble, ListenerPhase::Bubble) {
            report.stopped = true;
            return Ok(report);
        }
    }

    Ok(report)
}

/// Run the listeners of one node; returns whether propagation stopped
fn run_listeners<C: EventHost>(
    host: &mut C,
    event: &mut SceneEvent,
    node: Entity,
    phase: Phase,
    listener_phase: ListenerPhase,
) -> bool {
    let listeners = host.registry().listeners(node, event.kind(), listener_phase);
    if listeners.is_empty() {
        return event.is_propagation_stopped();
    }

    event.enter(node, phase);
    for listener in listeners {
        listener(host, event);
        if event.is_immediate_propagation_stopped() {
            return true;
        }
    }
    event.is_propagation_stopped()
}
