//! Deferred reactions to list changes
//!
//! List subscribers cannot reach the editor, so they queue an [`Effect`]
//! instead. The editor drains the queue at the end of every operation.

use crate::observable::ListEvent;
use crate::selection::SelectableOptions;
use crate::transform::GizmoId;
use hecs::Entity;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A queued reaction
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Object entered the selection of at least one scope
    Selected(Entity),
    /// Object left the selection of every scope
    Deselected(Entity),
    /// The list a gizmo observes changed
    GroupChanged { gizmo: GizmoId, change: ListEvent<Entity> },
    /// A deferred container reference resolved
    Register { container: Entity, options: SelectableOptions },
}

/// Shared FIFO of pending effects
#[derive(Debug, Clone, Default)]
pub struct EffectQueue {
    queue: Rc<RefCell<VecDeque<Effect>>>,
}

impl EffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, effect: Effect) {
        self.queue.borrow_mut().push_back(effect);
    }

    pub fn pop(&self) -> Option<Effect> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}
