//! Synthetic scene events and the native pointer input they wrap

use glam::{Mat4, Vec3};
use hecs::Entity;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INPUT_ID: AtomicU64 = AtomicU64::new(1);

/// Event types routed through the scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    PointerDown,
    PointerUp,
    PointerMove,
    PointerEnter,
    PointerLeave,
    /// A click that hit nothing; only ever delivered to the scene root
    PointerMissed,
    Selected,
    Deselected,
    TransformStart,
    Transform,
    TransformComplete,
    TransformCancel,
}

impl EventKind {
    /// Whether this kind originates from pointer input
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            Self::Click
                | Self::PointerDown
                | Self::PointerUp
                | Self::PointerMove
                | Self::PointerEnter
                | Self::PointerLeave
                | Self::PointerMissed
        )
    }
}

/// Phase a listener is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerPhase {
    /// Runs on the way down, root first
    Capture,
    /// Runs on the way up, target first
    Bubble,
}

/// Phase the event is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Target,
    Bubble,
}

/// Pointer input as reported by the host's input collaborator
///
/// Cancellation flags are shared with every [`SceneEvent`] built from this
/// input, so a listener stopping a synthetic event also stops the native one.
#[derive(Debug, Clone)]
pub struct PointerInput {
    id: u64,
    /// Event type
    pub kind: EventKind,
    /// Nearest intersected scene object
    pub hit: Option<Entity>,
    /// World-space intersection point
    pub point: Option<Vec3>,
    /// Pressed button, 0 for the primary button
    pub button: u16,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl PointerInput {
    /// Create input of `kind` with no hit object
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: NEXT_INPUT_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            hit: None,
            point: None,
            button: 0,
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    /// Click on `hit` at world-space `point`
    pub fn click(hit: Entity, point: Vec3) -> Self {
        Self::new(EventKind::Click).with_hit(hit, point)
    }

    /// Click that intersected nothing
    pub fn click_background() -> Self {
        Self::new(EventKind::Click)
    }

    /// Attach the hit object and intersection point
    pub fn with_hit(mut self, hit: Entity, point: Vec3) -> Self {
        self.hit = Some(hit);
        self.point = Some(point);
        self
    }

    /// Set the pressed button
    pub fn with_button(mut self, button: u16) -> Self {
        self.button = button;
        self
    }

    /// Identity of this input; clones share it
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether a handler cancelled propagation
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    /// Whether a handler suppressed default behaviour
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    fn prevent_default(&self) {
        self.default_prevented.set(true);
    }
}

/// Event delivered to listeners while it travels through the scene graph
///
/// `target` is fixed at construction; `current_target` and `phase` are
/// updated by the dispatcher before each listener runs.
#[derive(Debug, Clone)]
pub struct SceneEvent {
    kind: EventKind,
    target: Entity,
    current_target: Entity,
    phase: Phase,
    bubbles: bool,
    point: Option<Vec3>,
    delta: Option<Mat4>,
    native: Option<Rc<PointerInput>>,
    propagation_stopped: bool,
    immediate_stopped: bool,
    default_prevented: bool,
}

impl SceneEvent {
    /// Create an event of `kind` aimed at `target`
    pub fn new(kind: EventKind, target: Entity, bubbles: bool) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            phase: Phase::Target,
            bubbles,
            point: None,
            delta: None,
            native: None,
            propagation_stopped: false,
            immediate_stopped: false,
            default_prevented: false,
        }
    }

    /// Wrap native pointer input aimed at `target`
    pub fn from_pointer(native: Rc<PointerInput>, kind: EventKind, target: Entity, bubbles: bool) -> Self {
        let mut event = Self::new(kind, target, bubbles);
        event.point = native.point;
        event.native = Some(native);
        event
    }

    /// Attach a transform delta
    pub fn with_delta(mut self, delta: Mat4) -> Self {
        self.delta = Some(delta);
        self
    }

    /// Event type
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Object the event was dispatched to
    pub fn target(&self) -> Entity {
        self.target
    }

    /// Object whose listeners are currently running
    pub fn current_target(&self) -> Entity {
        self.current_target
    }

    /// Current propagation phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the event travels through ancestors
    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// World-space intersection point, for pointer events
    pub fn point(&self) -> Option<Vec3> {
        self.point
    }

    /// Accumulated transform delta, for transform events
    pub fn delta(&self) -> Option<Mat4> {
        self.delta
    }

    /// Native input this event wraps
    pub fn native(&self) -> Option<&PointerInput> {
        self.native.as_deref()
    }

    /// Stop after the listeners of the current object have run
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
        if let Some(native) = &self.native {
            native.stop_propagation();
        }
    }

    /// Stop before any further listener runs, including on the current object
    pub fn stop_immediate_propagation(&mut self) {
        self.immediate_stopped = true;
        self.stop_propagation();
    }

    /// Suppress the default behaviour of the native input
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
        if let Some(native) = &self.native {
            native.prevent_default();
        }
    }

    /// Whether propagation was stopped
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Whether propagation was stopped immediately
    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_stopped
    }

    /// Whether default behaviour was suppressed
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub(crate) fn enter(&mut self, node: Entity, phase: Phase) {
        self.current_target = node;
        self.phase = phase;
    }
}
