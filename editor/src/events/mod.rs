//! Event bubbling layer
//!
//! Pointer input and editor notifications are wrapped in [`SceneEvent`]s and
//! routed through the scene hierarchy with a capture and a bubble phase.
//! Listener registries are a side table keyed by entity.

pub mod dispatch;
pub mod event;
pub mod registry;

pub use dispatch::{ancestor_path, dispatch, DispatchReport, EventHost};
pub use event::{EventKind, ListenerPhase, Phase, PointerInput, SceneEvent};
pub use registry::{EventRegistry, Listener, ListenerId};
