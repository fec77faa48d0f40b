//! Scene editor overlay
//!
//! This crate mounts around a scene and provides nested selection scopes,
//! pointer event bubbling over the scene hierarchy, transform gizmos and
//! vertex, edge and face editing. Rendering and hit testing stay with the host.

pub mod editor_state;
pub mod effects;
pub mod error;
pub mod events;
pub mod geometry_edit;
pub mod islands;
pub mod observable;
pub mod selection;
pub mod settings;
pub mod toolbar;
pub mod transform;

pub use editor_state::Editor;
pub use error::{EditorError, EditorResult};
pub use settings::EditorSettings;

pub mod prelude {
    pub use crate::events::{EventKind, ListenerPhase, Phase, PointerInput, SceneEvent};
    pub use crate::geometry_edit::{EditProxy, FeatureKind, GeometryMap, MappedMesh};
    pub use crate::observable::{ListEvent, ObjectRef, ObservableList};
    pub use crate::selection::{Resolution, ScopeId, SelectableOptions, SelectionMode};
    pub use crate::toolbar::ToolbarChoice;
    pub use crate::transform::{
        CoordinateSpace, GizmoHelper, GizmoId, GizmoMode, GizmoOptions, PivotHelper, TransformControlsPosition,
    };
    pub use crate::{Editor, EditorError, EditorResult, EditorSettings};
}
