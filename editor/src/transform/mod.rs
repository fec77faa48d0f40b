//! Transform propagation
//!
//! A gizmo manipulates one object directly; every other member of the
//! manipulated group follows through an [`ObjectTransformer`] session.

pub mod gizmo;
pub mod transformer;

pub use gizmo::{
    average_transform, Gizmo, GizmoHandle, GizmoHelper, GizmoId, GizmoMode, GizmoOptions, PivotHelper,
    TransformControlsPosition,
};
pub use transformer::{local_frame_delta, strip_translation, ObjectTransformer, SessionState, TransformNotice};

use serde::{Deserialize, Serialize};

/// Frame a gizmo delta is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Each object's own frame
    Local,
    /// World axes
    #[default]
    Global,
}
