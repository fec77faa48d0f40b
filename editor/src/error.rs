//! Editor error type

use crate::geometry_edit::FeatureKind;
use crate::selection::ScopeId;
use crate::transform::GizmoId;
use hecs::Entity;
use scene_engine::core::entity::HierarchyError;

/// Errors raised by editor operations
///
/// These are invariant violations: the offending operation is aborted and
/// no selection or transform state is changed.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("expected single display index for {kind:?} {base_index}, found {count}")]
    ExpectedSingleIndex {
        kind: FeatureKind,
        base_index: u32,
        count: usize,
    },

    #[error("hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("unknown selectable scope {0:?}")]
    UnknownScope(ScopeId),

    #[error("unknown gizmo {0:?}")]
    UnknownGizmo(GizmoId),

    #[error("entity {0:?} is not a geometry edit proxy")]
    UnknownProxy(Entity),

    #[error("no manipulation session is active")]
    NoActiveSession,

    #[error("entity {0:?} is already tracked by an active manipulation session")]
    SessionConflict(Entity),

    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),

    #[error("settings IO error: {0}")]
    SettingsIo(#[from] std::io::Error),

    #[error("settings format error: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

/// Result alias used across the editor
pub type EditorResult<T> = Result<T, EditorError>;
