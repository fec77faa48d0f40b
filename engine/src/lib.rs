//! Scene graph for the editor overlay
//!
//! This crate provides the retained scene the editor is mounted around:
//! an entity world with transform and parent components, hierarchy queries
//! and the mesh data used for geometry editing.

pub mod core;
pub mod graphics;

// Re-export commonly used types
pub mod prelude {
    // Entity system types
    pub use crate::core::entity::{
        hierarchy, update_hierarchy_system, Entity, GlobalTransform, HierarchyError, Name,
        Parent, Transform, World,
    };

    // Math types
    pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

    // Graphics types
    pub use crate::graphics::{Mesh, Vertex};
}

/// Initialize logging for the engine
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
