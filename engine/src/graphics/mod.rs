//! Graphics module
//!
//! Provides the mesh data the host renders and the editor edits.

pub mod mesh;

// Re-export commonly used types
pub use mesh::{Mesh, Vertex};
