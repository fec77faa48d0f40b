//! Edit mesh to display mesh index maps

use super::FeatureKind;
use crate::error::{EditorError, EditorResult};
use glam::Vec3;
use scene_engine::graphics::Mesh;
use tracing::trace;

/// Bidirectional topology map between an edit mesh and its display mesh
///
/// Base indices address features of the edit mesh, display indices address
/// features of the mesh that is actually rendered.
pub trait GeometryMap {
    /// Number of base features of `kind`
    fn base_count(&self, kind: FeatureKind) -> usize;

    /// Display features derived from base feature `base`, in order
    fn display_indices(&self, kind: FeatureKind, base: u32) -> Vec<u32>;

    /// Position of a display feature in mesh space
    fn display_position(&self, kind: FeatureKind, display: u32) -> Option<Vec3>;

    /// Base vertices that make up base feature `base`
    fn base_feature_vertices(&self, kind: FeatureKind, base: u32) -> Vec<u32>;

    fn base_vertex_position(&self, base: u32) -> Option<Vec3>;

    /// Move one edit-mesh vertex; returns whether the vertex exists
    fn move_base_vertex(&mut self, base: u32, position: Vec3) -> bool;
}

/// The one display feature of base feature `base`
///
/// Eliminated features resolve to `None`. A feature that fans out to several
/// display features is a data error.
pub fn resolve_single(map: &dyn GeometryMap, kind: FeatureKind, base: u32) -> EditorResult<Option<u32>> {
    let indices = map.display_indices(kind, base);
    match indices.as_slice() {
        [] => {
            trace!(kind = ?kind, base, "Feature has no display counterpart");
            Ok(None)
        }
        [single] => Ok(Some(*single)),
        _ => Err(EditorError::ExpectedSingleIndex {
            kind,
            base_index: base,
            count: indices.len(),
        }),
    }
}

/// Index map over two meshes held in memory
#[derive(Debug, Clone)]
pub struct MappedMesh {
    edit: Mesh,
    display: Mesh,
    edit_edges: Vec<[u32; 2]>,
    display_edges: Vec<[u32; 2]>,
    vertex_map: Vec<Vec<u32>>,
    edge_map: Vec<Vec<u32>>,
    face_map: Vec<Vec<u32>>,
}

impl MappedMesh {
    /// Map `edit` onto `display` with explicit per-kind tables
    ///
    /// Each table has one entry per base feature. Missing entries map to
    /// nothing.
    pub fn new(
        edit: Mesh,
        display: Mesh,
        vertex_map: Vec<Vec<u32>>,
        edge_map: Vec<Vec<u32>>,
        face_map: Vec<Vec<u32>>,
    ) -> Self {
        let edit_edges = edit.edges();
        let display_edges = display.edges();
        Self {
            edit,
            display,
            edit_edges,
            display_edges,
            vertex_map,
            edge_map,
            face_map,
        }
    }

    /// Display a mesh as itself
    pub fn identity(mesh: Mesh) -> Self {
        let vertex_map = (0..mesh.vertices.len() as u32).map(|index| vec![index]).collect();
        let edge_map = (0..mesh.edges().len() as u32).map(|index| vec![index]).collect();
        let face_map = (0..mesh.face_count() as u32).map(|index| vec![index]).collect();
        Self::new(mesh.clone(), mesh, vertex_map, edge_map, face_map)
    }

    pub fn edit_mesh(&self) -> &Mesh {
        &self.edit
    }

    pub fn display_mesh(&self) -> &Mesh {
        &self.display
    }

    fn table(&self, kind: FeatureKind) -> &[Vec<u32>] {
        match kind {
            FeatureKind::Vertex => &self.vertex_map,
            FeatureKind::Edge => &self.edge_map,
            FeatureKind::Face => &self.face_map,
        }
    }
}

impl GeometryMap for MappedMesh {
    fn base_count(&self, kind: FeatureKind) -> usize {
        match kind {
            FeatureKind::Vertex => self.edit.vertices.len(),
            FeatureKind::Edge => self.edit_edges.len(),
            FeatureKind::Face => self.edit.face_count(),
        }
    }

    fn display_indices(&self, kind: FeatureKind, base: u32) -> Vec<u32> {
        self.table(kind).get(base as usize).cloned().unwrap_or_default()
    }

    fn display_position(&self, kind: FeatureKind, display: u32) -> Option<Vec3> {
        match kind {
            FeatureKind::Vertex => self.display.vertex_position(display),
            FeatureKind::Edge => self
                .display_edges
                .get(display as usize)
                .and_then(|edge| self.display.edge_center(*edge)),
            FeatureKind::Face => self.display.face_center(display as usize),
        }
    }

    fn base_feature_vertices(&self, kind: FeatureKind, base: u32) -> Vec<u32> {
        match kind {
            FeatureKind::Vertex => {
                if (base as usize) < self.edit.vertices.len() {
                    vec![base]
                } else {
                    Vec::new()
                }
            }
            FeatureKind::Edge => self
                .edit_edges
                .get(base as usize)
                .map(|edge| edge.to_vec())
                .unwrap_or_default(),
            FeatureKind::Face => self
                .edit
                .face(base as usize)
                .map(|face| face.to_vec())
                .unwrap_or_default(),
        }
    }

    fn base_vertex_position(&self, base: u32) -> Option<Vec3> {
        self.edit.vertex_position(base)
    }

    fn move_base_vertex(&mut self, base: u32, position: Vec3) -> bool {
        if !self.edit.set_vertex_position(base, position) {
            return false;
        }
        // Display vertices derived from this one follow it
        for display in self.vertex_map.get(base as usize).cloned().unwrap_or_default() {
            self.display.set_vertex_position(display, position);
        }
        true
    }
}
