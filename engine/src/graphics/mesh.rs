//! Mesh component and vertex data structures
//!
//! Provides mesh data structures, primitive generation functions
//! for cubes and planes, and the
//! topology queries (faces, edges, centroids) used by geometry editing.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertex data structure for GPU rendering
///
/// This struct is tightly packed for efficient GPU transfer using bytemuck.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],
    /// Surface normal vector (normalized)
    pub normal: [f32; 3],
    /// Texture coordinates (UV mapping)
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex with the given attributes
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Position as a vector
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Mesh component containing vertex and index data
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex data for the mesh
    pub vertices: Vec<Vertex>,
    /// Index data for triangle assembly
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new mesh from vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Create a cube mesh with the given size
    ///
    /// The cube is centered at the origin with each side having length `size`.
    pub fn cube(size: f32) -> Self {
        let half = size * 0.5;

        // Define the 8 corner positions
        let positions = [
            [-half, -half, -half], // 0: left bottom back
            [half, -half, -half],  // 1: right bottom back
            [half, half, -half],   // 2: right top back
            [-half, half, -half],  // 3: left top back
            [-half, -half, half],  // 4: left bottom front
            [half, -half, half],   // 5: right bottom front
            [half, half, half],    // 6: right top front
            [-half, half, half],   // 7: left top front
        ];

        // Each face needs 4 unique vertices (for proper normals and UVs)
        let vertices = vec![
            // Front face (positive Z)
            Vertex::new(positions[4], [0.0, 0.0, 1.0], [0.0, 1.0]),
            Vertex::new(positions[5], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new(positions[6], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new(positions[7], [0.0, 0.0, 1.0], [0.0, 0.0]),
            // Back face (negative Z)
            Vertex::new(positions[1], [0.0, 0.0, -1.0], [0.0, 1.0]),
            Vertex::new(positions[0], [0.0, 0.0, -1.0], [1.0, 1.0]),
            Vertex::new(positions[3], [0.0, 0.0, -1.0], [1.0, 0.0]),
            Vertex::new(positions[2], [0.0, 0.0, -1.0], [0.0, 0.0]),
            // Top face (positive Y)
            Vertex::new(positions[7], [0.0, 1.0, 0.0], [0.0, 1.0]),
            Vertex::new(positions[6], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex::new(positions[2], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::new(positions[3], [0.0, 1.0, 0.0], [0.0, 0.0]),
            // Bottom face (negative Y)
            Vertex::new(positions[0], [0.0, -1.0, 0.0], [0.0, 1.0]),
            Vertex::new(positions[1], [0.0, -1.0, 0.0], [1.0, 1.0]),
            Vertex::new(positions[5], [0.0, -1.0, 0.0], [1.0, 0.0]),
            Vertex::new(positions[4], [0.0, -1.0, 0.0], [0.0, 0.0]),
            // Right face (positive X)
            Vertex::new(positions[5], [1.0, 0.0, 0.0], [0.0, 1.0]),
            Vertex::new(positions[1], [1.0, 0.0, 0.0], [1.0, 1.0]),
            Vertex::new(positions[2], [1.0, 0.0, 0.0], [1.0, 0.0]),
            Vertex::new(positions[6], [1.0, 0.0, 0.0], [0.0, 0.0]),
            // Left face (negative X)
            Vertex::new(positions[0], [-1.0, 0.0, 0.0], [0.0, 1.0]),
            Vertex::new(positions[4], [-1.0, 0.0, 0.0], [1.0, 1.0]),
            Vertex::new(positions[7], [-1.0, 0.0, 0.0], [1.0, 0.0]),
            Vertex::new(positions[3], [-1.0, 0.0, 0.0], [0.0, 0.0]),
        ];

        // Create indices for triangles (2 triangles per face, 6 indices per face)
        let mut indices = Vec::with_capacity(36);
        for i in 0..6 {
            let base = i * 4;
            // First triangle
            indices.push(base);
            indices.push(base + 1);
            indices.push(base + 2);
            // Second triangle
            indices.push(base);
            indices.push(base + 2);
            indices.push(base + 3);
        }

        Self { vertices, indices }
    }

    /// Create a plane mesh on the XZ plane
    ///
    /// The plane is centered at the origin with the given width and depth.
    pub fn plane(width: f32, depth: f32) -> Self {
        let half_width = width * 0.5;
        let half_depth = depth * 0.5;

        let vertices = vec![
            Vertex::new([-half_width, 0.0, -half_depth], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex::new([half_width, 0.0, -half_depth], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::new([half_width, 0.0, half_depth], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex::new([-half_width, 0.0, half_depth], [0.0, 1.0, 0.0], [0.0, 1.0]),
        ];

        // Create double-sided plane by including both winding orders
        let indices = vec![
            // Top face (viewed from above)
            0, 1, 2, // First triangle
            0, 2, 3, // Second triangle
            // Bottom face (viewed from below)
            0, 2, 1, // First triangle reversed
            0, 3, 2, // Second triangle reversed
        ];

        Self { vertices, indices }
    }

    /// Raw vertex bytes for upload by the host renderer
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Number of triangles
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex indices of triangle `face`
    pub fn face(&self, face: usize) -> Option<[u32; 3]> {
        let start = face.checked_mul(3)?;
        match self.indices.get(start..start + 3) {
            Some(&[a, b, c]) => Some([a, b, c]),
            _ => None,
        }
    }

    /// Position of vertex `index`
    pub fn vertex_position(&self, index: u32) -> Option<Vec3> {
        self.vertices.get(index as usize).map(Vertex::position)
    }

    /// Move vertex `index`, returning false when it does not exist
    pub fn set_vertex_position(&mut self, index: u32, position: Vec3) -> bool {
        match self.vertices.get_mut(index as usize) {
            Some(vertex) => {
                vertex.position = position.to_array();
                true
            }
            None => false,
        }
    }

    /// Centroid of triangle `face`
    pub fn face_center(&self, face: usize) -> Option<Vec3> {
        let [a, b, c] = self.face(face)?;
        let sum = self.vertex_position(a)? + self.vertex_position(b)? + self.vertex_position(c)?;
        Some(sum / 3.0)
    }

    /// Unique undirected edges, each with the lower index first, in first-seen order
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut seen = std::collections::HashSet::new();
        let mut edges = Vec::new();
        for triangle in self.indices.chunks_exact(3) {
            for (a, b) in [
                (triangle[0], triangle[1]),
                (triangle[1], triangle[2]),
                (triangle[2], triangle[0]),
            ] {
                let edge = [a.min(b), a.max(b)];
                if seen.insert(edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Midpoint of `edge`
    pub fn edge_center(&self, edge: [u32; 2]) -> Option<Vec3> {
        Some((self.vertex_position(edge[0])? + self.vertex_position(edge[1])?) * 0.5)
    }
}
