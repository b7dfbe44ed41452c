//! In-memory mesh: vertex positions, explicit topology and attached fields.

use std::path::PathBuf;

use crate::data::mesh_data::{DataKind, MeshData};
use crate::error::EmulatorError;
use crate::topology::validation::validate_mesh_topology;

/// Index into [`Mesh::positions`]; stable for the mesh's lifetime.
pub type VertexIndex = usize;
/// Explicit line element.
pub type Edge = [VertexIndex; 2];
/// Triangle face.
pub type Triangle = [VertexIndex; 3];
/// Quadrilateral face in perimeter order: (a,b),(b,c),(c,d),(d,a) are its sides.
pub type Quad = [VertexIndex; 4];
/// Tetrahedral volume.
pub type Tetrahedron = [VertexIndex; 4];

/// Mesh with 2D or 3D vertex positions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Vertex coordinates, each of length equal to the mesh dimension.
    pub positions: Vec<Vec<f64>>,
    pub edges: Vec<Edge>,
    pub triangles: Vec<Triangle>,
    pub quads: Vec<Quad>,
    pub tetrahedra: Vec<Tetrahedron>,
    /// File the mesh (and its current field values) was loaded from.
    pub fname: PathBuf,
    pub data: Vec<MeshData>,
}

impl Mesh {
    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Spatial dimension, taken from the first vertex (0 for an empty mesh).
    pub fn dimension(&self) -> usize {
        self.positions.first().map_or(0, Vec::len)
    }

    /// Whether the mesh carries any connectivity beyond vertex positions.
    pub fn has_connectivity(&self) -> bool {
        !(self.edges.is_empty()
            && self.triangles.is_empty()
            && self.quads.is_empty()
            && self.tetrahedra.is_empty())
    }

    /// Check that every topology index refers to an existing vertex.
    pub fn validate(&self) -> Result<(), EmulatorError> {
        validate_mesh_topology(self)
    }

    /// Look up a field by name and kind.
    pub fn find_data(&self, name: &str, kind: DataKind) -> Option<&MeshData> {
        self.data.iter().find(|d| d.name == name && d.kind == kind)
    }

    /// Clear every field buffer.
    pub fn reset_data(&mut self) {
        for data in &mut self.data {
            data.reset();
        }
    }

    /// One-line summary of the mesh contents.
    pub fn summary(&self) -> String {
        format!(
            "{} Vertices, {} Data arrays, {} Edges, {} Triangles, {} Quadrilaterals, {} Tetrahedra",
            self.positions.len(),
            self.data.len(),
            self.edges.len(),
            self.triangles.len(),
            self.quads.len(),
            self.tetrahedra.len()
        )
    }

    /// Preview of every field, `max` values each.
    pub fn preview_data(&self, max: usize) -> String {
        if self.data.is_empty() || max == 0 {
            return "<nothing>".to_string();
        }
        self.data
            .iter()
            .map(|d| d.preview(max))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_everything() {
        let mut mesh = Mesh {
            positions: vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]],
            triangles: vec![[0, 1, 2]],
            ..Default::default()
        };
        mesh.data.push(MeshData::new(DataKind::Write, 1, "T"));
        assert_eq!(mesh.dimension(), 2);
        assert!(mesh.has_connectivity());
        assert_eq!(
            mesh.summary(),
            "3 Vertices, 1 Data arrays, 0 Edges, 1 Triangles, 0 Quadrilaterals, 0 Tetrahedra"
        );
    }

    #[test]
    fn validate_rejects_dangling_indices() {
        let mesh = Mesh {
            positions: vec![vec![0.0, 0.0], vec![1.0, 0.0]],
            edges: vec![[0, 2]],
            ..Default::default()
        };
        assert!(matches!(mesh.validate(), Err(EmulatorError::MalformedMesh(_))));
    }
}
