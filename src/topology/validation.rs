//! Topology validation helpers.

use crate::data::mesh::{Mesh, VertexIndex};
use crate::error::EmulatorError;
use crate::topology::cell_type::CellType;

/// Check that every topology index refers to an existing vertex and that no
/// element repeats a vertex.
///
/// Registration calls this before touching the session so a malformed mesh
/// fails without leaving partial topology behind.
pub fn validate_mesh_topology(mesh: &Mesh) -> Result<(), EmulatorError> {
    let n = mesh.num_vertices();
    for (i, e) in mesh.edges.iter().enumerate() {
        check_element(CellType::Segment, i, e, n)?;
    }
    for (i, t) in mesh.triangles.iter().enumerate() {
        check_element(CellType::Triangle, i, t, n)?;
    }
    for (i, q) in mesh.quads.iter().enumerate() {
        check_element(CellType::Quadrilateral, i, q, n)?;
    }
    for (i, t) in mesh.tetrahedra.iter().enumerate() {
        check_element(CellType::Tetrahedron, i, t, n)?;
    }
    Ok(())
}

fn check_element(
    cell_type: CellType,
    index: usize,
    vertices: &[VertexIndex],
    num_vertices: usize,
) -> Result<(), EmulatorError> {
    debug_assert_eq!(vertices.len(), cell_type.vertex_count());
    if let Some(&v) = vertices.iter().find(|&&v| v >= num_vertices) {
        return Err(EmulatorError::MalformedMesh(format!(
            "{cell_type:?} {index} refers to vertex {v}, but the mesh has {num_vertices} vertices"
        )));
    }
    for (k, a) in vertices.iter().enumerate() {
        if vertices[k + 1..].contains(a) {
            return Err(EmulatorError::MalformedMesh(format!(
                "{cell_type:?} {index} repeats vertex {a}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Mesh {
        Mesh {
            positions: vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, 1.0],
            ],
            quads: vec![[0, 1, 2, 3]],
            ..Default::default()
        }
    }

    #[test]
    fn valid_mesh_passes() {
        validate_mesh_topology(&square()).unwrap();
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut mesh = square();
        mesh.triangles.push([0, 1, 4]);
        let err = validate_mesh_topology(&mesh).unwrap_err();
        assert!(matches!(err, EmulatorError::MalformedMesh(msg) if msg.contains("vertex 4")));
    }

    #[test]
    fn degenerate_edge_is_rejected() {
        let mut mesh = square();
        mesh.edges.push([2, 2]);
        assert!(matches!(
            validate_mesh_topology(&mesh),
            Err(EmulatorError::MalformedMesh(_))
        ));
    }
}
