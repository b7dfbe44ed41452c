//! Registration of a mesh's vertices and connectivity with the session.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::coupling::participant::{EdgeHandle, MeshHandle, Participant, VertexHandle};
use crate::data::mesh::Mesh;
use crate::error::EmulatorError;
use crate::logging::LogContext;
use crate::topology::edges::{UndirectedEdge, quad_sides, triangle_sides, unique_edges};

/// Session handles produced by [`register_mesh`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegisteredMesh {
    /// `vertices[i]` is the handle of `mesh.positions[i]`.
    pub vertices: Vec<VertexHandle>,
    pub edges: usize,
    pub triangles: usize,
    pub quads: usize,
    pub tetrahedra: usize,
}

/// Edge handles keyed by the canonical `(min, max)` pair of vertex handles.
#[derive(Debug, Default)]
struct EdgeLookup {
    edges: BTreeMap<(VertexHandle, VertexHandle), EdgeHandle>,
}

impl EdgeLookup {
    fn key(a: VertexHandle, b: VertexHandle) -> (VertexHandle, VertexHandle) {
        (a.min(b), a.max(b))
    }

    fn insert(&mut self, a: VertexHandle, b: VertexHandle, edge: EdgeHandle) {
        self.edges.insert(Self::key(a, b), edge);
    }

    fn get(
        &self,
        vertices: &[VertexHandle],
        edge: UndirectedEdge,
    ) -> Result<EdgeHandle, EmulatorError> {
        let a = vertices[edge.first()];
        let b = vertices[edge.second()];
        self.edges.get(&Self::key(a, b)).copied().ok_or_else(|| {
            EmulatorError::MalformedMesh(format!(
                "no registered edge between vertices {} and {}",
                edge.first(),
                edge.second()
            ))
        })
    }
}

/// Register `mesh` under `handle` and return its vertex handles.
///
/// Vertices are always registered. Edges, faces and volumes follow only if
/// the session requires connectivity for this mesh: every unique edge is
/// registered once, then triangles and quads by their side edges, and
/// tetrahedra by their vertices when the session supports volumes.
///
/// Must be called exactly once per mesh; a second call registers the
/// topology again.
pub fn register_mesh<P: Participant + ?Sized>(
    session: &mut P,
    mesh: &Mesh,
    handle: MeshHandle,
    log_ctx: &LogContext,
) -> Result<RegisteredMesh, EmulatorError> {
    mesh.validate()?;
    let t_start = Instant::now();
    log::debug!("{log_ctx} Mesh setup started for mesh {}", mesh.fname.display());

    log::debug!("{log_ctx} Mesh setup: 1) {} vertices", mesh.num_vertices());
    let vertices = mesh
        .positions
        .iter()
        .map(|pos| session.set_mesh_vertex(handle, pos))
        .collect::<Result<Vec<_>, _>>()?;
    let mut registered = RegisteredMesh {
        vertices,
        ..Default::default()
    };
    let t_connectivity = Instant::now();

    if !session.requires_mesh_connectivity_for(handle)? {
        log::debug!(
            "{log_ctx} Mesh setup: 2) skipped connectivity of {} as it is not required",
            mesh.fname.display()
        );
        return Ok(registered);
    }

    let vertices = &registered.vertices;
    let unique = unique_edges(mesh);
    log::debug!("{log_ctx} Mesh setup: 2) {} unique edges", unique.len());
    let mut lookup = EdgeLookup::default();
    for edge in &unique {
        let a = vertices[edge.first()];
        let b = vertices[edge.second()];
        let id = session.set_mesh_edge(handle, a, b)?;
        lookup.insert(a, b, id);
    }

    log::debug!("{log_ctx} Mesh setup: 3) {} triangles", mesh.triangles.len());
    for &triangle in &mesh.triangles {
        let [ab, bc, ca] = triangle_sides(triangle);
        let edges = [
            lookup.get(vertices, ab)?,
            lookup.get(vertices, bc)?,
            lookup.get(vertices, ca)?,
        ];
        session.set_mesh_triangle_with_edges(handle, edges)?;
    }

    log::debug!("{log_ctx} Mesh setup: 4) {} quadrilaterals", mesh.quads.len());
    for &quad in &mesh.quads {
        let [ab, bc, cd, da] = quad_sides(quad);
        let edges = [
            lookup.get(vertices, ab)?,
            lookup.get(vertices, bc)?,
            lookup.get(vertices, cd)?,
            lookup.get(vertices, da)?,
        ];
        session.set_mesh_quad_with_edges(handle, edges)?;
    }

    let mut tetrahedra = 0;
    if session.supports_volume_primitives() {
        log::debug!("{log_ctx} Mesh setup: 5) {} tetrahedra", mesh.tetrahedra.len());
        for tet in &mesh.tetrahedra {
            session.set_mesh_tetrahedron(handle, tet.map(|v| vertices[v]))?;
        }
        tetrahedra = mesh.tetrahedra.len();
    } else if !mesh.tetrahedra.is_empty() {
        log::debug!("{log_ctx} Mesh setup: 5) tetrahedra skipped, no volume support");
    }

    registered.edges = unique.len();
    registered.triangles = mesh.triangles.len();
    registered.quads = mesh.quads.len();
    registered.tetrahedra = tetrahedra;

    let t_end = Instant::now();
    log::debug!(
        "{log_ctx} Mesh setup took {}ms ({}ms for vertices, {}ms for connectivity)",
        (t_end - t_start).as_millis(),
        (t_connectivity - t_start).as_millis(),
        (t_end - t_connectivity).as_millis()
    );
    Ok(registered)
}
