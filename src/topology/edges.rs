//! Deduplication of the undirected edges implied by a mesh's topology.
//!
//! Faces are registered with the coupling session through their side edges,
//! so every shared side must be registered exactly once. [`unique_edges`]
//! collects explicit edges and all triangle and quad sides, canonicalizes
//! each one and returns them sorted, independent of the order in which the
//! faces were discovered.

use itertools::Itertools;

use crate::data::mesh::{Mesh, Quad, Triangle, VertexIndex};

/// Undirected edge stored as `(min, max)`.
///
/// Ordering is lexicographic on `(first, second)`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct UndirectedEdge {
    first: VertexIndex,
    second: VertexIndex,
}

impl UndirectedEdge {
    /// Canonicalize the pair `(a, b)`.
    #[inline]
    pub fn new(a: VertexIndex, b: VertexIndex) -> Self {
        Self {
            first: a.min(b),
            second: a.max(b),
        }
    }

    #[inline]
    pub fn first(&self) -> VertexIndex {
        self.first
    }

    #[inline]
    pub fn second(&self) -> VertexIndex {
        self.second
    }

    /// Both endpoints as an array.
    #[inline]
    pub fn vertices(&self) -> [VertexIndex; 2] {
        [self.first, self.second]
    }
}

impl From<[VertexIndex; 2]> for UndirectedEdge {
    fn from([a, b]: [VertexIndex; 2]) -> Self {
        Self::new(a, b)
    }
}

/// Sides of a triangle: `ab, bc, ca`.
#[inline]
pub fn triangle_sides([a, b, c]: Triangle) -> [UndirectedEdge; 3] {
    [
        UndirectedEdge::new(a, b),
        UndirectedEdge::new(b, c),
        UndirectedEdge::new(c, a),
    ]
}

/// Sides of a quad in perimeter order: `ab, bc, cd, da`.
#[inline]
pub fn quad_sides([a, b, c, d]: Quad) -> [UndirectedEdge; 4] {
    [
        UndirectedEdge::new(a, b),
        UndirectedEdge::new(b, c),
        UndirectedEdge::new(c, d),
        UndirectedEdge::new(d, a),
    ]
}

/// Number of edge occurrences before deduplication.
pub fn edge_occurrences(mesh: &Mesh) -> usize {
    mesh.edges.len() + 3 * mesh.triangles.len() + 4 * mesh.quads.len()
}

/// Sorted, duplicate-free edges of `mesh`.
///
/// Collects every explicit edge, every triangle side and every quad side.
/// Runs in `O(E log E)` with `E` = [`edge_occurrences`].
pub fn unique_edges(mesh: &Mesh) -> Vec<UndirectedEdge> {
    let mut all = Vec::with_capacity(edge_occurrences(mesh));
    all.extend(mesh.edges.iter().copied().map(UndirectedEdge::from));
    all.extend(mesh.triangles.iter().copied().flat_map(triangle_sides));
    all.extend(mesh.quads.iter().copied().flat_map(quad_sides));
    all.into_iter().sorted_unstable().dedup().collect()
}
