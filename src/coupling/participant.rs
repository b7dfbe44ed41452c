//! The coupling-session seam.
//!
//! [`Participant`] is the subset of a coupling library's participant API the
//! emulator drives. Handles are opaque integers issued by the session.

use std::fmt;
use thiserror::Error;

/// Session-side identifier of a named mesh.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MeshHandle(pub i32);

/// Session-side identifier of a named field on a mesh.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DataHandle(pub i32);

/// Session-side identifier of a registered vertex.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VertexHandle(pub i32);

/// Session-side identifier of a registered edge.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EdgeHandle(pub i32);

impl fmt::Display for VertexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Error reported by the coupling session.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("coupling session error: {0}")]
pub struct SessionError(pub String);

impl SessionError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Coupling-session operations used by the emulator.
///
/// Blocking calls (`initialize`, `advance`, `finalize` and the data
/// exchange) may wait for peers; the emulator never calls them concurrently.
pub trait Participant {
    // --- capabilities -------------------------------------------------------

    /// Whether gradient data can be exchanged at all.
    ///
    /// Queried once at setup; when `false`, `is_gradient_data_required` is
    /// never asked.
    fn supports_gradients(&self) -> bool;

    /// Whether tetrahedra can be registered.
    fn supports_volume_primitives(&self) -> bool;

    // --- setup --------------------------------------------------------------

    fn mesh_handle(&mut self, mesh_name: &str) -> Result<MeshHandle, SessionError>;

    fn data_handle(
        &mut self,
        data_name: &str,
        mesh: MeshHandle,
    ) -> Result<DataHandle, SessionError>;

    /// Spatial dimension of the named mesh.
    fn mesh_dimensions(&self, mesh: MeshHandle) -> Result<usize, SessionError>;

    fn requires_mesh_connectivity_for(&self, mesh: MeshHandle) -> Result<bool, SessionError>;

    fn is_gradient_data_required(&self, data: DataHandle) -> Result<bool, SessionError>;

    fn set_mesh_vertex(
        &mut self,
        mesh: MeshHandle,
        position: &[f64],
    ) -> Result<VertexHandle, SessionError>;

    fn set_mesh_edge(
        &mut self,
        mesh: MeshHandle,
        a: VertexHandle,
        b: VertexHandle,
    ) -> Result<EdgeHandle, SessionError>;

    fn set_mesh_triangle_with_edges(
        &mut self,
        mesh: MeshHandle,
        edges: [EdgeHandle; 3],
    ) -> Result<(), SessionError>;

    fn set_mesh_quad_with_edges(
        &mut self,
        mesh: MeshHandle,
        edges: [EdgeHandle; 4],
    ) -> Result<(), SessionError>;

    fn set_mesh_tetrahedron(
        &mut self,
        mesh: MeshHandle,
        vertices: [VertexHandle; 4],
    ) -> Result<(), SessionError>;

    // --- lifecycle ----------------------------------------------------------

    fn requires_initial_data(&self) -> Result<bool, SessionError>;

    /// Finish setup; returns the first suggested step size.
    fn initialize(&mut self) -> Result<f64, SessionError>;

    /// Advance by `dt`; returns the next suggested step size.
    fn advance(&mut self, dt: f64) -> Result<f64, SessionError>;

    fn finalize(&mut self) -> Result<(), SessionError>;

    fn is_coupling_ongoing(&self) -> bool;

    fn requires_writing_checkpoint(&self) -> bool;

    fn requires_reading_checkpoint(&self) -> bool;

    // --- data exchange ------------------------------------------------------

    fn write_block_scalar_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &[f64],
    ) -> Result<(), SessionError>;

    fn write_block_vector_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &[f64],
    ) -> Result<(), SessionError>;

    fn write_block_gradient_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        gradients: &[f64],
    ) -> Result<(), SessionError>;

    fn read_block_scalar_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &mut [f64],
    ) -> Result<(), SessionError>;

    fn read_block_vector_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &mut [f64],
    ) -> Result<(), SessionError>;
}
