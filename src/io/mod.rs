//! Mesh I/O seams used by the session driver.
//!
//! The driver only talks to [`MeshLoader`] and [`MeshWriter`]; the legacy VTK
//! implementation in [`vtk`] is the one shipped with the crate. Snapshot
//! discovery and output naming live in [`snapshot`].

pub mod snapshot;
pub mod vtk;

use std::path::Path;

use crate::data::mesh::Mesh;
use crate::error::EmulatorError;

/// Reads mesh topology and per-round field values.
pub trait MeshLoader {
    /// Load vertex positions (truncated to `dim` coordinates) and, if
    /// `require_connectivity` is set, edges/faces/volumes from `path`.
    ///
    /// The returned mesh has no fields and records `path` as its origin.
    fn load_mesh(
        &self,
        path: &Path,
        dim: usize,
        require_connectivity: bool,
    ) -> Result<Mesh, EmulatorError>;

    /// Fill every declared write and gradient field of `mesh` from
    /// `mesh.fname`.
    fn load_data(&self, mesh: &mut Mesh) -> Result<(), EmulatorError>;

    /// Clear every field buffer of `mesh`.
    fn reset_data(&self, mesh: &mut Mesh) {
        mesh.reset_data();
    }
}

/// Persists a mesh together with its current field values.
pub trait MeshWriter {
    /// Write `mesh` and all of its fields to `output`.
    fn save(&self, mesh: &Mesh, output: &Path) -> Result<(), EmulatorError>;
}
