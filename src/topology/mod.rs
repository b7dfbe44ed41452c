//! Mesh topology helpers.
//!
//! This module provides:
//! - Cell type metadata and legacy VTK codes
//! - Canonical undirected edges and the deduplication used for registration
//! - Index-range validation for mesh topology

pub mod cell_type;
pub mod edges;
pub mod validation;

pub use cell_type::CellType;
pub use edges::{UndirectedEdge, unique_edges};
pub use validation::validate_mesh_topology;
