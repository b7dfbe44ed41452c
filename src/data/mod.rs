//! Data module: meshes and the field buffers attached to them.

pub mod mesh;
pub mod mesh_data;

pub use mesh::{Edge, Mesh, Quad, Tetrahedron, Triangle, VertexIndex};
pub use mesh_data::{DataKind, MeshData};
