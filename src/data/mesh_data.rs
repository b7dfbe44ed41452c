//! Named per-vertex field buffers attached to a [`Mesh`](crate::data::mesh::Mesh).

use std::fmt;

/// Role a field plays in the exchange with the coupling session.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DataKind {
    /// Loaded from snapshots and pushed to the session.
    Write,
    /// Pulled from the session after each advance.
    Read,
    /// Spatial derivatives of a write field, pushed through the gradient call.
    Gradient,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataKind::Write => "write",
            DataKind::Read => "read",
            DataKind::Gradient => "gradient",
        };
        f.write_str(s)
    }
}

/// A named field over all vertices of a mesh.
///
/// Values are stored vertex-major: `values[v * width() + k]`. For gradient
/// fields each vertex holds `spatial_dimension` blocks of `components`
/// values, one block per derivative direction.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub kind: DataKind,
    /// 1 for scalars, the mesh dimension for vectors.
    pub components: usize,
    /// Number of derivative directions; only set for [`DataKind::Gradient`].
    pub gradient_dimension: Option<usize>,
    pub values: Vec<f64>,
}

impl MeshData {
    /// Empty scalar/vector field of the given kind.
    pub fn new(kind: DataKind, components: usize, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            components,
            gradient_dimension: None,
            values: Vec::new(),
        }
    }

    /// Empty gradient field for `name` with `spatial_dimension` directions.
    pub fn gradient(components: usize, name: impl Into<String>, spatial_dimension: usize) -> Self {
        Self {
            name: name.into(),
            kind: DataKind::Gradient,
            components,
            gradient_dimension: Some(spatial_dimension),
            values: Vec::new(),
        }
    }

    /// Number of values stored per vertex.
    #[inline]
    pub fn width(&self) -> usize {
        self.components * self.gradient_dimension.unwrap_or(1)
    }

    /// Expected buffer length for a mesh with `num_vertices` vertices.
    #[inline]
    pub fn expected_len(&self, num_vertices: usize) -> usize {
        num_vertices * self.width()
    }

    /// Drop all values, keeping the allocation.
    pub fn reset(&mut self) {
        self.values.clear();
    }

    /// Resize to exactly `num_vertices` entries, zero-filling new slots.
    pub fn resize_for(&mut self, num_vertices: usize) {
        let len = self.expected_len(num_vertices);
        self.values.resize(len, 0.0);
    }

    /// Render up to `max` values for debug output.
    pub fn preview(&self, max: usize) -> String {
        if self.values.is_empty() || max == 0 {
            return "<nothing>".to_string();
        }
        let shown: Vec<String> = self.values.iter().take(max).map(|v| v.to_string()).collect();
        format!("{}  {} ...", self.name, shown.join(", "))
    }
}
