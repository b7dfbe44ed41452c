//! Cell type metadata for mesh elements.

/// Element kinds a [`Mesh`](crate::data::Mesh) can carry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CellType {
    /// 1D segment/edge.
    Segment,
    /// 2D simplex (triangle).
    Triangle,
    /// 2D tensor-product cell (quad).
    Quadrilateral,
    /// 3D simplex (tet).
    Tetrahedron,
}

impl CellType {
    /// Returns the topological dimension of the cell.
    pub fn dimension(self) -> u8 {
        match self {
            CellType::Segment => 1,
            CellType::Triangle | CellType::Quadrilateral => 2,
            CellType::Tetrahedron => 3,
        }
    }

    /// Number of vertices in the cell.
    pub fn vertex_count(self) -> usize {
        match self {
            CellType::Segment => 2,
            CellType::Triangle => 3,
            CellType::Quadrilateral | CellType::Tetrahedron => 4,
        }
    }

    /// Legacy VTK cell type code.
    pub fn vtk_code(self) -> i32 {
        match self {
            CellType::Segment => 3,
            CellType::Triangle => 5,
            CellType::Quadrilateral => 9,
            CellType::Tetrahedron => 10,
        }
    }

    /// Inverse of [`CellType::vtk_code`]; `None` for unsupported cells.
    pub fn from_vtk_code(code: i32) -> Option<Self> {
        match code {
            3 => Some(CellType::Segment),
            5 => Some(CellType::Triangle),
            9 => Some(CellType::Quadrilateral),
            10 => Some(CellType::Tetrahedron),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vtk_codes_round_trip() {
        for ct in [
            CellType::Segment,
            CellType::Triangle,
            CellType::Quadrilateral,
            CellType::Tetrahedron,
        ] {
            assert_eq!(CellType::from_vtk_code(ct.vtk_code()), Some(ct));
        }
        // hexahedra are not supported
        assert_eq!(CellType::from_vtk_code(12), None);
    }
}
