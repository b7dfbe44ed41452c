//! Legacy VTK (`.vtk`) reader/writer for unstructured grids.
//!
//! This implementation targets ASCII legacy VTK files with an
//! `UNSTRUCTURED_GRID` dataset. Both the classic `CELLS` layout and the
//! `OFFSETS`/`CONNECTIVITY` layout of format 5.1 are accepted. Point data may
//! be given as `SCALARS`, `VECTORS`/`NORMALS` or `FIELD` arrays; cell data is
//! parsed and discarded.
//!
//! Supported cells: line (3), triangle (5), quad (9), tetrahedron (10). Vertex
//! cells (1) carry no connectivity and are skipped.
//!
//! Gradient fields for `name` are read from the arrays `name_gradientx`,
//! `name_gradienty` and `name_gradientz`, falling back to the unprefixed
//! `gradientx`/`gradienty`/`gradientz` arrays, and written back under the
//! prefixed names.
//!
//! Only the legacy format is handled; XML files (`.vtu`, `.pvtu`) are
//! rejected.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::iter::Peekable;
use std::path::Path;
use std::str::SplitWhitespace;

use crate::data::mesh::Mesh;
use crate::data::mesh_data::{DataKind, MeshData};
use crate::error::EmulatorError;
use crate::io::{MeshLoader, MeshWriter};
use crate::topology::cell_type::CellType;

const GRADIENT_AXES: [&str; 3] = ["gradientx", "gradienty", "gradientz"];
const VTK_VERTEX: i32 = 1;

#[derive(Debug, Default, Clone)]
pub struct VtkReader;

#[derive(Debug, Default, Clone)]
pub struct VtkWriter;

#[derive(Debug, Clone, PartialEq)]
struct PointArray {
    components: usize,
    values: Vec<f64>,
}

#[derive(Debug, Default)]
struct VtkGrid {
    points: Vec<[f64; 3]>,
    cells: Vec<Vec<usize>>,
    cell_types: Vec<i32>,
    point_data: BTreeMap<String, PointArray>,
}

struct Tokens<'a> {
    inner: Peekable<SplitWhitespace<'a>>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_whitespace().peekable(),
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        self.inner.next()
    }

    fn peek(&mut self) -> Option<&'a str> {
        self.inner.peek().copied()
    }

    fn next_str(&mut self, what: &str) -> Result<&'a str, EmulatorError> {
        self.inner
            .next()
            .ok_or_else(|| EmulatorError::MeshIoParse(format!("missing {what}")))
    }

    fn next_usize(&mut self, what: &str) -> Result<usize, EmulatorError> {
        let raw = self.next_str(what)?;
        raw.parse()
            .map_err(|_| EmulatorError::MeshIoParse(format!("invalid {what} `{raw}`")))
    }

    fn next_f64(&mut self, what: &str) -> Result<f64, EmulatorError> {
        let raw = self.next_str(what)?;
        raw.parse()
            .map_err(|_| EmulatorError::MeshIoParse(format!("invalid {what} `{raw}`")))
    }

    fn take_f64(&mut self, count: usize, what: &str) -> Result<Vec<f64>, EmulatorError> {
        (0..count).map(|_| self.next_f64(what)).collect()
    }

    fn expect(&mut self, keyword: &str) -> Result<(), EmulatorError> {
        let token = self.next_str(keyword)?;
        if token != keyword {
            return Err(EmulatorError::MeshIoParse(format!(
                "expected {keyword}, found `{token}`"
            )));
        }
        Ok(())
    }
}

/// Which attribute section (`POINT_DATA`/`CELL_DATA`) arrays belong to.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Attributes {
    None,
    Point(usize),
    Cell(usize),
}

impl VtkReader {
    fn read_file(path: &Path) -> Result<String, EmulatorError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("vtk") => {}
            _ => {
                return Err(EmulatorError::MeshIoParse(format!(
                    "unknown file extension for {}, expected a legacy .vtk file",
                    path.display()
                )));
            }
        }
        fs::read_to_string(path).map_err(|e| {
            EmulatorError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {e}", path.display()),
            ))
        })
    }

    fn parse_grid(input: &str) -> Result<VtkGrid, EmulatorError> {
        let mut lines = input.lines();
        let version = lines
            .next()
            .ok_or_else(|| EmulatorError::MeshIoParse("empty VTK file".into()))?;
        if !version.trim_start().starts_with("# vtk DataFile") {
            return Err(EmulatorError::MeshIoParse("missing VTK header".into()));
        }
        let _title = lines.next();
        let format = lines
            .next()
            .ok_or_else(|| EmulatorError::MeshIoParse("missing ASCII line".into()))?;
        if format.trim() != "ASCII" {
            return Err(EmulatorError::MeshIoParse(
                "VTK ASCII format required".into(),
            ));
        }

        let remaining: String = lines.collect::<Vec<_>>().join("\n");
        let mut tokens = Tokens::new(&remaining);
        let mut grid = VtkGrid::default();
        let mut attributes = Attributes::None;

        while let Some(token) = tokens.next() {
            match token {
                "DATASET" => {
                    let kind = tokens.next_str("dataset type")?;
                    if kind != "UNSTRUCTURED_GRID" {
                        return Err(EmulatorError::MeshIoParse(format!(
                            "VTK UNSTRUCTURED_GRID required, found {kind}"
                        )));
                    }
                }
                "POINTS" => {
                    let n = tokens.next_usize("point count")?;
                    let _ty = tokens.next_str("point type")?;
                    let coords = tokens.take_f64(n * 3, "point value")?;
                    grid.points = coords.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
                }
                "CELLS" => grid.cells = Self::parse_cells(&mut tokens)?,
                "CELL_TYPES" => {
                    let n = tokens.next_usize("cell types count")?;
                    grid.cell_types = (0..n)
                        .map(|_| {
                            let raw = tokens.next_str("cell type")?;
                            raw.parse::<i32>().map_err(|_| {
                                EmulatorError::MeshIoParse(format!("invalid cell type `{raw}`"))
                            })
                        })
                        .collect::<Result<_, _>>()?;
                }
                "POINT_DATA" => {
                    let n = tokens.next_usize("point data count")?;
                    if n != grid.points.len() {
                        return Err(EmulatorError::MeshIoParse(format!(
                            "POINT_DATA declares {n} tuples for {} points",
                            grid.points.len()
                        )));
                    }
                    attributes = Attributes::Point(n);
                }
                "CELL_DATA" => {
                    attributes = Attributes::Cell(tokens.next_usize("cell data count")?);
                }
                "SCALARS" => {
                    let tuples = Self::attribute_tuples(attributes, token)?;
                    let name = tokens.next_str("scalars name")?;
                    let _ty = tokens.next_str("scalars type")?;
                    let components = match tokens.peek() {
                        Some(raw) if raw.parse::<usize>().is_ok() => {
                            tokens.next_usize("scalars components")?
                        }
                        _ => 1,
                    };
                    tokens.expect("LOOKUP_TABLE")?;
                    let _table = tokens.next_str("lookup table name")?;
                    let values = tokens.take_f64(tuples * components, "scalar value")?;
                    grid.store(attributes, name, components, values);
                }
                "VECTORS" | "NORMALS" => {
                    let tuples = Self::attribute_tuples(attributes, token)?;
                    let name = tokens.next_str("vectors name")?;
                    let _ty = tokens.next_str("vectors type")?;
                    let values = tokens.take_f64(tuples * 3, "vector value")?;
                    grid.store(attributes, name, 3, values);
                }
                "FIELD" => {
                    let _field_name = tokens.next_str("field name")?;
                    let num_arrays = tokens.next_usize("field count")?;
                    for _ in 0..num_arrays {
                        let name = tokens.next_str("field array name")?;
                        let components = tokens.next_usize("field components")?;
                        let tuples = tokens.next_usize("field tuples")?;
                        let _ty = tokens.next_str("field type")?;
                        let values = tokens.take_f64(components * tuples, "field value")?;
                        if attributes == Attributes::Point(tuples) {
                            grid.store(attributes, name, components, values);
                        }
                    }
                }
                _ => {
                    return Err(EmulatorError::MeshIoParse(format!(
                        "unexpected token {token}"
                    )));
                }
            }
        }

        if grid.cells.len() != grid.cell_types.len() {
            return Err(EmulatorError::MeshIoParse(format!(
                "{} cells but {} cell types",
                grid.cells.len(),
                grid.cell_types.len()
            )));
        }
        Ok(grid)
    }

    fn parse_cells(tokens: &mut Tokens<'_>) -> Result<Vec<Vec<usize>>, EmulatorError> {
        let first = tokens.next_usize("cell count")?;
        let second = tokens.next_usize("cell size")?;
        if tokens.peek() == Some("OFFSETS") {
            // format 5.1: `CELLS <offsets> <connectivity>`
            tokens.expect("OFFSETS")?;
            let _ty = tokens.next_str("offsets type")?;
            let offsets = (0..first)
                .map(|_| tokens.next_usize("cell offset"))
                .collect::<Result<Vec<_>, _>>()?;
            tokens.expect("CONNECTIVITY")?;
            let _ty = tokens.next_str("connectivity type")?;
            let connectivity = (0..second)
                .map(|_| tokens.next_usize("cell index"))
                .collect::<Result<Vec<_>, _>>()?;
            offsets
                .windows(2)
                .map(|w| {
                    connectivity.get(w[0]..w[1]).map(<[usize]>::to_vec).ok_or_else(|| {
                        EmulatorError::MeshIoParse("cell offsets out of range".into())
                    })
                })
                .collect()
        } else {
            let mut cells = Vec::with_capacity(first);
            for _ in 0..first {
                let count = tokens.next_usize("cell size")?;
                let cell = (0..count)
                    .map(|_| tokens.next_usize("cell index"))
                    .collect::<Result<Vec<_>, _>>()?;
                cells.push(cell);
            }
            Ok(cells)
        }
    }

    fn attribute_tuples(attributes: Attributes, keyword: &str) -> Result<usize, EmulatorError> {
        match attributes {
            Attributes::Point(n) | Attributes::Cell(n) => Ok(n),
            Attributes::None => Err(EmulatorError::MeshIoParse(format!(
                "{keyword} outside POINT_DATA/CELL_DATA"
            ))),
        }
    }

    fn build_mesh(
        grid: &VtkGrid,
        dim: usize,
        require_connectivity: bool,
    ) -> Result<Mesh, EmulatorError> {
        if !(1..=3).contains(&dim) {
            return Err(EmulatorError::MeshIoParse(format!(
                "unsupported mesh dimension {dim}"
            )));
        }
        let mut mesh = Mesh {
            positions: grid.points.iter().map(|p| p[..dim].to_vec()).collect(),
            ..Default::default()
        };
        if !require_connectivity {
            return Ok(mesh);
        }
        for (cell, &code) in grid.cells.iter().zip(&grid.cell_types) {
            if code == VTK_VERTEX {
                continue;
            }
            let cell_type = CellType::from_vtk_code(code).ok_or_else(|| {
                EmulatorError::MeshIoParse(format!(
                    "invalid cell type {code}; valid cell types are line, triangle, quad \
                     and tetrahedron"
                ))
            })?;
            if cell.len() != cell_type.vertex_count() {
                return Err(EmulatorError::MeshIoParse(format!(
                    "{cell_type:?} cell with {} vertices",
                    cell.len()
                )));
            }
            match cell_type {
                CellType::Segment => mesh.edges.push([cell[0], cell[1]]),
                CellType::Triangle => mesh.triangles.push([cell[0], cell[1], cell[2]]),
                CellType::Quadrilateral => mesh.quads.push([cell[0], cell[1], cell[2], cell[3]]),
                CellType::Tetrahedron => {
                    mesh.tetrahedra.push([cell[0], cell[1], cell[2], cell[3]])
                }
            }
        }
        Ok(mesh)
    }

    fn write_values(
        grid: &VtkGrid,
        data: &mut MeshData,
        mesh_dimension: usize,
        path: &Path,
    ) -> Result<(), EmulatorError> {
        let n = grid.points.len();
        let missing = |name: String| EmulatorError::MissingField {
            name,
            path: path.to_path_buf(),
        };
        let values = match data.kind {
            DataKind::Read => return Ok(()),
            DataKind::Write => {
                let array = grid
                    .point_data
                    .get(&data.name)
                    .ok_or_else(|| missing(data.name.clone()))?;
                check_components(array, data)?;
                (0..n)
                    .flat_map(|v| leading(array, v, data.components))
                    .copied()
                    .collect()
            }
            DataKind::Gradient => {
                let directions = data.gradient_dimension.unwrap_or(mesh_dimension);
                let arrays = GRADIENT_AXES
                    .iter()
                    .take(directions)
                    .map(|axis| {
                        grid.point_data
                            .get(&format!("{}_{axis}", data.name))
                            .or_else(|| grid.point_data.get(*axis))
                            .ok_or_else(|| missing(format!("{}_{axis}", data.name)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                for array in &arrays {
                    check_components(array, data)?;
                }
                let mut values = Vec::with_capacity(data.expected_len(n));
                for v in 0..n {
                    for array in &arrays {
                        values.extend_from_slice(leading(array, v, data.components));
                    }
                }
                values
            }
        };
        data.values = values;
        Ok(())
    }
}

fn check_components(array: &PointArray, data: &MeshData) -> Result<(), EmulatorError> {
    if array.components < data.components {
        return Err(EmulatorError::DimensionMismatch {
            name: data.name.clone(),
            expected: data.components,
            found: array.components,
        });
    }
    Ok(())
}

/// First `count` components of tuple `v`.
fn leading(array: &PointArray, v: usize, count: usize) -> &[f64] {
    let start = v * array.components;
    &array.values[start..start + count]
}

impl VtkGrid {
    fn store(&mut self, attributes: Attributes, name: &str, components: usize, values: Vec<f64>) {
        if let Attributes::Point(_) = attributes {
            self.point_data
                .insert(name.to_string(), PointArray { components, values });
        }
    }
}

impl MeshLoader for VtkReader {
    fn load_mesh(
        &self,
        path: &Path,
        dim: usize,
        require_connectivity: bool,
    ) -> Result<Mesh, EmulatorError> {
        let grid = Self::parse_grid(&Self::read_file(path)?)?;
        let mut mesh = Self::build_mesh(&grid, dim, require_connectivity)?;
        mesh.fname = path.to_path_buf();
        Ok(mesh)
    }

    fn load_data(&self, mesh: &mut Mesh) -> Result<(), EmulatorError> {
        let path = mesh.fname.clone();
        let grid = Self::parse_grid(&Self::read_file(&path)?)?;
        if grid.points.len() != mesh.num_vertices() {
            return Err(EmulatorError::MeshIoParse(format!(
                "{} has {} points, but the registered mesh has {} vertices",
                path.display(),
                grid.points.len(),
                mesh.num_vertices()
            )));
        }
        let dim = mesh.dimension();
        for data in &mut mesh.data {
            Self::write_values(&grid, data, dim, &path)?;
        }
        Ok(())
    }
}

impl VtkGrid {
    /// Grid holding the geometry of `mesh`, coordinates padded to 3D.
    fn from_mesh(mesh: &Mesh) -> Self {
        let points = mesh
            .positions
            .iter()
            .map(|position| {
                let mut xyz = [0.0f64; 3];
                for (slot, value) in xyz.iter_mut().zip(position) {
                    *slot = *value;
                }
                xyz
            })
            .collect();
        let cells: Vec<(CellType, &[usize])> = mesh
            .edges
            .iter()
            .map(|c| (CellType::Segment, c.as_slice()))
            .chain(mesh.triangles.iter().map(|c| (CellType::Triangle, c.as_slice())))
            .chain(mesh.quads.iter().map(|c| (CellType::Quadrilateral, c.as_slice())))
            .chain(mesh.tetrahedra.iter().map(|c| (CellType::Tetrahedron, c.as_slice())))
            .collect();
        Self {
            points,
            cell_types: cells.iter().map(|(ty, _)| ty.vtk_code()).collect(),
            cells: cells.into_iter().map(|(_, c)| c.to_vec()).collect(),
            point_data: BTreeMap::new(),
        }
    }

    /// Store every field of `mesh` as point data, replacing arrays of the
    /// same name. Gradient fields are split into one array per direction.
    fn set_fields(&mut self, mesh: &Mesh) -> Result<(), EmulatorError> {
        let n = self.points.len();
        for data in &mesh.data {
            if data.values.len() != data.expected_len(n) {
                return Err(EmulatorError::MeshIoParse(format!(
                    "field `{}` holds {} values, expected {}",
                    data.name,
                    data.values.len(),
                    data.expected_len(n)
                )));
            }
        }
        for data in &mesh.data {
            let Some(directions) = data.gradient_dimension else {
                let array = PointArray {
                    components: data.components,
                    values: data.values.clone(),
                };
                self.point_data.insert(data.name.clone(), array);
                continue;
            };
            let c = data.components;
            let width = data.width();
            for (k, axis) in GRADIENT_AXES.iter().enumerate().take(directions) {
                let values = (0..n)
                    .flat_map(|v| &data.values[v * width + k * c..v * width + (k + 1) * c])
                    .copied()
                    .collect();
                let array = PointArray { components: c, values };
                self.point_data.insert(format!("{}_{axis}", data.name), array);
            }
        }
        Ok(())
    }
}

impl VtkWriter {
    fn write_field_array<W: Write>(
        writer: &mut W,
        name: &str,
        num_components: usize,
        num_tuples: usize,
        values: &[f64],
    ) -> Result<(), EmulatorError> {
        writeln!(writer, "{name} {num_components} {num_tuples} double")?;
        let mut line_len = 0usize;
        for value in values {
            let value = value.to_string();
            if line_len + value.len() + 1 > 70 {
                writeln!(writer)?;
                line_len = 0;
            }
            if line_len > 0 {
                write!(writer, " ")?;
                line_len += 1;
            }
            write!(writer, "{value}")?;
            line_len += value.len();
        }
        writeln!(writer)?;
        Ok(())
    }

    fn write_grid<W: Write>(mut writer: W, grid: &VtkGrid) -> Result<(), EmulatorError> {
        let n = grid.points.len();
        writeln!(writer, "# vtk DataFile Version 3.0")?;
        writeln!(writer, "coupling-emulator")?;
        writeln!(writer, "ASCII")?;
        writeln!(writer, "DATASET UNSTRUCTURED_GRID")?;
        writeln!(writer, "POINTS {n} double")?;
        for [x, y, z] in &grid.points {
            writeln!(writer, "{x} {y} {z}")?;
        }

        let total_size: usize = grid.cells.iter().map(|c| c.len() + 1).sum();
        writeln!(writer, "CELLS {} {total_size}", grid.cells.len())?;
        for cell in &grid.cells {
            write!(writer, "{}", cell.len())?;
            for idx in cell {
                write!(writer, " {idx}")?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "CELL_TYPES {}", grid.cell_types.len())?;
        for code in &grid.cell_types {
            writeln!(writer, "{code}")?;
        }

        if !grid.point_data.is_empty() {
            writeln!(writer, "POINT_DATA {n}")?;
            writeln!(writer, "FIELD FieldData {}", grid.point_data.len())?;
            for (name, array) in &grid.point_data {
                Self::write_field_array(&mut writer, name, array.components, n, &array.values)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Serialize `mesh` as an ASCII legacy VTK unstructured grid.
    pub fn write<W: Write>(&self, writer: W, mesh: &Mesh) -> Result<(), EmulatorError> {
        let mut grid = VtkGrid::from_mesh(mesh);
        grid.set_fields(mesh)?;
        Self::write_grid(writer, &grid)
    }
}

impl MeshWriter for VtkWriter {
    /// Meshes loaded from a file keep that file's points, cells and point
    /// arrays; the fields of `mesh` are added on top. Other meshes are
    /// written from memory.
    fn save(&self, mesh: &Mesh, output: &Path) -> Result<(), EmulatorError> {
        let mut grid = if mesh.fname.as_os_str().is_empty() {
            VtkGrid::from_mesh(mesh)
        } else {
            let origin = VtkReader::parse_grid(&VtkReader::read_file(&mesh.fname)?)?;
            if origin.points.len() != mesh.num_vertices() {
                return Err(EmulatorError::MeshIoParse(format!(
                    "{} has {} points, but the mesh has {} vertices",
                    mesh.fname.display(),
                    origin.points.len(),
                    mesh.num_vertices()
                )));
            }
            origin
        };
        grid.set_fields(mesh)?;

        if let Some(dir) = output.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let file = File::create(output)?;
        Self::write_grid(BufWriter::new(file), &grid)
    }
}
