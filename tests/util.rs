#![allow(dead_code)]
use std::path::Path;

use coupling_emulator::context::ExecutionContext;
use coupling_emulator::coupling::SessionCall;
use coupling_emulator::data::{DataKind, Mesh, MeshData};
use coupling_emulator::io::MeshWriter;
use coupling_emulator::io::vtk::VtkWriter;
use coupling_emulator::logging::LogContext;

/// 12-vertex mesh: a 3x3 grid (vertices 0-8) split into 4 triangles on the
/// lower row and 2 quads on the upper row, plus a polyline 9-10-11 of 2
/// explicit edges. 22 edge occurrences, 16 of them unique.
pub fn fixture_mesh() -> Mesh {
    let mut positions = Vec::new();
    for y in 0..3 {
        for x in 0..3 {
            positions.push(vec![x as f64, y as f64, 0.0]);
        }
    }
    for x in 4..7 {
        positions.push(vec![x as f64, 0.0, 0.0]);
    }
    Mesh {
        positions,
        edges: vec![[9, 10], [10, 11]],
        triangles: vec![[0, 1, 3], [1, 4, 3], [1, 2, 4], [2, 4, 5]],
        quads: vec![[3, 4, 7, 6], [4, 5, 8, 7]],
        ..Default::default()
    }
}

/// `fixture_mesh` carrying one scalar write field.
pub fn with_scalar(mut mesh: Mesh, name: &str, values: Vec<f64>) -> Mesh {
    let mut data = MeshData::new(DataKind::Write, 1, name);
    data.values = values;
    mesh.data.push(data);
    mesh
}

/// Values stored for `name` in the snapshot with the given index of a series.
pub fn series_values(index: usize, num_vertices: usize) -> Vec<f64> {
    (0..num_vertices).map(|i| (100 * index + i) as f64).collect()
}

/// Write `{dir}/{stem}{infix}.vtk` for every infix, each carrying the scalar
/// `field` filled by [`series_values`]. Returns the series prefix.
pub fn write_series(dir: &Path, stem: &str, field: &str, infixes: &[&str]) -> String {
    let mesh = fixture_mesh();
    let n = mesh.num_vertices();
    for (index, infix) in infixes.iter().enumerate() {
        let snapshot = with_scalar(mesh.clone(), field, series_values(index, n));
        VtkWriter
            .save(&snapshot, &dir.join(format!("{stem}{infix}.vtk")))
            .expect("write snapshot");
    }
    dir.join(stem).to_str().expect("utf-8 path").to_string()
}

/// Gradient values stored for a 3D gradient of a scalar in a series snapshot.
pub fn gradient_values(index: usize, num_vertices: usize) -> Vec<f64> {
    (0..3 * num_vertices).map(|i| (1000 * index + i) as f64).collect()
}

/// Like [`write_series`], but every snapshot also carries a 3D gradient of
/// `field` filled by [`gradient_values`].
pub fn write_gradient_series(dir: &Path, stem: &str, field: &str, infixes: &[&str]) -> String {
    let mesh = fixture_mesh();
    let n = mesh.num_vertices();
    for (index, infix) in infixes.iter().enumerate() {
        let mut snapshot = with_scalar(mesh.clone(), field, series_values(index, n));
        let mut gradient = MeshData::gradient(1, field, 3);
        gradient.values = gradient_values(index, n);
        snapshot.data.push(gradient);
        VtkWriter
            .save(&snapshot, &dir.join(format!("{stem}{infix}.vtk")))
            .expect("write snapshot");
    }
    dir.join(stem).to_str().expect("utf-8 path").to_string()
}

/// Create empty files for snapshot discovery tests.
pub fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), "").expect("touch");
    }
}

pub fn log_ctx() -> LogContext {
    LogContext::new("Test", &ExecutionContext::default())
}

/// Values of every write call, in call order.
pub fn written_values(calls: &[SessionCall]) -> Vec<Vec<f64>> {
    calls
        .iter()
        .filter_map(|c| match c {
            SessionCall::Write { values, .. } => Some(values.clone()),
            _ => None,
        })
        .collect()
}

/// Index of the first call matching `pred`.
pub fn first_call(calls: &[SessionCall], pred: impl Fn(&SessionCall) -> bool) -> Option<usize> {
    calls.iter().position(pred)
}

/// Values of every gradient write call, in call order.
pub fn gradient_writes(calls: &[SessionCall]) -> Vec<Vec<f64>> {
    calls
        .iter()
        .filter_map(|c| match c {
            SessionCall::WriteGradient { values, .. } => Some(values.clone()),
            _ => None,
        })
        .collect()
}
