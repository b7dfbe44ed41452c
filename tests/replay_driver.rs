mod util;

use std::path::{Path, PathBuf};

use coupling_emulator::config::{DataNames, InterfaceConfig, ReplayConfig};
use coupling_emulator::context::ExecutionContext;
use coupling_emulator::coupling::{
    DataHandle, EdgeHandle, LoopbackParticipant, LoopbackSettings, MeshHandle, Participant,
    SessionCall, SessionError, VertexHandle, run_replay,
};
use coupling_emulator::error::EmulatorError;
use coupling_emulator::io::vtk::VtkReader;
use tempfile::tempdir;
use util::{
    first_call, gradient_values, gradient_writes, series_values, write_gradient_series,
    write_series, written_values,
};

const N: usize = 12;

fn interface(mesh: &str, prefix: String, write: &[&str], read: &[&str]) -> InterfaceConfig {
    let names = |list: &[&str]| DataNames {
        scalar: list.iter().map(|s| s.to_string()).collect(),
        vector: Vec::new(),
    };
    InterfaceConfig {
        mesh_name: mesh.to_string(),
        mesh_file_prefix: prefix,
        read_data: names(read),
        write_data: names(write),
    }
}

fn config(start_round: usize, interfaces: Vec<InterfaceConfig>) -> ReplayConfig {
    ReplayConfig {
        session_config: PathBuf::from("loopback.json"),
        participant: "Fluid".to_string(),
        start_round,
        interfaces,
    }
}

fn session(windows: usize) -> LoopbackParticipant {
    LoopbackParticipant::new(LoopbackSettings {
        time_windows: windows,
        ..Default::default()
    })
}

fn fluid_series(dir: &Path) -> String {
    write_series(dir, "Fluid", "Temperature", &[".init", ".dt1", ".dt2", ".dt3"])
}

fn no_exchange(calls: &[SessionCall]) -> bool {
    !calls
        .iter()
        .any(|c| matches!(c, SessionCall::Write { .. } | SessionCall::Advance(_)))
}

#[test]
fn replays_every_round_after_the_start() {
    let dir = tempdir().unwrap();
    let prefix = fluid_series(dir.path());
    let config = config(1, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = session(10);

    let outcome = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap();
    assert_eq!(outcome.start_position, 1);
    assert_eq!(outcome.rounds, 3);
    assert!(!outcome.initial_data);
    assert_eq!(s.advances(), 3);
    assert_eq!(
        written_values(s.calls()),
        vec![series_values(1, N), series_values(2, N), series_values(3, N)]
    );
    assert_eq!(s.calls().last(), Some(&SessionCall::Finalize));
    assert_eq!(s.field_values("Fluid-Mesh", "Temperature"), Some(series_values(3, N)));
}

#[test]
fn later_start_round_skips_earlier_snapshots() {
    let dir = tempdir().unwrap();
    let prefix = fluid_series(dir.path());
    let config = config(3, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = session(10);

    let outcome = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap();
    assert_eq!(outcome.start_position, 3);
    assert_eq!(outcome.rounds, 1);
    assert_eq!(written_values(s.calls()), vec![series_values(3, N)]);
}

#[test]
fn shortest_series_bounds_the_rounds() {
    let dir = tempdir().unwrap();
    let fluid = fluid_series(dir.path());
    let solid = write_series(dir.path(), "Solid", "Heat", &[".init", ".dt1", ".dt2"]);
    let config = config(
        1,
        vec![
            interface("Fluid-Mesh", fluid, &["Temperature"], &[]),
            interface("Solid-Mesh", solid, &[], &["Forces"]),
        ],
    );
    let mut s = session(10);

    let outcome = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap();
    assert_eq!(outcome.rounds, 2);
    assert_eq!(s.advances(), 2);
    let reads = s
        .calls()
        .iter()
        .filter(|c| matches!(c, SessionCall::Read { count: N, .. }))
        .count();
    assert_eq!(reads, 2);
}

#[test]
fn coupling_end_bounds_the_rounds() {
    let dir = tempdir().unwrap();
    let prefix = fluid_series(dir.path());
    let config = config(1, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = session(2);

    let outcome = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap();
    assert_eq!(outcome.rounds, 2);
    assert_eq!(
        written_values(s.calls()),
        vec![series_values(1, N), series_values(2, N)]
    );
}

#[test]
fn initial_data_comes_from_the_snapshot_before_the_start() {
    let dir = tempdir().unwrap();
    let prefix = fluid_series(dir.path());
    let config = config(2, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = LoopbackParticipant::new(LoopbackSettings {
        initial_data: true,
        time_windows: 10,
        ..Default::default()
    });

    let outcome = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap();
    assert!(outcome.initial_data);
    assert_eq!(outcome.rounds, 2);
    assert_eq!(
        written_values(s.calls()),
        vec![series_values(1, N), series_values(2, N), series_values(3, N)]
    );
    let first_write = first_call(s.calls(), |c| matches!(c, SessionCall::Write { .. })).unwrap();
    let init = first_call(s.calls(), |c| *c == SessionCall::Initialize).unwrap();
    assert!(first_write < init);
}

#[test]
fn initial_data_without_a_previous_snapshot_fails() {
    let dir = tempdir().unwrap();
    let prefix = write_series(dir.path(), "Fluid", "Temperature", &[".dt1", ".dt2"]);
    let config = config(1, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = LoopbackParticipant::new(LoopbackSettings {
        initial_data: true,
        time_windows: 10,
        ..Default::default()
    });

    let err = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap_err();
    assert!(matches!(err, EmulatorError::NoInitialDataSource { start: 1 }));
    assert!(no_exchange(s.calls()));
}

#[test]
fn missing_start_round_fails() {
    let dir = tempdir().unwrap();
    let prefix = fluid_series(dir.path());
    let config = config(5, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = session(10);

    let err = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap_err();
    assert!(matches!(err, EmulatorError::StartRoundMissing { start: 5, .. }));
    assert!(no_exchange(s.calls()));
}

#[test]
fn implicit_coupling_is_rejected_before_writing() {
    let dir = tempdir().unwrap();
    let prefix = fluid_series(dir.path());
    let config = config(1, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = LoopbackParticipant::new(LoopbackSettings {
        implicit: true,
        time_windows: 10,
        ..Default::default()
    });

    let err = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap_err();
    assert!(matches!(err, EmulatorError::UnsupportedCouplingScheme(_)));
    assert!(no_exchange(s.calls()));
}

#[test]
fn empty_interface_list_is_a_config_error() {
    let mut s = session(10);
    let err = run_replay(&config(1, Vec::new()), &mut s, &VtkReader, ExecutionContext::default())
        .unwrap_err();
    assert!(matches!(err, EmulatorError::Config(_)));
    assert!(s.calls().is_empty());
}

#[test]
fn missing_series_is_reported() {
    let dir = tempdir().unwrap();
    let prefix = dir.path().join("Nowhere").to_str().unwrap().to_string();
    let config = config(1, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = session(10);

    let err = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap_err();
    assert!(matches!(err, EmulatorError::NoSnapshots { .. }));
}

#[test]
fn start_round_zero_is_rejected_before_the_session_opens() {
    let dir = tempdir().unwrap();
    let prefix = fluid_series(dir.path());
    let config = config(0, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = session(10);

    let err = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap_err();
    assert!(matches!(err, EmulatorError::Config(_)));
    assert!(s.calls().is_empty());
}

fn fluid_gradient_series(dir: &Path) -> String {
    write_gradient_series(dir, "Fluid", "Temperature", &[".init", ".dt1", ".dt2"])
}

fn gradient_session(gradient_data: &[&str], initial_data: bool) -> LoopbackParticipant {
    LoopbackParticipant::new(LoopbackSettings {
        initial_data,
        time_windows: 10,
        gradients: true,
        gradient_data: gradient_data.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    })
}

#[test]
fn required_gradients_are_sent_every_round() {
    let dir = tempdir().unwrap();
    let prefix = fluid_gradient_series(dir.path());
    let config = config(1, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = gradient_session(&["Temperature"], false);

    let outcome = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap();
    assert_eq!(outcome.rounds, 2);
    assert_eq!(
        written_values(s.calls()),
        vec![series_values(1, N), series_values(2, N)]
    );
    assert_eq!(
        gradient_writes(s.calls()),
        vec![gradient_values(1, N), gradient_values(2, N)]
    );
}

#[test]
fn gradients_are_not_sent_unless_required() {
    let dir = tempdir().unwrap();
    let prefix = fluid_gradient_series(dir.path());
    let config = config(1, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = gradient_session(&[], false);

    let outcome = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap();
    assert_eq!(outcome.rounds, 2);
    assert!(gradient_writes(s.calls()).is_empty());
}

#[test]
fn initial_data_carries_no_gradients() {
    let dir = tempdir().unwrap();
    let prefix = fluid_gradient_series(dir.path());
    let config = config(2, vec![interface("Fluid-Mesh", prefix, &["Temperature"], &[])]);
    let mut s = gradient_session(&["Temperature"], true);

    let outcome = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap();
    assert!(outcome.initial_data);
    assert_eq!(outcome.rounds, 1);
    assert_eq!(
        written_values(s.calls()),
        vec![series_values(1, N), series_values(2, N)]
    );
    assert_eq!(gradient_writes(s.calls()), vec![gradient_values(2, N)]);
}

/// Session that asks for a checkpoint to be read once it has advanced,
/// without ever asking for one to be written.
struct ReadCheckpointOnly(LoopbackParticipant);

impl Participant for ReadCheckpointOnly {
    fn supports_gradients(&self) -> bool {
        self.0.supports_gradients()
    }

    fn supports_volume_primitives(&self) -> bool {
        self.0.supports_volume_primitives()
    }

    fn mesh_handle(&mut self, mesh_name: &str) -> Result<MeshHandle, SessionError> {
        self.0.mesh_handle(mesh_name)
    }

    fn data_handle(
        &mut self,
        data_name: &str,
        mesh: MeshHandle,
    ) -> Result<DataHandle, SessionError> {
        self.0.data_handle(data_name, mesh)
    }

    fn mesh_dimensions(&self, mesh: MeshHandle) -> Result<usize, SessionError> {
        self.0.mesh_dimensions(mesh)
    }

    fn requires_mesh_connectivity_for(&self, mesh: MeshHandle) -> Result<bool, SessionError> {
        self.0.requires_mesh_connectivity_for(mesh)
    }

    fn is_gradient_data_required(&self, data: DataHandle) -> Result<bool, SessionError> {
        self.0.is_gradient_data_required(data)
    }

    fn set_mesh_vertex(
        &mut self,
        mesh: MeshHandle,
        position: &[f64],
    ) -> Result<VertexHandle, SessionError> {
        self.0.set_mesh_vertex(mesh, position)
    }

    fn set_mesh_edge(
        &mut self,
        mesh: MeshHandle,
        a: VertexHandle,
        b: VertexHandle,
    ) -> Result<EdgeHandle, SessionError> {
        self.0.set_mesh_edge(mesh, a, b)
    }

    fn set_mesh_triangle_with_edges(
        &mut self,
        mesh: MeshHandle,
        edges: [EdgeHandle; 3],
    ) -> Result<(), SessionError> {
        self.0.set_mesh_triangle_with_edges(mesh, edges)
    }

    fn set_mesh_quad_with_edges(
        &mut self,
        mesh: MeshHandle,
        edges: [EdgeHandle; 4],
    ) -> Result<(), SessionError> {
        self.0.set_mesh_quad_with_edges(mesh, edges)
    }

    fn set_mesh_tetrahedron(
        &mut self,
        mesh: MeshHandle,
        vertices: [VertexHandle; 4],
    ) -> Result<(), SessionError> {
        self.0.set_mesh_tetrahedron(mesh, vertices)
    }

    fn requires_initial_data(&self) -> Result<bool, SessionError> {
        self.0.requires_initial_data()
    }

    fn initialize(&mut self) -> Result<f64, SessionError> {
        self.0.initialize()
    }

    fn advance(&mut self, dt: f64) -> Result<f64, SessionError> {
        self.0.advance(dt)
    }

    fn finalize(&mut self) -> Result<(), SessionError> {
        self.0.finalize()
    }

    fn is_coupling_ongoing(&self) -> bool {
        self.0.is_coupling_ongoing()
    }

    fn requires_writing_checkpoint(&self) -> bool {
        false
    }

    fn requires_reading_checkpoint(&self) -> bool {
        self.0.advances() > 0
    }

    fn write_block_scalar_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &[f64],
    ) -> Result<(), SessionError> {
        self.0.write_block_scalar_data(data, vertices, values)
    }

    fn write_block_vector_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &[f64],
    ) -> Result<(), SessionError> {
        self.0.write_block_vector_data(data, vertices, values)
    }

    fn write_block_gradient_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        gradients: &[f64],
    ) -> Result<(), SessionError> {
        self.0.write_block_gradient_data(data, vertices, gradients)
    }

    fn read_block_scalar_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &mut [f64],
    ) -> Result<(), SessionError> {
        self.0.read_block_scalar_data(data, vertices, values)
    }

    fn read_block_vector_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &mut [f64],
    ) -> Result<(), SessionError> {
        self.0.read_block_vector_data(data, vertices, values)
    }
}

#[test]
fn reading_a_checkpoint_stops_after_the_first_advance() {
    let dir = tempdir().unwrap();
    let prefix = fluid_series(dir.path());
    let config = config(
        1,
        vec![interface("Fluid-Mesh", prefix, &["Temperature"], &["Forces"])],
    );
    let mut s = ReadCheckpointOnly(session(10));

    let err = run_replay(&config, &mut s, &VtkReader, ExecutionContext::default()).unwrap_err();
    assert!(
        matches!(err, EmulatorError::UnsupportedCouplingScheme(what) if what.contains("reading"))
    );
    let calls = s.0.calls();
    assert_eq!(written_values(calls), vec![series_values(1, N)]);
    assert_eq!(s.0.advances(), 1);
    assert!(!calls.iter().any(|c| matches!(c, SessionCall::Read { .. })));
    assert!(!calls.contains(&SessionCall::Finalize));
}
