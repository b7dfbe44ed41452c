//! In-process coupling session.
//!
//! [`LoopbackParticipant`] implements [`Participant`] without any peer: data
//! written to a field is returned by later reads of the same field, and reads
//! of a field nobody wrote yield staged values or zeros. Every call is
//! recorded so tests can assert on call order.
//!
//! The behaviour of the session (mesh dimensions, connectivity requirements,
//! number of time windows, implicit coupling, ...) is described by a
//! [`LoopbackSettings`] JSON document.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coupling::participant::{
    DataHandle, EdgeHandle, MeshHandle, Participant, SessionError, VertexHandle,
};
use crate::error::EmulatorError;

/// Session behaviour of a [`LoopbackParticipant`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoopbackSettings {
    /// Spatial dimension of every mesh without an override.
    pub dimensions: usize,
    /// Per-mesh dimension overrides.
    pub mesh_dimensions: BTreeMap<String, usize>,
    /// Meshes whose connectivity must be registered.
    pub connectivity_meshes: Vec<String>,
    pub initial_data: bool,
    /// Number of advances before coupling ends.
    pub time_windows: usize,
    pub time_window_size: f64,
    /// Pretend an implicit scheme was negotiated, which requires checkpoints.
    pub implicit: bool,
    pub volume_primitives: bool,
    pub gradients: bool,
    /// Fields for which gradient data is required, if `gradients` is set.
    pub gradient_data: Vec<String>,
}

impl Default for LoopbackSettings {
    fn default() -> Self {
        Self {
            dimensions: 3,
            mesh_dimensions: BTreeMap::new(),
            connectivity_meshes: Vec::new(),
            initial_data: false,
            time_windows: 1,
            time_window_size: 1.0,
            implicit: false,
            volume_primitives: false,
            gradients: false,
            gradient_data: Vec::new(),
        }
    }
}

impl LoopbackSettings {
    /// Read settings from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, EmulatorError> {
        let text = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), EmulatorError> {
        let dims = std::iter::once(self.dimensions).chain(self.mesh_dimensions.values().copied());
        for dim in dims {
            if !(2..=3).contains(&dim) {
                return Err(EmulatorError::Config(format!(
                    "loopback mesh dimension must be 2 or 3, got {dim}"
                )));
            }
        }
        if !(self.time_window_size > 0.0) {
            return Err(EmulatorError::Config(format!(
                "loopback time-window-size must be positive, got {}",
                self.time_window_size
            )));
        }
        Ok(())
    }
}

/// One recorded call into the loopback session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionCall {
    SetVertex {
        mesh: MeshHandle,
        position: Vec<f64>,
    },
    SetEdge {
        mesh: MeshHandle,
        vertices: [VertexHandle; 2],
    },
    SetTriangle {
        mesh: MeshHandle,
        edges: [EdgeHandle; 3],
    },
    SetQuad {
        mesh: MeshHandle,
        edges: [EdgeHandle; 4],
    },
    SetTetrahedron {
        mesh: MeshHandle,
        vertices: [VertexHandle; 4],
    },
    Initialize,
    Advance(f64),
    Finalize,
    Write {
        data: DataHandle,
        values: Vec<f64>,
    },
    WriteGradient {
        data: DataHandle,
        values: Vec<f64>,
    },
    Read {
        data: DataHandle,
        count: usize,
    },
}

#[derive(Debug, Default)]
struct MeshState {
    name: String,
    vertices: usize,
    edges: Vec<[VertexHandle; 2]>,
}

#[derive(Debug)]
struct FieldState {
    name: String,
    mesh: MeshHandle,
    /// Last value written per vertex.
    values: BTreeMap<VertexHandle, Vec<f64>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Setup,
    Running { window: usize },
    Finalized,
}

/// Coupling session that exchanges data with itself.
#[derive(Debug)]
pub struct LoopbackParticipant {
    settings: LoopbackSettings,
    meshes: Vec<MeshState>,
    fields: Vec<FieldState>,
    staged: BTreeMap<(String, String), Vec<f64>>,
    phase: Phase,
    calls: Vec<SessionCall>,
}

impl LoopbackParticipant {
    pub fn new(settings: LoopbackSettings) -> Self {
        Self {
            settings,
            meshes: Vec::new(),
            fields: Vec::new(),
            staged: BTreeMap::new(),
            phase: Phase::Setup,
            calls: Vec::new(),
        }
    }

    pub fn settings(&self) -> &LoopbackSettings {
        &self.settings
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> &[SessionCall] {
        &self.calls
    }

    /// Number of completed advances.
    pub fn advances(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SessionCall::Advance(_)))
            .count()
    }

    /// Values returned by reads of `data_name` on `mesh_name` until the field
    /// is written. Laid out vertex-major in vertex-handle order.
    pub fn stage_values(&mut self, mesh_name: &str, data_name: &str, values: Vec<f64>) {
        self.staged
            .insert((mesh_name.to_string(), data_name.to_string()), values);
    }

    /// Current values of a field, vertex-major in vertex-handle order.
    pub fn field_values(&self, mesh_name: &str, data_name: &str) -> Option<Vec<f64>> {
        let mesh = self.meshes.iter().position(|m| m.name == mesh_name)?;
        let field = self
            .fields
            .iter()
            .find(|f| f.name == data_name && f.mesh == MeshHandle(mesh as i32))?;
        Some(field.values.values().flatten().copied().collect())
    }

    fn mesh(&self, mesh: MeshHandle) -> Result<&MeshState, SessionError> {
        usize::try_from(mesh.0)
            .ok()
            .and_then(|i| self.meshes.get(i))
            .ok_or_else(|| SessionError::new(format!("unknown mesh handle {}", mesh.0)))
    }

    fn mesh_mut(&mut self, mesh: MeshHandle) -> Result<&mut MeshState, SessionError> {
        usize::try_from(mesh.0)
            .ok()
            .and_then(|i| self.meshes.get_mut(i))
            .ok_or_else(|| SessionError::new(format!("unknown mesh handle {}", mesh.0)))
    }

    fn field(&self, data: DataHandle) -> Result<&FieldState, SessionError> {
        usize::try_from(data.0)
            .ok()
            .and_then(|i| self.fields.get(i))
            .ok_or_else(|| SessionError::new(format!("unknown data handle {}", data.0)))
    }

    fn dimension_of(&self, mesh_name: &str) -> usize {
        self.settings
            .mesh_dimensions
            .get(mesh_name)
            .copied()
            .unwrap_or(self.settings.dimensions)
    }

    fn check_vertices(
        &self,
        mesh: MeshHandle,
        vertices: &[VertexHandle],
    ) -> Result<(), SessionError> {
        let count = self.mesh(mesh)?.vertices;
        match vertices.iter().find(|v| v.0 < 0 || v.0 as usize >= count) {
            Some(v) => Err(SessionError::new(format!(
                "vertex {v} is not registered on mesh {}",
                mesh.0
            ))),
            None => Ok(()),
        }
    }

    fn check_edges(&self, mesh: MeshHandle, edges: &[EdgeHandle]) -> Result<(), SessionError> {
        let count = self.mesh(mesh)?.edges.len();
        match edges.iter().find(|e| e.0 < 0 || e.0 as usize >= count) {
            Some(e) => Err(SessionError::new(format!(
                "edge {} is not registered on mesh {}",
                e.0, mesh.0
            ))),
            None => Ok(()),
        }
    }

    fn require_running(&self, what: &str) -> Result<(), SessionError> {
        match self.phase {
            Phase::Running { .. } => Ok(()),
            _ => Err(SessionError::new(format!("{what} outside of the coupling phase"))),
        }
    }

    fn store(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &[f64],
        width: usize,
    ) -> Result<(), SessionError> {
        if values.len() != vertices.len() * width {
            return Err(SessionError::new(format!(
                "expected {} values for {} vertices, got {}",
                vertices.len() * width,
                vertices.len(),
                values.len()
            )));
        }
        let mesh = self.field(data)?.mesh;
        self.check_vertices(mesh, vertices)?;
        let field = &mut self.fields[data.0 as usize];
        for (vertex, chunk) in vertices.iter().zip(values.chunks(width.max(1))) {
            field.values.insert(*vertex, chunk.to_vec());
        }
        Ok(())
    }

    fn load(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &mut [f64],
        width: usize,
    ) -> Result<(), SessionError> {
        if values.len() != vertices.len() * width {
            return Err(SessionError::new(format!(
                "expected room for {} values, got {}",
                vertices.len() * width,
                values.len()
            )));
        }
        let field = self.field(data)?;
        self.check_vertices(field.mesh, vertices)?;
        let mesh_name = &self.mesh(field.mesh)?.name;
        let staged = self.staged.get(&(mesh_name.clone(), field.name.clone()));
        for (vertex, slot) in vertices.iter().zip(values.chunks_mut(width.max(1))) {
            if let Some(stored) = field.values.get(vertex) {
                slot.copy_from_slice(stored);
                continue;
            }
            let start = vertex.0 as usize * width;
            match staged.and_then(|s| s.get(start..start + width)) {
                Some(src) => slot.copy_from_slice(src),
                None => slot.fill(0.0),
            }
        }
        self.calls.push(SessionCall::Read {
            data,
            count: vertices.len(),
        });
        Ok(())
    }
}

impl Participant for LoopbackParticipant {
    fn supports_gradients(&self) -> bool {
        self.settings.gradients
    }

    fn supports_volume_primitives(&self) -> bool {
        self.settings.volume_primitives
    }

    fn mesh_handle(&mut self, mesh_name: &str) -> Result<MeshHandle, SessionError> {
        if let Some(i) = self.meshes.iter().position(|m| m.name == mesh_name) {
            return Ok(MeshHandle(i as i32));
        }
        self.meshes.push(MeshState {
            name: mesh_name.to_string(),
            ..Default::default()
        });
        Ok(MeshHandle(self.meshes.len() as i32 - 1))
    }

    fn data_handle(
        &mut self,
        data_name: &str,
        mesh: MeshHandle,
    ) -> Result<DataHandle, SessionError> {
        self.mesh(mesh)?;
        if let Some(i) = self
            .fields
            .iter()
            .position(|f| f.name == data_name && f.mesh == mesh)
        {
            return Ok(DataHandle(i as i32));
        }
        self.fields.push(FieldState {
            name: data_name.to_string(),
            mesh,
            values: BTreeMap::new(),
        });
        Ok(DataHandle(self.fields.len() as i32 - 1))
    }

    fn mesh_dimensions(&self, mesh: MeshHandle) -> Result<usize, SessionError> {
        let name = &self.mesh(mesh)?.name;
        Ok(self.dimension_of(name))
    }

    fn requires_mesh_connectivity_for(&self, mesh: MeshHandle) -> Result<bool, SessionError> {
        let name = &self.mesh(mesh)?.name;
        Ok(self.settings.connectivity_meshes.iter().any(|m| m == name))
    }

    fn is_gradient_data_required(&self, data: DataHandle) -> Result<bool, SessionError> {
        let name = &self.field(data)?.name;
        Ok(self.settings.gradients && self.settings.gradient_data.iter().any(|d| d == name))
    }

    fn set_mesh_vertex(
        &mut self,
        mesh: MeshHandle,
        position: &[f64],
    ) -> Result<VertexHandle, SessionError> {
        let dim = self.mesh_dimensions(mesh)?;
        if position.len() != dim {
            return Err(SessionError::new(format!(
                "vertex has {} coordinates, mesh {} is {dim}D",
                position.len(),
                mesh.0
            )));
        }
        let state = self.mesh_mut(mesh)?;
        let id = VertexHandle(state.vertices as i32);
        state.vertices += 1;
        self.calls.push(SessionCall::SetVertex {
            mesh,
            position: position.to_vec(),
        });
        Ok(id)
    }

    fn set_mesh_edge(
        &mut self,
        mesh: MeshHandle,
        a: VertexHandle,
        b: VertexHandle,
    ) -> Result<EdgeHandle, SessionError> {
        self.check_vertices(mesh, &[a, b])?;
        let state = self.mesh_mut(mesh)?;
        state.edges.push([a, b]);
        let id = EdgeHandle(state.edges.len() as i32 - 1);
        self.calls.push(SessionCall::SetEdge {
            mesh,
            vertices: [a, b],
        });
        Ok(id)
    }

    fn set_mesh_triangle_with_edges(
        &mut self,
        mesh: MeshHandle,
        edges: [EdgeHandle; 3],
    ) -> Result<(), SessionError> {
        self.check_edges(mesh, &edges)?;
        self.calls.push(SessionCall::SetTriangle { mesh, edges });
        Ok(())
    }

    fn set_mesh_quad_with_edges(
        &mut self,
        mesh: MeshHandle,
        edges: [EdgeHandle; 4],
    ) -> Result<(), SessionError> {
        self.check_edges(mesh, &edges)?;
        self.calls.push(SessionCall::SetQuad { mesh, edges });
        Ok(())
    }

    fn set_mesh_tetrahedron(
        &mut self,
        mesh: MeshHandle,
        vertices: [VertexHandle; 4],
    ) -> Result<(), SessionError> {
        if !self.settings.volume_primitives {
            return Err(SessionError::new("volume primitives are not supported"));
        }
        self.check_vertices(mesh, &vertices)?;
        self.calls.push(SessionCall::SetTetrahedron { mesh, vertices });
        Ok(())
    }

    fn requires_initial_data(&self) -> Result<bool, SessionError> {
        if self.phase != Phase::Setup {
            return Err(SessionError::new("initial data can only be queried before initialize"));
        }
        Ok(self.settings.initial_data)
    }

    fn initialize(&mut self) -> Result<f64, SessionError> {
        if self.phase != Phase::Setup {
            return Err(SessionError::new("initialize called twice"));
        }
        self.phase = Phase::Running { window: 0 };
        self.calls.push(SessionCall::Initialize);
        Ok(self.settings.time_window_size)
    }

    fn advance(&mut self, dt: f64) -> Result<f64, SessionError> {
        let Phase::Running { window } = self.phase else {
            return Err(SessionError::new("advance outside of the coupling phase"));
        };
        if window >= self.settings.time_windows {
            return Err(SessionError::new("advance after coupling ended"));
        }
        self.phase = Phase::Running { window: window + 1 };
        self.calls.push(SessionCall::Advance(dt));
        Ok(self.settings.time_window_size)
    }

    fn finalize(&mut self) -> Result<(), SessionError> {
        if self.phase == Phase::Finalized {
            return Err(SessionError::new("finalize called twice"));
        }
        self.phase = Phase::Finalized;
        self.calls.push(SessionCall::Finalize);
        Ok(())
    }

    fn is_coupling_ongoing(&self) -> bool {
        match self.phase {
            Phase::Setup => true,
            Phase::Running { window } => window < self.settings.time_windows,
            Phase::Finalized => false,
        }
    }

    fn requires_writing_checkpoint(&self) -> bool {
        self.settings.implicit && self.is_coupling_ongoing()
    }

    fn requires_reading_checkpoint(&self) -> bool {
        self.settings.implicit && matches!(self.phase, Phase::Running { window } if window > 0)
    }

    fn write_block_scalar_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &[f64],
    ) -> Result<(), SessionError> {
        if self.phase == Phase::Finalized {
            return Err(SessionError::new("write after finalize"));
        }
        self.store(data, vertices, values, 1)?;
        self.calls.push(SessionCall::Write {
            data,
            values: values.to_vec(),
        });
        Ok(())
    }

    fn write_block_vector_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &[f64],
    ) -> Result<(), SessionError> {
        if self.phase == Phase::Finalized {
            return Err(SessionError::new("write after finalize"));
        }
        let dim = self.mesh_dimensions(self.field(data)?.mesh)?;
        self.store(data, vertices, values, dim)?;
        self.calls.push(SessionCall::Write {
            data,
            values: values.to_vec(),
        });
        Ok(())
    }

    fn write_block_gradient_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        gradients: &[f64],
    ) -> Result<(), SessionError> {
        if !self.is_gradient_data_required(data)? {
            return Err(SessionError::new(format!(
                "gradient data is not required for data handle {}",
                data.0
            )));
        }
        let field = self.field(data)?;
        self.check_vertices(field.mesh, vertices)?;
        let dim = self.mesh_dimensions(field.mesh)?;
        // A gradient block is dim directions of either 1 or dim components.
        let per_vertex = gradients.len() / vertices.len().max(1);
        if per_vertex * vertices.len() != gradients.len()
            || (per_vertex != dim && per_vertex != dim * dim)
        {
            return Err(SessionError::new(format!(
                "gradient block of {} values does not fit {} vertices in {dim}D",
                gradients.len(),
                vertices.len()
            )));
        }
        self.calls.push(SessionCall::WriteGradient {
            data,
            values: gradients.to_vec(),
        });
        Ok(())
    }

    fn read_block_scalar_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &mut [f64],
    ) -> Result<(), SessionError> {
        self.require_running("read")?;
        self.load(data, vertices, values, 1)
    }

    fn read_block_vector_data(
        &mut self,
        data: DataHandle,
        vertices: &[VertexHandle],
        values: &mut [f64],
    ) -> Result<(), SessionError> {
        self.require_running("read")?;
        let dim = self.mesh_dimensions(self.field(data)?.mesh)?;
        self.load(data, vertices, values, dim)
    }
}
