//! Per-mesh coupling interface: which files to replay, which fields to
//! exchange, and the session handles resolved for them.

use crate::context::ExecutionContext;
use crate::coupling::participant::{DataHandle, MeshHandle, Participant, VertexHandle};
use crate::coupling::registration::{RegisteredMesh, register_mesh};
use crate::data::mesh::Mesh;
use crate::data::mesh_data::{DataKind, MeshData};
use crate::error::EmulatorError;
use crate::io::MeshLoader;
use crate::io::snapshot::{Snapshot, find_all};
use crate::logging::LogContext;

/// Number of values shown per field in debug previews.
pub const PREVIEW_VALUES: usize = 10;

/// One field exchanged over an interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name of the field inside the coupling session.
    pub session_name: String,
    /// Name of the array in the snapshot files and in written output.
    pub file_name: String,
    /// [`DataKind::Write`] or [`DataKind::Read`].
    pub kind: DataKind,
    pub vector: bool,
}

impl FieldSpec {
    /// Field whose session and file names agree.
    pub fn named(kind: DataKind, name: impl Into<String>, vector: bool) -> Self {
        let name = name.into();
        Self {
            session_name: name.clone(),
            file_name: name,
            kind,
            vector,
        }
    }
}

/// A named coupling mesh together with its snapshot series and fields.
#[derive(Debug)]
pub struct InterfaceDescriptor {
    pub mesh_name: String,
    pub prefix: String,
    pub fields: Vec<FieldSpec>,
    pub snapshots: Vec<Snapshot>,
    pub mesh_handle: Option<MeshHandle>,
    pub registered: Option<RegisteredMesh>,
    /// Current mesh; holds the field values of the last loaded round.
    pub mesh: Mesh,
    /// Session handle for each entry of `mesh.data`.
    data_handles: Vec<DataHandle>,
}

impl InterfaceDescriptor {
    pub fn new(
        mesh_name: impl Into<String>,
        prefix: impl Into<String>,
        fields: Vec<FieldSpec>,
    ) -> Self {
        Self {
            mesh_name: mesh_name.into(),
            prefix: prefix.into(),
            fields,
            snapshots: Vec::new(),
            mesh_handle: None,
            registered: None,
            mesh: Mesh::default(),
            data_handles: Vec::new(),
        }
    }

    /// Registered vertex handles, in mesh order.
    pub fn vertex_handles(&self) -> &[VertexHandle] {
        self.registered
            .as_ref()
            .map_or(&[][..], |r| r.vertices.as_slice())
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Find the snapshot series of this interface for the local rank.
    pub fn resolve_snapshots(&mut self, context: &ExecutionContext) -> Result<(), EmulatorError> {
        self.snapshots = find_all(&self.prefix, context)?;
        Ok(())
    }

    /// Declare fields, load the first snapshot's mesh and register it.
    ///
    /// With `preload`, field values of the first snapshot are loaded as well.
    /// Read fields start out zero-filled.
    pub fn setup<P, L>(
        &mut self,
        session: &mut P,
        loader: &L,
        preload: bool,
        log_ctx: &LogContext,
    ) -> Result<(), EmulatorError>
    where
        P: Participant + ?Sized,
        L: MeshLoader + ?Sized,
    {
        if self.registered.is_some() {
            return Err(EmulatorError::InvalidTransition {
                from: "Registered",
                to: "Registered",
            });
        }
        let first = self
            .snapshots
            .first()
            .ok_or_else(|| EmulatorError::NoSnapshots {
                prefix: self.prefix.clone(),
            })?
            .path
            .clone();

        let handle = session.mesh_handle(&self.mesh_name)?;
        let dim = session.mesh_dimensions(handle)?;
        let gradients = session.supports_gradients();
        let mut data = Vec::new();
        let mut data_handles = Vec::new();
        for field in &self.fields {
            let components = if field.vector { dim } else { 1 };
            let data_handle = session.data_handle(&field.session_name, handle)?;
            data.push(MeshData::new(field.kind, components, field.file_name.as_str()));
            data_handles.push(data_handle);
            if gradients
                && field.kind == DataKind::Write
                && session.is_gradient_data_required(data_handle)?
            {
                log::debug!("{log_ctx} Gradient data required for {}", field.session_name);
                data.push(MeshData::gradient(components, field.file_name.as_str(), dim));
                data_handles.push(data_handle);
            }
        }

        log::info!("{log_ctx} Loading mesh from {}", first.display());
        let connectivity = session.requires_mesh_connectivity_for(handle)?;
        let mut mesh = loader.load_mesh(&first, dim, connectivity)?;
        mesh.data = data;
        if preload {
            loader.load_data(&mut mesh)?;
        }
        let n = mesh.num_vertices();
        for field in mesh.data.iter_mut().filter(|d| d.kind == DataKind::Read) {
            field.resize_for(n);
        }
        log::info!(
            "{log_ctx} The loaded mesh {} contains: {}",
            first.display(),
            mesh.summary()
        );

        let registered = register_mesh(session, &mesh, handle, log_ctx)?;
        log::debug!("{log_ctx} Mesh setup completed on rank {}", log_ctx.rank());

        self.mesh = mesh;
        self.mesh_handle = Some(handle);
        self.data_handles = data_handles;
        self.registered = Some(registered);
        Ok(())
    }

    /// Replace field values with those of snapshot `position`.
    pub fn load_round<L: MeshLoader + ?Sized>(
        &mut self,
        loader: &L,
        position: usize,
        log_ctx: &LogContext,
    ) -> Result<(), EmulatorError> {
        let snapshot = self.snapshots.get(position).ok_or_else(|| {
            EmulatorError::Config(format!(
                "round {position} is past the {} snapshots of `{}`",
                self.snapshots.len(),
                self.prefix
            ))
        })?;
        log::info!("{log_ctx} Read mesh for t={position} from {snapshot}");
        self.mesh.fname = snapshot.path.clone();
        loader.reset_data(&mut self.mesh);
        loader.load_data(&mut self.mesh)?;
        log::debug!("{log_ctx} This round's mesh contains: {}", self.mesh.summary());
        Ok(())
    }

    /// Send every write field to the session, and every gradient field too
    /// if `gradients` is set.
    pub fn push<P: Participant + ?Sized>(
        &self,
        session: &mut P,
        gradients: bool,
        log_ctx: &LogContext,
    ) -> Result<(), EmulatorError> {
        let vertices = self.vertex_handles();
        for (data, &handle) in self.mesh.data.iter().zip(&self.data_handles) {
            match data.kind {
                DataKind::Write if data.components == 1 => {
                    session.write_block_scalar_data(handle, vertices, &data.values)?
                }
                DataKind::Write => {
                    session.write_block_vector_data(handle, vertices, &data.values)?
                }
                DataKind::Gradient if gradients => {
                    session.write_block_gradient_data(handle, vertices, &data.values)?
                }
                DataKind::Gradient | DataKind::Read => continue,
            }
            log::debug!(
                "{log_ctx} {} data written: {}",
                data.kind,
                data.preview(PREVIEW_VALUES)
            );
        }
        Ok(())
    }

    /// Fetch every read field from the session.
    pub fn pull<P: Participant + ?Sized>(
        &mut self,
        session: &mut P,
        log_ctx: &LogContext,
    ) -> Result<(), EmulatorError> {
        let vertices = self
            .registered
            .as_ref()
            .map_or(&[][..], |r| r.vertices.as_slice());
        let n = self.mesh.num_vertices();
        for (data, &handle) in self.mesh.data.iter_mut().zip(&self.data_handles) {
            if data.kind != DataKind::Read {
                continue;
            }
            data.resize_for(n);
            if data.components == 1 {
                session.read_block_scalar_data(handle, vertices, &mut data.values)?;
            } else {
                session.read_block_vector_data(handle, vertices, &mut data.values)?;
            }
            log::debug!("{log_ctx} Data read: {}", data.preview(PREVIEW_VALUES));
        }
        Ok(())
    }
}
