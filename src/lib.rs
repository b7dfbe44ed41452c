#![cfg_attr(docsrs, feature(doc_cfg))]
//! # coupling-emulator
//!
//! coupling-emulator stands in for a numerical solver when testing a
//! multi-participant data-coupling session. It loads a mesh with optional
//! field data, registers the mesh topology with the session, and then drives
//! a deterministic write/advance/read cycle, optionally replaying a series of
//! pre-computed snapshots as solver timesteps.
//!
//! ## Features
//! - Mesh data model with edges, triangles, quads, tetrahedra and named
//!   read/write/gradient fields
//! - Deduplicated edge registration so faces never create duplicate edges
//! - Replay mode over several named interfaces, and a two-sided mapping test
//! - Legacy VTK (ASCII) snapshot reader and writer
//! - Serial execution, and MPI process groups behind `mpi-support`
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! coupling-emulator = "0.3"
//! # features = ["mpi-support"]
//! ```
//!
//! The coupling library is reached through the [`coupling::Participant`]
//! trait; [`coupling::LoopbackParticipant`] is an in-process implementation
//! for tests and dry runs.

pub mod cli;
pub mod config;
pub mod context;
pub mod coupling;
pub mod data;
pub mod error;
pub mod io;
pub mod logging;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::config::{InterfaceConfig, ReplayConfig};
    #[cfg(feature = "mpi-support")]
    pub use crate::context::MpiGroup;
    pub use crate::context::{ExecutionContext, ProcessGroup, SerialGroup};
    pub use crate::coupling::{
        DriverState, FieldSpec, InterfaceDescriptor, LoopbackParticipant, LoopbackSettings,
        Participant, RegisteredMesh, SessionDriver, register_mesh, run_mapper, run_replay,
    };
    pub use crate::data::{DataKind, Mesh, MeshData};
    pub use crate::error::EmulatorError;
    pub use crate::io::vtk::{VtkReader, VtkWriter};
    pub use crate::io::{MeshLoader, MeshWriter};
    pub use crate::logging::LogContext;
    pub use crate::topology::{CellType, UndirectedEdge, unique_edges};
}
