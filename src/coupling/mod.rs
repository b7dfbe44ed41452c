//! Coupling-session side of the emulator.
//!
//! [`participant::Participant`] is the seam to the coupling library. Meshes
//! are registered through [`registration`], per-mesh state lives in
//! [`interface`], and [`driver`] sequences a run. [`replay`] and [`mapper`]
//! are the two run modes; [`loopback`] is an in-process session.

pub mod driver;
pub mod interface;
pub mod loopback;
pub mod mapper;
pub mod participant;
pub mod registration;
pub mod replay;

pub use driver::{DriverState, SessionDriver};
pub use interface::{FieldSpec, InterfaceDescriptor};
pub use loopback::{LoopbackParticipant, LoopbackSettings, SessionCall};
pub use mapper::{MapperOutcome, run_mapper};
pub use participant::{DataHandle, EdgeHandle, MeshHandle, Participant, SessionError, VertexHandle};
pub use registration::{RegisteredMesh, register_mesh};
pub use replay::{ReplayOutcome, run_replay};
