//! EmulatorError: unified error type for the emulator's public APIs.
//!
//! Every failure in this crate is fatal for the run: errors propagate with `?`
//! up to the binary, which reports them and aborts the whole process group so
//! no coupling peer is left blocked.

use std::path::PathBuf;
use thiserror::Error;

use crate::coupling::participant::SessionError;

/// Unified error type for emulator operations.
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// Invalid or incomplete configuration document.
    #[error("configuration error: {0}")]
    Config(String),
    /// Invalid command-line option combination.
    #[error("invalid command line: {0}")]
    Cli(String),
    /// No snapshot file was found for a configured prefix.
    #[error("could not find meshes for prefix `{prefix}`")]
    NoSnapshots { prefix: String },
    /// Timestep snapshots are not numbered contiguously.
    #[error("snapshot series `{prefix}` has a gap: dt{missing} is missing but dt{found} exists")]
    SnapshotGap {
        prefix: String,
        missing: usize,
        found: usize,
    },
    /// The configured start round has no matching snapshot.
    #[error("no snapshot for start round dt{start} in series `{prefix}`")]
    StartRoundMissing { prefix: String, start: usize },
    /// Initial data is required but there is no round before the start round.
    #[error(
        "starting from dt{start} but the previous timestep (\".init\" or dt{}) was not found",
        start.saturating_sub(1)
    )]
    NoInitialDataSource { start: usize },
    /// The peer negotiated an implicit/iterative scheme that needs checkpoints.
    #[error("implicit coupling schemes cannot be used with the emulator ({0} requested)")]
    UnsupportedCouplingScheme(&'static str),
    /// Declared and actual component counts disagree.
    #[error("dimension mismatch for `{name}`: expected {expected} components, found {found}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// A declared write/gradient field is absent from a snapshot file.
    #[error("field `{name}` not found in {}", path.display())]
    MissingField { name: String, path: PathBuf },
    /// Topology refers to vertices that do not exist.
    #[error("malformed mesh: {0}")]
    MalformedMesh(String),
    /// A mesh file could not be parsed.
    #[error("mesh I/O parse error: {0}")]
    MeshIoParse(String),
    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The coupling session rejected a call.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The driver was asked to move between states in an illegal order.
    #[error("invalid driver transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}
