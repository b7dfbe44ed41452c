//! Mapping-test mode: one interface between participants "A" and "B".
//!
//! "A" writes the array named by `--data` from its snapshots into the session
//! field `Data` on `A-Mesh`. "B" reads `Data` on `B-Mesh` into a zero-filled
//! array of the same name and saves its mesh once coupling ends.

use std::fs;
use std::path::PathBuf;

use crate::cli::{MapperOptions, MapperRole};
use crate::context::ProcessGroup;
use crate::coupling::driver::SessionDriver;
use crate::coupling::interface::{FieldSpec, InterfaceDescriptor};
use crate::coupling::participant::Participant;
use crate::data::mesh_data::DataKind;
use crate::error::EmulatorError;
use crate::io::snapshot::{existing_outputs, output_path};
use crate::io::{MeshLoader, MeshWriter};
use crate::logging::LogContext;

/// Session field exchanged by both sides of a mapping test.
pub const MAPPED_DATA: &str = "Data";

/// What a finished mapping test did.
#[derive(Clone, Debug, PartialEq)]
pub struct MapperOutcome {
    pub rounds: usize,
    pub initial_data: bool,
    /// Where participant B saved its result.
    pub output: Option<PathBuf>,
}

fn descriptor(options: &MapperOptions) -> InterfaceDescriptor {
    let kind = match options.participant {
        MapperRole::A => DataKind::Write,
        MapperRole::B => DataKind::Read,
    };
    let field = FieldSpec {
        session_name: MAPPED_DATA.to_string(),
        file_name: options.data.clone(),
        kind,
        vector: options.vector,
    };
    InterfaceDescriptor::new(
        options.participant.mesh_name(),
        options.mesh.as_str(),
        vec![field],
    )
}

/// Run one side of a mapping test.
pub fn run_mapper<P, L, W, G>(
    options: &MapperOptions,
    session: &mut P,
    loader: &L,
    writer: &W,
    group: &G,
) -> Result<MapperOutcome, EmulatorError>
where
    P: Participant + ?Sized,
    L: MeshLoader + ?Sized,
    W: MeshWriter + ?Sized,
    G: ProcessGroup + ?Sized,
{
    let context = group.context();
    let log_ctx = LogContext::new(options.participant.to_string(), &context);
    log::info!("{log_ctx} Running in mapping test mode");

    let mut driver = SessionDriver::new(
        session,
        loader,
        vec![descriptor(options)],
        context,
        log_ctx.clone(),
    );
    driver.register(true)?;

    let initial_data = driver.requires_initial_data()?;
    if initial_data {
        driver.exchange_initial_data(None, true)?;
    }
    driver.initialize(0)?;
    let rounds = driver.run_rounds()?;

    let mut output = None;
    if options.participant == MapperRole::B {
        let name = options
            .output
            .as_deref()
            .ok_or_else(|| EmulatorError::Cli("participant B requires --output".into()))?;
        let path = output_path(name, &context);
        if context.is_primary() {
            for stale in existing_outputs(name, &context)? {
                log::debug!("{log_ctx} Removing stale result {}", stale.display());
                fs::remove_file(&stale)?;
            }
        }
        group.barrier();
        log::info!("{log_ctx} Writing results to {}", path.display());
        if let Some(iface) = driver.interfaces().first() {
            writer.save(&iface.mesh, &path)?;
        }
        output = Some(path);
    }

    driver.finalize()?;
    Ok(MapperOutcome {
        rounds,
        initial_data,
        output,
    })
}
