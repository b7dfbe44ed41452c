//! CLI: run the solver emulator in replay or mapping-test mode.
//!
//! The coupling session is the in-process loopback session; its settings are
//! read from the JSON file given as `precice-config`.
//!
//! Usage:
//!   coupling-emulator-run --aste-config <file> [-v] [-a]
//!   coupling-emulator-run --participant <A|B> --data <name> --mesh <prefix> [options]

use std::env;

use coupling_emulator::cli::{self, CliOptions, Mode, Parsed, USAGE};
use coupling_emulator::config::ReplayConfig;
use coupling_emulator::context::ProcessGroup;
use coupling_emulator::coupling::{LoopbackParticipant, LoopbackSettings, run_mapper, run_replay};
use coupling_emulator::error::EmulatorError;
use coupling_emulator::io::vtk::{VtkReader, VtkWriter};
use coupling_emulator::logging::init_logger;

#[cfg(feature = "mpi-support")]
fn process_group() -> impl ProcessGroup {
    match coupling_emulator::context::MpiGroup::initialize() {
        Some(group) => group,
        None => {
            eprintln!("MPI was already initialized");
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "mpi-support"))]
fn process_group() -> impl ProcessGroup {
    coupling_emulator::context::SerialGroup
}

fn run<G: ProcessGroup>(options: &CliOptions, group: &G) -> Result<(), EmulatorError> {
    let loader = VtkReader;
    match &options.mode {
        Mode::Replay { config } => {
            let config = ReplayConfig::from_path(config)?;
            let settings = LoopbackSettings::from_path(&config.session_config)?;
            let mut session = LoopbackParticipant::new(settings);
            run_replay(&config, &mut session, &loader, group.context())?;
        }
        Mode::Mapper(mapper) => {
            let settings = LoopbackSettings::from_path(&mapper.session_config)?;
            let mut session = LoopbackParticipant::new(settings);
            run_mapper(mapper, &mut session, &loader, &VtkWriter, group)?;
        }
    }
    Ok(())
}

fn main() {
    let group = process_group();
    let options = match cli::parse_args(env::args().skip(1)) {
        Ok(Parsed::Help) => {
            println!("{USAGE}");
            return;
        }
        Ok(Parsed::Run(options)) => options,
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            group.abort(1)
        }
    };

    if let Err(err) = init_logger(options.verbosity, options.rank_filter, &group.context()) {
        eprintln!("logger already initialized: {err}");
    }

    if let Err(err) = run(&options, &group) {
        log::error!("{err}");
        group.abort(1);
    }
    log::info!("Finalizing emulator");
}
