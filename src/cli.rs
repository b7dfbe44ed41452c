//! Command-line options of `coupling-emulator-run`.

use std::fmt;
use std::path::PathBuf;

use crate::error::EmulatorError;
use crate::logging::{RankFilter, Verbosity};

pub const USAGE: &str = "\
Artificial solver emulation for coupling sessions

Usage:
  coupling-emulator-run --aste-config <file> [-v] [-a]
  coupling-emulator-run --participant <A|B> --data <name> --mesh <prefix>
                        [--output <path>] [--vector] [--precice-config <file>] [-v] [-a]

Options:
  --aste-config <file>     Configuration file for replay mode
  --precice-config <file>  Coupling session configuration [default: precice-config.xml]
  --participant <A|B>      Participant of the mapping test
  --data <name>            Name of the data array in the mesh files
  --mesh <prefix>          Mesh file prefix
  --output <path>          Output file (required for participant B)
  --vector                 Treat the data as vector valued
  -v, --verbose            Enable verbose output
  -a, --all                Log on all ranks, not only the primary one
  -h, --help               Print this help message";

const DEFAULT_SESSION_CONFIG: &str = "precice-config.xml";

/// Side of a mapping test.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MapperRole {
    /// Writes data from the mesh files.
    A,
    /// Reads the mapped data and saves it.
    B,
}

impl MapperRole {
    pub fn mesh_name(self) -> &'static str {
        match self {
            MapperRole::A => "A-Mesh",
            MapperRole::B => "B-Mesh",
        }
    }
}

impl fmt::Display for MapperRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperRole::A => f.write_str("A"),
            MapperRole::B => f.write_str("B"),
        }
    }
}

/// Options of the single-interface mapping test.
#[derive(Clone, Debug, PartialEq)]
pub struct MapperOptions {
    pub participant: MapperRole,
    pub data: String,
    pub mesh: String,
    pub output: Option<String>,
    pub vector: bool,
    pub session_config: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mode {
    Replay { config: PathBuf },
    Mapper(MapperOptions),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CliOptions {
    pub mode: Mode,
    pub verbosity: Verbosity,
    pub rank_filter: RankFilter,
}

/// Outcome of parsing the command line.
#[derive(Clone, Debug, PartialEq)]
pub enum Parsed {
    Run(CliOptions),
    Help,
}

fn cli_err(msg: impl Into<String>) -> EmulatorError {
    EmulatorError::Cli(msg.into())
}

/// Parse the arguments following the program name.
pub fn parse_args<I, S>(args: I) -> Result<Parsed, EmulatorError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut aste_config = None;
    let mut session_config = None;
    let mut participant = None;
    let mut data = None;
    let mut mesh = None;
    let mut output = None;
    let mut vector = false;
    let mut verbosity = Verbosity::Quiet;
    let mut rank_filter = RankFilter::OnlyPrimary;

    let mut args = args.into_iter().map(Into::<String>::into);
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => {
                (flag.to_string(), Some(value.to_string()))
            }
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| cli_err(format!("missing value for {name}")))
        };
        match flag.as_str() {
            "-h" | "--help" => return Ok(Parsed::Help),
            "-v" | "--verbose" => verbosity = Verbosity::Verbose,
            "-a" | "--all" => rank_filter = RankFilter::All,
            "--vector" => vector = true,
            "--aste-config" => aste_config = Some(PathBuf::from(value("--aste-config")?)),
            "--precice-config" => session_config = Some(PathBuf::from(value("--precice-config")?)),
            "--participant" => participant = Some(value("--participant")?),
            "--data" => data = Some(value("--data")?),
            "--mesh" => mesh = Some(value("--mesh")?),
            "--output" => output = Some(value("--output")?),
            other => return Err(cli_err(format!("unknown option `{other}`"))),
        }
    }

    let mode = if let Some(config) = aste_config {
        if participant.is_some() || data.is_some() || mesh.is_some() || output.is_some() || vector {
            return Err(cli_err("replay mode can only be combined with logging options"));
        }
        Mode::Replay { config }
    } else {
        let (Some(participant), Some(data), Some(mesh)) = (participant, data, mesh) else {
            return Err(cli_err(
                "one of the following arguments is missing: --participant --data --mesh",
            ));
        };
        let participant = match participant.as_str() {
            "A" => MapperRole::A,
            "B" => MapperRole::B,
            other => {
                return Err(cli_err(format!(
                    "invalid participant `{other}`, must be either 'A' or 'B'"
                )));
            }
        };
        if participant == MapperRole::B && output.is_none() {
            return Err(cli_err("participant B requires --output"));
        }
        Mode::Mapper(MapperOptions {
            participant,
            data,
            mesh,
            output,
            vector,
            session_config: session_config.unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_CONFIG)),
        })
    };

    Ok(Parsed::Run(CliOptions {
        mode,
        verbosity,
        rank_filter,
    }))
}
