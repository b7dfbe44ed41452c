//! Log identity and sink setup.
//!
//! Every message the driver emits goes through the `log` facade prefixed by
//! a [`LogContext`] that names the participant and rank. The sink is an
//! `env_logger` installed once by the binary.

use std::fmt;
use std::io::Write;

use log::LevelFilter;

use crate::context::ExecutionContext;

/// Participant/rank identity attached to driver log lines.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogContext {
    participant: String,
    rank: usize,
}

impl LogContext {
    pub fn new(participant: impl Into<String>, context: &ExecutionContext) -> Self {
        Self {
            participant: participant.into(),
            rank: context.rank,
        }
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.participant, self.rank)
    }
}

/// How much the emulator reports.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Verbosity {
    #[default]
    Quiet,
    Verbose,
}

/// Which ranks print informational output.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RankFilter {
    /// Only rank 0; other ranks still report errors.
    #[default]
    OnlyPrimary,
    All,
}

/// Level the local rank logs at.
pub fn level_for(
    verbosity: Verbosity,
    filter: RankFilter,
    context: &ExecutionContext,
) -> LevelFilter {
    if filter == RankFilter::OnlyPrimary && !context.is_primary() {
        return LevelFilter::Error;
    }
    match verbosity {
        Verbosity::Quiet => LevelFilter::Info,
        Verbosity::Verbose => LevelFilter::Debug,
    }
}

/// Install the process-wide log sink. Call once, from `main`.
pub fn init_logger(
    verbosity: Verbosity,
    filter: RankFilter,
    context: &ExecutionContext,
) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(level_for(verbosity, filter, context))
        .format(|buf, record| writeln!(buf, "---[emulator] {}", record.args()))
        .try_init()
}
