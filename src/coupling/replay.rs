//! Replay mode: several interfaces driven from a configuration document.

use crate::config::ReplayConfig;
use crate::context::ExecutionContext;
use crate::coupling::driver::SessionDriver;
use crate::coupling::participant::Participant;
use crate::error::EmulatorError;
use crate::io::MeshLoader;
use crate::io::snapshot::start_position;
use crate::logging::LogContext;

/// What a finished replay run did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReplayOutcome {
    /// Snapshot position of the first replayed round.
    pub start_position: usize,
    pub rounds: usize,
    pub initial_data: bool,
}

/// Replay the snapshot series of every configured interface.
///
/// The first round is the snapshot `dt{start_round}`; it must sit at the same
/// position in every series. If the session asks for initial data it is
/// taken from the snapshot right before the start round.
pub fn run_replay<P, L>(
    config: &ReplayConfig,
    session: &mut P,
    loader: &L,
    context: ExecutionContext,
) -> Result<ReplayOutcome, EmulatorError>
where
    P: Participant + ?Sized,
    L: MeshLoader + ?Sized,
{
    config.validate()?;
    let log_ctx = LogContext::new(config.participant.as_str(), &context);
    log::info!("{log_ctx} Running in replay mode");

    let mut driver =
        SessionDriver::new(session, loader, config.descriptors(), context, log_ctx.clone());
    driver.register(false)?;

    let start = config.start_round;
    log::debug!("{log_ctx} Looking for dt = {start}");
    let mut position = None;
    for iface in driver.interfaces() {
        let found = start_position(&iface.snapshots, start).ok_or_else(|| {
            EmulatorError::StartRoundMissing {
                prefix: iface.prefix.clone(),
                start,
            }
        })?;
        match position {
            None => position = Some(found),
            Some(p) if p != found => {
                return Err(EmulatorError::Config(format!(
                    "dt{start} is snapshot {found} of `{}` but snapshot {p} of the first mesh",
                    iface.prefix
                )));
            }
            Some(_) => {}
        }
    }
    // `register` rejects an empty interface list.
    let position = position.unwrap_or_default();
    log::debug!("{log_ctx} Found in position {position}");
    if let Some(first) = driver.interfaces().first() {
        log::info!("{log_ctx} Start mesh is {}", first.snapshots[position]);
        if let Some(last) = first.snapshots.last() {
            log::info!("{log_ctx} Final mesh is {last}");
        }
    }

    let initial_data = driver.requires_initial_data()?;
    if initial_data {
        if position == 0 {
            return Err(EmulatorError::NoInitialDataSource { start });
        }
        driver.exchange_initial_data(Some(position - 1), false)?;
    }

    driver.initialize(position)?;
    let rounds = driver.run_rounds()?;
    driver.finalize()?;
    log::info!("{log_ctx} Replayed {rounds} rounds");
    Ok(ReplayOutcome {
        start_position: position,
        rounds,
        initial_data,
    })
}
