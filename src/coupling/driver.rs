//! Session driver: registration, optional initial data, the round loop and
//! finalization, shared by the replay and mapper modes.
//!
//! The driver tracks its progress as a [`DriverState`]. Every public step
//! checks that it is legal from the current state, so calling the steps out
//! of order is reported as [`EmulatorError::InvalidTransition`] instead of
//! confusing the coupling session.
//!
//! One round at position `r` is:
//! 1. fail if the session asks for a write checkpoint,
//! 2. load snapshot `r` for every interface and push write/gradient fields,
//! 3. advance the session,
//! 4. fail if the session asks for a read checkpoint,
//! 5. pull every read field.
//!
//! Rounds continue while the session reports ongoing coupling and `r` stays
//! below the shortest snapshot series of all interfaces.

use std::fmt;

use crate::context::ExecutionContext;
use crate::coupling::interface::{InterfaceDescriptor, PREVIEW_VALUES};
use crate::coupling::participant::Participant;
use crate::error::EmulatorError;
use crate::io::MeshLoader;
use crate::logging::LogContext;

/// Progress of a [`SessionDriver`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DriverState {
    Uninitialized,
    Registered,
    InitialDataExchanged,
    /// Coupling, about to run the round at this snapshot position.
    Coupling(usize),
    Finalized,
}

impl DriverState {
    pub fn name(&self) -> &'static str {
        match self {
            DriverState::Uninitialized => "Uninitialized",
            DriverState::Registered => "Registered",
            DriverState::InitialDataExchanged => "InitialDataExchanged",
            DriverState::Coupling(_) => "Coupling",
            DriverState::Finalized => "Finalized",
        }
    }

    fn allows(self, to: DriverState) -> bool {
        use DriverState::*;
        match (self, to) {
            (Uninitialized, Registered) => true,
            (Registered, InitialDataExchanged) => true,
            (Registered | InitialDataExchanged, Coupling(_)) => true,
            (Coupling(r), Coupling(next)) => next == r + 1,
            (Coupling(_), Finalized) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverState::Coupling(round) => write!(f, "Coupling({round})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Drives one participant's coupling session over a set of interfaces.
pub struct SessionDriver<'a, P: Participant + ?Sized, L: MeshLoader + ?Sized> {
    session: &'a mut P,
    loader: &'a L,
    interfaces: Vec<InterfaceDescriptor>,
    context: ExecutionContext,
    log_ctx: LogContext,
    state: DriverState,
    dt: f64,
}

impl<'a, P, L> SessionDriver<'a, P, L>
where
    P: Participant + ?Sized,
    L: MeshLoader + ?Sized,
{
    pub fn new(
        session: &'a mut P,
        loader: &'a L,
        interfaces: Vec<InterfaceDescriptor>,
        context: ExecutionContext,
        log_ctx: LogContext,
    ) -> Self {
        Self {
            session,
            loader,
            interfaces,
            context,
            log_ctx,
            state: DriverState::Uninitialized,
            dt: 0.0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn interfaces(&self) -> &[InterfaceDescriptor] {
        &self.interfaces
    }

    pub fn session(&self) -> &P {
        &*self.session
    }

    fn transition(&mut self, to: DriverState) -> Result<(), EmulatorError> {
        if !self.state.allows(to) {
            return Err(EmulatorError::InvalidTransition {
                from: self.state.name(),
                to: to.name(),
            });
        }
        log::debug!("{} Driver state {} -> {}", self.log_ctx, self.state, to);
        self.state = to;
        Ok(())
    }

    fn check_state(&self, to: DriverState) -> Result<(), EmulatorError> {
        if self.state.allows(to) {
            Ok(())
        } else {
            Err(EmulatorError::InvalidTransition {
                from: self.state.name(),
                to: to.name(),
            })
        }
    }

    /// Shortest snapshot series over all interfaces.
    pub fn round_limit(&self) -> usize {
        self.interfaces
            .iter()
            .map(InterfaceDescriptor::snapshot_count)
            .min()
            .unwrap_or(0)
    }

    /// Resolve snapshots, load and register the mesh of every interface.
    pub fn register(&mut self, preload: bool) -> Result<(), EmulatorError> {
        self.check_state(DriverState::Registered)?;
        if self.interfaces.is_empty() {
            return Err(EmulatorError::Config("no coupling interfaces configured".into()));
        }
        for iface in &mut self.interfaces {
            iface.resolve_snapshots(&self.context)?;
        }
        for iface in &mut self.interfaces {
            iface.setup(&mut *self.session, self.loader, preload, &self.log_ctx)?;
        }
        self.transition(DriverState::Registered)
    }

    /// Whether the session wants data before `initialize`.
    pub fn requires_initial_data(&self) -> Result<bool, EmulatorError> {
        Ok(self.session.requires_initial_data()?)
    }

    /// Push initial data, optionally loading snapshot `position` first.
    ///
    /// `None` pushes the values already held by each interface. Gradient
    /// fields are only sent with `gradients`.
    pub fn exchange_initial_data(
        &mut self,
        position: Option<usize>,
        gradients: bool,
    ) -> Result<(), EmulatorError> {
        self.check_state(DriverState::InitialDataExchanged)?;
        log::info!(
            "{} Write initial data for participant {}",
            self.log_ctx,
            self.log_ctx.participant()
        );
        for iface in &mut self.interfaces {
            if let Some(position) = position {
                iface.load_round(self.loader, position, &self.log_ctx)?;
            }
            log::info!("{} The mesh contains: {}", self.log_ctx, iface.mesh.summary());
            iface.push(&mut *self.session, gradients, &self.log_ctx)?;
            log::debug!(
                "{} Data written: {}",
                self.log_ctx,
                iface.mesh.preview_data(PREVIEW_VALUES)
            );
        }
        self.transition(DriverState::InitialDataExchanged)
    }

    /// Initialize the session and enter coupling at snapshot `start`.
    pub fn initialize(&mut self, start: usize) -> Result<(), EmulatorError> {
        self.check_state(DriverState::Coupling(start))?;
        self.dt = self.session.initialize()?;
        self.transition(DriverState::Coupling(start))
    }

    /// Run one round; the driver must be coupling.
    pub fn run_round(&mut self) -> Result<(), EmulatorError> {
        let DriverState::Coupling(round) = self.state else {
            return Err(EmulatorError::InvalidTransition {
                from: self.state.name(),
                to: "Coupling",
            });
        };
        if self.session.requires_writing_checkpoint() {
            return Err(EmulatorError::UnsupportedCouplingScheme("writing a checkpoint"));
        }
        for iface in &mut self.interfaces {
            iface.load_round(self.loader, round, &self.log_ctx)?;
            iface.push(&mut *self.session, true, &self.log_ctx)?;
        }
        self.dt = self.session.advance(self.dt)?;
        if self.session.requires_reading_checkpoint() {
            return Err(EmulatorError::UnsupportedCouplingScheme("reading a checkpoint"));
        }
        for iface in &mut self.interfaces {
            iface.pull(&mut *self.session, &self.log_ctx)?;
        }
        self.transition(DriverState::Coupling(round + 1))
    }

    /// Run rounds until coupling ends or snapshots run out; returns the
    /// number of rounds run.
    pub fn run_rounds(&mut self) -> Result<usize, EmulatorError> {
        let limit = self.round_limit();
        let mut rounds = 0;
        while let DriverState::Coupling(round) = self.state {
            if !self.session.is_coupling_ongoing() || round >= limit {
                break;
            }
            self.run_round()?;
            rounds += 1;
        }
        log::debug!("{} Coupling loop ended after {rounds} rounds", self.log_ctx);
        Ok(rounds)
    }

    /// Finalize the session.
    pub fn finalize(&mut self) -> Result<(), EmulatorError> {
        self.check_state(DriverState::Finalized)?;
        self.session.finalize()?;
        self.transition(DriverState::Finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_follow_the_lifecycle() {
        use DriverState::*;
        assert!(Uninitialized.allows(Registered));
        assert!(Registered.allows(InitialDataExchanged));
        assert!(Registered.allows(Coupling(0)));
        assert!(InitialDataExchanged.allows(Coupling(3)));
        assert!(Coupling(3).allows(Coupling(4)));
        assert!(Coupling(3).allows(Finalized));
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        use DriverState::*;
        assert!(!Uninitialized.allows(Coupling(0)));
        assert!(!Uninitialized.allows(Finalized));
        assert!(!Registered.allows(Finalized));
        assert!(!Coupling(1).allows(Coupling(3)));
        assert!(!Coupling(1).allows(InitialDataExchanged));
        assert!(!Finalized.allows(Registered));
    }

    #[test]
    fn coupling_state_displays_round() {
        assert_eq!(DriverState::Coupling(7).to_string(), "Coupling(7)");
        assert_eq!(DriverState::Registered.to_string(), "Registered");
    }
}
