//! Execution context and collective process-group operations.
//!
//! Each rank of a participant runs its own single-threaded driver. The only
//! collectives the emulator needs itself are a barrier around writing final
//! output and a group-wide abort on fatal errors; all other cross-rank traffic
//! happens inside the coupling session.

/// Rank and size of the current process within its participant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExecutionContext {
    pub rank: usize,
    pub size: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self { rank: 0, size: 1 }
    }
}

impl ExecutionContext {
    /// Build a context; `rank` must be below `size`.
    pub fn new(rank: usize, size: usize) -> Self {
        assert!(rank < size, "rank {rank} out of range for size {size}");
        Self { rank, size }
    }

    /// True when more than one rank takes part.
    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.size > 1
    }

    /// True on rank 0.
    #[inline]
    pub fn is_primary(&self) -> bool {
        self.rank == 0
    }
}

/// Collective operations over the ranks of one participant.
pub trait ProcessGroup {
    /// The local rank/size.
    fn context(&self) -> ExecutionContext;

    /// Block until every rank reached this point.
    fn barrier(&self);

    /// Terminate every rank of the group with `code`.
    fn abort(&self, code: i32) -> !;
}

/// Single-process group for serial runs and tests.
#[derive(Clone, Debug, Default)]
pub struct SerialGroup;

impl ProcessGroup for SerialGroup {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::default()
    }

    fn barrier(&self) {}

    fn abort(&self, code: i32) -> ! {
        std::process::exit(code)
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// Process group over `MPI_COMM_WORLD`.
    pub struct MpiGroup {
        world: SimpleCommunicator,
        // Finalizes MPI on drop; must outlive `world`.
        _universe: Universe,
    }

    impl MpiGroup {
        /// Initialize MPI; `None` if it was already initialized.
        pub fn initialize() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = universe.world();
            Some(Self {
                world,
                _universe: universe,
            })
        }
    }

    impl ProcessGroup for MpiGroup {
        fn context(&self) -> ExecutionContext {
            ExecutionContext::new(self.world.rank() as usize, self.world.size() as usize)
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn abort(&self, code: i32) -> ! {
            self.world.abort(code)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiGroup;
