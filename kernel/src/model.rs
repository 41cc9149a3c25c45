//! Model contract
//!
//! A model is what the [`ReplicationController`](crate::replication::ReplicationController)
//! drives: one-time setup, one call per replication, and a teardown hook the
//! driving application invokes after the last replication.

use crate::error::SimulationError;
use crate::rng::RandomStorage;
use crate::stats::Statistics;

/// A stochastic model run replication after replication
pub trait Model {
    /// Caller-owned configuration, read-only to the kernel
    type Parameters;

    /// Aggregate the model updates across replications
    type Statistics: Statistics;

    /// Called once before any replication
    ///
    /// Must register every random stream the model will ever draw from;
    /// the registry is frozen as soon as this returns.
    fn setup(
        &mut self,
        parameters: &Self::Parameters,
        statistics: &mut Self::Statistics,
        randoms: &mut RandomStorage,
    ) -> Result<(), SimulationError>;

    /// Simulate one replication
    ///
    /// Must terminate and be deterministic given the stream states.
    fn run_replication(
        &mut self,
        parameters: &Self::Parameters,
        statistics: &mut Self::Statistics,
        randoms: &mut RandomStorage,
    ) -> Result<(), SimulationError>;

    /// Release resources after the last replication
    ///
    /// Never called by the controller itself.
    fn teardown(&mut self) {}
}
