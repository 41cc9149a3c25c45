//! Event-oriented models
//!
//! [`EventSimulation`] composes an [`EventDrivenModel`] with an
//! [`EventLoop`] and implements [`Model`] on top of them: each replication
//! resets the loop and the model state, lets the model schedule its initial
//! events, and runs the loop to completion.

use super::control::LoopHandle;
use super::event_loop::{EventLoop, LoopConfig, LoopOutcome};
use crate::error::SimulationError;
use crate::model::Model;
use crate::rng::RandomStorage;
use crate::stats::Statistics;
use tracing::debug;

/// A model expressed as events
pub trait EventDrivenModel {
    type Parameters;
    type Statistics: Statistics;
    /// Per-replication state reachable from events; reset to its default
    /// before every replication
    type State: Default;

    /// Register random streams; called once before any replication
    fn setup(
        &mut self,
        parameters: &Self::Parameters,
        statistics: &mut Self::Statistics,
        randoms: &mut RandomStorage,
    ) -> Result<(), SimulationError>;

    /// Schedule the initial events of a replication on a freshly reset loop
    fn initialize(
        &mut self,
        sim: &mut EventLoop<Self::Parameters, Self::Statistics, Self::State>,
        parameters: &Self::Parameters,
        statistics: &mut Self::Statistics,
        randoms: &mut RandomStorage,
    ) -> Result<(), SimulationError>;

    /// Replication-level bookkeeping once the loop has stopped
    fn finish_replication(
        &mut self,
        _outcome: &LoopOutcome,
        _state: &Self::State,
        _parameters: &Self::Parameters,
        _statistics: &mut Self::Statistics,
    ) -> Result<(), SimulationError> {
        Ok(())
    }

    fn teardown(&mut self) {}
}

/// Runs an [`EventDrivenModel`] on its own [`EventLoop`]
pub struct EventSimulation<M: EventDrivenModel> {
    model: M,
    sim: EventLoop<M::Parameters, M::Statistics, M::State>,
    last_outcome: Option<LoopOutcome>,
}

impl<M: EventDrivenModel> EventSimulation<M> {
    /// # Errors
    /// `InvalidConfig` if `config` does not validate
    pub fn new(model: M, config: LoopConfig) -> Result<Self, SimulationError> {
        Ok(Self {
            model,
            sim: EventLoop::new(config)?,
            last_outcome: None,
        })
    }

    /// Handle for pausing, stopping or pacing the loop from other threads
    pub fn handle(&self) -> LoopHandle {
        self.sim.handle()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// The loop, e.g. for registering event listeners
    pub fn event_loop_mut(&mut self) -> &mut EventLoop<M::Parameters, M::Statistics, M::State> {
        &mut self.sim
    }

    pub fn event_loop(&self) -> &EventLoop<M::Parameters, M::Statistics, M::State> {
        &self.sim
    }

    /// Outcome of the most recent replication
    pub fn last_outcome(&self) -> Option<&LoopOutcome> {
        self.last_outcome.as_ref()
    }
}

impl<M: EventDrivenModel> Model for EventSimulation<M> {
    type Parameters = M::Parameters;
    type Statistics = M::Statistics;

    fn setup(
        &mut self,
        parameters: &M::Parameters,
        statistics: &mut M::Statistics,
        randoms: &mut RandomStorage,
    ) -> Result<(), SimulationError> {
        self.model.setup(parameters, statistics, randoms)
    }

    fn run_replication(
        &mut self,
        parameters: &M::Parameters,
        statistics: &mut M::Statistics,
        randoms: &mut RandomStorage,
    ) -> Result<(), SimulationError> {
        self.sim.reset();
        self.sim.replace_model_state(M::State::default());
        self.model
            .initialize(&mut self.sim, parameters, statistics, randoms)?;

        let outcome = self.sim.run(parameters, statistics, randoms)?;
        debug!(
            events = outcome.events_executed,
            time = %outcome.final_time,
            "Replication finished"
        );
        self.model
            .finish_replication(&outcome, self.sim.model_state(), parameters, statistics)?;
        self.last_outcome = Some(outcome);
        Ok(())
    }

    fn teardown(&mut self) {
        self.model.teardown();
    }
}
