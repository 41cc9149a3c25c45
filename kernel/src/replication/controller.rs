//! Replication controller
//!
//! Repeatedly invokes a model's replication entry point while owning the
//! statistics and random streams shared by every replication.
//!
//! # Lifecycle
//!
//! ```text
//! new():  model.setup(...) ──▶ random storage frozen
//! run(n): for each replication:
//!           1. Stop requested? ──▶ leave the loop
//!           2. model.run_replication(...)
//!           3. Record the replication index into statistics
//!           4. replication_ended(index, snapshot) to every listener
//!         terminated ──▶ simulation_ended(snapshot) to every listener
//! ```
//!
//! A controller runs once. Whether `run(n)` exhausts `n` or is stopped
//! early, it ends permanently terminated and further runs fail with
//! `AlreadyTerminated`.
//!
//! # Example
//!
//! ```rust
//! use des_kernel::model::Model;
//! use des_kernel::replication::ReplicationController;
//! use des_kernel::rng::{RandomStorage, RandomStream, XorShiftStream};
//! use des_kernel::stats::BasicStatistics;
//! use des_kernel::SimulationError;
//!
//! struct Dice;
//!
//! impl Model for Dice {
//!     type Parameters = ();
//!     type Statistics = BasicStatistics;
//!
//!     fn setup(&mut self, _: &(), _: &mut BasicStatistics, randoms: &mut RandomStorage) -> Result<(), SimulationError> {
//!         randoms.register("die", XorShiftStream::new(42))?;
//!         Ok(())
//!     }
//!
//!     fn run_replication(&mut self, _: &(), stats: &mut BasicStatistics, randoms: &mut RandomStorage) -> Result<(), SimulationError> {
//!         let roll = randoms.require("die")?.range(1, 7);
//!         stats.record("roll", roll as f64);
//!         Ok(())
//!     }
//! }
//!
//! let mut controller = ReplicationController::new(Dice, ()).unwrap();
//! assert_eq!(controller.run(1_000).unwrap(), 1_000);
//!
//! let mean = controller.statistics().mean("roll").unwrap();
//! assert!((mean - 3.5).abs() < 0.2);
//! assert!(controller.run(1).is_err());
//! ```

use super::listener::ProgressListener;
use crate::core::listener::{ListenerId, ListenerList};
use crate::error::SimulationError;
use crate::model::Model;
use crate::rng::RandomStorage;
use crate::stats::Statistics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Cloneable handle for stopping a controller from another thread
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    stop_requested: Arc<AtomicBool>,
}

impl ControllerHandle {
    /// Let the replication in flight finish, then start no more
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

/// Drives a [`Model`] through replications
pub struct ReplicationController<M: Model> {
    model: M,
    parameters: M::Parameters,
    statistics: M::Statistics,
    randoms: RandomStorage,
    listeners: ListenerList<Box<dyn ProgressListener<M::Statistics>>>,
    stop_requested: Arc<AtomicBool>,
    terminated: bool,
    replications_completed: u64,
    /// Tags every log line of this controller
    run_id: Uuid,
}

impl<M: Model> ReplicationController<M> {
    /// Create a controller with default statistics
    ///
    /// # Errors
    /// Whatever `model.setup` returns.
    pub fn new(model: M, parameters: M::Parameters) -> Result<Self, SimulationError>
    where
        M::Statistics: Default,
    {
        Self::with_statistics(model, parameters, M::Statistics::default())
    }

    /// Create a controller with caller-supplied statistics
    ///
    /// Calls `model.setup` exactly once, then freezes the random storage.
    ///
    /// # Errors
    /// Whatever `model.setup` returns.
    pub fn with_statistics(
        mut model: M,
        parameters: M::Parameters,
        mut statistics: M::Statistics,
    ) -> Result<Self, SimulationError> {
        let run_id = Uuid::new_v4();
        let mut randoms = RandomStorage::new();

        model.setup(&parameters, &mut statistics, &mut randoms)?;
        randoms.freeze()?;

        info!(%run_id, streams = randoms.len(), "Created replication controller");

        Ok(Self {
            model,
            parameters,
            statistics,
            randoms,
            listeners: ListenerList::new(),
            stop_requested: Arc::new(AtomicBool::new(false)),
            terminated: false,
            replications_completed: 0,
            run_id,
        })
    }

    /// Run up to `replications` replications
    ///
    /// Returns how many replications this call executed: fewer than
    /// requested only if a stop was observed between replications.
    ///
    /// # Errors
    /// - `AlreadyTerminated` if the controller already ran
    /// - Any error from the model; the controller is terminated and no
    ///   `simulation_ended` notification is sent
    pub fn run(&mut self, replications: u64) -> Result<u64, SimulationError> {
        if self.terminated {
            return Err(SimulationError::AlreadyTerminated);
        }
        info!(run_id = %self.run_id, replications, "Starting replications");

        let mut executed = 0u64;
        for _ in 0..replications {
            if self.stop_requested.load(Ordering::Acquire) {
                break;
            }

            if let Err(err) =
                self.model
                    .run_replication(&self.parameters, &mut self.statistics, &mut self.randoms)
            {
                self.terminated = true;
                error!(
                    run_id = %self.run_id,
                    replication = self.replications_completed,
                    error = %err,
                    "Replication failed"
                );
                return Err(err);
            }

            let index = self.replications_completed;
            self.statistics.set_last_replication(index);
            self.replications_completed += 1;
            executed += 1;
            debug!(run_id = %self.run_id, replication = index, "Replication ended");

            self.notify_replication_ended(index);
        }

        self.terminated = true;
        info!(
            run_id = %self.run_id,
            executed,
            stopped_early = executed < replications,
            "Replications finished"
        );
        self.notify_simulation_ended();
        Ok(executed)
    }

    /// Stop after the replication in flight
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Handle for stopping this controller from another thread
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            stop_requested: Arc::clone(&self.stop_requested),
        }
    }

    /// Call the model's teardown hook; never done automatically
    pub fn teardown(&mut self) {
        debug!(run_id = %self.run_id, "Tearing down model");
        self.model.teardown();
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_progress_listener<L>(&mut self, listener: L) -> ListenerId
    where
        L: ProgressListener<M::Statistics> + 'static,
    {
        self.listeners.add(Box::new(listener))
    }

    pub fn remove_progress_listener(
        &mut self,
        id: ListenerId,
    ) -> Option<Box<dyn ProgressListener<M::Statistics>>> {
        self.listeners.remove(id)
    }

    fn snapshot(&self) -> Arc<M::Statistics> {
        Arc::new(self.statistics.clone())
    }

    fn notify_replication_ended(&mut self, index: u64) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for listener in self.listeners.iter_mut() {
            listener.replication_ended(index, Arc::clone(&snapshot));
        }
    }

    fn notify_simulation_ended(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for listener in self.listeners.iter_mut() {
            listener.simulation_ended(Arc::clone(&snapshot));
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn parameters(&self) -> &M::Parameters {
        &self.parameters
    }

    /// Live statistics
    pub fn statistics(&self) -> &M::Statistics {
        &self.statistics
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn replications_completed(&self) -> u64 {
        self.replications_completed
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}
