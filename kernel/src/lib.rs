//! Discrete-Event Simulation Kernel
//!
//! Runs a stochastic model replication after replication and aggregates its
//! behavior over simulated time.
//!
//! # Architecture
//!
//! - **core**: Simulated time and listener bookkeeping
//! - **engine**: Event calendar and the event loop (pause, real-time pacing)
//! - **rng**: Random streams and the phase-gated stream registry
//! - **stats**: Incremental accumulators and replication statistics
//! - **model**: The contract a simulated model implements
//! - **replication**: Replication controller and progress listeners
//!
//! # Critical Invariants
//!
//! 1. Simulated time never decreases
//! 2. Equal-time events execute in submission order
//! 3. Random streams are registered during setup only, and read after it only
//! 4. A controller runs once; snapshots handed to listeners never change

// Module declarations
pub mod core;
pub mod engine;
pub mod error;
pub mod model;
pub mod replication;
pub mod rng;
pub mod stats;

// Re-exports for convenience
pub use crate::core::listener::ListenerId;
pub use crate::core::time::{SimClock, SimTime};
pub use engine::{
    EndReason, Event, EventDrivenModel, EventListener, EventLoop, EventOutcome, EventSimulation,
    LoopConfig, LoopHandle, LoopOutcome,
};
pub use error::{CalendarError, LifecycleError, SimulationError};
pub use model::Model;
pub use replication::{ControllerHandle, ProgressListener, ReplicationController};
pub use rng::{RandomStorage, RandomStream, XorShiftStream};
pub use stats::{Accumulator, BasicStatistics, Statistics};
