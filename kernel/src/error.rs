//! Kernel error taxonomy
//!
//! Every variant signals a contract violation by the driver or the model.
//! Nothing in the kernel retries: a replication is a single deterministic
//! pass, so errors fail fast and propagate with `?`.

use crate::core::time::SimTime;
use thiserror::Error;

/// Registry accessed or mutated in the wrong phase
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// Streams read before the registry was frozen
    #[error("random storage is not initialized yet (streams can only be read after setup)")]
    NotYetInitialized,

    /// Streams registered, removed or re-frozen after the registry was frozen
    #[error("random storage is already initialized (streams can only be changed during setup)")]
    AlreadyInitialized,
}

/// Event calendar failures
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("event calendar is empty")]
    Empty,
}

/// Errors raised by the simulation kernel
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A run was requested on a controller that already finished
    #[error("replications already terminated; create a new controller to run again")]
    AlreadyTerminated,

    /// An event was scheduled before the current simulated time
    #[error("cannot schedule event at {requested}: current time is {current}")]
    PastTime { requested: SimTime, current: SimTime },

    /// An event was scheduled at NaN
    #[error("cannot schedule event at a NaN time")]
    InvalidTime,

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// Configuration validation error
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A stream key required by the model was never registered
    #[error("unknown random stream: {0}")]
    UnknownStream(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure reported by model code
    #[error("model error: {0}")]
    Model(String),
}
