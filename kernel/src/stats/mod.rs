//! Incremental statistics
//!
//! - **accumulator**: running sum/count aggregate producing a mean
//! - **statistics**: the per-controller aggregate handed to listeners

mod accumulator;
mod statistics;

pub use accumulator::{Accumulator, CompensatedSum, Observation};
pub use statistics::{fingerprint, BasicStatistics, Statistics};
