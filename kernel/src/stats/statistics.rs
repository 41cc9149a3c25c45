//! Statistics shared across replications
//!
//! A controller owns one statistics object for its whole lifetime. Model
//! code mutates it during runs; listeners receive deep copies, so a snapshot
//! is never affected by later replications.

use super::accumulator::Accumulator;
use crate::error::SimulationError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Aggregate mutated by a model and snapshotted for listeners
///
/// `Clone` must produce a fully independent copy: no shared interior
/// mutability (`Rc<RefCell<_>>`, `Arc<Mutex<_>>`) inside implementors.
pub trait Statistics: Clone + Send + Sync + 'static {
    /// Record the zero-based index of the replication that just completed
    fn set_last_replication(&mut self, index: u64);

    /// Index of the most recently completed replication
    fn last_replication(&self) -> Option<u64>;

    /// Number of replications completed so far
    fn replications(&self) -> u64 {
        self.last_replication().map_or(0, |index| index + 1)
    }
}

/// Default statistics: named floating-point accumulators
///
/// # Example
/// ```
/// use des_kernel::stats::{BasicStatistics, Statistics};
///
/// let mut stats = BasicStatistics::new();
/// stats.record("wait", 2.0);
/// stats.record("wait", 4.0);
/// stats.set_last_replication(0);
///
/// assert_eq!(stats.mean("wait"), Some(3.0));
/// assert_eq!(stats.replications(), 1);
/// assert_eq!(stats.mean("unknown"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicStatistics {
    accumulators: BTreeMap<String, Accumulator<f64>>,
    last_replication: Option<u64>,
}

impl BasicStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observation to the accumulator named `name`, creating it if needed
    pub fn record(&mut self, name: &str, value: f64) {
        self.accumulator_mut(name).add(value);
    }

    /// Accumulator named `name`, created empty on first use
    pub fn accumulator_mut(&mut self, name: &str) -> &mut Accumulator<f64> {
        self.accumulators.entry(name.to_string()).or_default()
    }

    pub fn accumulator(&self, name: &str) -> Option<&Accumulator<f64>> {
        self.accumulators.get(name)
    }

    /// Mean of `name`; `None` if the accumulator does not exist
    pub fn mean(&self, name: &str) -> Option<f64> {
        self.accumulator(name).map(Accumulator::mean)
    }

    /// Accumulator names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.accumulators.keys().map(String::as_str)
    }
}

impl Statistics for BasicStatistics {
    fn set_last_replication(&mut self, index: u64) {
        self.last_replication = Some(index);
    }

    fn last_replication(&self) -> Option<u64> {
        self.last_replication
    }
}

/// SHA-256 of a snapshot's JSON form, as lowercase hex
///
/// Two controllers driven by the same model, parameters and seeds produce
/// equal fingerprints; comparing them is the cheapest reproducibility check.
///
/// # Errors
/// `Serialization` if the value cannot be encoded as JSON.
pub fn fingerprint<T: Serialize>(snapshot: &T) -> Result<String, SimulationError> {
    let json = serde_json::to_string(snapshot)?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
