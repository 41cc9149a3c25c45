//! Simulated time for the kernel
//!
//! Simulated time is a continuous quantity advanced only by event execution.
//! It is independent of wall-clock time.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

/// A point in simulated time
///
/// Wraps an `f64` and orders it with IEEE-754 total ordering so it can key
/// ordered collections. NaN is never accepted by the scheduling API.
///
/// # Example
/// ```
/// use des_kernel::SimTime;
///
/// let a = SimTime::new(2.0);
/// let b = a + 0.5;
/// assert!(a < b);
/// assert_eq!(b.as_f64(), 2.5);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct SimTime(f64);

impl SimTime {
    /// Start of every replication
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create a time value (negative zero is folded into zero)
    pub fn new(value: f64) -> Self {
        Self(if value == 0.0 { 0.0 } else { value })
    }

    /// Raw value
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// True unless the value is NaN
    pub fn is_valid(self) -> bool {
        !self.0.is_nan()
    }
}

impl From<f64> for SimTime {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> Self {
        time.0
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: f64) -> SimTime {
        SimTime::new(self.0 + rhs)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic simulation clock bounded by a horizon
///
/// # Example
/// ```
/// use des_kernel::{SimClock, SimTime};
///
/// let mut clock = SimClock::new(SimTime::new(10.0));
/// assert_eq!(clock.current_time(), SimTime::ZERO);
///
/// clock.advance_to(SimTime::new(4.0));
/// assert_eq!(clock.current_time(), SimTime::new(4.0));
/// assert!(clock.is_before_horizon());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Time of the most recently executed event
    current_time: SimTime,
    /// Runs stop once current time reaches this value
    horizon: SimTime,
}

impl SimClock {
    /// Create a clock at time zero
    ///
    /// # Arguments
    /// * `horizon` - Simulated time at which a run ends
    pub fn new(horizon: SimTime) -> Self {
        assert!(horizon.is_valid(), "horizon must not be NaN");
        Self {
            current_time: SimTime::ZERO,
            horizon,
        }
    }

    /// Move the clock forward to `time`
    ///
    /// # Panics
    /// Panics if `time` is earlier than the current time. Scheduling rejects
    /// past times, so this can only fire on a kernel bug.
    pub fn advance_to(&mut self, time: SimTime) {
        assert!(
            time >= self.current_time,
            "simulated time must not decrease ({} -> {})",
            self.current_time,
            time
        );
        self.current_time = time;
    }

    /// Current simulated time
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Time horizon of a run
    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    /// Whether the clock is still short of the horizon
    pub fn is_before_horizon(&self) -> bool {
        self.current_time < self.horizon
    }

    /// Rewind to time zero for the next replication
    pub fn reset(&mut self) {
        self.current_time = SimTime::ZERO;
    }
}
