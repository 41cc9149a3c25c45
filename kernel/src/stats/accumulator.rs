//! Running mean accumulator
//!
//! The numeric kind is fixed at compile time through [`Observation`]. Each
//! kind accumulates into a wider representation so long runs do not
//! overflow, and the observation count is a `u128`.
//!
//! # Empty accumulators
//!
//! `mean()` of an accumulator with no observations is `f64::NAN`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::marker::PhantomData;

/// A numeric kind that can be fed to an [`Accumulator`]
pub trait Observation: Copy + Debug + Send + Sync + 'static {
    /// Representation the running sum is kept in
    type Sum: Copy + Debug + Default + PartialEq + Send + Sync + Serialize + DeserializeOwned;

    /// Fold `value` into `sum`
    fn accumulate(sum: &mut Self::Sum, value: Self);

    /// Sum as a float
    fn total(sum: &Self::Sum) -> f64;
}

macro_rules! widening_observation {
    ($($kind:ty => $wide:ty),* $(,)?) => {
        $(
            impl Observation for $kind {
                type Sum = $wide;

                fn accumulate(sum: &mut $wide, value: $kind) {
                    *sum += <$wide>::from(value);
                }

                fn total(sum: &$wide) -> f64 {
                    *sum as f64
                }
            }
        )*
    };
}

widening_observation! {
    i32 => i64,
    u32 => u64,
    i64 => i128,
    u64 => u128,
}

/// Neumaier-compensated floating point sum
///
/// Keeps the low-order bits a naive `+=` drops when small observations are
/// added to a large running total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl Observation for f64 {
    type Sum = CompensatedSum;

    fn accumulate(sum: &mut CompensatedSum, value: f64) {
        sum.add(value);
    }

    fn total(sum: &CompensatedSum) -> f64 {
        sum.value()
    }
}

/// Running sum and count of observations
///
/// # Example
/// ```
/// use des_kernel::stats::Accumulator;
///
/// let mut waits = Accumulator::<i64>::new();
/// assert!(waits.mean().is_nan());
///
/// waits.add(4);
/// waits.add(8);
/// assert_eq!(waits.count(), 2);
/// assert_eq!(waits.mean(), 6.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Accumulator<T: Observation> {
    sum: T::Sum,
    count: u128,
    #[serde(skip)]
    _kind: PhantomData<T>,
}

impl<T: Observation> Accumulator<T> {
    pub fn new() -> Self {
        Self {
            sum: T::Sum::default(),
            count: 0,
            _kind: PhantomData,
        }
    }

    /// Record one observation
    pub fn add(&mut self, value: T) {
        T::accumulate(&mut self.sum, value);
        self.count += 1;
    }

    /// `sum / count`, or NaN when nothing was observed
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        T::total(&self.sum) / self.count as f64
    }

    pub fn sum(&self) -> f64 {
        T::total(&self.sum)
    }

    pub fn count(&self) -> u128 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Forget every observation
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<T: Observation> Default for Accumulator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Observation> Extend<T> for Accumulator<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}
