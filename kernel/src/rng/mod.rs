//! Random streams and their registry
//!
//! Models draw every random number from a named [`RandomStream`] kept in
//! [`RandomStorage`]. Streams are registered once during setup and the
//! registry is then frozen, so all replications of a controller draw from
//! streams configured exactly once.

mod seed;
mod storage;
mod xorshift;

pub use seed::SeedSequence;
pub use storage::{RandomStorage, StoragePhase};
pub use xorshift::XorShiftStream;

/// Source of pseudo-random draws identified by a key in [`RandomStorage`]
///
/// The kernel only manages the lifecycle of streams; the algorithm belongs
/// to the implementation.
pub trait RandomStream: Send {
    /// Next raw 64-bit draw
    fn next_u64(&mut self) -> u64;

    /// Uniform draw in `[0.0, 1.0)` built from the top 53 bits
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform integer in `[min, max)`
    ///
    /// # Panics
    /// Panics if `min >= max`
    fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");
        let span = max.abs_diff(min);
        min.wrapping_add((self.next_u64() % span) as i64)
    }

    /// Exponentially distributed draw with the given mean
    fn exponential(&mut self, mean: f64) -> f64 {
        // 1 - u lies in (0, 1], keeping ln finite
        -mean * (1.0 - self.next_f64()).ln()
    }
}
