//! Core kernel primitives
//!
//! - **time**: simulated time and the monotonic clock
//! - **listener**: ordered listener registry

pub mod listener;
pub mod time;
