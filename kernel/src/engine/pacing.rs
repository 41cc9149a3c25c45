//! Real-time pacing
//!
//! A pacing event fires every `interval` units of simulated time and blocks
//! the loop thread for `delay` of wall-clock time, throttling playback
//! without touching simulated-time bookkeeping.

use super::control::WaitOutcome;
use super::event::{Event, EventOutcome};
use super::event_loop::EventLoop;
use crate::error::SimulationError;
use crate::rng::RandomStorage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Pacing parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Simulated time between two pacing firings
    pub interval: f64,
    /// Wall-clock pause per firing, in milliseconds
    pub delay_ms: u64,
}

impl PacingConfig {
    pub fn new(interval: f64, delay: Duration) -> Self {
        Self {
            interval,
            delay_ms: delay.as_millis().min(u128::from(u64::MAX)) as u64,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// A non-positive or non-finite interval would pin the loop at one instant
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.interval.is_finite() && self.interval > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "pacing interval must be positive and finite, got {}",
                self.interval
            )));
        }
        Ok(())
    }
}

/// Settings shared by the loop and its pacing event
#[derive(Debug)]
pub(crate) struct PacingSettings {
    pub(crate) config: PacingConfig,
    /// Cleared by `stop_speed_synchronization`: the pending firing still
    /// happens, but does not reschedule itself
    pub(crate) reschedule: bool,
}

pub(crate) type SharedPacing = Arc<Mutex<PacingSettings>>;

pub(crate) fn shared_settings(config: PacingConfig) -> SharedPacing {
    Arc::new(Mutex::new(PacingSettings {
        config,
        reschedule: true,
    }))
}

/// The self-rescheduling pacing event
pub(crate) struct PacingEvent {
    settings: SharedPacing,
}

impl PacingEvent {
    pub(crate) fn new(settings: SharedPacing) -> Self {
        Self { settings }
    }
}

impl<P, S, W> Event<P, S, W> for PacingEvent {
    fn execute(
        &mut self,
        sim: &mut EventLoop<P, S, W>,
        _parameters: &P,
        _statistics: &mut S,
        _randoms: &mut RandomStorage,
    ) -> Result<EventOutcome, SimulationError> {
        let (config, reschedule) = {
            let settings = self.settings.lock();
            (settings.config, settings.reschedule)
        };

        let delay = config.delay();
        if !delay.is_zero() && sim.wait_wall_clock(delay) == WaitOutcome::Interrupted {
            debug!(time = %sim.current_time(), "Pacing delay interrupted");
        }

        if reschedule {
            Ok(EventOutcome::Reschedule(sim.current_time() + config.interval))
        } else {
            Ok(EventOutcome::Completed)
        }
    }

    fn label(&self) -> &str {
        "pacing"
    }

    fn is_auxiliary(&self) -> bool {
        true
    }
}
