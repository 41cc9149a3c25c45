//! Cross-thread control of a running event loop
//!
//! The loop thread and controlling threads share one [`LoopControl`]: a
//! mutex-guarded state plus a condition variable. The loop checks the paused
//! flag under the same lock it waits on, so a resume can never be missed,
//! and nothing busy-waits.

use super::pacing::PacingConfig;
use crate::error::SimulationError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Pacing change requested from another thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PacingRequest {
    Synchronize(PacingConfig),
    Stop,
}

/// How a wall-clock wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    Elapsed,
    /// Cut short by `interrupt()` or a stop request
    Interrupted,
}

/// Snapshot of the control flags taken at a loop safe point
#[derive(Debug)]
pub(crate) struct Signals {
    pub(crate) stop_requested: bool,
    pub(crate) paused: bool,
    pub(crate) pacing: Option<PacingRequest>,
}

#[derive(Debug, Default)]
struct ControlState {
    paused: bool,
    stop_requested: bool,
    interrupts: u64,
    pacing: Option<PacingRequest>,
}

#[derive(Debug, Default)]
pub(crate) struct LoopControl {
    state: Mutex<ControlState>,
    wakeup: Condvar,
}

impl LoopControl {
    pub(crate) fn set_paused(&self, paused: bool) {
        let mut state = self.state.lock();
        if state.paused != paused {
            state.paused = paused;
            debug!(paused, "Event loop pause toggled");
        }
        drop(state);
        self.wakeup.notify_all();
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub(crate) fn request_stop(&self) {
        self.state.lock().stop_requested = true;
        self.wakeup.notify_all();
    }

    pub(crate) fn clear_stop(&self) {
        self.state.lock().stop_requested = false;
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.state.lock().stop_requested
    }

    pub(crate) fn interrupt(&self) {
        self.state.lock().interrupts += 1;
        self.wakeup.notify_all();
    }

    pub(crate) fn request_pacing(&self, request: PacingRequest) {
        self.state.lock().pacing = Some(request);
    }

    /// Read the flags and take any pending pacing request
    pub(crate) fn poll(&self) -> Signals {
        let mut state = self.state.lock();
        Signals {
            stop_requested: state.stop_requested,
            paused: state.paused,
            pacing: state.pacing.take(),
        }
    }

    /// Block while paused. Returns `false` if a stop request ended the wait.
    pub(crate) fn wait_while_paused(&self) -> bool {
        let mut state = self.state.lock();
        while state.paused && !state.stop_requested {
            self.wakeup.wait(&mut state);
        }
        !state.stop_requested
    }

    /// Wait `delay` of wall-clock time unless interrupted or stopped first
    pub(crate) fn sleep(&self, delay: Duration) -> WaitOutcome {
        let deadline = Instant::now() + delay;
        let mut state = self.state.lock();
        let epoch = state.interrupts;
        loop {
            if state.stop_requested || state.interrupts != epoch {
                return WaitOutcome::Interrupted;
            }
            if self.wakeup.wait_until(&mut state, deadline).timed_out() {
                return WaitOutcome::Elapsed;
            }
        }
    }
}

/// Cloneable handle for controlling an [`EventLoop`](super::EventLoop) from
/// other threads
///
/// # Example
/// ```
/// use des_kernel::engine::{EventLoop, LoopConfig};
/// use des_kernel::stats::BasicStatistics;
///
/// let sim: EventLoop<(), BasicStatistics> = EventLoop::new(LoopConfig::with_horizon(100.0)).unwrap();
/// let handle = sim.handle();
///
/// std::thread::spawn(move || handle.set_paused(true)).join().unwrap();
/// assert!(sim.is_paused());
/// ```
#[derive(Debug, Clone)]
pub struct LoopHandle {
    control: Arc<LoopControl>,
}

impl LoopHandle {
    pub(crate) fn new(control: Arc<LoopControl>) -> Self {
        Self { control }
    }

    /// Pause at the next safe point, or wake a paused loop
    pub fn set_paused(&self, paused: bool) {
        self.control.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Ask the loop to stop at the next event boundary; also wakes a paused loop
    pub fn stop(&self) {
        self.control.request_stop();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.control.is_stop_requested()
    }

    /// Cut short a pacing delay in progress; the loop simply carries on
    pub fn interrupt(&self) {
        self.control.interrupt();
    }

    /// Install or update real-time pacing; applied at the next safe point
    ///
    /// # Errors
    /// `InvalidConfig` if `interval` is not positive and finite
    pub fn synchronize_speed(&self, interval: f64, delay: Duration) -> Result<(), SimulationError> {
        let config = PacingConfig::new(interval, delay);
        config.validate()?;
        self.control.request_pacing(PacingRequest::Synchronize(config));
        Ok(())
    }

    /// Stop real-time pacing; applied at the next safe point
    pub fn stop_speed_synchronization(&self) {
        self.control.request_pacing(PacingRequest::Stop);
    }
}
