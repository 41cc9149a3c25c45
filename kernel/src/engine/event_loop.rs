//! Event loop - the simulation engine
//!
//! Drives the event calendar against simulated time.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──run()──▶ Running ──▶ Stopped
//!                  ▲    │
//!        resume    │    ▼  pause (at a safe point)
//!                  Paused
//! ```
//!
//! `reset()` brings a stopped loop back to `Idle` for the next replication.
//!
//! # Iteration
//!
//! ```text
//! while (pending domain work || auxiliary events due now)
//!       && current time < horizon && no stop request:
//! 1. Apply pacing requests from other threads
//! 2. If paused, wait on the control condition until resumed
//! 3. Pop the earliest event and advance time to its stamp
//! 4. Execute it
//! 5. Notify event listeners in registration order
//! 6. Re-insert the event if it asked to be rescheduled
//! ```

use super::calendar::{EventCalendar, EventKey};
use super::control::{LoopControl, LoopHandle, PacingRequest, WaitOutcome};
use super::event::{Event, EventListener, EventOutcome};
use super::pacing::{shared_settings, PacingConfig, PacingEvent, SharedPacing};
use crate::core::listener::{ListenerId, ListenerList};
use crate::core::time::{SimClock, SimTime};
use crate::error::SimulationError;
use crate::rng::RandomStorage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

// ============================================================================
// Configuration Types
// ============================================================================

/// Event loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Runs end once simulated time reaches the horizon
    pub horizon: SimTime,

    /// Real-time pacing installed at the start of every run
    #[serde(default)]
    pub pacing: Option<PacingConfig>,
}

impl LoopConfig {
    pub fn with_horizon(horizon: f64) -> Self {
        Self {
            horizon: SimTime::new(horizon),
            pacing: None,
        }
    }

    pub fn pacing(mut self, interval: f64, delay: Duration) -> Self {
        self.pacing = Some(PacingConfig::new(interval, delay));
        self
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.horizon.is_valid() {
            return Err(SimulationError::InvalidConfig(
                "horizon must not be NaN".to_string(),
            ));
        }
        if let Some(pacing) = &self.pacing {
            pacing.validate()?;
        }
        Ok(())
    }
}

/// Where the loop is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// No domain events left
    CalendarExhausted,
    /// Simulated time reached the horizon
    HorizonReached,
    /// `stop()` was observed at an event boundary
    StopRequested,
}

/// Result of one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopOutcome {
    /// Events executed during the run, pacing firings included
    pub events_executed: u64,
    /// Simulated time when the run ended
    pub final_time: SimTime,
    pub reason: EndReason,
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event-oriented simulation engine
///
/// `P` is the parameter type and `S` the statistics type passed through to
/// every event. `W` is per-replication model state (queue contents, server
/// status) that events reach through [`model_state_mut`](Self::model_state_mut).
///
/// # Example
///
/// ```rust
/// use des_kernel::engine::{EndReason, Event, EventLoop, EventOutcome, LoopConfig};
/// use des_kernel::rng::RandomStorage;
/// use des_kernel::stats::BasicStatistics;
/// use des_kernel::{SimTime, SimulationError};
///
/// struct Tick;
///
/// impl Event<(), BasicStatistics> for Tick {
///     fn execute(
///         &mut self,
///         sim: &mut EventLoop<(), BasicStatistics>,
///         _: &(),
///         stats: &mut BasicStatistics,
///         _: &mut RandomStorage,
///     ) -> Result<EventOutcome, SimulationError> {
///         stats.record("ticks", 1.0);
///         Ok(EventOutcome::Reschedule(sim.current_time() + 1.0))
///     }
/// }
///
/// let mut sim: EventLoop<(), BasicStatistics> =
///     EventLoop::new(LoopConfig::with_horizon(5.0)).unwrap();
/// let mut stats = BasicStatistics::new();
/// let mut randoms = RandomStorage::new();
///
/// sim.schedule(Tick, SimTime::new(1.0)).unwrap();
/// let outcome = sim.run(&(), &mut stats, &mut randoms).unwrap();
///
/// assert_eq!(outcome.reason, EndReason::HorizonReached);
/// assert_eq!(outcome.final_time, SimTime::new(5.0));
/// assert_eq!(stats.accumulator("ticks").unwrap().count(), 5);
/// ```
pub struct EventLoop<P, S, W = ()> {
    clock: SimClock,
    calendar: EventCalendar<Box<dyn Event<P, S, W>>>,
    /// Non-auxiliary events in the calendar
    pending_work: usize,
    state: LoopState,
    control: Arc<LoopControl>,
    listeners: ListenerList<Box<dyn EventListener<P, S, W>>>,
    pacing: Option<SharedPacing>,
    /// Whether a pacing event for `pacing` sits in the calendar
    pacing_armed: bool,
    events_executed: u64,
    model_state: W,
}

impl<P, S, W: Default> EventLoop<P, S, W> {
    /// Create an idle loop at time zero with default model state
    ///
    /// # Errors
    /// `InvalidConfig` for a NaN horizon or invalid pacing
    pub fn new(config: LoopConfig) -> Result<Self, SimulationError> {
        Self::with_state(config, W::default())
    }
}

impl<P, S, W> EventLoop<P, S, W> {
    /// Create an idle loop at time zero carrying `model_state`
    ///
    /// # Errors
    /// `InvalidConfig` for a NaN horizon or invalid pacing
    pub fn with_state(config: LoopConfig, model_state: W) -> Result<Self, SimulationError> {
        config.validate()?;

        Ok(Self {
            clock: SimClock::new(config.horizon),
            calendar: EventCalendar::new(),
            pending_work: 0,
            state: LoopState::Idle,
            control: Arc::new(LoopControl::default()),
            listeners: ListenerList::new(),
            pacing: config.pacing.map(shared_settings),
            pacing_armed: false,
            events_executed: 0,
            model_state,
        })
    }

    /// Run until the calendar has no domain work, the horizon is reached or
    /// a stop is requested
    ///
    /// A stop requested before `run` starts is discarded: stop requests
    /// apply to the run in progress.
    ///
    /// # Errors
    /// Any error returned by an event, or `PastTime` if an event asks to be
    /// rescheduled in the past. The loop is `Stopped` afterwards either way.
    pub fn run(
        &mut self,
        parameters: &P,
        statistics: &mut S,
        randoms: &mut RandomStorage,
    ) -> Result<LoopOutcome, SimulationError> {
        self.control.clear_stop();
        self.state = LoopState::Running;
        debug!(
            time = %self.clock.current_time(),
            horizon = %self.clock.horizon(),
            pending = self.calendar.len(),
            "Event loop started"
        );

        let result = self.run_events(parameters, statistics, randoms);
        self.state = LoopState::Stopped;

        if let Ok(outcome) = &result {
            debug!(
                events = outcome.events_executed,
                time = %outcome.final_time,
                reason = ?outcome.reason,
                "Event loop finished"
            );
        }
        result
    }

    fn run_events(
        &mut self,
        parameters: &P,
        statistics: &mut S,
        randoms: &mut RandomStorage,
    ) -> Result<LoopOutcome, SimulationError> {
        self.arm_pacing()?;
        let mut executed = 0u64;

        let reason = loop {
            let signals = self.control.poll();
            if let Some(request) = signals.pacing {
                self.apply_pacing_request(request)?;
            }
            if signals.stop_requested {
                break EndReason::StopRequested;
            }
            if !self.has_due_work() {
                break EndReason::CalendarExhausted;
            }
            if !self.clock.is_before_horizon() {
                break EndReason::HorizonReached;
            }
            if signals.paused {
                self.state = LoopState::Paused;
                debug!(time = %self.clock.current_time(), "Event loop paused");
                let resumed = self.control.wait_while_paused();
                self.state = LoopState::Running;
                if !resumed {
                    break EndReason::StopRequested;
                }
                debug!(time = %self.clock.current_time(), "Event loop resumed");
                // Re-check every condition after waking up
                continue;
            }

            let (key, mut event) = self.calendar.pop_earliest()?;
            if !event.is_auxiliary() {
                self.pending_work -= 1;
            }
            self.clock.advance_to(key.time);
            trace!(time = %key.time, seq = key.sequence, event = event.label(), "Executing event");

            let outcome = event.execute(self, parameters, statistics, randoms)?;
            executed += 1;
            self.events_executed += 1;
            self.notify_listeners(&*event);

            if let EventOutcome::Reschedule(time) = outcome {
                self.schedule_boxed(event, time)?;
            }
        };

        Ok(LoopOutcome {
            events_executed: executed,
            final_time: self.clock.current_time(),
            reason,
        })
    }

    /// Domain events are pending, or auxiliary events are still due at the
    /// current instant
    ///
    /// Auxiliary events alone never move time forward, but those stamped
    /// with the current time drain before the run ends.
    fn has_due_work(&self) -> bool {
        self.pending_work > 0
            || self
                .calendar
                .peek_time()
                .is_some_and(|time| time <= self.clock.current_time())
    }

    /// Schedule `event` at `time`
    ///
    /// This is the only way to add work to the calendar.
    ///
    /// # Errors
    /// - `PastTime` if `time` is earlier than the current time
    /// - `InvalidTime` if `time` is NaN
    pub fn schedule<E>(&mut self, event: E, time: SimTime) -> Result<EventKey, SimulationError>
    where
        E: Event<P, S, W> + 'static,
    {
        self.schedule_boxed(Box::new(event), time)
    }

    /// Schedule `event` `delay` time units after the current time
    pub fn schedule_in<E>(&mut self, event: E, delay: f64) -> Result<EventKey, SimulationError>
    where
        E: Event<P, S, W> + 'static,
    {
        let time = self.clock.current_time() + delay;
        self.schedule(event, time)
    }

    /// Schedule an already boxed event
    pub fn schedule_boxed(
        &mut self,
        event: Box<dyn Event<P, S, W>>,
        time: SimTime,
    ) -> Result<EventKey, SimulationError> {
        if !time.is_valid() {
            return Err(SimulationError::InvalidTime);
        }
        let current = self.clock.current_time();
        if time < current {
            return Err(SimulationError::PastTime {
                requested: time,
                current,
            });
        }

        if !event.is_auxiliary() {
            self.pending_work += 1;
        }
        Ok(self.calendar.insert(time, event))
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Pause at the next safe point, or wake a paused loop
    pub fn set_paused(&self, paused: bool) {
        self.control.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Stop at the next event boundary
    pub fn stop(&self) {
        self.control.request_stop();
    }

    /// Handle for pausing, stopping or pacing this loop from other threads
    pub fn handle(&self) -> LoopHandle {
        LoopHandle::new(Arc::clone(&self.control))
    }

    /// Install real-time pacing, or update it if already installed
    ///
    /// A new pacing event fires `interval` after the current time.
    ///
    /// # Errors
    /// `InvalidConfig` if `interval` is not positive and finite
    pub fn synchronize_speed(&mut self, interval: f64, delay: Duration) -> Result<(), SimulationError> {
        let config = PacingConfig::new(interval, delay);
        config.validate()?;

        if let Some(settings) = &self.pacing {
            settings.lock().config = config;
            debug!(interval, delay_ms = config.delay_ms, "Pacing updated");
            if self.pacing_armed {
                return Ok(());
            }
        } else {
            self.pacing = Some(shared_settings(config));
            debug!(interval, delay_ms = config.delay_ms, "Pacing installed");
        }
        self.arm_pacing()
    }

    /// Stop real-time pacing
    ///
    /// An already scheduled pacing firing still happens but no longer
    /// reschedules itself.
    pub fn stop_speed_synchronization(&mut self) {
        if let Some(settings) = self.pacing.take() {
            settings.lock().reschedule = false;
            self.pacing_armed = false;
            debug!("Pacing stopped");
        }
    }

    pub fn is_speed_synchronized(&self) -> bool {
        self.pacing.is_some()
    }

    /// Block the loop thread for `delay` of wall-clock time
    ///
    /// Ends early on `LoopHandle::interrupt` or a stop request.
    pub(crate) fn wait_wall_clock(&self, delay: Duration) -> WaitOutcome {
        self.control.sleep(delay)
    }

    fn apply_pacing_request(&mut self, request: PacingRequest) -> Result<(), SimulationError> {
        match request {
            PacingRequest::Synchronize(config) => {
                self.synchronize_speed(config.interval, config.delay())
            }
            PacingRequest::Stop => {
                self.stop_speed_synchronization();
                Ok(())
            }
        }
    }

    fn arm_pacing(&mut self) -> Result<(), SimulationError> {
        if self.pacing_armed {
            return Ok(());
        }
        let Some(settings) = &self.pacing else {
            return Ok(());
        };

        let interval = settings.lock().config.interval;
        let event = PacingEvent::new(Arc::clone(settings));
        let time = self.clock.current_time() + interval;
        self.schedule_boxed(Box::new(event), time)?;
        self.pacing_armed = true;
        Ok(())
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a listener notified after every executed event
    pub fn add_listener<L>(&mut self, listener: L) -> ListenerId
    where
        L: EventListener<P, S, W> + 'static,
    {
        self.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn EventListener<P, S, W>>> {
        self.listeners.remove(id)
    }

    fn notify_listeners(&mut self, event: &dyn Event<P, S, W>) {
        if self.listeners.is_empty() {
            return;
        }
        let mut entries = self.listeners.take_entries();
        for (_, listener) in entries.iter_mut() {
            listener.on_event(event, self);
        }
        self.listeners.restore_entries(entries);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current simulated time; while an event executes this is its stamp
    pub fn current_time(&self) -> SimTime {
        self.clock.current_time()
    }

    pub fn horizon(&self) -> SimTime {
        self.clock.horizon()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Events waiting in the calendar, pacing included
    pub fn pending_events(&self) -> usize {
        self.calendar.len()
    }

    /// Events executed since the loop was created
    pub fn events_executed(&self) -> u64 {
        self.events_executed
    }

    pub fn model_state(&self) -> &W {
        &self.model_state
    }

    pub fn model_state_mut(&mut self) -> &mut W {
        &mut self.model_state
    }

    /// Replace the model state, returning the previous one
    pub fn replace_model_state(&mut self, model_state: W) -> W {
        std::mem::replace(&mut self.model_state, model_state)
    }

    /// Prepare for the next replication
    ///
    /// Clears the calendar and rewinds the clock. Listeners, handles,
    /// model state and pacing settings are kept; pacing is re-armed when the
    /// next run starts.
    pub fn reset(&mut self) {
        self.calendar.clear();
        self.clock.reset();
        self.pending_work = 0;
        self.pacing_armed = false;
        self.state = LoopState::Idle;
    }
}

impl<P, S, W> std::fmt::Debug for EventLoop<P, S, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("clock", &self.clock)
            .field("pending_events", &self.calendar.len())
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("pacing", &self.pacing.is_some())
            .finish()
    }
}
