//! Events and event listeners

use super::event_loop::EventLoop;
use crate::core::time::SimTime;
use crate::error::SimulationError;
use crate::rng::RandomStorage;

/// What the loop does with an event after it executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event is done and is dropped
    Completed,
    /// Re-insert the same instance at the given time (subject to the usual
    /// past-time check)
    Reschedule(SimTime),
}

/// A time-stamped unit of model work
///
/// The loop stamps the event with its time when it is scheduled; while
/// `execute` runs, `sim.current_time()` is that time. The loop itself is
/// passed in as context, which is how an event queries time, schedules
/// follow-up work, or reaches the model state `W` through
/// `sim.model_state_mut()`.
///
/// # Example
/// ```
/// use des_kernel::engine::{Event, EventLoop, EventOutcome};
/// use des_kernel::rng::RandomStorage;
/// use des_kernel::stats::BasicStatistics;
/// use des_kernel::SimulationError;
///
/// /// Customer arrival, recurring every `gap` time units
/// struct Arrival {
///     gap: f64,
/// }
///
/// impl Event<(), BasicStatistics> for Arrival {
///     fn execute(
///         &mut self,
///         sim: &mut EventLoop<(), BasicStatistics>,
///         _parameters: &(),
///         statistics: &mut BasicStatistics,
///         _randoms: &mut RandomStorage,
///     ) -> Result<EventOutcome, SimulationError> {
///         statistics.record("arrival_time", sim.current_time().as_f64());
///         Ok(EventOutcome::Reschedule(sim.current_time() + self.gap))
///     }
/// }
/// ```
pub trait Event<P, S, W = ()>: Send {
    /// Run the event. Called exactly once per scheduling.
    fn execute(
        &mut self,
        sim: &mut EventLoop<P, S, W>,
        parameters: &P,
        statistics: &mut S,
        randoms: &mut RandomStorage,
    ) -> Result<EventOutcome, SimulationError>;

    /// Name used by listeners and logs
    fn label(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Bookkeeping events (real-time pacing) do not keep a run alive on
    /// their own: the loop ends once only auxiliary events are pending.
    fn is_auxiliary(&self) -> bool {
        false
    }
}

/// Observer notified after every executed event
///
/// Called on the loop thread, in registration order. The listener may
/// schedule new events through `sim`. Listeners registered from inside a
/// callback are kept; removing listeners from inside a callback has no
/// effect.
pub trait EventListener<P, S, W = ()>: Send {
    fn on_event(&mut self, event: &dyn Event<P, S, W>, sim: &mut EventLoop<P, S, W>);
}
