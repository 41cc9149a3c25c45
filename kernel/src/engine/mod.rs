//! Event-oriented simulation engine
//!
//! - **calendar**: pending events ordered by `(time, submission order)`
//! - **event**: the `Event` and `EventListener` contracts
//! - **event_loop**: time advance, pause and real-time pacing
//! - **control**: cross-thread handle to a running loop
//! - **pacing**: self-rescheduling real-time pacing event
//! - **simulation**: adapter turning an event-driven model into a `Model`

mod calendar;
mod control;
mod event;
mod event_loop;
mod pacing;
mod simulation;

pub use calendar::{EventCalendar, EventKey};
pub use control::LoopHandle;
pub use event::{Event, EventListener, EventOutcome};
pub use event_loop::{EndReason, EventLoop, LoopConfig, LoopOutcome, LoopState};
pub use pacing::PacingConfig;
pub use simulation::{EventDrivenModel, EventSimulation};
