//! Event loop integration tests
//!
//! Covers time advance, tie-breaking, past-time rejection, listeners,
//! termination conditions and the interplay with real-time pacing events.

use des_kernel::engine::{
    EndReason, Event, EventListener, EventLoop, EventOutcome, LoopConfig, LoopState,
};
use des_kernel::rng::RandomStorage;
use des_kernel::stats::BasicStatistics;
use des_kernel::{SimTime, SimulationError};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

type Sim = EventLoop<(), BasicStatistics>;
type Trace = Arc<Mutex<Vec<(String, f64)>>>;

fn new_loop(horizon: f64) -> Sim {
    EventLoop::new(LoopConfig::with_horizon(horizon)).unwrap()
}

fn new_trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

fn run(sim: &mut Sim) -> des_kernel::LoopOutcome {
    sim.run(&(), &mut BasicStatistics::new(), &mut RandomStorage::new())
        .unwrap()
}

fn labels(trace: &Trace) -> Vec<(String, f64)> {
    trace.lock().clone()
}

/// Writes its name and the time it ran at into a shared trace
struct Mark {
    name: &'static str,
    trace: Trace,
}

impl Mark {
    fn new(name: &'static str, trace: &Trace) -> Self {
        Self {
            name,
            trace: Arc::clone(trace),
        }
    }
}

impl Event<(), BasicStatistics> for Mark {
    fn execute(
        &mut self,
        sim: &mut Sim,
        _parameters: &(),
        statistics: &mut BasicStatistics,
        _randoms: &mut RandomStorage,
    ) -> Result<EventOutcome, SimulationError> {
        let now = sim.current_time().as_f64();
        self.trace.lock().push((self.name.to_string(), now));
        statistics.record("executed_at", now);
        Ok(EventOutcome::Completed)
    }

    fn label(&self) -> &str {
        self.name
    }
}

/// Listener recording every executed event with the time it saw
struct Recorder {
    trace: Trace,
}

impl EventListener<(), BasicStatistics> for Recorder {
    fn on_event(&mut self, event: &dyn Event<(), BasicStatistics>, sim: &mut Sim) {
        self.trace
            .lock()
            .push((event.label().to_string(), sim.current_time().as_f64()));
    }
}

// ============================================================================
// Scheduling and ordering
// ============================================================================

#[test]
fn test_empty_calendar_ends_immediately() {
    let mut sim = new_loop(100.0);
    let outcome = run(&mut sim);

    assert_eq!(outcome.reason, EndReason::CalendarExhausted);
    assert_eq!(outcome.events_executed, 0);
    assert_eq!(outcome.final_time, SimTime::ZERO);
    assert_eq!(sim.state(), LoopState::Stopped);
}

#[test]
fn test_events_execute_in_time_order() {
    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.schedule(Mark::new("c", &trace), SimTime::new(3.0)).unwrap();
    sim.schedule(Mark::new("a", &trace), SimTime::new(1.0)).unwrap();
    sim.schedule(Mark::new("b", &trace), SimTime::new(2.0)).unwrap();

    let outcome = run(&mut sim);

    assert_eq!(
        labels(&trace),
        vec![
            ("a".to_string(), 1.0),
            ("b".to_string(), 2.0),
            ("c".to_string(), 3.0)
        ]
    );
    assert_eq!(outcome.final_time, SimTime::new(3.0));
    assert_eq!(outcome.reason, EndReason::CalendarExhausted);
}

#[test]
fn test_equal_time_events_run_in_submission_order() {
    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.schedule(Mark::new("x", &trace), SimTime::new(4.0)).unwrap();
    sim.schedule(Mark::new("y", &trace), SimTime::new(4.0)).unwrap();
    sim.schedule(Mark::new("before", &trace), SimTime::new(1.0)).unwrap();
    sim.schedule(Mark::new("z", &trace), SimTime::new(4.0)).unwrap();

    run(&mut sim);

    let order: Vec<String> = labels(&trace).into_iter().map(|(name, _)| name).collect();
    assert_eq!(order, vec!["before", "x", "y", "z"]);
}

#[test]
fn test_schedule_in_is_relative_to_current_time() {
    struct Chain {
        remaining: u32,
        trace: Trace,
    }

    impl Event<(), BasicStatistics> for Chain {
        fn execute(
            &mut self,
            sim: &mut Sim,
            _parameters: &(),
            _statistics: &mut BasicStatistics,
            _randoms: &mut RandomStorage,
        ) -> Result<EventOutcome, SimulationError> {
            self.trace
                .lock()
                .push(("chain".to_string(), sim.current_time().as_f64()));
            if self.remaining > 0 {
                sim.schedule_in(
                    Chain {
                        remaining: self.remaining - 1,
                        trace: Arc::clone(&self.trace),
                    },
                    0.5,
                )?;
            }
            Ok(EventOutcome::Completed)
        }
    }

    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.schedule(
        Chain {
            remaining: 3,
            trace: Arc::clone(&trace),
        },
        SimTime::new(1.0),
    )
    .unwrap();

    run(&mut sim);

    let times: Vec<f64> = labels(&trace).into_iter().map(|(_, t)| t).collect();
    assert_eq!(times, vec![1.0, 1.5, 2.0, 2.5]);
}

#[test]
fn test_reschedule_outcome_reinserts_event() {
    struct Ticker {
        fired: Arc<Mutex<u32>>,
    }

    impl Event<(), BasicStatistics> for Ticker {
        fn execute(
            &mut self,
            sim: &mut Sim,
            _parameters: &(),
            _statistics: &mut BasicStatistics,
            _randoms: &mut RandomStorage,
        ) -> Result<EventOutcome, SimulationError> {
            *self.fired.lock() += 1;
            Ok(EventOutcome::Reschedule(sim.current_time() + 2.0))
        }
    }

    let fired = Arc::new(Mutex::new(0));
    let mut sim = new_loop(9.0);
    sim.schedule(
        Ticker {
            fired: Arc::clone(&fired),
        },
        SimTime::new(1.0),
    )
    .unwrap();

    let outcome = run(&mut sim);

    // 1, 3, 5, 7, 9; the horizon check happens before the next pop
    assert_eq!(*fired.lock(), 5);
    assert_eq!(outcome.final_time, SimTime::new(9.0));
    assert_eq!(outcome.reason, EndReason::HorizonReached);
    assert_eq!(sim.pending_events(), 1);
}

// ============================================================================
// Past-time rejection
// ============================================================================

/// Tries to schedule into the past and records whether it was refused
struct PastProbe {
    refusals: Arc<Mutex<Vec<bool>>>,
    trace: Trace,
}

impl Event<(), BasicStatistics> for PastProbe {
    fn execute(
        &mut self,
        sim: &mut Sim,
        _parameters: &(),
        _statistics: &mut BasicStatistics,
        _randoms: &mut RandomStorage,
    ) -> Result<EventOutcome, SimulationError> {
        let past = SimTime::new(sim.current_time().as_f64() - 0.25);
        let result = sim.schedule(Mark::new("never", &self.trace), past);
        self.refusals
            .lock()
            .push(matches!(result, Err(SimulationError::PastTime { .. })));
        Ok(EventOutcome::Completed)
    }
}

#[test]
fn test_past_time_rejected_at_every_reachable_time() {
    let refusals = Arc::new(Mutex::new(Vec::new()));
    let trace = new_trace();
    let mut sim = new_loop(100.0);
    for t in [0.0, 0.5, 3.0, 3.0, 42.0] {
        sim.schedule(
            PastProbe {
                refusals: Arc::clone(&refusals),
                trace: Arc::clone(&trace),
            },
            SimTime::new(t),
        )
        .unwrap();
    }

    let outcome = run(&mut sim);

    assert_eq!(*refusals.lock(), vec![true; 5]);
    assert!(trace.lock().is_empty());
    assert_eq!(outcome.events_executed, 5);
}

#[test]
fn test_past_time_rejected_after_run() {
    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.schedule(Mark::new("a", &trace), SimTime::new(3.0)).unwrap();
    run(&mut sim);

    match sim.schedule(Mark::new("late", &trace), SimTime::new(2.0)) {
        Err(SimulationError::PastTime { requested, current }) => {
            assert_eq!(requested, SimTime::new(2.0));
            assert_eq!(current, SimTime::new(3.0));
        }
        other => panic!("expected PastTime, got {:?}", other.map(|_| ())),
    }
    assert_eq!(sim.pending_events(), 0);

    // Scheduling exactly at the current time is allowed
    assert!(sim.schedule(Mark::new("now", &trace), SimTime::new(3.0)).is_ok());
}

#[test]
fn test_reschedule_into_past_fails_run() {
    struct Backwards;

    impl Event<(), BasicStatistics> for Backwards {
        fn execute(
            &mut self,
            sim: &mut Sim,
            _parameters: &(),
            _statistics: &mut BasicStatistics,
            _randoms: &mut RandomStorage,
        ) -> Result<EventOutcome, SimulationError> {
            Ok(EventOutcome::Reschedule(SimTime::new(
                sim.current_time().as_f64() - 1.0,
            )))
        }
    }

    let mut sim = new_loop(100.0);
    sim.schedule(Backwards, SimTime::new(5.0)).unwrap();

    let result = sim.run(&(), &mut BasicStatistics::new(), &mut RandomStorage::new());
    assert!(matches!(result, Err(SimulationError::PastTime { .. })));
    assert_eq!(sim.state(), LoopState::Stopped);
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn test_event_crossing_horizon_still_executes() {
    let trace = new_trace();
    let mut sim = new_loop(10.0);
    sim.schedule(Mark::new("inside", &trace), SimTime::new(1.0)).unwrap();
    sim.schedule(Mark::new("crossing", &trace), SimTime::new(12.0)).unwrap();
    sim.schedule(Mark::new("beyond", &trace), SimTime::new(15.0)).unwrap();

    let outcome = run(&mut sim);

    let order: Vec<String> = labels(&trace).into_iter().map(|(name, _)| name).collect();
    assert_eq!(order, vec!["inside", "crossing"]);
    assert_eq!(outcome.reason, EndReason::HorizonReached);
    assert_eq!(outcome.final_time, SimTime::new(12.0));
    assert_eq!(sim.pending_events(), 1);
}

#[test]
fn test_stop_from_event_ends_run_at_boundary() {
    struct Stopper;

    impl Event<(), BasicStatistics> for Stopper {
        fn execute(
            &mut self,
            sim: &mut Sim,
            _parameters: &(),
            _statistics: &mut BasicStatistics,
            _randoms: &mut RandomStorage,
        ) -> Result<EventOutcome, SimulationError> {
            sim.stop();
            Ok(EventOutcome::Completed)
        }
    }

    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.schedule(Mark::new("a", &trace), SimTime::new(1.0)).unwrap();
    sim.schedule(Stopper, SimTime::new(2.0)).unwrap();
    sim.schedule(Mark::new("b", &trace), SimTime::new(2.0)).unwrap();
    sim.schedule(Mark::new("c", &trace), SimTime::new(3.0)).unwrap();

    let outcome = run(&mut sim);

    assert_eq!(outcome.reason, EndReason::StopRequested);
    assert_eq!(outcome.events_executed, 2);
    assert_eq!(outcome.final_time, SimTime::new(2.0));
    assert_eq!(labels(&trace), vec![("a".to_string(), 1.0)]);
    assert_eq!(sim.pending_events(), 2);
}

#[test]
fn test_stop_before_run_is_discarded() {
    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.schedule(Mark::new("a", &trace), SimTime::new(1.0)).unwrap();
    sim.stop();

    let outcome = run(&mut sim);

    assert_eq!(outcome.reason, EndReason::CalendarExhausted);
    assert_eq!(outcome.events_executed, 1);
}

#[test]
fn test_event_error_propagates() {
    struct Failing;

    impl Event<(), BasicStatistics> for Failing {
        fn execute(
            &mut self,
            _sim: &mut Sim,
            _parameters: &(),
            _statistics: &mut BasicStatistics,
            _randoms: &mut RandomStorage,
        ) -> Result<EventOutcome, SimulationError> {
            Err(SimulationError::Model("queue overflow".to_string()))
        }
    }

    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.schedule(Failing, SimTime::new(1.0)).unwrap();
    sim.schedule(Mark::new("after", &trace), SimTime::new(2.0)).unwrap();

    let result = sim.run(&(), &mut BasicStatistics::new(), &mut RandomStorage::new());

    match result {
        Err(SimulationError::Model(message)) => assert_eq!(message, "queue overflow"),
        other => panic!("expected model error, got {:?}", other),
    }
    assert!(trace.lock().is_empty());
    assert_eq!(sim.current_time(), SimTime::new(1.0));
}

#[test]
fn test_reset_prepares_next_replication() {
    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.schedule(Mark::new("a", &trace), SimTime::new(5.0)).unwrap();
    sim.schedule(Mark::new("b", &trace), SimTime::new(500.0)).unwrap();
    sim.schedule(Mark::new("c", &trace), SimTime::new(600.0)).unwrap();
    run(&mut sim);
    assert_eq!(sim.pending_events(), 1);

    sim.reset();

    assert_eq!(sim.state(), LoopState::Idle);
    assert_eq!(sim.current_time(), SimTime::ZERO);
    assert_eq!(sim.pending_events(), 0);
    sim.schedule(Mark::new("again", &trace), SimTime::new(1.0)).unwrap();
    assert_eq!(run(&mut sim).final_time, SimTime::new(1.0));
}

// ============================================================================
// Listeners
// ============================================================================

/// Tags each notification with the listener's name
struct Tagger {
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl EventListener<(), BasicStatistics> for Tagger {
    fn on_event(&mut self, event: &dyn Event<(), BasicStatistics>, _sim: &mut Sim) {
        self.log.lock().push(format!("{}:{}", self.tag, event.label()));
    }
}

#[test]
fn test_listeners_notified_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.add_listener(Tagger {
        tag: "first",
        log: Arc::clone(&log),
    });
    sim.add_listener(Tagger {
        tag: "second",
        log: Arc::clone(&log),
    });
    sim.schedule(Mark::new("a", &trace), SimTime::new(1.0)).unwrap();
    sim.schedule(Mark::new("b", &trace), SimTime::new(2.0)).unwrap();

    run(&mut sim);

    assert_eq!(
        *log.lock(),
        vec!["first:a", "second:a", "first:b", "second:b"]
    );
}

#[test]
fn test_removed_listener_is_not_notified() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let trace = new_trace();
    let mut sim = new_loop(100.0);
    let first = sim.add_listener(Tagger {
        tag: "first",
        log: Arc::clone(&log),
    });
    sim.add_listener(Tagger {
        tag: "second",
        log: Arc::clone(&log),
    });

    assert!(sim.remove_listener(first).is_some());
    assert!(sim.remove_listener(first).is_none());

    sim.schedule(Mark::new("a", &trace), SimTime::new(1.0)).unwrap();
    run(&mut sim);

    assert_eq!(*log.lock(), vec!["second:a"]);
}

#[test]
fn test_listener_sees_time_of_executed_event() {
    let trace = new_trace();
    let seen = new_trace();
    let mut sim = new_loop(100.0);
    sim.add_listener(Recorder {
        trace: Arc::clone(&seen),
    });
    for t in [0.5, 2.0, 2.0, 7.25] {
        sim.schedule(Mark::new("m", &trace), SimTime::new(t)).unwrap();
    }

    run(&mut sim);

    // Listener observations mirror what the events saw while executing
    assert_eq!(labels(&seen), labels(&trace));
}

#[test]
fn test_listener_can_schedule_follow_up_events() {
    struct FollowUp {
        scheduled: bool,
        trace: Trace,
    }

    impl EventListener<(), BasicStatistics> for FollowUp {
        fn on_event(&mut self, _event: &dyn Event<(), BasicStatistics>, sim: &mut Sim) {
            if !self.scheduled {
                self.scheduled = true;
                sim.schedule_in(Mark::new("follow-up", &self.trace), 1.0)
                    .unwrap();
            }
        }
    }

    let trace = new_trace();
    let mut sim = new_loop(100.0);
    sim.add_listener(FollowUp {
        scheduled: false,
        trace: Arc::clone(&trace),
    });
    sim.schedule(Mark::new("origin", &trace), SimTime::new(2.0)).unwrap();

    let outcome = run(&mut sim);

    assert_eq!(
        labels(&trace),
        vec![("origin".to_string(), 2.0), ("follow-up".to_string(), 3.0)]
    );
    assert_eq!(outcome.events_executed, 2);
}

// ============================================================================
// Model state
// ============================================================================

#[test]
fn test_events_share_model_state() {
    struct Arrive;

    impl Event<(), BasicStatistics, Vec<f64>> for Arrive {
        fn execute(
            &mut self,
            sim: &mut EventLoop<(), BasicStatistics, Vec<f64>>,
            _parameters: &(),
            _statistics: &mut BasicStatistics,
            _randoms: &mut RandomStorage,
        ) -> Result<EventOutcome, SimulationError> {
            let now = sim.current_time().as_f64();
            sim.model_state_mut().push(now);
            Ok(EventOutcome::Completed)
        }
    }

    let mut sim: EventLoop<(), BasicStatistics, Vec<f64>> =
        EventLoop::new(LoopConfig::with_horizon(100.0)).unwrap();
    sim.schedule(Arrive, SimTime::new(1.0)).unwrap();
    sim.schedule(Arrive, SimTime::new(4.0)).unwrap();

    sim.run(&(), &mut BasicStatistics::new(), &mut RandomStorage::new())
        .unwrap();

    assert_eq!(sim.model_state(), &vec![1.0, 4.0]);
    let previous = sim.replace_model_state(Vec::new());
    assert_eq!(previous.len(), 2);
    assert!(sim.model_state().is_empty());
}

// ============================================================================
// Pacing interplay
// ============================================================================

#[test]
fn test_pacing_fires_alongside_domain_events() {
    let trace = new_trace();
    let seen = new_trace();
    let mut sim = new_loop(10.0);
    sim.add_listener(Recorder {
        trace: Arc::clone(&seen),
    });
    sim.synchronize_speed(1.0, Duration::ZERO).unwrap();
    sim.schedule(Mark::new("early", &trace), SimTime::new(2.0)).unwrap();
    sim.schedule(Mark::new("A", &trace), SimTime::new(5.0)).unwrap();
    sim.schedule(Mark::new("B", &trace), SimTime::new(5.0)).unwrap();

    let outcome = run(&mut sim);

    let expected: Vec<(String, f64)> = [
        ("pacing", 1.0),
        ("early", 2.0),
        ("pacing", 2.0),
        ("pacing", 3.0),
        ("pacing", 4.0),
        ("A", 5.0),
        ("B", 5.0),
        ("pacing", 5.0),
    ]
    .into_iter()
    .map(|(name, t)| (name.to_string(), t))
    .collect();
    assert_eq!(labels(&seen), expected);

    // Only pacing was left, which does not keep the run alive
    assert_eq!(outcome.reason, EndReason::CalendarExhausted);
    assert_eq!(outcome.final_time, SimTime::new(5.0));
    assert_eq!(outcome.events_executed, 8);
}

#[test]
fn test_pacing_armed_after_domain_events_still_fires_at_last_instant() {
    let trace = new_trace();
    let seen = new_trace();
    let mut sim = new_loop(10.0);
    sim.add_listener(Recorder {
        trace: Arc::clone(&seen),
    });
    sim.schedule(Mark::new("A", &trace), SimTime::new(3.0)).unwrap();
    sim.schedule(Mark::new("B", &trace), SimTime::new(3.0)).unwrap();
    sim.synchronize_speed(3.0, Duration::ZERO).unwrap();

    let outcome = run(&mut sim);

    let expected: Vec<(String, f64)> = [("A", 3.0), ("B", 3.0), ("pacing", 3.0)]
        .into_iter()
        .map(|(name, t)| (name.to_string(), t))
        .collect();
    assert_eq!(labels(&seen), expected);
    assert_eq!(outcome.reason, EndReason::CalendarExhausted);
    assert_eq!(outcome.final_time, SimTime::new(3.0));
    assert_eq!(outcome.events_executed, 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_time_never_decreases(times in prop::collection::vec(0.0f64..1_000.0, 1..100)) {
        let trace = new_trace();
        let seen = new_trace();
        let mut sim = new_loop(f64::INFINITY);
        sim.add_listener(Recorder { trace: Arc::clone(&seen) });
        for t in &times {
            sim.schedule(Mark::new("m", &trace), SimTime::new(*t)).unwrap();
        }

        let outcome = run(&mut sim);

        let observed: Vec<f64> = labels(&seen).into_iter().map(|(_, t)| t).collect();
        prop_assert_eq!(observed.len(), times.len());
        for pair in observed.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }

        let mut sorted = times.clone();
        sorted.sort_by(f64::total_cmp);
        prop_assert_eq!(&observed, &sorted);
        prop_assert_eq!(outcome.final_time.as_f64(), *sorted.last().unwrap());
    }
}
