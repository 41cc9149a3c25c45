//! Event calendar with deterministic ordering

use crate::core::time::SimTime;
use crate::error::CalendarError;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Key for ordering pending events
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (FIFO for events submitted at the same time)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When the event executes
    pub time: SimTime,
    /// Submission order within this calendar
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending events keyed by `(time, sequence)`
///
/// Insert and pop are `O(log n)`. The calendar itself does not police time:
/// [`EventLoop::schedule`](crate::engine::EventLoop::schedule) is what
/// rejects events in the past.
///
/// # Example
/// ```
/// use des_kernel::engine::EventCalendar;
/// use des_kernel::SimTime;
///
/// let mut calendar = EventCalendar::new();
/// calendar.insert(SimTime::new(5.0), "A");
/// calendar.insert(SimTime::new(2.0), "early");
/// calendar.insert(SimTime::new(5.0), "B");
///
/// let order: Vec<_> = std::iter::from_fn(|| calendar.pop_earliest().ok())
///     .map(|(_, event)| event)
///     .collect();
/// assert_eq!(order, vec!["early", "A", "B"]);
/// ```
#[derive(Debug)]
pub struct EventCalendar<E> {
    events: BTreeMap<EventKey, E>,
    next_sequence: u64,
}

impl<E> EventCalendar<E> {
    pub fn new() -> Self {
        Self {
            events: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    /// Insert `event` at `time`, after every event already pending at that time
    pub fn insert(&mut self, time: SimTime, event: E) -> EventKey {
        let key = EventKey {
            time,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.events.insert(key, event);
        key
    }

    /// Remove and return the earliest event
    ///
    /// # Errors
    /// `CalendarError::Empty` when nothing is pending
    pub fn pop_earliest(&mut self) -> Result<(EventKey, E), CalendarError> {
        self.events.pop_first().ok_or(CalendarError::Empty)
    }

    /// Time of the earliest pending event
    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.keys().next().map(|key| key.time)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Drop every pending event and restart sequence numbering
    pub fn clear(&mut self) {
        self.events.clear();
        self.next_sequence = 0;
    }
}

impl<E> Default for EventCalendar<E> {
    fn default() -> Self {
        Self::new()
    }
}
