//! # Event Queue
//!
//! Min-heap of future events keyed by `(time, sequence)`.

use shared_types::SimTime;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::clock::SimClock;
use crate::DEFAULT_QUEUE_CAPACITY;

/// Insertion sequence number, unique per queue.
pub type EventId = u64;

/// Scheduling errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    /// The requested time is before the current simulated time.
    #[error("Cannot schedule at {at}: clock is already at {now}")]
    ScheduledInPast { at: SimTime, now: SimTime },
}

/// An event with its due time.
#[derive(Debug, Clone)]
pub struct ScheduledEvent<E> {
    /// Due time.
    pub at: SimTime,
    /// Insertion sequence, breaks ties between equal times.
    pub id: EventId,
    /// Payload.
    pub event: E,
}

impl<E> PartialEq for ScheduledEvent<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl<E> Eq for ScheduledEvent<E> {}

impl<E> PartialOrd for ScheduledEvent<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for ScheduledEvent<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.id).cmp(&(other.at, other.id))
    }
}

/// Deterministic discrete-event queue.
///
/// Owns the [`SimClock`]; popping an event advances the clock to its time.
pub struct EventQueue<E> {
    heap: BinaryHeap<Reverse<ScheduledEvent<E>>>,
    clock: SimClock,
    next_id: EventId,
    events_dispatched: u64,
}

impl<E> EventQueue<E> {
    /// Create an empty queue at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::with_capacity(DEFAULT_QUEUE_CAPACITY),
            clock: SimClock::new(),
            next_id: 0,
            events_dispatched: 0,
        }
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Schedule `event` at absolute time `at`.
    ///
    /// # Errors
    ///
    /// Returns `BusError::ScheduledInPast` if `at` is before the clock.
    pub fn schedule_at(&mut self, at: SimTime, event: E) -> Result<EventId, BusError> {
        let now = self.clock.now();
        if at < now {
            return Err(BusError::ScheduledInPast { at, now });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse(ScheduledEvent { at, id, event }));
        trace!(event_id = id, at = at.ticks(), "Event scheduled");
        Ok(id)
    }

    /// Schedule `event` `delay` ticks after the current time.
    pub fn schedule_after(&mut self, delay: u64, event: E) -> EventId {
        let at = self.clock.now() + delay;
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse(ScheduledEvent { at, id, event }));
        trace!(event_id = id, at = at.ticks(), delay, "Event scheduled");
        id
    }

    /// Time of the next pending event.
    #[must_use]
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|Reverse(e)| e.at)
    }

    /// Pop the next event and advance the clock to its time.
    pub fn pop_next(&mut self) -> Option<ScheduledEvent<E>> {
        let Reverse(next) = self.heap.pop()?;
        if self.clock.advance_to(next.at) {
            debug!(sim_time = next.at.ticks(), "Clock advanced");
        }
        self.events_dispatched += 1;
        Some(next)
    }

    /// Pop the next event only if it is due at or before `end`.
    pub fn pop_until(&mut self, end: SimTime) -> Option<ScheduledEvent<E>> {
        match self.peek_time() {
            Some(at) if at <= end => self.pop_next(),
            _ => None,
        }
    }

    /// Pending event count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Total events popped so far.
    #[must_use]
    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}
