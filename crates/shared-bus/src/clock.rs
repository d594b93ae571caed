//! # Simulated Clock
//!
//! Monotonic time source owned by the event queue.

use shared_types::SimTime;

/// Simulated clock. Only moves forward.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: SimTime,
}

impl SimClock {
    /// Clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Move the clock to `to`. Earlier times are ignored; returns whether the
    /// clock moved.
    pub fn advance_to(&mut self, to: SimTime) -> bool {
        if to > self.now {
            self.now = to;
            true
        } else {
            false
        }
    }
}
