//! # Shared Bus - Deterministic Event Queue
//!
//! Every simulated event, including delayed KDC processing, goes through one
//! queue ordered by simulated time. Nothing in the core sleeps or spawns.
//!
//! ## Ordering
//!
//! ```text
//!   schedule_after(d, e) ──► (now + d, seq) ──► BinaryHeap (min first)
//!                                                    │
//!                               pop_next() ◄─────────┘  advances SimClock
//! ```
//!
//! Events at the same time are delivered in insertion order, so a run is a
//! pure function of its inputs.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod queue;

// Re-export main types
pub use clock::SimClock;
pub use queue::{BusError, EventId, EventQueue, ScheduledEvent};

/// Initial heap capacity for a new queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
