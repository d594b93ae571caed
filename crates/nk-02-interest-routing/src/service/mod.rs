//! Service Layer
//!
//! Per-host routing behaviour built on the gate and a shared history.

pub mod interest_router;

pub use interest_router::{InterestRouter, RankedRelay};
