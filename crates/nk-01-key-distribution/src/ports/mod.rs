//! Ports Layer
//!
//! Defines the driving port the simulation runtime calls into. The KDC has
//! no driven ports: all state it needs is passed in as [`KdcState`].
//!
//! [`KdcState`]: crate::domain::KdcState

pub mod inbound;

pub use inbound::{KeyDistributionApi, SubscriptionOutcome};
