//! Domain Layer - Pure business logic
//!
//! - `InterestGate`: topic-interest checks on one message and one host
//! - `ConnectionHistory`: contact and forwarding log
//! - `RoutingDecision`: what to do with a buffered message on a contact

pub mod gate;
pub mod history;

pub use gate::InterestGate;
pub use history::{ConnectionHistory, PeerRecord};

/// Outcome of routing one buffered message over one contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// The peer is a final recipient: hand the message over.
    Deliver,
    /// The peer shares interest: replicate the message to it.
    Relay,
    /// Keep the message buffered.
    Keep,
}
