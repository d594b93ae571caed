//! Cross-crate integration flows.

mod key_distribution_flow;
mod routing_flow;
mod simulation_flow;
