//! Service Layer
//!
//! Orchestrates registry, matcher, NAKT derivation and key stores behind the
//! [`KeyDistributionApi`](crate::ports::KeyDistributionApi) port.

pub mod key_distribution_service;

pub use key_distribution_service::KeyDistributionService;
