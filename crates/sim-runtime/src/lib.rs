//! # NAKT Overlay Simulation Runtime
//!
//! Runs the secure publish/subscribe overlay on a simulated delay-tolerant
//! network: hosts meet according to a contact plan, control messages travel
//! through brokers to the KDC, keys travel back, and data is routed by
//! topic interest.
//!
//! ## Modular Structure
//!
//! - `config` - JSON configuration, env overrides and validation
//! - `contacts` - configured plus seeded random contact windows
//! - `protocol` - message builders and request parsers
//! - `node` - per-host buffer, router and received keys
//! - `simulation` - the event loop and handover rules
//! - `report` - serialisable run summary
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, `NK_CONFIG`, or the built-in demo)
//! 2. Apply `NK_*` environment overrides
//! 3. Validate the KDC secret is not the zero default
//! 4. Build hosts and schedule publications, subscriptions and contacts
//! 5. Dispatch events until `end_time`
//! 6. Print the JSON report
//!
//! ## Usage Example
//!
//! ```ignore
//! use sim_runtime::{Simulation, SimulationConfig};
//!
//! let mut simulation = Simulation::new(SimulationConfig::demo())?;
//! let report = simulation.run()?;
//! println!("{}", report.to_json()?);
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod contacts;
pub mod error;
pub mod node;
pub mod protocol;
pub mod report;
pub mod simulation;

pub use config::{
    ConfigError, ContactWindow, Publication, RandomContacts, SimulationConfig, UNSET_SECRET_HEX,
};
pub use error::{ProtocolError, RuntimeError};
pub use node::{DataOutcome, HostNode, HostStats};
pub use report::{HostReport, RunStats, SimulationReport};
pub use simulation::Simulation;
