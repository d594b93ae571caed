//! # NK-02 Interest Routing
//!
//! Routing-layer gate of the secure pub/sub overlay: decides, on every
//! contact, whether a peer is an authorized final recipient of a message, an
//! eligible relay, or neither.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`)
//!   - `InterestGate`: `is_final_destination`, `shares_interest`,
//!     `similarity_score`
//!   - `ConnectionHistory`: contacts and hand-overs per peer
//! - **Service Layer** (`service/`)
//!   - `InterestRouter`: per-host behaviour over a shared history, with an
//!     explicit `snapshot()` deep copy
//!
//! The gate owns nothing and never fails: malformed topic properties are
//! logged at `warn` and read as "no opinion".
//!
//! ## Usage Example
//!
//! ```ignore
//! use nk_02_interest_routing::{InterestRouter, RoutingDecision};
//!
//! let prototype = InterestRouter::new();
//! let router = prototype.snapshot();
//! match router.decide(&message, &peer) {
//!     RoutingDecision::Deliver => { /* hand over */ }
//!     RoutingDecision::Relay => { /* replicate */ }
//!     RoutingDecision::Keep => {}
//! }
//! ```

pub mod domain;
pub mod service;

pub use domain::{ConnectionHistory, InterestGate, PeerRecord, RoutingDecision};
pub use service::{InterestRouter, RankedRelay};
