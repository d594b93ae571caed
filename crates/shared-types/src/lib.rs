//! # Shared Types Crate
//!
//! Types shared by the KDC, the routing gate and the simulation runtime.
//!
//! ## Design Principles
//!
//! - **Host abstraction**: the core never sees a concrete node, only the
//!   [`Host`] view (role predicates, interest weights and vectors, numeric
//!   attribute ranges).
//! - **Closed topic variant**: a message's topic property is a
//!   [`TopicProperty`], matched exhaustively rather than probed at runtime.
//! - **Merge-on-set**: [`Message::set`] merges collections and pairs scalars.

pub mod entities;
pub mod errors;
pub mod message;
pub mod topic;

pub use entities::*;
pub use errors::*;
pub use message::*;
pub use topic::*;
