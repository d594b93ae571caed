//! # Error Types
//!
//! Errors raised while validating shared entities.

use thiserror::Error;

use crate::entities::NodeId;

/// Inconsistent host description.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    /// Host id is blank.
    #[error("Host id must not be empty")]
    EmptyId,

    /// Host declares no role at all.
    #[error("Host {host} has no role")]
    NoRoles { host: NodeId },

    /// A numeric attribute range has `min > max`.
    #[error("Host {host} declares inverted range [{min}, {max}]")]
    InvertedRange { host: NodeId, min: i64, max: i64 },

    /// More attribute ranges than interested dimensions.
    #[error("Host {host} declares {ranges} ranges for {dimensions} interested dimensions")]
    AttributeCountMismatch {
        host: NodeId,
        ranges: usize,
        dimensions: usize,
    },
}
