//! Error types for the Key Distribution subsystem

use shared_crypto::CryptoError;
use shared_types::NodeId;
use thiserror::Error;

/// Errors that can occur in the Key Distribution subsystem
#[derive(Debug, Error)]
pub enum KdcError {
    #[error("Invalid topic id: {topic_id} (must be positive)")]
    InvalidTopic { topic_id: i64 },

    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    #[error("Key derivation failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("No broker reachable from {node}")]
    NoAvailableBroker { node: NodeId },

    #[error("No KDC reachable from {node}")]
    NoAvailableKdc { node: NodeId },

    #[error("Invalid KDC configuration: {0}")]
    InvalidConfig(String),
}

impl KdcError {
    /// Recoverable errors leave the control message buffered for the next
    /// contact. Everything else is either a rejected input or fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KdcError::NoAvailableBroker { .. } | KdcError::NoAvailableKdc { .. }
        )
    }

    /// Crypto failures abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KdcError::Crypto(_))
    }
}
