//! Runtime error types.

use nk_01_key_distribution::KdcError;
use shared_bus::BusError;
use thiserror::Error;

use crate::config::ConfigError;

/// A control message that could not be interpreted. Logged and dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message {message_id} has no {key} property")]
    MissingProperty {
        message_id: String,
        key: &'static str,
    },

    #[error("message {message_id} carries a {found} topic, expected {expected}")]
    UnexpectedTopic {
        message_id: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fatal KDC error: {0}")]
    Kdc(#[from] KdcError),

    #[error("Event queue error: {0}")]
    Bus(#[from] BusError),
}
