//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
///
/// Any of these aborts a simulation run: key derivation is never retried.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The keyed-hash primitive rejected its key
    #[error("HMAC primitive unavailable: {0}")]
    MacUnavailable(String),

    /// KDC secret could not be decoded
    #[error("Invalid KDC secret: {0}")]
    InvalidSecret(String),

    /// Invalid input for cryptographic operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
