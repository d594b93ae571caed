//! # SHA-256 Digests
//!
//! Non-keyed hashing for auxiliary identifiers. Hex encoded so the values can
//! be logged and used as map keys directly.

use sha2::{Digest, Sha256};

/// SHA-256 of `data`, lowercase hex.
pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// SHA-256 over several inputs fed in order, lowercase hex.
pub fn digest_hex_many(inputs: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    hex::encode(hasher.finalize())
}
