//! # Shared Crypto - Key Derivation Primitives
//!
//! HMAC-SHA256 chaining used by the Key Distribution Center to build the
//! NAKT (Node-Attribute Key Tree) hierarchy.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `derivation` | HMAC-SHA256, Base64 | Authorization, root and child keys |
//! | `hashing` | SHA-256, hex | Auxiliary identifiers (message ids, fingerprints) |
//!
//! ## Key Chain
//!
//! ```text
//! auth  = HMAC(kdc_secret, str(topic_id))
//! root  = HMAC(auth,       str(topic_id))
//! child = HMAC(parent,     path)          path = "0"/"1" per level
//! ```
//!
//! Every output is a pure function of its inputs. Nothing here holds state
//! beyond the caller-owned [`KdcSecret`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod derivation;
pub mod errors;
pub mod hashing;

// Re-exports
pub use derivation::{authorization_key, child_key, root_key, DerivedKey, KdcSecret};
pub use errors::CryptoError;
pub use hashing::{digest_hex, digest_hex_many};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
