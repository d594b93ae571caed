//! # HMAC Key Derivation
//!
//! Keys in the NAKT hierarchy are Base64-encoded HMAC-SHA256 digests. A child
//! key is keyed by the Base64 text of its parent, so the whole tree can be
//! recomputed from the KDC secret and a topic id alone.
//!
//! ## Security Properties
//!
//! - Knowing a key gives every descendant, never an ancestor or a sibling.
//! - Derivation is deterministic: re-subscribing yields identical keys.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Process-held KDC master secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KdcSecret(Vec<u8>);

impl KdcSecret {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a hex-encoded secret.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidSecret` on malformed hex or empty input.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidSecret(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CryptoError::InvalidSecret("secret is empty".to_string()));
        }
        Ok(Self(bytes))
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True when every byte is zero (an unset secret).
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Debug for KdcSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KdcSecret(<{} bytes>)", self.0.len())
    }
}

/// A Base64-encoded HMAC-SHA256 digest used as key material.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DerivedKey(String);

impl DerivedKey {
    /// Wrap an already encoded key.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Base64 text of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key bytes fed to HMAC when this key is a parent.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "DerivedKey({prefix}..)")
    }
}

fn hmac_base64(key: &[u8], data: &[u8]) -> Result<DerivedKey, CryptoError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| CryptoError::MacUnavailable(e.to_string()))?;
    mac.update(data);
    Ok(DerivedKey(STANDARD.encode(mac.finalize().into_bytes())))
}

/// `HMAC-SHA256(kdc_secret, str(topic_id))`.
///
/// # Errors
///
/// Returns `CryptoError::MacUnavailable` if the HMAC primitive rejects the key.
pub fn authorization_key(secret: &KdcSecret, topic_id: i64) -> Result<DerivedKey, CryptoError> {
    hmac_base64(secret.as_bytes(), topic_id.to_string().as_bytes())
}

/// `HMAC-SHA256(authorization_key(kdc_secret, topic_id), str(topic_id))`.
///
/// # Errors
///
/// Returns `CryptoError::MacUnavailable` if the HMAC primitive rejects the key.
pub fn root_key(secret: &KdcSecret, topic_id: i64) -> Result<DerivedKey, CryptoError> {
    let auth = authorization_key(secret, topic_id)?;
    hmac_base64(auth.as_bytes(), topic_id.to_string().as_bytes())
}

/// `HMAC-SHA256(parent, path)` where `path` is the accumulated binary path.
///
/// # Errors
///
/// Returns `CryptoError::MacUnavailable` if the HMAC primitive rejects the key.
pub fn child_key(parent: &DerivedKey, path: &str) -> Result<DerivedKey, CryptoError> {
    hmac_base64(parent.as_bytes(), path.as_bytes())
}
