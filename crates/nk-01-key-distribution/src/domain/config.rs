//! KDC configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use nk_01_key_distribution::domain::{KdcConfigBuilder, SubscriberKeyPolicy};
//!
//! let config = KdcConfigBuilder::new()
//!     .lcnum(4)
//!     .subscriber_key_policy(SubscriberKeyPolicy::Accumulate)
//!     .build()
//!     .expect("Valid config");
//! ```

use crate::error::KdcError;
use serde::{Deserialize, Serialize};

/// Deepest NAKT tree the KDC will derive. Bounds leaf count to `2^20`.
pub const MAX_LCNUM: i32 = 20;

/// Default NAKT depth.
pub const DEFAULT_LCNUM: i32 = 4;

/// How a subscriber's key record grows across matched topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberKeyPolicy {
    /// Keep only the first non-empty leaf set stored for a subscriber.
    /// Later topics never reach an existing record.
    // TODO: confirm with the protocol owner whether Accumulate should become the default.
    #[default]
    FirstMatch,
    /// Append the leaves of every matched topic, skipping ones already held.
    Accumulate,
}

/// Key Distribution Center configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KdcConfig {
    /// NAKT tree depth (`lcnum`). `<= 0` yields a single root leaf.
    pub lcnum: i32,
    /// Subscriber key-store population rule
    pub subscriber_key_policy: SubscriberKeyPolicy,
}

impl Default for KdcConfig {
    fn default() -> Self {
        Self {
            lcnum: DEFAULT_LCNUM,
            subscriber_key_policy: SubscriberKeyPolicy::FirstMatch,
        }
    }
}

impl KdcConfig {
    /// Validate configuration bounds
    pub fn validate(&self) -> Result<(), KdcError> {
        if self.lcnum > MAX_LCNUM {
            return Err(KdcError::InvalidConfig(format!(
                "lcnum {} exceeds maximum {}",
                self.lcnum, MAX_LCNUM
            )));
        }
        Ok(())
    }

    /// Builder-style method to set tree depth
    pub fn with_lcnum(mut self, lcnum: i32) -> Self {
        self.lcnum = lcnum;
        self
    }

    /// Builder-style method to set the subscriber key policy
    pub fn with_subscriber_key_policy(mut self, policy: SubscriberKeyPolicy) -> Self {
        self.subscriber_key_policy = policy;
        self
    }
}

/// Builder for KdcConfig with validation
#[derive(Default)]
pub struct KdcConfigBuilder {
    lcnum: Option<i32>,
    subscriber_key_policy: Option<SubscriberKeyPolicy>,
}

impl KdcConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set NAKT tree depth
    pub fn lcnum(mut self, lcnum: i32) -> Self {
        self.lcnum = Some(lcnum);
        self
    }

    /// Set subscriber key policy
    pub fn subscriber_key_policy(mut self, policy: SubscriberKeyPolicy) -> Self {
        self.subscriber_key_policy = Some(policy);
        self
    }

    /// Build the KdcConfig, validating all parameters
    pub fn build(self) -> Result<KdcConfig, KdcError> {
        let defaults = KdcConfig::default();

        let config = KdcConfig {
            lcnum: self.lcnum.unwrap_or(defaults.lcnum),
            subscriber_key_policy: self
                .subscriber_key_policy
                .unwrap_or(defaults.subscriber_key_policy),
        };

        config.validate()?;
        Ok(config)
    }
}
