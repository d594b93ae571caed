//! # Simulation Configuration
//!
//! One JSON document describes a run: the KDC parameters, the hosts, what
//! publishers publish and when hosts meet.
//!
//! ## Security Requirements
//!
//! - `kdc_secret` MUST NOT be the all-zero default
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `NK_KDC_SECRET` | `kdc_secret` (hex) |
//! | `NK_LCNUM` | `lcnum` |
//! | `NK_SEED` | `seed` |
//! | `NK_END_TIME` | `end_time` |

use nk_01_key_distribution::{KdcConfig, KdcError, SubscriberKeyPolicy};
use serde::{Deserialize, Serialize};
use shared_crypto::{CryptoError, KdcSecret};
use shared_types::{AttributeRange, HostError, HostProfile, HostRole, NodeId};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Hex of a 32-byte zero secret. Rejected by [`SimulationConfig::validate`].
pub const UNSET_SECRET_HEX: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "SECURITY VIOLATION: KDC secret is the default zero value. \
         Set NK_KDC_SECRET or provide kdc_secret in the config file."
    )]
    InsecureKdcSecret,

    #[error("Invalid KDC secret: {0}")]
    InvalidKdcSecret(#[from] CryptoError),

    #[error("Invalid KDC configuration: {0}")]
    Kdc(#[from] KdcError),

    #[error("end_time must be positive")]
    NonPositiveEndTime,

    #[error("Invalid host: {0}")]
    InvalidHost(#[from] HostError),

    #[error("Duplicate host id: {0}")]
    DuplicateHost(NodeId),

    #[error("No host has the KDC role")]
    NoKdc,

    #[error("{context} names unknown host {host}")]
    UnknownHost { context: &'static str, host: NodeId },

    #[error("{context}: {reason}")]
    InvalidEntry { context: &'static str, reason: String },

    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A topic a publisher announces, and how often it publishes on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    /// Publishing host.
    pub publisher: NodeId,
    /// Numeric sub-topic id (`> 0`).
    pub topic_id: i64,
    /// Boolean category flag.
    #[serde(default = "default_flag")]
    pub flag: bool,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Time the registration is created.
    #[serde(default)]
    pub at: u64,
    /// Data messages to publish after registering.
    #[serde(default)]
    pub messages: u32,
    /// Ticks between data messages.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_flag() -> bool {
    true
}

fn default_interval() -> u64 {
    10
}

/// A scheduled contact between two hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactWindow {
    /// Start time.
    pub at: u64,
    /// Length in ticks. Zero is an instantaneous exchange.
    #[serde(default)]
    pub duration: u64,
    pub a: NodeId,
    pub b: NodeId,
}

/// Seeded random contacts added on top of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomContacts {
    /// Number of contacts to generate.
    pub count: usize,
    /// Longest generated contact.
    #[serde(default = "default_max_duration")]
    pub max_duration: u64,
}

fn default_max_duration() -> u64 {
    5
}

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Hex-encoded KDC master secret.
    pub kdc_secret: String,
    /// NAKT depth.
    pub lcnum: i32,
    /// Subscriber key-store population rule.
    pub subscriber_key_policy: SubscriberKeyPolicy,
    /// Ticks between the KDC receiving a control message and processing it.
    pub kdc_processing_delay: u64,
    /// Last simulated tick.
    pub end_time: u64,
    /// Seed for random contacts.
    pub seed: u64,
    /// Time subscribers issue their subscription requests.
    pub subscribe_at: u64,
    /// Relay copies made per message per contact.
    pub relay_fanout: usize,
    pub random_contacts: Option<RandomContacts>,
    pub hosts: Vec<HostProfile>,
    pub publications: Vec<Publication>,
    pub contacts: Vec<ContactWindow>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            kdc_secret: UNSET_SECRET_HEX.to_string(), // MUST be overridden
            lcnum: nk_01_key_distribution::domain::DEFAULT_LCNUM,
            subscriber_key_policy: SubscriberKeyPolicy::default(),
            kdc_processing_delay: 5,
            end_time: 1_000,
            seed: 0,
            subscribe_at: 0,
            relay_fanout: 2,
            random_contacts: None,
            hosts: Vec::new(),
            publications: Vec::new(),
            contacts: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Small built-in scenario: one publisher, one broker, one KDC and two
    /// subscribers meeting on a fixed plan.
    pub fn demo() -> Self {
        let host = |id: &str, role: HostRole| HostProfile::new(id, [role]);
        Self {
            // Demo-only secret. Real runs set NK_KDC_SECRET.
            kdc_secret: "6e616b742d6f7665726c61792d64656d6f2d736563726574".to_string(),
            end_time: 200,
            hosts: vec![
                host("pub1", HostRole::Publisher),
                host("broker1", HostRole::Broker),
                host("kdc", HostRole::Kdc),
                host("sub1", HostRole::Subscriber)
                    .with_own_interest(vec![true, false, false])
                    .with_interest_weights(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.9])
                    .with_numeric_attributes(vec![AttributeRange::new(1, 8)]),
                host("sub2", HostRole::Subscriber)
                    .with_own_interest(vec![true])
                    .with_interest_weights(vec![0.0, 0.4])
                    .with_numeric_attributes(vec![AttributeRange::new(20, 30)]),
            ],
            publications: vec![Publication {
                publisher: NodeId::new("pub1"),
                topic_id: 5,
                flag: true,
                name: "telemetry".to_string(),
                at: 0,
                messages: 3,
                interval: 20,
            }],
            contacts: [
                (2, "pub1", "broker1"),
                (4, "sub1", "broker1"),
                (6, "sub2", "broker1"),
                (10, "broker1", "kdc"),
                (30, "broker1", "kdc"),
                (40, "broker1", "pub1"),
                (45, "broker1", "sub1"),
                (50, "broker1", "sub2"),
                (70, "pub1", "sub1"),
                (90, "pub1", "sub2"),
                (95, "sub2", "sub1"),
            ]
            .into_iter()
            .map(|(at, a, b)| ContactWindow {
                at,
                duration: 2,
                a: NodeId::new(a),
                b: NodeId::new(b),
            })
            .collect(),
            ..Self::default()
        }
    }

    /// Apply `NK_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an explicit variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("NK_KDC_SECRET") {
            KdcSecret::from_hex(&secret)?;
            self.kdc_secret = secret;
        }
        if let Some(value) = lookup("NK_LCNUM") {
            self.lcnum = parse_env("NK_LCNUM", &value)?;
        }
        if let Some(value) = lookup("NK_SEED") {
            self.seed = parse_env("NK_SEED", &value)?;
        }
        if let Some(value) = lookup("NK_END_TIME") {
            self.end_time = parse_env("NK_END_TIME", &value)?;
        }
        Ok(())
    }

    /// Decoded KDC secret.
    pub fn secret(&self) -> Result<KdcSecret, ConfigError> {
        let secret = KdcSecret::from_hex(&self.kdc_secret)?;
        if secret.is_zero() {
            return Err(ConfigError::InsecureKdcSecret);
        }
        Ok(secret)
    }

    /// KDC subsystem configuration.
    pub fn kdc_config(&self) -> KdcConfig {
        KdcConfig::default()
            .with_lcnum(self.lcnum)
            .with_subscriber_key_policy(self.subscriber_key_policy)
    }

    /// Validate the whole configuration.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the KDC secret is malformed or the zero default
    /// - `lcnum` exceeds the supported depth
    /// - `end_time` is zero
    /// - a host is inconsistent or listed twice, or no host is a KDC
    /// - a publication or contact names an unknown host or is malformed
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.secret()?;
        self.kdc_config().validate()?;
        if self.end_time == 0 {
            return Err(ConfigError::NonPositiveEndTime);
        }

        let mut ids = BTreeSet::new();
        for host in &self.hosts {
            host.validate()?;
            if !ids.insert(&host.id) {
                return Err(ConfigError::DuplicateHost(host.id.clone()));
            }
        }
        if !self.hosts.iter().any(|h| h.roles.contains(&HostRole::Kdc)) {
            return Err(ConfigError::NoKdc);
        }

        for publication in &self.publications {
            if !ids.contains(&publication.publisher) {
                return Err(ConfigError::UnknownHost {
                    context: "publication",
                    host: publication.publisher.clone(),
                });
            }
            if publication.topic_id <= 0 {
                return Err(ConfigError::InvalidEntry {
                    context: "publication",
                    reason: format!("topic id {} must be positive", publication.topic_id),
                });
            }
        }

        for contact in &self.contacts {
            for end in [&contact.a, &contact.b] {
                if !ids.contains(end) {
                    return Err(ConfigError::UnknownHost {
                        context: "contact",
                        host: end.clone(),
                    });
                }
            }
            if contact.a == contact.b {
                return Err(ConfigError::InvalidEntry {
                    context: "contact",
                    reason: format!("{} cannot meet itself", contact.a),
                });
            }
        }

        if let Some(random) = &self.random_contacts {
            if random.count > 0 && self.hosts.len() < 2 {
                return Err(ConfigError::InvalidEntry {
                    context: "random_contacts",
                    reason: "need at least two hosts".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nk_01_key_distribution::domain::MAX_LCNUM;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_demo_is_valid() {
        assert!(SimulationConfig::demo().validate().is_ok());
    }

    #[test]
    fn test_default_secret_is_rejected() {
        let config = SimulationConfig {
            kdc_secret: UNSET_SECRET_HEX.to_string(),
            ..SimulationConfig::demo()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InsecureKdcSecret)
        ));
    }

    #[test]
    fn test_malformed_secret_is_rejected() {
        let config = SimulationConfig {
            kdc_secret: "not-hex".to_string(),
            ..SimulationConfig::demo()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidKdcSecret(_))
        ));
    }

    #[test]
    fn test_zero_end_time_is_rejected() {
        let config = SimulationConfig {
            end_time: 0,
            ..SimulationConfig::demo()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveEndTime)
        ));
    }

    #[test]
    fn test_too_deep_tree_is_rejected() {
        let config = SimulationConfig {
            lcnum: MAX_LCNUM + 1,
            ..SimulationConfig::demo()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Kdc(_))));
    }

    #[test]
    fn test_unknown_contact_host_is_rejected() {
        let mut config = SimulationConfig::demo();
        config.contacts.push(ContactWindow {
            at: 1,
            duration: 0,
            a: NodeId::new("pub1"),
            b: NodeId::new("ghost"),
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownHost { context: "contact", .. })
        ));
    }

    #[test]
    fn test_missing_kdc_is_rejected() {
        let mut config = SimulationConfig::demo();
        config.hosts.retain(|h| !h.roles.contains(&HostRole::Kdc));
        config.contacts.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoKdc)));
    }

    #[test]
    fn test_inconsistent_host_is_rejected() {
        let mut config = SimulationConfig::demo();
        config.hosts[3].numeric_attributes.push(AttributeRange::new(9, 1));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_range_without_interested_dimension_is_rejected() {
        // sub1 is interested in one of three dimensions.
        let mut config = SimulationConfig::demo();
        config.hosts[3].numeric_attributes.push(AttributeRange::new(10, 12));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHost(HostError::AttributeCountMismatch {
                ranges: 2,
                dimensions: 1,
                ..
            }))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SimulationConfig::demo();
        config
            .apply_overrides(lookup(&[
                ("NK_KDC_SECRET", "abcdef"),
                ("NK_LCNUM", "7"),
                ("NK_SEED", "42"),
                ("NK_END_TIME", "900"),
            ]))
            .unwrap();
        assert_eq!(config.kdc_secret, "abcdef");
        assert_eq!(config.lcnum, 7);
        assert_eq!(config.seed, 42);
        assert_eq!(config.end_time, 900);
    }

    #[test]
    fn test_bad_env_override_is_reported() {
        let mut config = SimulationConfig::demo();
        let result = config.apply_overrides(lookup(&[("NK_LCNUM", "deep")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { var: "NK_LCNUM", .. })
        ));
    }

    #[test]
    fn test_json_uses_defaults_for_missing_fields() {
        let config = SimulationConfig::from_json(
            r#"{
                "kdc_secret": "0badc0de",
                "hosts": [{ "id": "kdc", "roles": ["kdc"] }],
                "subscriber_key_policy": "accumulate"
            }"#,
        )
        .unwrap();
        assert_eq!(config.lcnum, nk_01_key_distribution::domain::DEFAULT_LCNUM);
        assert_eq!(config.subscriber_key_policy, SubscriberKeyPolicy::Accumulate);
        assert!(config.validate().is_ok());
    }
}
