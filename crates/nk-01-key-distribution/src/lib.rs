//! # NK-01 Key Distribution
//!
//! Key Distribution Center (KDC) of the secure pub/sub overlay: topic
//! registration, subscription matching and NAKT hierarchical key derivation.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure business logic, no I/O
//!   - `NaktTree`: Binary HMAC key tree over a topic's address space
//!   - `TopicRegistry`: Insert-only `(sub_topic_id, flag, publisher)` table
//!   - `SubscriptionMatcher`: First-match range scan over the registry
//!   - `PublisherKeyStore` / `SubscriberKeyStore`: Issued leaf keys
//!   - `KdcState`: Explicitly owned state, one per simulation
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `KeyDistributionApi`: Driving port (inbound API)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `KeyDistributionService`: Implements `KeyDistributionApi`
//!
//! ## Invariants
//!
//! - At most one registry entry per `(sub_topic_id, publisher_id)`.
//! - Same `(secret, topic_id, lcnum)` always derives the same leaves.
//! - Leaves partition `[0, address_max]`.
//! - Only leaf keys are stored or handed out; interior keys never leave the
//!   derivation.
//! - A publisher key is never overwritten once issued.
//!
//! ## Usage Example
//!
//! ```ignore
//! use nk_01_key_distribution::{KdcConfig, KdcState, KeyDistributionApi, KeyDistributionService};
//! use shared_crypto::KdcSecret;
//!
//! let mut state = KdcState::new(KdcSecret::from_hex("0badc0de")?);
//! let service = KeyDistributionService::new(KdcConfig::default());
//!
//! service.register_topic(&mut state, 3, true, &"pubA".into())?;
//! let outcome = service.subscribe(&mut state, &"sub1".into(), &[true], &[(1, 5).into()])?;
//! assert_eq!(outcome.matched.len(), 1);
//! ```

pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use domain::{
    KdcConfig, KdcConfigBuilder, KdcState, KeyTree, LeafKey, MatchedTopic, NaktTree,
    PublisherKeyRecord, RegistrationOutcome, SubscriberKeyPolicy, SubscriberKeyRecord,
    SubscriptionEntry, TopicEntry,
};
pub use error::KdcError;
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use ports::{KeyDistributionApi, SubscriptionOutcome};
pub use service::KeyDistributionService;
