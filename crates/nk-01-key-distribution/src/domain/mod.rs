//! Domain Layer - Pure business logic
//!
//! This layer contains:
//! - NAKT key-tree derivation
//! - Topic registry
//! - Subscriptions and range matching
//! - Publisher / subscriber key stores
//! - The owned KDC state
//! - Configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code
//! - Pure functions where possible

pub mod config;
pub mod keystore;
pub mod matcher;
pub mod nakt;
pub mod registry;
pub mod state;
pub mod subscription;

pub use config::{KdcConfig, KdcConfigBuilder, SubscriberKeyPolicy, DEFAULT_LCNUM, MAX_LCNUM};
pub use keystore::{
    PublisherKeyRecord, PublisherKeyStore, SubscriberKeyEntry, SubscriberKeyRecord,
    SubscriberKeyStore,
};
pub use matcher::{MatchedTopic, SubscriptionMatcher};
pub use nakt::{address_space_max, KeyTree, LeafKey, NaktTree};
pub use registry::{RegistrationOutcome, TopicEntry, TopicRegistry};
pub use state::KdcState;
pub use subscription::{SubscriptionBook, SubscriptionEntry};
