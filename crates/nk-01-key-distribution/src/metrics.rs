//! Metrics hooks for Key Distribution operations
//!
//! Counters for registrations, subscriptions and key issuance, plus
//! cumulative derivation time.
//!
//! ## Usage
//!
//! ```ignore
//! use nk_01_key_distribution::metrics::{Metrics, MetricsRecorder};
//!
//! let metrics = Metrics::new();
//! metrics.record_registration(RegistrationOutcome::Inserted);
//! let snapshot = metrics.snapshot();
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::domain::RegistrationOutcome;

/// Counters for KDC operations
#[derive(Default)]
pub struct Metrics {
    /// Registrations that stored a new entry
    pub registrations_inserted: AtomicU64,
    /// Registrations absorbed as duplicates
    pub registrations_duplicate: AtomicU64,
    /// Registrations rejected (invalid topic)
    pub registrations_rejected: AtomicU64,
    /// Subscription requests processed
    pub subscriptions_processed: AtomicU64,
    /// Subscription requests rejected
    pub subscriptions_rejected: AtomicU64,
    /// NAKT trees derived
    pub trees_derived: AtomicU64,
    /// Publisher keys stored
    pub publisher_keys_issued: AtomicU64,
    /// Subscriber leaf keys stored
    pub subscriber_leaves_issued: AtomicU64,
    /// Cumulative derivation time in nanoseconds
    pub derivation_time_ns: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registration result
    pub fn record_registration(&self, outcome: RegistrationOutcome) {
        let counter = match outcome {
            RegistrationOutcome::Inserted => &self.registrations_inserted,
            RegistrationOutcome::Duplicate => &self.registrations_duplicate,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected registration
    pub fn record_registration_rejected(&self) {
        self.registrations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a processed (`accepted = true`) or rejected subscription
    pub fn record_subscription(&self, accepted: bool) {
        let counter = if accepted {
            &self.subscriptions_processed
        } else {
            &self.subscriptions_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one tree derivation
    pub fn record_tree_derived(&self, duration: Duration) {
        self.trees_derived.fetch_add(1, Ordering::Relaxed);
        self.derivation_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record stored keys
    pub fn record_keys_issued(&self, publisher_keys: usize, subscriber_leaves: usize) {
        self.publisher_keys_issued
            .fetch_add(publisher_keys as u64, Ordering::Relaxed);
        self.subscriber_leaves_issued
            .fetch_add(subscriber_leaves as u64, Ordering::Relaxed);
    }

    /// Average derivation time in nanoseconds
    pub fn avg_derivation_time_ns(&self) -> u64 {
        let total = self.derivation_time_ns.load(Ordering::Relaxed);
        let count = self.trees_derived.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            registrations_inserted: self.registrations_inserted.load(Ordering::Relaxed),
            registrations_duplicate: self.registrations_duplicate.load(Ordering::Relaxed),
            registrations_rejected: self.registrations_rejected.load(Ordering::Relaxed),
            subscriptions_processed: self.subscriptions_processed.load(Ordering::Relaxed),
            subscriptions_rejected: self.subscriptions_rejected.load(Ordering::Relaxed),
            trees_derived: self.trees_derived.load(Ordering::Relaxed),
            publisher_keys_issued: self.publisher_keys_issued.load(Ordering::Relaxed),
            subscriber_leaves_issued: self.subscriber_leaves_issued.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub registrations_inserted: u64,
    pub registrations_duplicate: u64,
    pub registrations_rejected: u64,
    pub subscriptions_processed: u64,
    pub subscriptions_rejected: u64,
    pub trees_derived: u64,
    pub publisher_keys_issued: u64,
    pub subscriber_leaves_issued: u64,
}

/// Trait for custom metrics recording implementations
pub trait MetricsRecorder: Send + Sync {
    fn record_registration(&self, outcome: RegistrationOutcome);
    fn record_registration_rejected(&self);
    fn record_subscription(&self, accepted: bool);
    fn record_tree_derived(&self, duration: Duration);
    fn record_keys_issued(&self, publisher_keys: usize, subscriber_leaves: usize);
}

/// No-op metrics recorder for when metrics are disabled
#[derive(Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_registration(&self, _: RegistrationOutcome) {}
    fn record_registration_rejected(&self) {}
    fn record_subscription(&self, _: bool) {}
    fn record_tree_derived(&self, _: Duration) {}
    fn record_keys_issued(&self, _: usize, _: usize) {}
}

impl MetricsRecorder for Metrics {
    fn record_registration(&self, outcome: RegistrationOutcome) {
        Metrics::record_registration(self, outcome);
    }

    fn record_registration_rejected(&self) {
        Metrics::record_registration_rejected(self);
    }

    fn record_subscription(&self, accepted: bool) {
        Metrics::record_subscription(self, accepted);
    }

    fn record_tree_derived(&self, duration: Duration) {
        Metrics::record_tree_derived(self, duration);
    }

    fn record_keys_issued(&self, publisher_keys: usize, subscriber_leaves: usize) {
        Metrics::record_keys_issued(self, publisher_keys, subscriber_leaves);
    }
}
