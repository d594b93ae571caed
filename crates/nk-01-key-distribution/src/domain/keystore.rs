//! # Key Stores
//!
//! Publisher-side and subscriber-side key material held by the KDC.
//!
//! ## Rules
//!
//! - A publisher key, once stored, is never overwritten (no silent rotation
//!   mid-session).
//! - Subscriber records are append-only; how they grow across topics is set
//!   by [`SubscriberKeyPolicy`].
//! - Only leaf keys enter either store.

use shared_crypto::DerivedKey;
use shared_types::{LeafGrant, NodeId, PublisherKeyGrant, SubscriberKeyGrant};
use std::collections::BTreeMap;

use crate::domain::config::SubscriberKeyPolicy;
use crate::domain::nakt::LeafKey;

/// Active encryption key of one publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherKeyRecord {
    pub publisher_id: NodeId,
    pub topic_id: i64,
    /// Leaf the key belongs to.
    pub path: String,
    pub key: DerivedKey,
}

impl From<&PublisherKeyRecord> for PublisherKeyGrant {
    fn from(record: &PublisherKeyRecord) -> Self {
        PublisherKeyGrant {
            publisher_id: record.publisher_id.clone(),
            topic_id: record.topic_id,
            path: record.path.clone(),
            key: record.key.clone(),
        }
    }
}

/// Publisher id → key record.
#[derive(Debug, Default)]
pub struct PublisherKeyStore {
    records: BTreeMap<NodeId, PublisherKeyRecord>,
}

impl PublisherKeyStore {
    /// Store `record` unless the publisher already has one. Returns whether it
    /// was stored.
    pub fn insert_if_absent(&mut self, record: PublisherKeyRecord) -> bool {
        if self.records.contains_key(&record.publisher_id) {
            return false;
        }
        self.records.insert(record.publisher_id.clone(), record);
        true
    }

    /// Key record of `publisher_id`.
    pub fn get(&self, publisher_id: &NodeId) -> Option<&PublisherKeyRecord> {
        self.records.get(publisher_id)
    }

    /// All records, by publisher id.
    pub fn iter(&self) -> impl Iterator<Item = &PublisherKeyRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One leaf key held by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberKeyEntry {
    pub topic_id: i64,
    pub path: String,
    pub key: DerivedKey,
}

/// Ordered leaf keys a subscriber is entitled to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberKeyRecord {
    pub subscriber_id: NodeId,
    pub entries: Vec<SubscriberKeyEntry>,
}

impl SubscriberKeyRecord {
    /// Key for leaf `path` of `topic_id`, if held.
    pub fn key_for_path(&self, topic_id: i64, path: &str) -> Option<&DerivedKey> {
        self.entries
            .iter()
            .find(|e| e.topic_id == topic_id && e.path == path)
            .map(|e| &e.key)
    }

    /// Distinct topics this record holds keys for.
    pub fn topics(&self) -> Vec<i64> {
        let mut topics: Vec<i64> = Vec::new();
        for e in &self.entries {
            if !topics.contains(&e.topic_id) {
                topics.push(e.topic_id);
            }
        }
        topics
    }
}

/// Subscriber id → key record.
#[derive(Debug, Default)]
pub struct SubscriberKeyStore {
    records: BTreeMap<NodeId, SubscriberKeyRecord>,
}

impl SubscriberKeyStore {
    /// Store the leaves of `topic_id` for `subscriber_id` under `policy`.
    ///
    /// Returns the grant of newly stored leaves, or `None` if nothing changed.
    pub fn store(
        &mut self,
        subscriber_id: &NodeId,
        topic_id: i64,
        leaves: &[LeafKey],
        policy: SubscriberKeyPolicy,
    ) -> Option<SubscriberKeyGrant> {
        if leaves.is_empty() {
            return None;
        }

        if policy == SubscriberKeyPolicy::FirstMatch && self.records.contains_key(subscriber_id) {
            return None;
        }

        let record = self
            .records
            .entry(subscriber_id.clone())
            .or_insert_with(|| SubscriberKeyRecord {
                subscriber_id: subscriber_id.clone(),
                entries: Vec::new(),
            });

        let mut granted = Vec::new();
        for leaf in leaves {
            if record.key_for_path(topic_id, &leaf.path).is_none() {
                record.entries.push(SubscriberKeyEntry {
                    topic_id,
                    path: leaf.path.clone(),
                    key: leaf.key.clone(),
                });
                granted.push(LeafGrant::from(leaf));
            }
        }

        if granted.is_empty() {
            None
        } else {
            Some(SubscriberKeyGrant {
                subscriber_id: subscriber_id.clone(),
                topic_id,
                leaves: granted,
            })
        }
    }

    /// Key record of `subscriber_id`.
    pub fn get(&self, subscriber_id: &NodeId) -> Option<&SubscriberKeyRecord> {
        self.records.get(subscriber_id)
    }

    /// All records, by subscriber id.
    pub fn iter(&self) -> impl Iterator<Item = &SubscriberKeyRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
