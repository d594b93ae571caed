//! # Topic Registry
//!
//! KDC-owned table of published topics: sub-topic id → `(flag, publisher)`
//! entries. Insert-only. Registration messages may be duplicated by
//! store-carry-forward delivery, so a second registration of the same
//! `(sub_topic_id, publisher_id)` is absorbed.

use shared_types::NodeId;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::error::KdcError;

/// One registered `(topic, publisher)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    pub sub_topic_id: i64,
    pub flag: bool,
    pub publisher_id: NodeId,
}

/// Result of a registration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new entry was stored.
    Inserted,
    /// The pair was already registered; nothing changed.
    Duplicate,
}

/// Registry of published topics, scanned in ascending id order.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: BTreeMap<i64, Vec<TopicEntry>>,
    entry_count: usize,
}

impl TopicRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `publisher_id` for `sub_topic_id`.
    ///
    /// # Errors
    ///
    /// Returns `KdcError::InvalidTopic` for `sub_topic_id <= 0`.
    pub fn register(
        &mut self,
        sub_topic_id: i64,
        flag: bool,
        publisher_id: &NodeId,
    ) -> Result<RegistrationOutcome, KdcError> {
        if sub_topic_id <= 0 {
            return Err(KdcError::InvalidTopic {
                topic_id: sub_topic_id,
            });
        }

        let entries = self.topics.entry(sub_topic_id).or_default();
        if entries.iter().any(|e| &e.publisher_id == publisher_id) {
            trace!(topic_id = sub_topic_id, publisher_id = %publisher_id, "Duplicate registration absorbed");
            return Ok(RegistrationOutcome::Duplicate);
        }

        entries.push(TopicEntry {
            sub_topic_id,
            flag,
            publisher_id: publisher_id.clone(),
        });
        self.entry_count += 1;
        debug!(topic_id = sub_topic_id, flag, publisher_id = %publisher_id, "Topic registered");
        Ok(RegistrationOutcome::Inserted)
    }

    /// Entries registered for `sub_topic_id`.
    pub fn lookup(&self, sub_topic_id: i64) -> &[TopicEntry] {
        self.topics
            .get(&sub_topic_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All entries, by ascending id then registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TopicEntry> {
        self.topics.values().flatten()
    }

    /// Registered sub-topic ids, ascending.
    pub fn topic_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.topics.keys().copied()
    }

    /// Total entry count.
    pub fn len(&self) -> usize {
        self.entry_count
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}
