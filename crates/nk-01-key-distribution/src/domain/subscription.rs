//! # Subscriptions
//!
//! Per-subscriber interest declarations and the running set of matched
//! topics. Re-subscribing merges; nothing is ever replaced.
//!
//! A single request carries at most one range per interest dimension. Once
//! stored, the ranges are a set: merging is a union, so a subscriber that
//! re-subscribes may hold more ranges than dimensions. The matcher reads the
//! interest vector as a flag set and never pairs a range with a position.

use shared_types::{AttributeRange, NodeId};
use std::collections::BTreeMap;

use crate::domain::matcher::MatchedTopic;
use crate::error::KdcError;

/// A subscriber's declared interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEntry {
    pub subscriber_id: NodeId,
    /// Index = topic dimension.
    pub interest_vector: Vec<bool>,
    /// Union of every declared numeric range, no duplicates, unordered by
    /// dimension.
    pub attribute_ranges: Vec<AttributeRange>,
}

impl SubscriptionEntry {
    /// Validate and build an entry.
    ///
    /// # Errors
    ///
    /// `KdcError::InvalidSubscription` when the interest vector or the range
    /// list is empty, a range is inverted, or there are more ranges than
    /// interest dimensions.
    pub fn new(
        subscriber_id: NodeId,
        interest_vector: Vec<bool>,
        ranges: &[AttributeRange],
    ) -> Result<Self, KdcError> {
        if interest_vector.is_empty() {
            return Err(KdcError::InvalidSubscription(format!(
                "{subscriber_id}: empty interest vector"
            )));
        }
        if ranges.is_empty() {
            return Err(KdcError::InvalidSubscription(format!(
                "{subscriber_id}: no attribute ranges"
            )));
        }
        if ranges.len() > interest_vector.len() {
            return Err(KdcError::InvalidSubscription(format!(
                "{subscriber_id}: {} ranges for {} interest dimensions",
                ranges.len(),
                interest_vector.len()
            )));
        }
        if let Some(bad) = ranges.iter().find(|r| !r.is_valid()) {
            return Err(KdcError::InvalidSubscription(format!(
                "{subscriber_id}: inverted range [{}, {}]",
                bad.min, bad.max
            )));
        }

        let mut entry = Self {
            subscriber_id,
            interest_vector,
            attribute_ranges: Vec::with_capacity(ranges.len()),
        };
        entry.merge_ranges(ranges);
        Ok(entry)
    }

    /// Add ranges not already present. Returns how many were added.
    pub fn merge_ranges(&mut self, ranges: &[AttributeRange]) -> usize {
        let before = self.attribute_ranges.len();
        for range in ranges {
            if !self.attribute_ranges.contains(range) {
                self.attribute_ranges.push(*range);
            }
        }
        self.attribute_ranges.len() - before
    }

    /// OR `other` into the interest vector, extending it if longer.
    fn merge_interest(&mut self, other: &[bool]) {
        if self.interest_vector.len() < other.len() {
            self.interest_vector.resize(other.len(), false);
        }
        for (mine, theirs) in self.interest_vector.iter_mut().zip(other) {
            *mine |= *theirs;
        }
    }
}

/// All subscriptions known to the KDC.
#[derive(Debug, Default)]
pub struct SubscriptionBook {
    entries: BTreeMap<NodeId, SubscriptionEntry>,
    matched: BTreeMap<NodeId, Vec<MatchedTopic>>,
}

impl SubscriptionBook {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a first subscription or merge into the existing one.
    pub fn upsert(&mut self, incoming: SubscriptionEntry) -> &SubscriptionEntry {
        match self.entries.entry(incoming.subscriber_id.clone()) {
            std::collections::btree_map::Entry::Vacant(slot) => slot.insert(incoming),
            std::collections::btree_map::Entry::Occupied(slot) => {
                let existing = slot.into_mut();
                existing.merge_ranges(&incoming.attribute_ranges);
                existing.merge_interest(&incoming.interest_vector);
                existing
            }
        }
    }

    /// Current subscription of `subscriber_id`.
    pub fn get(&self, subscriber_id: &NodeId) -> Option<&SubscriptionEntry> {
        self.entries.get(subscriber_id)
    }

    /// Add matches to the subscriber's running set. Returns the ones that
    /// were not already present.
    pub fn record_matches(
        &mut self,
        subscriber_id: &NodeId,
        matches: &[MatchedTopic],
    ) -> Vec<MatchedTopic> {
        let running = self.matched.entry(subscriber_id.clone()).or_default();
        let mut added = Vec::new();
        for m in matches {
            if !running.contains(m) {
                running.push(m.clone());
                added.push(m.clone());
            }
        }
        added
    }

    /// Running matched set of `subscriber_id`.
    pub fn matched(&self, subscriber_id: &NodeId) -> &[MatchedTopic] {
        self.matched
            .get(subscriber_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no subscriber is known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
