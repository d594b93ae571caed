//! # Subscription Matcher
//!
//! Scans the topic registry for each declared range.
//!
//! ## Matching rule
//!
//! A registry entry satisfies a range `(min, max)` when
//! `min <= sub_topic_id <= max` and the subscriber's interest vector
//! *contains* the entry's flag anywhere. The first satisfying entry (ascending
//! id, then registration order) settles the range; the scan stops there so
//! one range never causes more than one key issuance.

use shared_types::NodeId;

use crate::domain::registry::{TopicEntry, TopicRegistry};
use crate::domain::subscription::SubscriptionEntry;

/// A `(publisher, topic, flag)` triple a subscription matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchedTopic {
    pub publisher_id: NodeId,
    pub sub_topic_id: i64,
    pub flag: bool,
}

impl From<&TopicEntry> for MatchedTopic {
    fn from(entry: &TopicEntry) -> Self {
        Self {
            publisher_id: entry.publisher_id.clone(),
            sub_topic_id: entry.sub_topic_id,
            flag: entry.flag,
        }
    }
}

/// Range matcher over a [`TopicRegistry`].
pub struct SubscriptionMatcher;

impl SubscriptionMatcher {
    /// Matches for `subscription`, one per satisfied range, without duplicates.
    pub fn match_subscription(
        subscription: &SubscriptionEntry,
        registry: &TopicRegistry,
    ) -> Vec<MatchedTopic> {
        let mut matched: Vec<MatchedTopic> = Vec::new();

        for range in &subscription.attribute_ranges {
            let hit = registry.iter().find(|entry| {
                range.contains(entry.sub_topic_id)
                    && subscription.interest_vector.contains(&entry.flag)
            });

            if let Some(entry) = hit {
                let m = MatchedTopic::from(entry);
                if !matched.contains(&m) {
                    matched.push(m);
                }
            }
        }

        matched
    }

    /// Distinct topic ids of `matches`, first-seen order.
    pub fn distinct_topics(matches: &[MatchedTopic]) -> Vec<i64> {
        let mut topics: Vec<i64> = Vec::new();
        for m in matches {
            if !topics.contains(&m.sub_topic_id) {
                topics.push(m.sub_topic_id);
            }
        }
        topics
    }
}
