//! # Interest Gate
//!
//! Per-contact eligibility checks on a message's topic property.
//!
//! | Check | Reads | Answers |
//! |-------|-------|---------|
//! | `is_final_destination` | `Registration` map, host weights | `Some(bool)`, `None` when undecidable |
//! | `shares_interest` | `Subscription` map, host boolean interest | relay eligibility |
//! | `similarity_score` | topic interest vector, host interest + weights | relay sort key |
//!
//! Malformed or missing properties never raise: they are logged and read as
//! "no opinion".

use shared_types::{Host, Message, TopicProperty};
use tracing::{debug, trace, warn};

/// Stateless topic-interest checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterestGate;

impl InterestGate {
    /// Topic property of `message`, logging when the key holds something
    /// that is not a topic.
    fn topic<'m>(message: &'m Message) -> Option<&'m TopicProperty> {
        let topic = message.topic();
        if topic.is_none() && message.has_topic_key() {
            warn!(message_id = %message.id, "Malformed topic property ignored");
        }
        topic
    }

    /// Whether `host` is an authorized final recipient of `message`.
    ///
    /// `None` when the message carries no publish-time topic map; callers keep
    /// their default routing in that case. Otherwise true when some flagged
    /// topic id indexes a positive interest weight of the host.
    pub fn is_final_destination<H: Host + ?Sized>(&self, message: &Message, host: &H) -> Option<bool> {
        let map = match Self::topic(message)? {
            TopicProperty::Registration(map) => map,
            other => {
                trace!(message_id = %message.id, kind = other.kind(), "No final-destination rule for topic kind");
                return None;
            }
        };

        let weights = host.interest_weights();
        let interested = map
            .iter()
            .filter(|(flag, _)| **flag)
            .filter_map(|(_, label)| usize::try_from(label.topic_id).ok())
            .any(|index| weights.get(index).is_some_and(|w| *w > 0.0));
        Some(interested)
    }

    /// Whether `host` shares any interest dimension with the message's
    /// subscription annotation.
    ///
    /// Position `i` of each declared range list corresponds to position `i` of
    /// the host's boolean interest vector. Lists whose length differs from the
    /// host vector are skipped. A `Registration` annotation shares interest
    /// when a flagged topic id is a dimension the host is interested in.
    pub fn shares_interest<H: Host + ?Sized>(&self, message: &Message, host: &H) -> bool {
        let Some(topic) = Self::topic(message) else {
            return false;
        };
        let own = host.own_interest();

        match topic {
            TopicProperty::Subscription(map) => map.iter().any(|(key, ranges)| {
                if ranges.len() != own.len() {
                    debug!(
                        message_id = %message.id,
                        subscriber_id = %key.subscriber_id,
                        host = %host.id(),
                        ranges = ranges.len(),
                        dimensions = own.len(),
                        "Interest size mismatch, entry skipped"
                    );
                    return false;
                }
                own.iter()
                    .zip(ranges)
                    .any(|(interested, range)| *interested && range.is_some())
            }),
            TopicProperty::Registration(map) => map
                .iter()
                .filter(|(flag, _)| **flag)
                .filter_map(|(_, label)| usize::try_from(label.topic_id).ok())
                .any(|index| own.get(index).copied().unwrap_or(false)),
            TopicProperty::KeyEncryption(_) | TopicProperty::KeyAuthentication(_) => false,
        }
    }

    /// Interest weights of every dimension where the message's topic vector
    /// equals the host's boolean interest.
    ///
    /// Only the common prefix of the two vectors is compared. Dimensions
    /// without a weight contribute nothing.
    pub fn similarity_score<H: Host + ?Sized>(&self, message: &Message, host: &H) -> Vec<f64> {
        let own = host.own_interest();
        let Some(vector) = Self::topic(message).and_then(|topic| topic.interest_vector(own.len()))
        else {
            return Vec::new();
        };
        let weights = host.interest_weights();

        vector
            .iter()
            .zip(own)
            .enumerate()
            .filter(|(_, (theirs, mine))| theirs == mine)
            .filter_map(|(index, _)| weights.get(index).copied())
            .collect()
    }
}
