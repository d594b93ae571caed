//! # Topic Annotations
//!
//! The topic property a message carries, as a closed variant. Each protocol
//! phase has its own shape, and consumers match on it exhaustively.
//!
//! | Variant | Phase | Shape |
//! |---------|-------|-------|
//! | `Registration` | publish | `flag -> (topic_id, name)` |
//! | `Subscription` | subscribe | `(subscriber, flag) -> [Option<range>]` (positional) |
//! | `KeyEncryption` | KDC → publisher | one publisher key |
//! | `KeyAuthentication` | KDC → subscriber | leaf keys for one topic |

use shared_crypto::DerivedKey;
use std::collections::BTreeMap;

use crate::entities::{AttributeRange, NodeId};

/// Topic id and human-readable name announced by a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLabel {
    /// Numeric sub-topic id.
    pub topic_id: i64,
    /// Display name.
    pub name: String,
}

/// Key of a subscription annotation entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionKey {
    /// Subscribing host.
    pub subscriber_id: NodeId,
    /// Boolean topic flag the ranges apply to.
    pub flag: bool,
}

/// Encryption key handed to a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherKeyGrant {
    pub publisher_id: NodeId,
    pub topic_id: i64,
    /// Leaf path the key belongs to.
    pub path: String,
    pub key: DerivedKey,
}

/// One leaf of a topic's key tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafGrant {
    pub path: String,
    pub key: DerivedKey,
}

/// Leaf keys handed to a subscriber for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberKeyGrant {
    pub subscriber_id: NodeId,
    pub topic_id: i64,
    pub leaves: Vec<LeafGrant>,
}

/// Topic property of an in-flight message.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicProperty {
    /// Publish-time annotation.
    Registration(BTreeMap<bool, TopicLabel>),
    /// Subscription-time annotation. Index `i` of each list is interest dimension `i`.
    Subscription(BTreeMap<SubscriptionKey, Vec<Option<AttributeRange>>>),
    /// Publisher key delivery.
    KeyEncryption(PublisherKeyGrant),
    /// Subscriber key delivery.
    KeyAuthentication(SubscriberKeyGrant),
}

impl TopicProperty {
    /// Single-entry publish annotation.
    pub fn registration(flag: bool, topic_id: i64, name: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            flag,
            TopicLabel {
                topic_id,
                name: name.into(),
            },
        );
        TopicProperty::Registration(map)
    }

    /// Subscription annotation built from a host's interest vector and ranges.
    ///
    /// Ranges are laid out positionally: the `n`-th declared range fills the
    /// `n`-th interested dimension. Dimensions without interest stay `None`.
    /// A validated [`HostProfile`](crate::HostProfile) never declares more
    /// ranges than interested dimensions.
    pub fn subscription(
        subscriber_id: NodeId,
        interest: &[bool],
        ranges: &[AttributeRange],
    ) -> Self {
        let mut remaining = ranges.iter();
        let positional = interest
            .iter()
            .map(|interested| {
                if *interested {
                    remaining.next().copied()
                } else {
                    None
                }
            })
            .collect();

        let mut map = BTreeMap::new();
        map.insert(
            SubscriptionKey {
                subscriber_id,
                flag: true,
            },
            positional,
        );
        TopicProperty::Subscription(map)
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            TopicProperty::Registration(_) => "registration",
            TopicProperty::Subscription(_) => "subscription",
            TopicProperty::KeyEncryption(_) => "key_encryption",
            TopicProperty::KeyAuthentication(_) => "key_authentication",
        }
    }

    /// Merge `other` into `self` in place.
    ///
    /// Collections of the same variant merge. Anything else is handed back
    /// unchanged in `Err` so the caller can decide how to keep both.
    pub fn merge(&mut self, other: TopicProperty) -> Result<(), TopicProperty> {
        match (self, other) {
            (TopicProperty::Registration(mine), TopicProperty::Registration(theirs)) => {
                mine.extend(theirs);
                Ok(())
            }
            (TopicProperty::Subscription(mine), TopicProperty::Subscription(theirs)) => {
                for (key, ranges) in theirs {
                    let slot = mine.entry(key).or_default();
                    if slot.len() < ranges.len() {
                        slot.resize(ranges.len(), None);
                    }
                    for (existing, incoming) in slot.iter_mut().zip(ranges) {
                        if existing.is_none() {
                            *existing = incoming;
                        }
                    }
                }
                Ok(())
            }
            (TopicProperty::KeyAuthentication(mine), TopicProperty::KeyAuthentication(theirs))
                if mine.subscriber_id == theirs.subscriber_id
                    && mine.topic_id == theirs.topic_id =>
            {
                for leaf in theirs.leaves {
                    if !mine.leaves.iter().any(|l| l.path == leaf.path) {
                        mine.leaves.push(leaf);
                    }
                }
                Ok(())
            }
            (_, other) => Err(other),
        }
    }

    /// Boolean interest vector implied by the annotation, cut to its first
    /// `limit` dimensions.
    ///
    /// - `Registration`: position `topic_id` carries the flag
    /// - `Subscription`: position `i` is true when any entry has a range there
    /// - key deliveries carry no interest vector
    ///
    /// The vector never grows past `limit`, whatever the topic ids.
    pub fn interest_vector(&self, limit: usize) -> Option<Vec<bool>> {
        match self {
            TopicProperty::Registration(map) => {
                let highest = map
                    .values()
                    .map(|label| label.topic_id)
                    .filter(|id| *id >= 0)
                    .max()?;
                let len =
                    usize::try_from(highest).map_or(limit, |h| h.saturating_add(1).min(limit));
                let mut vector = vec![false; len];
                for (flag, label) in map {
                    let slot = usize::try_from(label.topic_id)
                        .ok()
                        .and_then(|index| vector.get_mut(index));
                    if let Some(slot) = slot {
                        *slot |= *flag;
                    }
                }
                Some(vector)
            }
            TopicProperty::Subscription(map) => {
                let len = map.values().map(Vec::len).max()?.min(limit);
                let mut vector = vec![false; len];
                for ranges in map.values() {
                    for (slot, range) in vector.iter_mut().zip(ranges) {
                        *slot |= range.is_some();
                    }
                }
                Some(vector)
            }
            TopicProperty::KeyEncryption(_) | TopicProperty::KeyAuthentication(_) => None,
        }
    }
}
