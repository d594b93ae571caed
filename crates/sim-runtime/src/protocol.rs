//! # Control and Data Messages
//!
//! Builders for every message the overlay exchanges, and parsers for the two
//! requests the KDC processes.
//!
//! | Kind | Source → Destination | Topic property | Extra properties |
//! |------|----------------------|----------------|------------------|
//! | `TopicRegistration` | publisher → (broker) → KDC | `Registration` | `origin` |
//! | `SubscriptionRequest` | subscriber → (broker) → KDC | `Subscription` | `origin`, `interest` |
//! | `KeyDelivery` | KDC → (broker) → target | `KeyEncryption` / `KeyAuthentication` | |
//! | `Data` | publisher → interested hosts | `Registration` | `key_path`, `key_fingerprint` |

use shared_crypto::{digest_hex, digest_hex_many, DerivedKey};
use shared_types::{
    AttributeRange, HostProfile, Message, MessageKind, NodeId, PropertyValue, PublisherKeyGrant,
    SimTime, SubscriberKeyGrant, TopicProperty, PROP_INTEREST, PROP_ORIGIN, PROP_TOPIC,
};

use crate::config::Publication;
use crate::error::ProtocolError;

/// Leaf path of the key a data message was sealed with.
pub const PROP_KEY_PATH: &str = "key_path";

/// SHA-256 hex of the sealing key, so receivers can check the key they hold.
pub const PROP_KEY_FINGERPRINT: &str = "key_fingerprint";

const MESSAGE_ID_LEN: usize = 16;

/// Fingerprint of a key as carried in [`PROP_KEY_FINGERPRINT`].
pub fn key_fingerprint(key: &DerivedKey) -> String {
    digest_hex(key.as_bytes())
}

/// Creates messages with deterministic ids.
#[derive(Debug, Default)]
pub struct MessageFactory {
    next_seq: u64,
}

impl MessageFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages created so far.
    pub fn created(&self) -> u64 {
        self.next_seq
    }

    fn new_message(
        &mut self,
        kind: MessageKind,
        source: &NodeId,
        destination: Option<NodeId>,
        now: SimTime,
    ) -> Message {
        let seq = self.next_seq;
        self.next_seq += 1;
        let label = format!("{kind:?}");
        let digest = digest_hex_many(&[
            source.as_str().as_bytes(),
            label.as_bytes(),
            &seq.to_be_bytes(),
        ]);
        Message::new(
            &digest[..MESSAGE_ID_LEN],
            kind,
            source.clone(),
            destination,
            now,
        )
    }

    /// Topic registration of `publication`.
    pub fn registration(&mut self, publication: &Publication, now: SimTime) -> Message {
        self.new_message(
            MessageKind::TopicRegistration,
            &publication.publisher,
            None,
            now,
        )
        .with(
            PROP_TOPIC,
            TopicProperty::registration(
                publication.flag,
                publication.topic_id,
                publication.name.clone(),
            ),
        )
        .with(PROP_ORIGIN, &publication.publisher)
    }

    /// Subscription request built from a subscriber's declared interests.
    pub fn subscription(&mut self, host: &HostProfile, now: SimTime) -> Message {
        self.new_message(MessageKind::SubscriptionRequest, &host.id, None, now)
            .with(
                PROP_TOPIC,
                TopicProperty::subscription(
                    host.id.clone(),
                    &host.own_interest,
                    &host.numeric_attributes,
                ),
            )
            .with(PROP_INTEREST, host.own_interest.clone())
            .with(PROP_ORIGIN, &host.id)
    }

    /// Publisher key delivery.
    pub fn publisher_key(&mut self, kdc: &NodeId, grant: PublisherKeyGrant, now: SimTime) -> Message {
        let target = grant.publisher_id.clone();
        self.new_message(MessageKind::KeyDelivery, kdc, Some(target), now)
            .with(PROP_TOPIC, TopicProperty::KeyEncryption(grant))
    }

    /// Subscriber leaf-key delivery.
    pub fn subscriber_keys(
        &mut self,
        kdc: &NodeId,
        grant: SubscriberKeyGrant,
        now: SimTime,
    ) -> Message {
        let target = grant.subscriber_id.clone();
        self.new_message(MessageKind::KeyDelivery, kdc, Some(target), now)
            .with(PROP_TOPIC, TopicProperty::KeyAuthentication(grant))
    }

    /// Data message sealed with the publisher's key.
    pub fn data(
        &mut self,
        publication: &Publication,
        key: &PublisherKeyGrant,
        now: SimTime,
    ) -> Message {
        self.new_message(MessageKind::Data, &publication.publisher, None, now)
            .with(
                PROP_TOPIC,
                TopicProperty::registration(
                    publication.flag,
                    publication.topic_id,
                    publication.name.clone(),
                ),
            )
            .with(PROP_KEY_PATH, PropertyValue::Text(key.path.clone()))
            .with(
                PROP_KEY_FINGERPRINT,
                PropertyValue::Text(key_fingerprint(&key.key)),
            )
    }
}

/// Parsed topic registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub publisher: NodeId,
    /// `(sub_topic_id, flag)` pairs announced.
    pub topics: Vec<(i64, bool)>,
}

/// Parsed subscription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub subscriber: NodeId,
    pub interest: Vec<bool>,
    pub ranges: Vec<AttributeRange>,
}

fn origin(message: &Message) -> Result<NodeId, ProtocolError> {
    message
        .text(PROP_ORIGIN)
        .map(NodeId::new)
        .ok_or_else(|| ProtocolError::MissingProperty {
            message_id: message.id.clone(),
            key: PROP_ORIGIN,
        })
}

fn topic(message: &Message) -> Result<&TopicProperty, ProtocolError> {
    message.topic().ok_or_else(|| ProtocolError::MissingProperty {
        message_id: message.id.clone(),
        key: PROP_TOPIC,
    })
}

/// Read a topic registration.
pub fn parse_registration(message: &Message) -> Result<RegistrationRequest, ProtocolError> {
    let publisher = origin(message)?;
    match topic(message)? {
        TopicProperty::Registration(map) => Ok(RegistrationRequest {
            publisher,
            topics: map
                .iter()
                .map(|(flag, label)| (label.topic_id, *flag))
                .collect(),
        }),
        other => Err(ProtocolError::UnexpectedTopic {
            message_id: message.id.clone(),
            expected: "registration",
            found: other.kind(),
        }),
    }
}

/// Read a subscription request. Ranges are taken from the origin's entries
/// in positional order.
pub fn parse_subscription(message: &Message) -> Result<SubscriptionRequest, ProtocolError> {
    let subscriber = origin(message)?;
    let interest = message
        .get(PROP_INTEREST)
        .and_then(PropertyValue::as_bool_list)
        .ok_or_else(|| ProtocolError::MissingProperty {
            message_id: message.id.clone(),
            key: PROP_INTEREST,
        })?;

    match topic(message)? {
        TopicProperty::Subscription(map) => {
            let mut ranges: Vec<AttributeRange> = Vec::new();
            for (_, positional) in map.iter().filter(|(k, _)| k.subscriber_id == subscriber) {
                for range in positional.iter().flatten() {
                    if !ranges.contains(range) {
                        ranges.push(*range);
                    }
                }
            }
            Ok(SubscriptionRequest {
                subscriber,
                interest,
                ranges,
            })
        }
        other => Err(ProtocolError::UnexpectedTopic {
            message_id: message.id.clone(),
            expected: "subscription",
            found: other.kind(),
        }),
    }
}

/// `(topic_id, key_path, fingerprint)` of a data message.
pub fn sealed_with(message: &Message) -> Option<(i64, &str, &str)> {
    let topic_id = match message.topic()? {
        TopicProperty::Registration(map) => map.values().next()?.topic_id,
        _ => return None,
    };
    Some((
        topic_id,
        message.text(PROP_KEY_PATH)?,
        message.text(PROP_KEY_FINGERPRINT)?,
    ))
}
