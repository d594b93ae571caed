//! Inbound Ports (Driving Ports)
//!
//! The API the KDC host exposes to control-message processing.

use shared_types::{AttributeRange, NodeId, SubscriberKeyGrant};

use crate::domain::{KdcState, KeyTree, MatchedTopic, PublisherKeyRecord, RegistrationOutcome};
use crate::error::KdcError;

/// Everything a processed subscription request produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionOutcome {
    /// Matches this request added to the subscriber's running set
    pub matched: Vec<MatchedTopic>,
    /// Publisher keys stored by this request (first issue only)
    pub publisher_keys: Vec<PublisherKeyRecord>,
    /// Leaf grants stored for the subscriber by this request
    pub subscriber_keys: Vec<SubscriberKeyGrant>,
}

impl SubscriptionOutcome {
    /// True when the request changed no key store.
    pub fn issued_nothing(&self) -> bool {
        self.publisher_keys.is_empty() && self.subscriber_keys.is_empty()
    }
}

/// Primary Key Distribution API (Driving Port)
pub trait KeyDistributionApi {
    /// Record that `publisher_id` publishes `sub_topic_id` with `flag`.
    ///
    /// Duplicate `(sub_topic_id, publisher_id)` registrations are absorbed
    /// and reported as [`RegistrationOutcome::Duplicate`].
    fn register_topic(
        &self,
        state: &mut KdcState,
        sub_topic_id: i64,
        flag: bool,
        publisher_id: &NodeId,
    ) -> Result<RegistrationOutcome, KdcError>;

    /// Merge a subscription, match it against the registry and issue keys
    /// for every newly matched topic.
    fn subscribe(
        &self,
        state: &mut KdcState,
        subscriber_id: &NodeId,
        interest_vector: &[bool],
        ranges: &[AttributeRange],
    ) -> Result<SubscriptionOutcome, KdcError>;

    /// Derive the leaf keys of `topic_id` under the KDC secret.
    fn derive_tree(&self, state: &KdcState, topic_id: i64) -> Result<KeyTree, KdcError>;
}
