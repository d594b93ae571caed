//! # Simulated Host
//!
//! A configured [`HostProfile`] plus everything the host accumulates during
//! a run: its message buffer, its router and the keys delivered to it.

use nk_02_interest_routing::InterestRouter;
use serde::Serialize;
use shared_crypto::DerivedKey;
use shared_types::{
    AttributeRange, Host, HostProfile, HostRole, Message, NodeId, PublisherKeyGrant,
    SubscriberKeyGrant,
};
use std::collections::{BTreeMap, BTreeSet};

use crate::protocol::{key_fingerprint, sealed_with};
use crate::report::HostReport;

/// Per-host counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub keys_received: u64,
    pub data_delivered: u64,
    pub data_decrypted: u64,
    pub data_undecryptable: u64,
}

/// Result of consuming a data message as its final recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOutcome {
    Decrypted,
    Undecryptable,
}

/// One simulated host.
#[derive(Debug)]
pub struct HostNode {
    profile: HostProfile,
    router: InterestRouter,
    buffer: Vec<Message>,
    seen: BTreeSet<String>,
    connected: BTreeMap<usize, u32>,
    publisher_keys: BTreeMap<i64, PublisherKeyGrant>,
    subscriber_keys: BTreeMap<(i64, String), DerivedKey>,
    stats: HostStats,
}

impl HostNode {
    pub fn new(profile: HostProfile, router: InterestRouter) -> Self {
        Self {
            profile,
            router,
            buffer: Vec::new(),
            seen: BTreeSet::new(),
            connected: BTreeMap::new(),
            publisher_keys: BTreeMap::new(),
            subscriber_keys: BTreeMap::new(),
            stats: HostStats::default(),
        }
    }

    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    pub fn router(&self) -> &InterestRouter {
        &self.router
    }

    pub fn stats(&self) -> &HostStats {
        &self.stats
    }

    // ---------------------------------------------------------------------
    // Buffer
    // ---------------------------------------------------------------------

    /// Take custody of `message`. Returns false if this host has already
    /// seen a message with the same id.
    pub fn store(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        self.buffer.push(message);
        true
    }

    /// Mark `message_id` as seen without buffering it.
    pub fn mark_seen(&mut self, message_id: &str) -> bool {
        self.seen.insert(message_id.to_string())
    }

    pub fn has_seen(&self, message_id: &str) -> bool {
        self.seen.contains(message_id)
    }

    pub fn buffer(&self) -> &[Message] {
        &self.buffer
    }

    /// Remove and return the buffered message with `message_id`.
    pub fn release(&mut self, message_id: &str) -> Option<Message> {
        let index = self.buffer.iter().position(|m| m.id == message_id)?;
        Some(self.buffer.remove(index))
    }

    // ---------------------------------------------------------------------
    // Contacts
    // ---------------------------------------------------------------------

    /// Open a contact with `peer`. Overlapping windows stack; returns true
    /// when the link was down before.
    pub fn connect(&mut self, peer: usize) -> bool {
        let open = self.connected.entry(peer).or_insert(0);
        *open += 1;
        *open == 1
    }

    /// Close one contact window with `peer`. Returns true when the link is
    /// now down.
    pub fn disconnect(&mut self, peer: usize) -> bool {
        match self.connected.get_mut(&peer) {
            Some(open) if *open > 1 => {
                *open -= 1;
                false
            }
            Some(_) => {
                self.connected.remove(&peer);
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self, peer: usize) -> bool {
        self.connected.contains_key(&peer)
    }

    /// Indices of currently connected peers, ascending.
    pub fn connected(&self) -> Vec<usize> {
        self.connected.keys().copied().collect()
    }

    // ---------------------------------------------------------------------
    // Keys
    // ---------------------------------------------------------------------

    /// Keep the first key issued for each topic.
    pub fn install_publisher_key(&mut self, grant: PublisherKeyGrant) {
        self.stats.keys_received += 1;
        self.publisher_keys.entry(grant.topic_id).or_insert(grant);
    }

    pub fn install_subscriber_keys(&mut self, grant: SubscriberKeyGrant) {
        self.stats.keys_received += grant.leaves.len() as u64;
        for leaf in grant.leaves {
            self.subscriber_keys
                .entry((grant.topic_id, leaf.path))
                .or_insert(leaf.key);
        }
    }

    pub fn publisher_key(&self, topic_id: i64) -> Option<&PublisherKeyGrant> {
        self.publisher_keys.get(&topic_id)
    }

    /// Number of leaf keys held as a subscriber.
    pub fn subscriber_key_count(&self) -> usize {
        self.subscriber_keys.len()
    }

    /// Final state for the run report.
    pub fn report(&self) -> HostReport {
        let encounters = self.router.history().borrow().total_encounters();
        HostReport {
            id: self.profile.id.clone(),
            roles: self.profile.roles.iter().copied().collect(),
            buffered: self.buffer.len(),
            encounters,
            publisher_topics: self.publisher_keys.keys().copied().collect(),
            subscriber_keys: self.subscriber_keys.len(),
            stats: self.stats.clone(),
        }
    }

    /// Consume `message` as its final recipient.
    pub fn consume_data(&mut self, message: &Message) -> DataOutcome {
        self.stats.data_delivered += 1;
        let readable = sealed_with(message).is_some_and(|(topic_id, path, fingerprint)| {
            self.subscriber_keys
                .get(&(topic_id, path.to_string()))
                .is_some_and(|key| key_fingerprint(key) == fingerprint)
        });
        if readable {
            self.stats.data_decrypted += 1;
            DataOutcome::Decrypted
        } else {
            self.stats.data_undecryptable += 1;
            DataOutcome::Undecryptable
        }
    }
}

impl Host for HostNode {
    fn id(&self) -> &NodeId {
        &self.profile.id
    }

    fn has_role(&self, role: HostRole) -> bool {
        self.profile.has_role(role)
    }

    fn interest_weights(&self) -> &[f64] {
        &self.profile.interest_weights
    }

    fn own_interest(&self) -> &[bool] {
        &self.profile.own_interest
    }

    fn numeric_attributes(&self) -> &[AttributeRange] {
        &self.profile.numeric_attributes
    }
}
