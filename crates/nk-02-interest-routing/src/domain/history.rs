//! Connection history shared by the routers of one simulation.

use serde::Serialize;
use shared_types::{NodeId, SimTime};
use std::collections::{BTreeMap, BTreeSet};

/// What is known about one peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeerRecord {
    /// Number of contacts that came up with this peer.
    pub encounters: u64,
    /// Time the most recent contact came up.
    pub last_seen: Option<SimTime>,
    /// Whether a contact is currently up.
    pub connected: bool,
}

/// Contact log and per-peer forwarding record.
#[derive(Debug, Clone, Default)]
pub struct ConnectionHistory {
    peers: BTreeMap<NodeId, PeerRecord>,
    forwarded: BTreeSet<(NodeId, String)>,
}

impl ConnectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A contact with `peer` came up at `now`.
    pub fn record_up(&mut self, peer: &NodeId, now: SimTime) {
        let record = self.peers.entry(peer.clone()).or_default();
        record.encounters += 1;
        record.last_seen = Some(now);
        record.connected = true;
    }

    /// The contact with `peer` went down.
    pub fn record_down(&mut self, peer: &NodeId) {
        if let Some(record) = self.peers.get_mut(peer) {
            record.connected = false;
        }
    }

    /// Remember that `message_id` was handed to `peer`. Returns false if it
    /// already had been.
    pub fn mark_forwarded(&mut self, peer: &NodeId, message_id: &str) -> bool {
        self.forwarded.insert((peer.clone(), message_id.to_string()))
    }

    /// Whether `message_id` was already handed to `peer`.
    pub fn was_forwarded(&self, peer: &NodeId, message_id: &str) -> bool {
        self.forwarded
            .contains(&(peer.clone(), message_id.to_string()))
    }

    pub fn peer(&self, peer: &NodeId) -> Option<&PeerRecord> {
        self.peers.get(peer)
    }

    pub fn is_connected(&self, peer: &NodeId) -> bool {
        self.peers.get(peer).is_some_and(|r| r.connected)
    }

    /// Total contacts seen across all peers.
    pub fn total_encounters(&self) -> u64 {
        self.peers.values().map(|r| r.encounters).sum()
    }

    /// Number of `(peer, message)` hand-overs recorded.
    pub fn forwarded_count(&self) -> usize {
        self.forwarded.len()
    }
}
