//! # Run Report
//!
//! What a finished run produced, serialisable as JSON for the binary's
//! output.

use nk_01_key_distribution::MetricsSnapshot;
use serde::Serialize;
use shared_types::{HostRole, NodeId};

use crate::node::HostStats;

/// Counters kept by the event loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Contact windows opened.
    pub contacts: u64,
    /// Control messages handed one hop towards the KDC.
    pub control_forwarded: u64,
    /// Control handovers postponed because no broker or KDC was in reach.
    pub control_deferred: u64,
    /// Requests the KDC processed.
    pub kdc_requests_processed: u64,
    /// Requests the KDC rejected.
    pub kdc_requests_rejected: u64,
    /// Requests whose properties could not be read.
    pub malformed_requests: u64,
    /// Key deliveries that reached their target.
    pub key_deliveries: u64,
    /// Data messages created.
    pub data_published: u64,
    /// Scheduled publications dropped because the publisher held no key yet.
    pub data_skipped_no_key: u64,
    /// Data messages consumed by a final recipient.
    pub data_delivered: u64,
    /// Data copies handed to relays.
    pub data_relayed: u64,
}

/// Final state of one host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostReport {
    pub id: NodeId,
    pub roles: Vec<HostRole>,
    /// Messages still buffered at the end.
    pub buffered: usize,
    pub encounters: u64,
    /// Topics the host holds a publisher key for.
    pub publisher_topics: Vec<i64>,
    /// Leaf keys held as a subscriber.
    pub subscriber_keys: usize,
    pub stats: HostStats,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub end_time: u64,
    pub events_dispatched: u64,
    pub messages_created: u64,
    /// Entries in the KDC topic registry.
    pub topics_registered: usize,
    /// Subscribers known to the KDC.
    pub subscribers: usize,
    pub publisher_keys_stored: usize,
    pub subscriber_key_records: usize,
    pub run: RunStats,
    pub kdc: MetricsSnapshot,
    pub hosts: Vec<HostReport>,
}

impl SimulationReport {
    /// Report of host `id`.
    pub fn host(&self, id: &str) -> Option<&HostReport> {
        self.hosts.iter().find(|h| h.id.as_str() == id)
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
