//! Key Distribution Service
//!
//! ## Subscription flow
//!
//! ```text
//! subscribe(id, interest, ranges)
//!   │
//!   ├─ validate → SubscriptionEntry
//!   ├─ merge into SubscriptionBook (ranges ∪, interest OR)
//!   ├─ SubscriptionMatcher over the merged entry
//!   ├─ record new matches in the running set
//!   └─ per distinct matched topic (derived once):
//!        ├─ publisher key  = leaf covering the topic id   (insert if absent)
//!        └─ subscriber key = all leaves of the tree       (per policy)
//! ```

use shared_types::{AttributeRange, NodeId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{
    KdcConfig, KdcState, KeyTree, NaktTree, PublisherKeyRecord, RegistrationOutcome,
    SubscriptionEntry, SubscriptionMatcher,
};
use crate::error::KdcError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::{KeyDistributionApi, SubscriptionOutcome};

/// Key Distribution Service implementation
///
/// Stateless apart from configuration; every call works on the
/// [`KdcState`] it is handed.
pub struct KeyDistributionService<M: MetricsRecorder = NoOpMetrics> {
    config: KdcConfig,
    tree: NaktTree,
    metrics: Arc<M>,
}

impl KeyDistributionService<NoOpMetrics> {
    /// Create a service without metrics
    pub fn new(config: KdcConfig) -> Self {
        Self::with_metrics(config, Arc::new(NoOpMetrics))
    }
}

impl<M: MetricsRecorder> KeyDistributionService<M> {
    /// Create a service reporting into `metrics`
    pub fn with_metrics(config: KdcConfig, metrics: Arc<M>) -> Self {
        Self {
            tree: NaktTree::new(config.lcnum),
            config,
            metrics,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &KdcConfig {
        &self.config
    }

    /// Metrics sink
    pub fn metrics(&self) -> &Arc<M> {
        &self.metrics
    }

    fn derive_timed(&self, state: &KdcState, topic_id: i64) -> Result<KeyTree, KdcError> {
        let start = Instant::now();
        let tree = self.tree.derive(state.secret(), topic_id)?;
        self.metrics.record_tree_derived(start.elapsed());
        debug!(topic_id, leaves = tree.len(), "NAKT derived");
        Ok(tree)
    }
}

impl<M: MetricsRecorder> KeyDistributionApi for KeyDistributionService<M> {
    fn register_topic(
        &self,
        state: &mut KdcState,
        sub_topic_id: i64,
        flag: bool,
        publisher_id: &NodeId,
    ) -> Result<RegistrationOutcome, KdcError> {
        match state.registry.register(sub_topic_id, flag, publisher_id) {
            Ok(outcome) => {
                self.metrics.record_registration(outcome);
                Ok(outcome)
            }
            Err(e) => {
                self.metrics.record_registration_rejected();
                warn!(topic_id = sub_topic_id, publisher_id = %publisher_id, error = %e, "Registration rejected");
                Err(e)
            }
        }
    }

    fn subscribe(
        &self,
        state: &mut KdcState,
        subscriber_id: &NodeId,
        interest_vector: &[bool],
        ranges: &[AttributeRange],
    ) -> Result<SubscriptionOutcome, KdcError> {
        let incoming =
            match SubscriptionEntry::new(subscriber_id.clone(), interest_vector.to_vec(), ranges) {
                Ok(entry) => entry,
                Err(e) => {
                    self.metrics.record_subscription(false);
                    warn!(subscriber_id = %subscriber_id, error = %e, "Subscription rejected");
                    return Err(e);
                }
            };

        let merged = state.subscriptions.upsert(incoming).clone();
        let matches = SubscriptionMatcher::match_subscription(&merged, &state.registry);
        let mut outcome = SubscriptionOutcome {
            matched: state.subscriptions.record_matches(subscriber_id, &matches),
            ..Default::default()
        };
        self.metrics.record_subscription(true);

        if matches.is_empty() {
            debug!(subscriber_id = %subscriber_id, ranges = merged.attribute_ranges.len(), "No registered topic matched");
            return Ok(outcome);
        }

        for topic_id in SubscriptionMatcher::distinct_topics(&matches) {
            let tree = self.derive_timed(state, topic_id)?;

            let Some(leaf) = tree.covering(topic_id) else {
                warn!(topic_id, "No leaf covers the topic id");
                continue;
            };
            for m in matches.iter().filter(|m| m.sub_topic_id == topic_id) {
                let record = PublisherKeyRecord {
                    publisher_id: m.publisher_id.clone(),
                    topic_id,
                    path: leaf.path.clone(),
                    key: leaf.key.clone(),
                };
                if state.publisher_keys.insert_if_absent(record.clone()) {
                    info!(publisher_id = %m.publisher_id, topic_id, path = %leaf.path, "Publisher key issued");
                    outcome.publisher_keys.push(record);
                }
            }

            if let Some(grant) = state.subscriber_keys.store(
                subscriber_id,
                topic_id,
                tree.leaves(),
                self.config.subscriber_key_policy,
            ) {
                info!(subscriber_id = %subscriber_id, topic_id, leaves = grant.leaves.len(), "Subscriber keys issued");
                outcome.subscriber_keys.push(grant);
            }
        }

        let leaves: usize = outcome.subscriber_keys.iter().map(|g| g.leaves.len()).sum();
        self.metrics
            .record_keys_issued(outcome.publisher_keys.len(), leaves);
        Ok(outcome)
    }

    fn derive_tree(&self, state: &KdcState, topic_id: i64) -> Result<KeyTree, KdcError> {
        self.derive_timed(state, topic_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SubscriberKeyPolicy;
    use crate::metrics::Metrics;
    use shared_crypto::{child_key, root_key, KdcSecret};
    use std::collections::HashSet;

    fn secret() -> KdcSecret {
        KdcSecret::from_bytes(b"kdc-test-secret".to_vec())
    }

    fn state_with_topics() -> KdcState {
        let mut state = KdcState::new(secret());
        let service = KeyDistributionService::new(KdcConfig::default());
        service
            .register_topic(&mut state, 3, true, &NodeId::new("pubA"))
            .unwrap();
        service
            .register_topic(&mut state, 10, false, &NodeId::new("pubB"))
            .unwrap();
        state
    }

    fn ranges(r: &[(i64, i64)]) -> Vec<AttributeRange> {
        r.iter().copied().map(Into::into).collect()
    }

    #[test]
    fn test_register_twice_yields_one_entry() {
        let mut state = KdcState::new(secret());
        let metrics = Arc::new(Metrics::new());
        let service = KeyDistributionService::with_metrics(KdcConfig::default(), metrics.clone());
        let pub1 = NodeId::new("pub1");

        service.register_topic(&mut state, 5, true, &pub1).unwrap();
        let second = service.register_topic(&mut state, 5, true, &pub1).unwrap();

        assert_eq!(second, RegistrationOutcome::Duplicate);
        assert_eq!(state.registry().lookup(5).len(), 1);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.registrations_inserted, 1);
        assert_eq!(snapshot.registrations_duplicate, 1);
    }

    #[test]
    fn test_register_rejects_invalid_topic() {
        let mut state = KdcState::new(secret());
        let metrics = Arc::new(Metrics::new());
        let service = KeyDistributionService::with_metrics(KdcConfig::default(), metrics.clone());
        assert!(service
            .register_topic(&mut state, 0, true, &NodeId::new("p"))
            .is_err());
        assert_eq!(metrics.snapshot().registrations_rejected, 1);
    }

    #[test]
    fn test_subscribe_matches_and_issues_keys() {
        let mut state = state_with_topics();
        let service = KeyDistributionService::new(KdcConfig::default().with_lcnum(2));
        let sub = NodeId::new("sub1");

        let outcome = service
            .subscribe(&mut state, &sub, &[true], &ranges(&[(1, 5)]))
            .unwrap();

        assert_eq!(outcome.matched.len(), 1);
        assert_eq!(outcome.matched[0].publisher_id, NodeId::new("pubA"));
        assert_eq!(outcome.publisher_keys.len(), 1);
        assert_eq!(outcome.subscriber_keys.len(), 1);
        // topic 3 -> address space [0, 3], depth 2 -> four leaves
        assert_eq!(outcome.subscriber_keys[0].leaves.len(), 4);
        assert!(state.publisher_keys().get(&NodeId::new("pubB")).is_none());
    }

    #[test]
    fn test_publisher_key_is_leaf_covering_topic() {
        let mut state = state_with_topics();
        let service = KeyDistributionService::new(KdcConfig::default().with_lcnum(2));
        let sub = NodeId::new("sub1");
        service
            .subscribe(&mut state, &sub, &[true], &ranges(&[(1, 5)]))
            .unwrap();

        let publisher = state.publisher_keys().get(&NodeId::new("pubA")).unwrap();
        assert_eq!(publisher.path, "11");
        let held = state
            .subscriber_keys()
            .get(&sub)
            .and_then(|r| r.key_for_path(3, &publisher.path))
            .unwrap();
        assert_eq!(held, &publisher.key);
    }

    #[test]
    fn test_resubscribe_is_not_rekeyed() {
        let mut state = state_with_topics();
        let service = KeyDistributionService::new(KdcConfig::default());
        let sub = NodeId::new("sub1");

        service
            .subscribe(&mut state, &sub, &[true], &ranges(&[(1, 5)]))
            .unwrap();
        let before = state.subscriber_keys().get(&sub).unwrap().clone();
        let again = service
            .subscribe(&mut state, &sub, &[true], &ranges(&[(1, 5)]))
            .unwrap();

        assert!(again.matched.is_empty());
        assert!(again.issued_nothing());
        assert_eq!(state.subscriber_keys().get(&sub).unwrap(), &before);
    }

    #[test]
    fn test_overlapping_subscriptions_merge() {
        let mut state = state_with_topics();
        let service = KeyDistributionService::new(KdcConfig::default());
        let sub = NodeId::new("sub1");

        service
            .subscribe(&mut state, &sub, &[true, true], &ranges(&[(1, 5)]))
            .unwrap();
        service
            .subscribe(&mut state, &sub, &[true, true], &ranges(&[(3, 8)]))
            .unwrap();

        let entry = state.subscriptions().get(&sub).unwrap();
        assert_eq!(entry.attribute_ranges, ranges(&[(1, 5), (3, 8)]));
    }

    #[test]
    fn test_first_match_policy_keeps_first_topic_only() {
        let mut state = state_with_topics();
        let service = KeyDistributionService::new(KdcConfig::default());
        let sub = NodeId::new("sub1");

        let outcome = service
            .subscribe(&mut state, &sub, &[true, false], &ranges(&[(1, 5), (8, 12)]))
            .unwrap();

        assert_eq!(outcome.matched.len(), 2);
        assert_eq!(outcome.publisher_keys.len(), 2);
        assert_eq!(outcome.subscriber_keys.len(), 1);
        assert_eq!(state.subscriber_keys().get(&sub).unwrap().topics(), vec![3]);
    }

    #[test]
    fn test_accumulate_policy_stores_every_topic() {
        let mut state = state_with_topics();
        let config = KdcConfig::default().with_subscriber_key_policy(SubscriberKeyPolicy::Accumulate);
        let service = KeyDistributionService::new(config);
        let sub = NodeId::new("sub1");

        service
            .subscribe(&mut state, &sub, &[true, false], &ranges(&[(1, 5), (8, 12)]))
            .unwrap();

        assert_eq!(
            state.subscriber_keys().get(&sub).unwrap().topics(),
            vec![3, 10]
        );
    }

    #[test]
    fn test_invalid_subscription_is_rejected() {
        let mut state = state_with_topics();
        let metrics = Arc::new(Metrics::new());
        let service = KeyDistributionService::with_metrics(KdcConfig::default(), metrics.clone());

        let result = service.subscribe(&mut state, &NodeId::new("s"), &[], &ranges(&[(1, 5)]));
        assert!(matches!(result, Err(KdcError::InvalidSubscription(_))));
        assert!(state.subscriptions().is_empty());
        assert_eq!(metrics.snapshot().subscriptions_rejected, 1);
    }

    #[test]
    fn test_no_interior_key_reaches_a_store() {
        // Topics 9 and 12 both live in [0, 15], so depth 3 is never cut short.
        let mut state = KdcState::new(secret());
        let lcnum = 3;
        let service = KeyDistributionService::new(
            KdcConfig::default()
                .with_lcnum(lcnum)
                .with_subscriber_key_policy(SubscriberKeyPolicy::Accumulate),
        );
        service
            .register_topic(&mut state, 9, true, &NodeId::new("pubA"))
            .unwrap();
        service
            .register_topic(&mut state, 12, false, &NodeId::new("pubB"))
            .unwrap();
        let sub = NodeId::new("sub1");
        let outcome = service
            .subscribe(&mut state, &sub, &[true, false], &ranges(&[(8, 10), (11, 13)]))
            .unwrap();
        assert_eq!(outcome.subscriber_keys.len(), 2);

        // Every key of depth < lcnum on the full tree of each matched topic.
        let mut interior = HashSet::new();
        for topic in [9_i64, 12] {
            let root = root_key(&secret(), topic).unwrap();
            interior.insert(root.clone());
            let mut frontier = vec![(String::new(), root)];
            for _ in 1..lcnum {
                let mut next = Vec::new();
                for (path, key) in &frontier {
                    for bit in ['0', '1'] {
                        let p = format!("{path}{bit}");
                        let k = child_key(key, &p).unwrap();
                        interior.insert(k.clone());
                        next.push((p, k));
                    }
                }
                frontier = next;
            }
        }

        for record in state.subscriber_keys().iter() {
            for entry in &record.entries {
                assert!(!interior.contains(&entry.key), "interior key at {}", entry.path);
            }
        }
        for record in state.publisher_keys().iter() {
            assert!(!interior.contains(&record.key));
        }
    }

    #[test]
    fn test_derive_tree_is_deterministic() {
        let state = KdcState::new(secret());
        let service = KeyDistributionService::new(KdcConfig::default());
        assert_eq!(
            service.derive_tree(&state, 42).unwrap(),
            service.derive_tree(&state, 42).unwrap()
        );
    }
}
