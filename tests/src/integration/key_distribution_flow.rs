//! # Key Distribution Flow
//!
//! Drives the KDC service the way the runtime does (register, then
//! subscribe) and checks every issued key against an independent HMAC chain
//! computed with `shared-crypto` alone.
//!
//! ## Flow Tested:
//!
//! 1. Publishers register topics; duplicates are absorbed
//! 2. A subscription matches by range and flag membership
//! 3. Publisher key = leaf covering the topic id; the subscriber holds it
//! 4. No interior tree key reaches either key store

#[cfg(test)]
mod tests {
    use nk_01_key_distribution::{
        KdcConfig, KdcState, KeyDistributionApi, KeyDistributionService, Metrics,
        SubscriberKeyPolicy,
    };
    use proptest::prelude::*;
    use shared_crypto::{child_key, root_key, DerivedKey, KdcSecret};
    use shared_types::{AttributeRange, NodeId};
    use std::sync::Arc;

    fn secret() -> KdcSecret {
        KdcSecret::from_bytes(b"integration-kdc-secret".to_vec())
    }

    /// Every key of the full tree for `topic_id` at `depth`, interior keys
    /// included, keyed by path.
    fn all_tree_keys(topic_id: i64, depth: usize) -> Vec<(String, DerivedKey)> {
        let root = root_key(&secret(), topic_id).unwrap();
        let mut keys = vec![(String::new(), root)];
        let mut frontier = vec![keys[0].clone()];
        for _ in 0..depth {
            let mut next = Vec::new();
            for (path, key) in &frontier {
                for bit in ['0', '1'] {
                    let child_path = format!("{path}{bit}");
                    let child = child_key(key, &child_path).unwrap();
                    next.push((child_path, child));
                }
            }
            keys.extend(next.iter().cloned());
            frontier = next;
        }
        keys
    }

    fn service(lcnum: i32, policy: SubscriberKeyPolicy) -> KeyDistributionService<Metrics> {
        let config = KdcConfig::default()
            .with_lcnum(lcnum)
            .with_subscriber_key_policy(policy);
        KeyDistributionService::with_metrics(config, Arc::new(Metrics::new()))
    }

    #[test]
    fn test_issued_keys_match_independent_hmac_chain() {
        let service = service(3, SubscriberKeyPolicy::FirstMatch);
        let mut state = KdcState::new(secret());
        let publisher = NodeId::new("pub1");
        let subscriber = NodeId::new("sub1");

        service.register_topic(&mut state, 12, true, &publisher).unwrap();
        let outcome = service
            .subscribe(&mut state, &subscriber, &[true], &[AttributeRange::new(10, 14)])
            .unwrap();

        // [0, 15] at depth 3: eight leaves of two ids each.
        let expected: Vec<(String, DerivedKey)> = all_tree_keys(12, 3)
            .into_iter()
            .filter(|(path, _)| path.len() == 3)
            .collect();
        let record = state.subscriber_keys().get(&subscriber).unwrap();
        assert_eq!(record.entries.len(), expected.len());
        for (path, key) in &expected {
            assert_eq!(record.key_for_path(12, path), Some(key));
        }

        // 12 sits in [12, 13] = "110".
        assert_eq!(outcome.publisher_keys.len(), 1);
        let publisher_key = state.publisher_keys().get(&publisher).unwrap();
        assert_eq!(publisher_key.path, "110");
        assert_eq!(
            record.key_for_path(12, &publisher_key.path),
            Some(&publisher_key.key)
        );
    }

    #[test]
    fn test_registration_is_idempotent_across_requests() {
        let metrics = Arc::new(Metrics::new());
        let service = KeyDistributionService::with_metrics(KdcConfig::default(), metrics.clone());
        let mut state = KdcState::new(secret());
        let pub1 = NodeId::new("pub1");

        for _ in 0..3 {
            service.register_topic(&mut state, 5, true, &pub1).unwrap();
        }
        assert_eq!(state.registry().lookup(5).len(), 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.registrations_inserted, 1);
        assert_eq!(snapshot.registrations_duplicate, 2);
    }

    #[test]
    fn test_range_matching_scenario() {
        let service = service(2, SubscriberKeyPolicy::FirstMatch);
        let mut state = KdcState::new(secret());
        service
            .register_topic(&mut state, 3, true, &NodeId::new("pubA"))
            .unwrap();
        service
            .register_topic(&mut state, 10, false, &NodeId::new("pubB"))
            .unwrap();

        let outcome = service
            .subscribe(&mut state, &NodeId::new("sub"), &[true], &[AttributeRange::new(1, 5)])
            .unwrap();

        assert_eq!(outcome.matched.len(), 1);
        assert_eq!(outcome.matched[0].publisher_id, NodeId::new("pubA"));
        assert_eq!(outcome.matched[0].sub_topic_id, 3);
        assert!(state.publisher_keys().get(&NodeId::new("pubB")).is_none());
    }

    #[test]
    fn test_resubscribing_adds_ranges_and_accumulates() {
        let service = service(2, SubscriberKeyPolicy::Accumulate);
        let mut state = KdcState::new(secret());
        let sub = NodeId::new("sub1");
        service
            .register_topic(&mut state, 3, true, &NodeId::new("pubA"))
            .unwrap();
        service
            .register_topic(&mut state, 7, true, &NodeId::new("pubB"))
            .unwrap();

        service
            .subscribe(&mut state, &sub, &[true, true], &[AttributeRange::new(1, 5)])
            .unwrap();
        let second = service
            .subscribe(&mut state, &sub, &[true, true], &[AttributeRange::new(6, 8)])
            .unwrap();

        let entry = state.subscriptions().get(&sub).unwrap();
        assert_eq!(
            entry.attribute_ranges,
            vec![AttributeRange::new(1, 5), AttributeRange::new(6, 8)]
        );
        // Topic 3 was already keyed; only topic 7 is new.
        assert_eq!(second.subscriber_keys.len(), 1);
        assert_eq!(second.subscriber_keys[0].topic_id, 7);
        assert_eq!(
            state.subscriber_keys().get(&sub).unwrap().topics(),
            vec![3, 7]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_no_interior_key_is_ever_stored(topic in 1i64..200, lcnum in 1i32..6) {
            let service = service(lcnum, SubscriberKeyPolicy::Accumulate);
            let mut state = KdcState::new(secret());
            service.register_topic(&mut state, topic, true, &NodeId::new("pub")).unwrap();
            service
                .subscribe(&mut state, &NodeId::new("sub"), &[true], &[AttributeRange::new(1, topic)])
                .unwrap();

            let leaves: Vec<String> = state
                .subscriber_keys()
                .get(&NodeId::new("sub"))
                .unwrap()
                .entries
                .iter()
                .map(|e| e.path.clone())
                .collect();
            let interior: Vec<DerivedKey> = all_tree_keys(topic, lcnum as usize)
                .into_iter()
                .filter(|(path, _)| !leaves.contains(path))
                .map(|(_, key)| key)
                .collect();

            for record in state.subscriber_keys().iter() {
                for entry in &record.entries {
                    prop_assert!(!interior.contains(&entry.key));
                }
            }
            for record in state.publisher_keys().iter() {
                prop_assert!(!interior.contains(&record.key));
            }
        }
    }
}
