//! # Routing Flow
//!
//! Messages built by the runtime's `MessageFactory` evaluated by the
//! routing crate's gate and router against configured host profiles.
//!
//! ## Flow Tested:
//!
//! 1. Final-destination gate on publish-time annotations
//! 2. Graceful handling of missing and malformed topic properties
//! 3. Relay eligibility of subscription annotations by position
//! 4. Stable, descending relay ranking
//! 5. Router history sharing vs. `snapshot()`

#[cfg(test)]
mod tests {
    use nk_02_interest_routing::{InterestGate, InterestRouter, RoutingDecision};
    use shared_crypto::DerivedKey;
    use shared_types::{
        AttributeRange, HostProfile, HostRole, Message, MessageKind, NodeId, PropertyValue,
        PublisherKeyGrant, SimTime, TopicProperty, PROP_TOPIC,
    };
    use sim_runtime::protocol::MessageFactory;
    use sim_runtime::Publication;

    fn publication(topic_id: i64) -> Publication {
        Publication {
            publisher: NodeId::new("pub1"),
            topic_id,
            flag: true,
            name: format!("t{topic_id}"),
            at: 0,
            messages: 1,
            interval: 10,
        }
    }

    fn data(topic_id: i64) -> Message {
        let grant = PublisherKeyGrant {
            publisher_id: NodeId::new("pub1"),
            topic_id,
            path: "10".to_string(),
            key: DerivedKey::from_encoded("k"),
        };
        MessageFactory::new().data(&publication(topic_id), &grant, SimTime(1))
    }

    fn subscriber(id: &str, weights: Vec<f64>, interest: Vec<bool>) -> HostProfile {
        HostProfile::new(id, [HostRole::Subscriber])
            .with_interest_weights(weights)
            .with_own_interest(interest)
    }

    #[test]
    fn test_final_destination_follows_interest_weight() {
        let gate = InterestGate;
        let message = data(2);

        let interested = subscriber("h", vec![0.0, 0.0, 0.7], vec![]);
        let indifferent = subscriber("h", vec![0.0, 0.0, 0.0], vec![]);
        assert_eq!(gate.is_final_destination(&message, &interested), Some(true));
        assert_eq!(gate.is_final_destination(&message, &indifferent), Some(false));

        let router = InterestRouter::new();
        assert_eq!(router.decide(&message, &interested), RoutingDecision::Deliver);
        assert_eq!(router.decide(&message, &indifferent), RoutingDecision::Keep);
    }

    #[test]
    fn test_missing_topic_is_undecidable() {
        let gate = InterestGate;
        let message = Message::new("m", MessageKind::Data, NodeId::new("p"), None, SimTime(0));
        let host = subscriber("h", vec![1.0; 4], vec![true; 4]);

        assert_eq!(gate.is_final_destination(&message, &host), None);
        assert!(!gate.shares_interest(&message, &host));
        assert!(gate.similarity_score(&message, &host).is_empty());
        assert_eq!(InterestRouter::new().decide(&message, &host), RoutingDecision::Keep);
    }

    #[test]
    fn test_conflicting_topic_values_degrade_gracefully() {
        let gate = InterestGate;
        let host = subscriber("h", vec![0.0, 0.5, 0.5], vec![]);

        let mut message = data(1);
        message.set(PROP_TOPIC, TopicProperty::registration(false, 2, "other"));
        assert!(matches!(message.topic(), Some(TopicProperty::Registration(map)) if map.len() == 2));
        assert_eq!(gate.is_final_destination(&message, &host), Some(true));

        // A scalar arriving for the same key wraps both values.
        message.set(PROP_TOPIC, PropertyValue::Int(9));
        assert!(matches!(message.get(PROP_TOPIC), Some(PropertyValue::Pair(_, _))));
        assert_eq!(gate.is_final_destination(&message, &host), None);
    }

    #[test]
    fn test_subscription_request_relays_by_position() {
        let gate = InterestGate;
        let requester = subscriber("sub1", vec![], vec![true, false, true])
            .with_numeric_attributes(vec![AttributeRange::new(1, 5), AttributeRange::new(7, 9)]);
        let request = MessageFactory::new().subscription(&requester, SimTime(0));

        let same_shape = subscriber("relay", vec![], vec![false, false, true]);
        let disjoint = subscriber("relay", vec![], vec![false, true, false]);
        let other_shape = subscriber("relay", vec![], vec![true, true]);

        assert!(gate.shares_interest(&request, &same_shape));
        assert!(!gate.shares_interest(&request, &disjoint));
        assert!(!gate.shares_interest(&request, &other_shape));
        // Registration-only rule: subscription requests are never "final".
        assert_eq!(gate.is_final_destination(&request, &same_shape), None);
    }

    #[test]
    fn test_relays_ranked_by_similarity_with_stable_ties() {
        let message = data(2);
        let interest = vec![false, false, true];
        let candidates = [
            subscriber("low", vec![0.1, 0.1, 0.1], interest.clone()),
            subscriber("tie-a", vec![0.3, 0.3, 0.3], interest.clone()),
            subscriber("tie-b", vec![0.3, 0.3, 0.3], interest.clone()),
            subscriber("none", vec![], vec![true, true, false]),
        ];

        let ranked = InterestRouter::new().rank_relays(&message, candidates.iter());
        let order: Vec<&str> = ranked.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(order, vec!["tie-a", "tie-b", "low", "none"]);
        assert!((ranked[0].total() - 0.9).abs() < 1e-9);
        assert!(ranked[3].score.is_empty());
    }

    #[test]
    fn test_shared_and_snapshot_histories() {
        let prototype = InterestRouter::new();
        let shared = prototype.clone();
        let private = prototype.snapshot();
        let peer = subscriber("peer", vec![0.0, 0.0, 1.0], vec![]);
        let message = data(2);

        assert!(shared.record_forward(&NodeId::new("peer"), &message));
        assert_eq!(prototype.decide(&message, &peer), RoutingDecision::Keep);
        assert_eq!(private.decide(&message, &peer), RoutingDecision::Deliver);

        private.contact_up(&NodeId::new("peer"), SimTime(3));
        assert!(private.history().borrow().is_connected(&NodeId::new("peer")));
        assert!(!prototype.history().borrow().is_connected(&NodeId::new("peer")));
    }
}
