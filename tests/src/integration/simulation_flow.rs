//! # Simulation Flow
//!
//! Whole runs of the runtime, configured the way the binary is: JSON text,
//! then environment overrides, then validation.
//!
//! ## Flow Tested:
//!
//! 1. Demo scenario end to end: registration, subscription, key delivery,
//!    decryptable data
//! 2. Configuration round trip through JSON
//! 3. Security gate on the KDC secret
//! 4. Reproducibility of seeded runs

#[cfg(test)]
mod tests {
    use shared_bus::EventQueue;
    use shared_types::SimTime;
    use sim_runtime::{
        ConfigError, RandomContacts, RuntimeError, Simulation, SimulationConfig,
        UNSET_SECRET_HEX,
    };
    use std::collections::HashMap;

    fn run(config: SimulationConfig) -> sim_runtime::SimulationReport {
        Simulation::new(config).unwrap().run().unwrap()
    }

    #[test]
    fn test_demo_scenario_end_to_end() {
        let report = run(SimulationConfig::demo());

        assert_eq!(report.topics_registered, 1);
        assert_eq!(report.kdc.registrations_inserted, 1);
        assert_eq!(report.kdc.subscriptions_processed, 2);
        assert_eq!(report.publisher_keys_stored, 1);
        assert_eq!(report.subscriber_key_records, 1);

        let sub1 = report.host("sub1").unwrap();
        assert!(sub1.subscriber_keys > 0);
        assert_eq!(sub1.stats.data_decrypted, report.run.data_delivered);

        let sub2 = report.host("sub2").unwrap();
        assert_eq!(sub2.subscriber_keys, 0);
        assert_eq!(sub2.stats.data_delivered, 0);

        // Control messages never linger at the KDC or the broker.
        assert_eq!(report.host("kdc").unwrap().buffered, 0);
        assert_eq!(report.host("broker1").unwrap().buffered, 0);
    }

    #[test]
    fn test_config_survives_json_round_trip() {
        let demo = SimulationConfig::demo();
        let json = serde_json::to_string(&demo).unwrap();
        let parsed = SimulationConfig::from_json(&json).unwrap();
        assert_eq!(parsed, demo);
        assert_eq!(run(parsed), run(demo));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{
            "kdc_secret": "0102030405060708",
            "hosts": [{ "id": "kdc", "roles": ["kdc"] }]
        }"#;
        let config = SimulationConfig::from_json(json).unwrap();
        assert_eq!(config.end_time, SimulationConfig::default().end_time);
        assert!(config.validate().is_ok());

        let report = run(config);
        assert_eq!(report.topics_registered, 0);
        assert_eq!(report.events_dispatched, 0);
    }

    #[test]
    fn test_zero_secret_blocks_the_run() {
        let mut config = SimulationConfig::demo();
        let env: HashMap<&str, &str> = [("NK_KDC_SECRET", UNSET_SECRET_HEX)].into();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert!(matches!(
            Simulation::new(config),
            Err(RuntimeError::Config(ConfigError::InsecureKdcSecret))
        ));
    }

    #[test]
    fn test_env_overrides_change_the_run() {
        let mut config = SimulationConfig::demo();
        let env: HashMap<&str, &str> = [("NK_END_TIME", "12"), ("NK_LCNUM", "2")].into();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.lcnum, 2);

        // Requests reach the KDC at t=10 and are processed at t=15.
        let report = run(config);
        assert_eq!(report.end_time, 12);
        assert_eq!(report.topics_registered, 0);
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let config = |seed| SimulationConfig {
            seed,
            random_contacts: Some(RandomContacts {
                count: 60,
                max_duration: 6,
            }),
            ..SimulationConfig::demo()
        };

        assert_eq!(run(config(3)), run(config(3)));
        assert_eq!(run(config(4)).end_time, 200);
    }

    #[test]
    fn test_event_queue_orders_ties_by_insertion() {
        let mut queue = EventQueue::new();
        queue.schedule_at(SimTime(5), "second-at-5").unwrap();
        queue.schedule_at(SimTime(1), "first").unwrap();
        queue.schedule_at(SimTime(5), "third-at-5").unwrap();

        let order: Vec<&str> = std::iter::from_fn(|| queue.pop_next().map(|e| e.event)).collect();
        assert_eq!(order, vec!["first", "second-at-5", "third-at-5"]);
        assert_eq!(queue.now(), SimTime(5));
    }
}
