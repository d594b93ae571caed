//! # Contact Plan
//!
//! The configured contact windows followed by any seeded random ones. The
//! same seed always yields the same plan.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::{ContactWindow, RandomContacts, SimulationConfig};

/// Every contact window of a run, configured ones first.
pub fn contact_plan(config: &SimulationConfig) -> Vec<ContactWindow> {
    let mut plan = config.contacts.clone();
    if let Some(random) = &config.random_contacts {
        let generated = random_windows(config, random);
        debug!(count = generated.len(), seed = config.seed, "Random contacts generated");
        plan.extend(generated);
    }
    plan
}

fn random_windows(config: &SimulationConfig, random: &RandomContacts) -> Vec<ContactWindow> {
    let hosts = &config.hosts;
    if hosts.len() < 2 || config.end_time == 0 {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    (0..random.count)
        .map(|_| {
            let a = rng.gen_range(0..hosts.len());
            // Shift past `a` so the pair is always distinct.
            let mut b = rng.gen_range(0..hosts.len() - 1);
            if b >= a {
                b += 1;
            }
            ContactWindow {
                at: rng.gen_range(0..config.end_time),
                duration: rng.gen_range(0..=random.max_duration),
                a: hosts[a].id.clone(),
                b: hosts[b].id.clone(),
            }
        })
        .collect()
}
