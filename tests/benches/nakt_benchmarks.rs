//! # NAKT Overlay Benchmarks
//!
//! | Area | Operation | Scales with |
//! |------|-----------|-------------|
//! | NAKT | `derive` | `2^lcnum` HMACs |
//! | KDC | `subscribe` | registry size |
//! | Routing | `decide` + `rank_relays` | candidates |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nk_01_key_distribution::{
    KdcConfig, KdcState, KeyDistributionApi, KeyDistributionService, NaktTree,
};
use nk_02_interest_routing::InterestRouter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_crypto::{DerivedKey, KdcSecret};
use shared_types::{AttributeRange, HostProfile, HostRole, NodeId, PublisherKeyGrant, SimTime};
use sim_runtime::protocol::MessageFactory;
use sim_runtime::Publication;
use std::time::Duration;

fn secret() -> KdcSecret {
    KdcSecret::from_bytes(b"bench-kdc-secret".to_vec())
}

fn bench_nakt_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("nakt-derive");
    group.measurement_time(Duration::from_secs(5));
    let secret = secret();

    for lcnum in [2, 4, 8, 12] {
        let tree = NaktTree::new(lcnum);
        group.throughput(Throughput::Elements(1u64 << lcnum));
        group.bench_with_input(BenchmarkId::new("topic_5000", lcnum), &tree, |b, tree| {
            b.iter(|| black_box(tree.derive(&secret, black_box(5_000)).map(|t| t.len())))
        });
    }
    group.finish();
}

fn bench_kdc_subscribe(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdc-subscribe");
    let mut rng = StdRng::seed_from_u64(7);

    for registry_size in [10, 100, 1_000] {
        let service = KeyDistributionService::new(KdcConfig::default());
        let mut state = KdcState::new(secret());
        for i in 0..registry_size {
            let topic = rng.gen_range(1..10_000);
            let publisher = NodeId::new(format!("pub{i}"));
            let _ = service.register_topic(&mut state, topic, rng.gen(), &publisher);
        }

        group.bench_with_input(
            BenchmarkId::new("registry", registry_size),
            &registry_size,
            |b, _| {
                let mut n = 0u64;
                b.iter(|| {
                    n += 1;
                    let subscriber = NodeId::new(format!("sub{n}"));
                    black_box(service.subscribe(
                        &mut state,
                        &subscriber,
                        &[true, false],
                        &[AttributeRange::new(2_000, 2_500)],
                    ))
                })
            },
        );
    }
    group.finish();
}

fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing");
    let grant = PublisherKeyGrant {
        publisher_id: NodeId::new("pub1"),
        topic_id: 6,
        path: "110".to_string(),
        key: DerivedKey::from_encoded("bench"),
    };
    let publication = Publication {
        publisher: NodeId::new("pub1"),
        topic_id: 6,
        flag: true,
        name: "bench".to_string(),
        at: 0,
        messages: 1,
        interval: 1,
    };
    let message = MessageFactory::new().data(&publication, &grant, SimTime(0));
    let router = InterestRouter::new();

    for candidates in [4, 32, 256] {
        let mut rng = StdRng::seed_from_u64(candidates as u64);
        let hosts: Vec<HostProfile> = (0..candidates)
            .map(|i| {
                HostProfile::new(format!("h{i}"), [HostRole::Subscriber])
                    .with_interest_weights((0..8).map(|_| rng.gen::<f64>()).collect())
                    .with_own_interest((0..8).map(|_| rng.gen()).collect())
            })
            .collect();

        group.throughput(Throughput::Elements(candidates as u64));
        group.bench_with_input(BenchmarkId::new("decide_and_rank", candidates), &hosts, |b, hosts| {
            b.iter(|| {
                let relays: Vec<&HostProfile> = hosts
                    .iter()
                    .filter(|h| router.decide(&message, *h) != nk_02_interest_routing::RoutingDecision::Keep)
                    .collect();
                black_box(router.rank_relays(&message, relays))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_nakt_derivation, bench_kdc_subscribe, bench_routing);
criterion_main!(benches);
