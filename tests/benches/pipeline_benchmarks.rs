//! Criterion benchmarks for the hot paths of the ordering core: timeframe
//! algebra, message selection, and credential application.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use echo_pipeline::{Candidate, MessageSelector, TimeframeClock, TrustAwareSelector};
use halo_trust::PartyTrustState;
use shared_crypto::Keyring;
use shared_types::{Credential, FeedMessage, PublicKey, Timeframe};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn wide_timeframe(feeds: usize, offset: u64) -> Timeframe {
    (0..feeds)
        .map(|i| (PublicKey::from_bytes([i as u8; 32]), offset + i as u64))
        .collect()
}

fn bench_timeframe_merge(c: &mut Criterion) {
    let a = wide_timeframe(64, 0);
    let b = wide_timeframe(64, 17);
    c.bench_function("timeframe_merge_64_feeds", |bencher| {
        bencher.iter(|| Timeframe::merge(black_box(&a), black_box(&b)))
    });
}

fn bench_timeframe_dependencies(c: &mut Criterion) {
    let declared = wide_timeframe(64, 9);
    let local = wide_timeframe(64, 3);
    c.bench_function("timeframe_dependencies_64_feeds", |bencher| {
        bencher.iter(|| Timeframe::dependencies(black_box(&declared), black_box(&local)))
    });
}

fn bench_selector_scan(c: &mut Criterion) {
    let clock = TimeframeClock::new(wide_timeframe(64, 100));
    let selector = TrustAwareSelector::new(clock, Arc::new(AtomicBool::new(true)));

    // Every candidate blocked except the last: worst-case full scan.
    let blocked = wide_timeframe(64, 1_000);
    let mut candidates: Vec<Candidate> = (0..100)
        .map(|i| Candidate {
            feed_key: PublicKey::from_bytes([i as u8; 32]),
            seq: 0,
            message: FeedMessage::echo(blocked.clone(), vec![i as u8]),
        })
        .collect();
    candidates.push(Candidate {
        feed_key: PublicKey::from_bytes([200u8; 32]),
        seq: 0,
        message: FeedMessage::echo(Timeframe::new(), vec![0]),
    });

    c.bench_function("selector_scan_100_blocked_candidates", |bencher| {
        bencher.iter(|| selector.select(black_box(&candidates)))
    });
}

fn bench_credential_application(c: &mut Criterion) {
    let keyring = Keyring::new();
    let party_key = keyring.generate();
    let identity = keyring.generate();
    let genesis_feed = keyring.generate();
    let genesis = keyring
        .sign_credential(
            Credential::PartyGenesis {
                party_key,
                feed_key: genesis_feed,
                identity_key: identity,
            },
            &party_key,
        )
        .expect("sign");
    let admit = keyring
        .sign_credential(
            Credential::FeedAdmit {
                party_key,
                feed_key: keyring.generate(),
                identity_key: identity,
            },
            &identity,
        )
        .expect("sign");

    c.bench_function("trust_state_apply_genesis_plus_admit", |bencher| {
        bencher.iter(|| {
            let mut state = PartyTrustState::new(party_key);
            state.apply(black_box(&genesis)).expect("genesis");
            state.apply(black_box(&admit)).expect("admit");
        })
    });
}

criterion_group!(
    benches,
    bench_timeframe_merge,
    bench_timeframe_dependencies,
    bench_selector_scan,
    bench_credential_application
);
criterion_main!(benches);
