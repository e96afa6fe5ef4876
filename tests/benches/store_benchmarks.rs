//! # Datastore Benchmarks
//!
//! | Path | What is measured |
//! |------|------------------|
//! | ds-01 | Filter probe, present and absent keys |
//! | ds-02 | Content-hash put and fetch, in memory and on disk |
//! | ds-02 | Signed-subspace fetch (signature verification) |
//! | ds-02 | Put at capacity (one eviction per put) |

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ds_01_membership_filter::{FilterConfig, MembershipFilter};
use ds_02_block_store::{
    BlockKind, BlockStore, ConstructContext, ContentHashBlock, SignedSubspaceBlock, StorableBlock,
    StoreConfig,
};
use rand::Rng;
use shared_crypto::Ed25519KeyPair;

fn random_blocks(count: usize) -> Vec<ContentHashBlock> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let mut content = vec![0u8; 4096];
            rng.fill(&mut content[..]);
            ContentHashBlock::encode(&content).unwrap()
        })
        .collect()
}

// ============================================================================
// DS-01: Membership Filter
// ============================================================================

fn bench_filter_probe(c: &mut Criterion) {
    let mut group = c.benchmark_group("ds-01-membership-filter");

    let filter = MembershipFilter::new(FilterConfig::for_capacity(100_000)).unwrap();
    let keys: Vec<[u8; 32]> = (0..100_000u32)
        .map(|i| {
            let mut key = [0u8; 32];
            key[..4].copy_from_slice(&i.to_be_bytes());
            key
        })
        .collect();
    for key in &keys {
        filter.insert(key);
    }

    group.bench_function("probe_present", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % keys.len();
            black_box(filter.might_contain(&keys[i]))
        })
    });
    group.bench_function("probe_absent", |b| {
        let mut rng = rand::thread_rng();
        b.iter(|| {
            let key: [u8; 32] = rng.gen();
            black_box(filter.might_contain(&key))
        })
    });

    group.finish();
}

// ============================================================================
// DS-02: Block Store
// ============================================================================

fn bench_content_hash_in_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("ds-02-content-hash-memory");
    group.throughput(Throughput::Elements(1));

    let blocks = random_blocks(1_000);
    let store =
        BlockStore::in_memory(BlockKind::ContentHash, StoreConfig::default().with_max_keys(2_000))
            .unwrap();
    for block in &blocks {
        store.put_block(block, false).unwrap();
    }

    group.bench_function("fetch_block", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % blocks.len();
            black_box(
                store
                    .fetch_block(&blocks[i].routing_key(), false, &ConstructContext::default())
                    .unwrap(),
            )
        })
    });

    group.bench_function("fetch_absent", |b| {
        let absent = random_blocks(1);
        let key = absent[0].routing_key();
        b.iter(|| black_box(store.fetch(&key, None, false).unwrap()))
    });

    group.finish();
}

fn bench_put_at_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("ds-02-eviction");

    for capacity in [100u64, 10_000] {
        let store = BlockStore::in_memory(
            BlockKind::ContentHash,
            StoreConfig::default().with_max_keys(capacity),
        )
        .unwrap();
        let blocks = random_blocks(capacity as usize * 2);
        for block in &blocks[..capacity as usize] {
            store.put_block(block, false).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("put_evicting", capacity), &blocks, |b, blocks| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % blocks.len();
                black_box(store.put_block(&blocks[i], false).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_file_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("ds-02-content-hash-file");
    group.measurement_time(Duration::from_secs(10));

    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(
        BlockKind::ContentHash,
        dir.path(),
        "bench",
        StoreConfig::default().with_max_keys(500),
    )
    .unwrap();
    let blocks = random_blocks(1_000);

    group.bench_function("put", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % blocks.len();
            black_box(store.put_block(&blocks[i], false).unwrap())
        })
    });
    group.bench_function("fetch_block", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % blocks.len();
            black_box(
                store
                    .fetch_block(&blocks[i].routing_key(), false, &ConstructContext::default())
                    .unwrap(),
            )
        })
    });

    group.finish();
}

fn bench_signed_subspace_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("ds-02-signed-subspace");

    let keypair = Ed25519KeyPair::generate();
    let block = SignedSubspaceBlock::sign(&keypair, b"bench/doc", b"signed content").unwrap();
    let store = BlockStore::in_memory(BlockKind::SignedSubspace, StoreConfig::default()).unwrap();
    store.put_block(&block, false).unwrap();
    let full_key = block.key().to_bytes();
    let ctx = ConstructContext::default()
        .with_full_key(&full_key)
        .with_verification_key(block.public_key());

    group.bench_function("fetch_and_verify", |b| {
        b.iter(|| black_box(store.fetch_block(&block.routing_key(), false, &ctx).unwrap()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_filter_probe,
    bench_content_hash_in_memory,
    bench_put_at_capacity,
    bench_file_store,
    bench_signed_subspace_fetch,
);
criterion_main!(benches);
