//! # Store Scenarios
//!
//! End-to-end flows through the typed facades of one node:
//!
//! 1. **Insert then fetch** for every block kind
//! 2. **LRU bound** under a stream of new blocks
//! 3. **Filter soundness**: no stored key ever probes absent
//! 4. **Signed-subspace updates**: collision, overwrite, key resolution

#[cfg(test)]
mod tests {
    use ds_02_block_store::{
        BlockStoreApi, BlockStores, ContentHashBlock, FetchFlags, NodeStoreConfig,
        InMemoryRecordStore, PublicKeyRecord, PutFlags, PutOutcome, RecordStore, StorableBlock,
        StoreError, SubspaceKey, TieredStoreConfig,
    };
    use rand::Rng;

    use crate::integration::fixtures::{chk, config, init_tracing, ssk};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn node(max_keys: u64) -> BlockStores<InMemoryRecordStore> {
        init_tracing();
        let tiers = TieredStoreConfig::new(config(max_keys)).with_client_cache(config(max_keys / 2));
        BlockStores::in_memory(&NodeStoreConfig::uniform(tiers)).unwrap()
    }

    // =============================================================================
    // INSERT / FETCH
    // =============================================================================

    #[test]
    fn test_every_kind_round_trips() {
        let node = node(64);

        let content = ContentHashBlock::encode(b"hello").unwrap();
        node.content_hash.put(&content, PutFlags::default()).unwrap();

        let signed = ssk(1, "site/index", "signed hello");
        node.signed_subspace.put(&signed, PutFlags::default()).unwrap();

        let fetched = node
            .content_hash
            .fetch(&content.key(), FetchFlags::default())
            .unwrap()
            .unwrap();
        assert_eq!(fetched.content(), b"hello");

        let bare_key =
            SubspaceKey::new(*signed.key().pubkey_hash(), *signed.key().docname_hash());
        let fetched = node
            .signed_subspace
            .fetch(&bare_key, FetchFlags::default())
            .unwrap()
            .unwrap();
        assert_eq!(fetched.content(), b"signed hello");

        let pubkey: &PublicKeyRecord = signed.public_key();
        assert_eq!(
            node.public_keys
                .fetch(pubkey.hash(), FetchFlags::default())
                .unwrap()
                .as_ref(),
            Some(pubkey)
        );
    }

    #[test]
    fn test_absent_keys_miss_without_error() {
        let node = node(16);
        for n in 0..10 {
            assert!(node
                .content_hash
                .fetch(&chk(n).key(), FetchFlags::default())
                .unwrap()
                .is_none());
        }
        assert_eq!(node.content_hash.misses(), 10);
        assert_eq!(node.content_hash.hits(), 0);
    }

    // =============================================================================
    // CAPACITY
    // =============================================================================

    #[test]
    fn test_store_never_exceeds_capacity() {
        let node = node(32);
        for n in 0..200 {
            node.content_hash.put(&chk(n), PutFlags::default()).unwrap();
            assert!(node.content_hash.key_count() <= 32);
        }
        assert_eq!(node.content_hash.key_count(), 32);

        let main = node.content_hash.tiers().main();
        assert_eq!(main.evictions(), 168);
        assert_eq!(main.metrics_snapshot().writes, 200);
    }

    #[test]
    fn test_hot_block_survives_churn() {
        let node = node(8);
        let hot = chk(1_000);
        node.content_hash.put(&hot, PutFlags::default()).unwrap();

        for n in 0..100 {
            node.content_hash.put(&chk(n), PutFlags::default()).unwrap();
            assert!(node
                .content_hash
                .fetch(&hot.key(), FetchFlags::default())
                .unwrap()
                .is_some());
        }
    }

    #[test]
    fn test_deferred_shrink_applies_on_next_put() {
        let node = node(20);
        for n in 0..20 {
            node.content_hash.put(&chk(n), PutFlags::default()).unwrap();
        }
        node.content_hash.set_max_keys(5, false).unwrap();
        assert_eq!(node.content_hash.key_count(), 20);

        node.content_hash.put(&chk(100), PutFlags::default()).unwrap();
        assert_eq!(node.content_hash.key_count(), 5);
        assert!(node
            .content_hash
            .fetch(&chk(100).key(), FetchFlags::default())
            .unwrap()
            .is_some());
    }

    // =============================================================================
    // FILTER SOUNDNESS
    // =============================================================================

    #[test]
    fn test_filter_has_no_false_negatives_through_evictions_and_rebuilds() {
        let node = node(50);
        let mut rng = rand::thread_rng();
        let mut written = Vec::new();

        for _ in 0..500 {
            let mut content = [0u8; 64];
            rng.fill(&mut content[..]);
            let block = ContentHashBlock::encode(&content).unwrap();
            node.content_hash.put(&block, PutFlags::default()).unwrap();
            written.push(block.routing_key());
        }

        let main = node.content_hash.tiers().main();
        assert!(main.filter_stats().rebuilds > 0);

        // Every key the store still holds must probe present.
        let mut present = 0;
        for key in &written {
            if main.records().contains(key).unwrap() {
                present += 1;
                assert!(node.content_hash.probably_in_store(key));
            }
        }
        assert_eq!(present, 50);
    }

    // =============================================================================
    // SIGNED SUBSPACE UPDATES
    // =============================================================================

    #[test]
    fn test_subspace_update_flow() {
        let node = node(16);
        let v1 = ssk(7, "blog", "first post");
        let v2 = ssk(7, "blog", "second post");
        assert_eq!(v1.routing_key(), v2.routing_key());

        assert_eq!(
            node.signed_subspace.put(&v1, PutFlags::default()).unwrap(),
            Some(PutOutcome::Stored)
        );
        assert_eq!(
            node.signed_subspace.put(&v1, PutFlags::default()).unwrap(),
            Some(PutOutcome::AlreadyPresent)
        );
        assert!(matches!(
            node.signed_subspace.put(&v2, PutFlags::default()),
            Err(StoreError::KeyCollision { .. })
        ));
        assert_eq!(
            node.signed_subspace
                .put(&v2, PutFlags::default().with_overwrite(true))
                .unwrap(),
            Some(PutOutcome::Replaced)
        );

        let fetched = node
            .signed_subspace
            .fetch(v1.key(), FetchFlags::default())
            .unwrap()
            .unwrap();
        assert_eq!(fetched.content(), b"second post");
        assert_eq!(node.public_keys.key_count(), 1);
    }

    #[test]
    fn test_key_from_client_cache_only_with_permission() {
        let node = node(16);
        let signed = ssk(9, "private", "local only");
        let cache_only = PutFlags::default()
            .with_datastore(false)
            .with_client_cache(true);
        node.public_keys.put(signed.public_key(), cache_only).unwrap();
        node.signed_subspace
            .tiers()
            .put_block(&signed, PutFlags::default())
            .unwrap();

        let bare_key =
            SubspaceKey::new(*signed.key().pubkey_hash(), *signed.key().docname_hash());
        assert!(node
            .signed_subspace
            .fetch(&bare_key, FetchFlags::default())
            .unwrap()
            .is_none());
        assert!(node
            .signed_subspace
            .fetch(&bare_key, FetchFlags::local())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_metrics_export() {
        let node = node(4);
        for n in 0..6 {
            node.content_hash.put(&chk(n), PutFlags::default()).unwrap();
        }
        node.content_hash
            .fetch(&chk(5).key(), FetchFlags::default())
            .unwrap();

        let snapshot = node.content_hash.tiers().main().metrics_snapshot();
        assert_eq!(snapshot.store, "chk");
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.evictions, 2);
        assert_eq!(snapshot.key_count, 4);

        let text = snapshot.export_prometheus();
        assert!(text.contains("ds02_hits{store=\"chk\"} 1"));
        assert!(text.contains("ds02_evictions{store=\"chk\"} 2"));
    }
}
