//! # Concurrency
//!
//! Many threads driving one store. Checks that the capacity bound, the
//! collision rule and filter soundness hold without external locking, and
//! that a synced file store keeps serving reads while other keys are written.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use ds_02_block_store::{
        BlockKind, BlockStore, BlockStoreApi, ConstructContext, InMemoryRecordStore, PutOutcome,
        RecordStore, StorableBlock, StoreError,
    };
    use parking_lot::Mutex;

    use crate::integration::fixtures::{chk, config, init_tracing, ssk};

    const THREADS: u32 = 8;
    const PER_THREAD: u32 = 100;

    fn store(kind: BlockKind, max_keys: u64) -> Arc<BlockStore<InMemoryRecordStore>> {
        init_tracing();
        Arc::new(BlockStore::in_memory(kind, config(max_keys)).unwrap())
    }

    #[test]
    fn test_parallel_writers_within_capacity() {
        let store = store(BlockKind::ContentHash, 10_000);

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        let block = chk(t * 1_000 + i);
                        store.put_block(&block, false).unwrap();
                        let fetched = store
                            .fetch_block(&block.routing_key(), false, &ConstructContext::default())
                            .unwrap();
                        assert!(fetched.is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.key_count(), u64::from(THREADS * PER_THREAD));
        assert_eq!(store.writes(), u64::from(THREADS * PER_THREAD));
        assert_eq!(store.evictions(), 0);
    }

    #[test]
    fn test_parallel_writers_settle_at_capacity() {
        let store = store(BlockKind::ContentHash, 50);

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        store.put_block(&chk(t * 1_000 + i), false).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.key_count(), 50);
        assert_eq!(store.evictions(), u64::from(THREADS * PER_THREAD) - 50);

        // Whatever survived must still probe present.
        for t in 0..THREADS {
            for i in 0..PER_THREAD {
                let key = chk(t * 1_000 + i).routing_key();
                if store.records().contains(&key).unwrap() {
                    assert!(store.probably_in_store(&key));
                }
            }
        }
    }

    #[test]
    fn test_racing_subspace_updates_store_exactly_one() {
        let store = store(BlockKind::SignedSubspace, 100);
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let store = Arc::clone(&store);
                let outcomes = Arc::clone(&outcomes);
                thread::spawn(move || {
                    let block = ssk(3, "contested", &format!("version {t}"));
                    let outcome = store.put_block(&block, false);
                    outcomes.lock().push(outcome);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let outcomes = outcomes.lock();
        let stored = outcomes
            .iter()
            .filter(|o| matches!(o, Ok(PutOutcome::Stored)))
            .count();
        let collisions = outcomes
            .iter()
            .filter(|o| matches!(o, Err(StoreError::KeyCollision { .. })))
            .count();
        assert_eq!(stored, 1);
        assert_eq!(collisions, THREADS as usize - 1);
        assert_eq!(store.key_count(), 1);
    }

    #[test]
    fn test_readers_and_writers_interleave() {
        let store = store(BlockKind::ContentHash, 10_000);
        for i in 0..PER_THREAD {
            store.put_block(&chk(i), false).unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..THREADS / 2 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let fetched = store
                        .fetch(&chk(i).routing_key(), None, i % 2 == 0)
                        .unwrap();
                    assert!(fetched.is_some());
                }
            }));
        }
        for t in 0..THREADS / 2 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..PER_THREAD {
                    store.put_block(&chk(10_000 + t * 1_000 + i), false).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.hits(), u64::from(THREADS / 2 * PER_THREAD));
        assert_eq!(store.key_count(), u64::from(PER_THREAD + THREADS / 2 * PER_THREAD));
    }

    #[test]
    fn test_synced_file_store_reads_while_writing() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            BlockStore::open(
                BlockKind::ContentHash,
                dir.path(),
                "chk",
                config(10_000).with_sync_writes(true),
            )
            .unwrap(),
        );
        let hot = chk(0);
        store.put_block(&hot, false).unwrap();

        let mut handles = Vec::new();
        for _ in 0..THREADS / 2 {
            let store = Arc::clone(&store);
            let key = hot.routing_key();
            handles.push(thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    let fetched = store
                        .fetch_block(&key, true, &ConstructContext::default())
                        .unwrap()
                        .and_then(|block| block.into_content_hash())
                        .unwrap();
                    assert_eq!(fetched.content(), b"integration block 0");
                }
            }));
        }
        for t in 0..THREADS / 2 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..PER_THREAD / 4 {
                    store.put_block(&chk(1 + t * 1_000 + i), false).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let written = u64::from(THREADS / 2 * (PER_THREAD / 4));
        assert_eq!(store.hits(), u64::from(THREADS / 2 * PER_THREAD));
        assert_eq!(store.writes(), written + 1);
        assert_eq!(store.key_count(), written + 1);
        assert_eq!(store.corrupt_removed(), 0);
        for t in 0..THREADS / 2 {
            for i in 0..PER_THREAD / 4 {
                assert!(store.records().contains(&chk(1 + t * 1_000 + i).routing_key()).unwrap());
            }
        }
    }
}
