//! # Persistence
//!
//! Restart behaviour of file-backed stores:
//!
//! - Clean shutdown keeps contents, write order and the filter image
//! - A flipped byte on disk is detected on fetch and the entry dropped
//! - A torn trailing slot is discarded on open
//! - Two opens of one directory are refused

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::{Seek, SeekFrom, Write};
    use std::path::Path;

    use ds_02_block_store::{
        BlockKind, BlockStore, BlockStoreApi, BlockStores, ConstructContext, FetchFlags,
        FileRecordStore, NodeStoreConfig, PutFlags, StorableBlock, StoreError, StoreIoError,
        SubspaceKey, TieredStoreConfig,
    };

    use crate::integration::fixtures::{chk, config, init_tracing, ssk};

    /// Start of the payload of slot 0 in a content-hash store file:
    /// file header, slot meta, routing key, block header.
    const FIRST_PAYLOAD_OFFSET: u64 = 64 + 13 + 32 + 36;

    fn open_chk(dir: &Path, max_keys: u64) -> BlockStore<FileRecordStore> {
        init_tracing();
        BlockStore::open(BlockKind::ContentHash, dir, "chk", config(max_keys)).unwrap()
    }

    fn holds(store: &BlockStore<FileRecordStore>, n: u32) -> bool {
        store
            .fetch_block(&chk(n).routing_key(), true, &ConstructContext::default())
            .unwrap()
            .is_some()
    }

    #[test]
    fn test_write_order_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_chk(dir.path(), 5);
            for n in 0..5 {
                store.put_block(&chk(n), false).unwrap();
            }
            store.shutdown().unwrap();
        }

        let store = open_chk(dir.path(), 5);
        assert_eq!(store.key_count(), 5);
        assert_eq!(store.filter_stats().rebuilds, 0);
        for n in 0..5 {
            assert!(store.probably_in_store(&chk(n).routing_key()));
        }

        store.put_block(&chk(5), false).unwrap();
        assert!(!holds(&store, 0));
        for n in 1..=5 {
            assert!(holds(&store, n));
        }
    }

    #[test]
    fn test_flipped_payload_byte_is_dropped_on_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let block = chk(42);
        {
            let store = open_chk(dir.path(), 10);
            store.put_block(&block, false).unwrap();
            store.shutdown().unwrap();
        }

        let mut file = OpenOptions::new()
            .write(true)
            .open(dir.path().join("chk.store"))
            .unwrap();
        file.seek(SeekFrom::Start(FIRST_PAYLOAD_OFFSET + 7)).unwrap();
        file.write_all(&[0xFF]).unwrap();
        file.sync_all().unwrap();
        drop(file);

        let store = open_chk(dir.path(), 10);
        assert_eq!(store.key_count(), 1);
        assert!(!holds(&store, 42));
        assert_eq!(store.key_count(), 0);
        assert_eq!(store.corrupt_removed(), 1);
        assert_eq!(store.misses(), 1);

        // The slot is usable again.
        store.put_block(&block, false).unwrap();
        assert!(holds(&store, 42));
    }

    #[test]
    fn test_torn_tail_discarded_on_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_chk(dir.path(), 10);
            for n in 0..3 {
                store.put_block(&chk(n), false).unwrap();
            }
            store.shutdown().unwrap();
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join("chk.store"))
            .unwrap();
        file.write_all(&[1u8; 100]).unwrap();
        drop(file);

        let store = open_chk(dir.path(), 10);
        assert_eq!(store.key_count(), 3);
        for n in 0..3 {
            assert!(holds(&store, n));
        }
    }

    #[test]
    fn test_directory_is_locked_while_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeStoreConfig::uniform(TieredStoreConfig::new(config(10)));
        let first = BlockStores::open(dir.path(), &config).unwrap();

        let second = BlockStores::open(dir.path(), &config);
        assert!(matches!(
            second,
            Err(StoreError::Io(StoreIoError::Lock(_)))
        ));

        drop(first);
        assert!(BlockStores::open(dir.path(), &config).is_ok());
    }

    #[test]
    fn test_node_restart_keeps_every_kind() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let config = NodeStoreConfig::uniform(
            TieredStoreConfig::new(config(32)).with_client_cache(config(8)),
        );
        let content = chk(7);
        let signed = ssk(11, "freesite/activelink.png", "image bytes");
        let cached = chk(8);
        {
            let node = BlockStores::open(dir.path(), &config).unwrap();
            node.content_hash.put(&content, PutFlags::default()).unwrap();
            node.content_hash
                .put(
                    &cached,
                    PutFlags::default()
                        .with_datastore(false)
                        .with_client_cache(true),
                )
                .unwrap();
            node.signed_subspace.put(&signed, PutFlags::default()).unwrap();
            node.flush().unwrap();
        }

        let node = BlockStores::open(dir.path(), &config).unwrap();
        assert_eq!(node.content_hash.key_count(), 1);
        assert_eq!(node.public_keys.key_count(), 1);
        assert!(node
            .content_hash
            .fetch(&content.key(), FetchFlags::default())
            .unwrap()
            .is_some());
        assert!(node
            .content_hash
            .fetch(&cached.key(), FetchFlags::local())
            .unwrap()
            .is_some());

        let bare_key =
            SubspaceKey::new(*signed.key().pubkey_hash(), *signed.key().docname_hash());
        let fetched = node
            .signed_subspace
            .fetch(&bare_key, FetchFlags::default())
            .unwrap()
            .unwrap();
        assert_eq!(fetched.content(), b"image bytes");
    }
}
