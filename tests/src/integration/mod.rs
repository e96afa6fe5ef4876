//! # Integration Scenarios

pub mod concurrency;
pub mod persistence;
pub mod store_scenarios;

#[cfg(test)]
pub(crate) mod fixtures {
    use ds_02_block_store::{ContentHashBlock, SignedSubspaceBlock, StoreConfig};
    use shared_crypto::Ed25519KeyPair;

    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    pub fn config(max_keys: u64) -> StoreConfig {
        StoreConfig::default()
            .with_max_keys(max_keys)
            .with_key_lock_stripes(32)
    }

    pub fn chk(n: u32) -> ContentHashBlock {
        ContentHashBlock::encode(format!("integration block {n}").as_bytes()).unwrap()
    }

    pub fn ssk(seed: u8, document: &str, content: &str) -> SignedSubspaceBlock {
        let keypair = Ed25519KeyPair::from_seed([seed; 32]);
        SignedSubspaceBlock::sign(&keypair, document.as_bytes(), content.as_bytes()).unwrap()
    }
}
