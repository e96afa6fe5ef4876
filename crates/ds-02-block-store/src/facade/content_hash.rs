use super::{check_kind, FetchFlags, PutFlags, TieredStore};
use crate::domain::entities::PutOutcome;
use crate::domain::errors::StoreError;
use crate::domain::formats::{Block, BlockKind, ConstructContext, ContentHashBlock, ContentHashKey};
use crate::ports::outbound::RecordStore;

/// Store of immutable content-hash blocks.
pub struct ContentHashStore<R: RecordStore> {
    pub(super) tiers: TieredStore<R>,
}

impl<R: RecordStore> ContentHashStore<R> {
    pub fn new(tiers: TieredStore<R>) -> Result<Self, StoreError> {
        check_kind(&tiers, BlockKind::ContentHash)?;
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &TieredStore<R> {
        &self.tiers
    }

    pub fn fetch(
        &self,
        key: &ContentHashKey,
        flags: FetchFlags,
    ) -> Result<Option<ContentHashBlock>, StoreError> {
        let full_key = key.to_bytes();
        let ctx = ConstructContext::default().with_full_key(&full_key);
        Ok(self
            .tiers
            .fetch_block(&key.routing_key(), flags, ctx)?
            .and_then(Block::into_content_hash))
    }

    pub fn put(
        &self,
        block: &ContentHashBlock,
        flags: PutFlags,
    ) -> Result<Option<PutOutcome>, StoreError> {
        self.tiers.put_block(block, flags).map_err(|err| {
            if let StoreError::KeyCollision { key } = &err {
                tracing::error!("[ds-02] Impossible content-hash collision on {}", key);
            }
            err
        })
    }
}
