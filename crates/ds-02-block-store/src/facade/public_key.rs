use super::{check_kind, FetchFlags, PutFlags, TieredStore};
use crate::domain::entities::PutOutcome;
use crate::domain::errors::StoreError;
use crate::domain::formats::{Block, BlockKind, ConstructContext, PublicKeyRecord, PublicKeySource};
use crate::domain::keys::RoutingKey;
use crate::ports::outbound::RecordStore;

/// Store of verification keys, addressed by key hash.
pub struct PublicKeyStore<R: RecordStore> {
    pub(super) tiers: TieredStore<R>,
}

impl<R: RecordStore> PublicKeyStore<R> {
    pub fn new(tiers: TieredStore<R>) -> Result<Self, StoreError> {
        check_kind(&tiers, BlockKind::PublicKey)?;
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &TieredStore<R> {
        &self.tiers
    }

    pub fn fetch(
        &self,
        hash: &RoutingKey,
        flags: FetchFlags,
    ) -> Result<Option<PublicKeyRecord>, StoreError> {
        Ok(self
            .tiers
            .fetch_block(hash, flags, ConstructContext::default())?
            .and_then(Block::into_public_key))
    }

    pub fn put(
        &self,
        record: &PublicKeyRecord,
        flags: PutFlags,
    ) -> Result<Option<PutOutcome>, StoreError> {
        self.tiers.put_block(record, flags)
    }
}

impl<R: RecordStore> PublicKeySource for PublicKeyStore<R> {
    fn public_key(
        &self,
        pubkey_hash: &RoutingKey,
        can_read_client_cache: bool,
    ) -> Option<PublicKeyRecord> {
        let flags = FetchFlags {
            dont_promote: false,
            can_read_client_cache,
        };
        match self.fetch(pubkey_hash, flags) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("[ds-02] Public key lookup for {} failed: {}", pubkey_hash, e);
                None
            }
        }
    }
}
