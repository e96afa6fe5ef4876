use std::sync::Arc;

use super::{check_kind, FetchFlags, PublicKeyStore, PutFlags, TieredStore};
use crate::domain::entities::PutOutcome;
use crate::domain::errors::StoreError;
use crate::domain::formats::{Block, BlockKind, ConstructContext, SignedSubspaceBlock, SubspaceKey};
use crate::ports::outbound::RecordStore;

/// Store of signed-subspace blocks.
///
/// Verification keys come from the fetch key when it carries one, otherwise
/// from the shared public-key store.
pub struct SignedSubspaceStore<R: RecordStore> {
    pub(super) tiers: TieredStore<R>,
    public_keys: Arc<PublicKeyStore<R>>,
}

impl<R: RecordStore> SignedSubspaceStore<R> {
    pub fn new(
        tiers: TieredStore<R>,
        public_keys: Arc<PublicKeyStore<R>>,
    ) -> Result<Self, StoreError> {
        check_kind(&tiers, BlockKind::SignedSubspace)?;
        Ok(Self { tiers, public_keys })
    }

    pub fn tiers(&self) -> &TieredStore<R> {
        &self.tiers
    }

    pub fn public_keys(&self) -> &Arc<PublicKeyStore<R>> {
        &self.public_keys
    }

    pub fn fetch(
        &self,
        key: &SubspaceKey,
        flags: FetchFlags,
    ) -> Result<Option<SignedSubspaceBlock>, StoreError> {
        let full_key = key.to_bytes();
        let mut ctx = ConstructContext::default()
            .with_full_key(&full_key)
            .with_key_source(&*self.public_keys);
        if let Some(pubkey) = key.public_key() {
            ctx = ctx.with_verification_key(pubkey);
        }
        Ok(self
            .tiers
            .fetch_block(&key.routing_key(), flags, ctx)?
            .and_then(Block::into_signed_subspace))
    }

    /// Store `block` and its verification key.
    ///
    /// Fails with `KeyCollision` if a different block holds the same document
    /// name and `flags.overwrite` is not set.
    pub fn put(
        &self,
        block: &SignedSubspaceBlock,
        flags: PutFlags,
    ) -> Result<Option<PutOutcome>, StoreError> {
        self.public_keys
            .put(block.public_key(), flags.with_overwrite(false))?;
        self.tiers.put_block(block, flags)
    }
}
