//! Fetch, put and eviction.

use std::sync::atomic::Ordering;

use super::BlockStore;
use crate::domain::entities::{PutOutcome, RawEntry, StoredRecord};
use crate::domain::errors::{StoreError, StoreIoError, VerifyError};
use crate::domain::formats::{check_len, Block, ConstructContext, StorableBlock};
use crate::domain::keys::RoutingKey;
use crate::ports::inbound::BlockStoreApi;
use crate::ports::outbound::RecordStore;

/// What a put found under its routing key.
enum Existing {
    Absent,
    /// Present; contents not needed for this kind
    Present,
    Holds(StoredRecord),
}

impl<R: RecordStore> BlockStore<R> {
    /// Fetch the raw header and payload under `routing_key`.
    ///
    /// No block validation happens here beyond the record store's own
    /// integrity check. A supplied `full_key` is returned in place of the
    /// stored one; one that does not address `routing_key` is a miss.
    pub fn fetch(
        &self,
        routing_key: &RoutingKey,
        full_key: Option<&[u8]>,
        dont_promote: bool,
    ) -> Result<Option<RawEntry>, StoreError> {
        if full_key.is_some_and(|full_key| !self.full_key_addresses(routing_key, full_key)) {
            self.metrics.record_miss();
            return Ok(None);
        }
        if !self.filter.might_contain(routing_key.as_ref()) {
            self.metrics.record_miss();
            return Ok(None);
        }

        let _guard = self.key_locks.lock(routing_key);
        let Some(record) = self.read_record(routing_key)? else {
            return Ok(None);
        };
        self.record_hit(routing_key, dont_promote);

        Ok(Some(RawEntry {
            routing_key: *routing_key,
            header: record.header,
            payload: record.payload,
            full_key: full_key.map(<[u8]>::to_vec).or(record.full_key),
        }))
    }

    /// Fetch and fully validate the block under `routing_key`.
    ///
    /// An entry that fails validation as corrupt is removed and reported as a
    /// miss. An entry that cannot be validated with the context given (missing
    /// or mismatched key material) is kept and reported as a miss, as is a
    /// context full key that does not address `routing_key`.
    pub fn fetch_block(
        &self,
        routing_key: &RoutingKey,
        dont_promote: bool,
        ctx: &ConstructContext<'_>,
    ) -> Result<Option<Block>, StoreError> {
        if ctx
            .full_key
            .is_some_and(|full_key| !self.full_key_addresses(routing_key, full_key))
        {
            self.metrics.record_miss();
            return Ok(None);
        }
        if !self.filter.might_contain(routing_key.as_ref()) {
            self.metrics.record_miss();
            return Ok(None);
        }

        let _guard = self.key_locks.lock(routing_key);
        let Some(record) = self.read_record(routing_key)? else {
            return Ok(None);
        };

        let ctx = ConstructContext {
            full_key: ctx.full_key.or(record.full_key.as_deref()),
            ..*ctx
        };
        match self
            .kind
            .construct(&record.payload, &record.header, routing_key, &ctx)
        {
            Ok(block) => {
                self.record_hit(routing_key, dont_promote);
                Ok(Some(block))
            }
            Err(err) if err.is_corruption() => {
                tracing::warn!(
                    "[ds-02] '{}' removing corrupt entry {}: {}",
                    self.name,
                    routing_key,
                    err
                );
                self.remove_corrupt(routing_key)?;
                self.metrics.record_miss();
                Ok(None)
            }
            Err(err) => {
                tracing::debug!(
                    "[ds-02] '{}' cannot construct {}: {}",
                    self.name,
                    routing_key,
                    err
                );
                self.metrics.record_miss();
                Ok(None)
            }
        }
    }

    /// Store a header/payload pair under `routing_key`.
    ///
    /// Without `overwrite`, an existing entry is kept: for kinds where
    /// collisions are impossible it is simply promoted, otherwise identical
    /// bytes are a no-op and different bytes fail with `KeyCollision`.
    /// Full keys are ignored for kinds that do not keep them.
    pub fn put(
        &self,
        routing_key: RoutingKey,
        header: &[u8],
        payload: &[u8],
        full_key: Option<&[u8]>,
        overwrite: bool,
    ) -> Result<PutOutcome, StoreError> {
        let spec = self.kind.spec();
        check_len("header", spec.header_len, header.len())?;
        check_len("payload", spec.payload_len, payload.len())?;
        let full_key = full_key.filter(|_| spec.store_full_keys);
        if let Some(full_key) = full_key {
            self.check_full_key(&routing_key, full_key)?;
        }

        let outcome = {
            let _guard = self.key_locks.lock(&routing_key);
            let outcome = match self.existing_entry(&routing_key)? {
                Existing::Absent => PutOutcome::Stored,
                _ if overwrite => PutOutcome::Replaced,
                Existing::Holds(existing)
                    if existing.header != header || existing.payload != payload =>
                {
                    tracing::debug!("[ds-02] '{}' collision on {}", self.name, routing_key);
                    return Err(StoreError::KeyCollision { key: routing_key });
                }
                Existing::Present | Existing::Holds(_) => {
                    self.touch(&routing_key);
                    return Ok(PutOutcome::AlreadyPresent);
                }
            };

            let record = StoredRecord {
                routing_key,
                header: header.to_vec(),
                payload: payload.to_vec(),
                full_key: full_key.map(<[u8]>::to_vec),
                generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            };
            self.records.write(&record)?;
            self.touch(&routing_key);
            self.metrics.record_write();
            outcome
        };

        self.enforce_capacity()?;
        Ok(outcome)
    }

    /// Store any block of this store's kind.
    pub fn put_block<B: StorableBlock + ?Sized>(
        &self,
        block: &B,
        overwrite: bool,
    ) -> Result<PutOutcome, StoreError> {
        if block.kind() != self.kind {
            return Err(StoreError::KindMismatch {
                expected: self.kind,
                actual: block.kind(),
            });
        }
        let full_key = block.full_key();
        self.put(
            block.routing_key(),
            block.header(),
            block.payload(),
            full_key.as_deref(),
            overwrite,
        )
    }

    /// Evict least-recently-used entries until the store fits its capacity.
    ///
    /// Must be called without any key stripe held. Returns the number evicted.
    pub(crate) fn enforce_capacity(&self) -> Result<u64, StoreError> {
        let mut evicted = 0;
        loop {
            let victim = {
                let mut recency = self.recency.lock();
                if recency.len() as u64 <= self.max_keys() {
                    break;
                }
                match recency.pop_least_recent() {
                    Some(victim) => victim,
                    None => break,
                }
            };

            let _guard = self.key_locks.lock(&victim);
            // A put may have re-inserted the victim before we took its stripe.
            if self.recency.lock().contains(&victim) {
                continue;
            }
            if let Err(e) = self.records.remove(&victim) {
                self.touch(&victim);
                return Err(e.into());
            }
            self.filter.mark_stale(1);
            self.metrics.record_eviction();
            evicted += 1;
            tracing::debug!("[ds-02] '{}' evicted {}", self.name, victim);
        }

        if evicted > 0 {
            self.maybe_rebuild_filter()?;
        }
        Ok(evicted)
    }

    fn existing_entry(&self, routing_key: &RoutingKey) -> Result<Existing, StoreError> {
        if !self.kind.spec().collision_possible {
            return Ok(if self.records.contains(routing_key)? {
                Existing::Present
            } else {
                Existing::Absent
            });
        }
        match self.records.read(routing_key) {
            Ok(Some(record)) => Ok(Existing::Holds(record)),
            Ok(None) => Ok(Existing::Absent),
            Err(StoreIoError::CorruptRecord { reason, .. }) => {
                tracing::warn!(
                    "[ds-02] '{}' overwriting corrupt entry {}: {}",
                    self.name,
                    routing_key,
                    reason
                );
                Ok(Existing::Absent)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read under the key stripe. Misses, including corrupt records, are
    /// counted here.
    fn read_record(&self, routing_key: &RoutingKey) -> Result<Option<StoredRecord>, StoreError> {
        match self.records.read(routing_key) {
            Ok(Some(mut record)) => {
                if let Some(stored) = &record.full_key {
                    if self.kind.routing_key_from_full_key(stored).ok() != Some(*routing_key) {
                        tracing::debug!(
                            "[ds-02] '{}' ignoring stored full key for {}",
                            self.name,
                            routing_key
                        );
                        record.full_key = None;
                    }
                }
                Ok(Some(record))
            }
            Ok(None) => {
                self.filter.record_false_positive();
                self.metrics.record_miss();
                Ok(None)
            }
            Err(StoreIoError::CorruptRecord { reason, .. }) => {
                tracing::warn!(
                    "[ds-02] '{}' removing unreadable entry {}: {}",
                    self.name,
                    routing_key,
                    reason
                );
                self.remove_corrupt(routing_key)?;
                self.metrics.record_miss();
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn check_full_key(&self, routing_key: &RoutingKey, full_key: &[u8]) -> Result<(), StoreError> {
        if self.kind.routing_key_from_full_key(full_key)? != *routing_key {
            return Err(VerifyError::KeyMismatch("full key").into());
        }
        Ok(())
    }

    fn full_key_addresses(&self, routing_key: &RoutingKey, full_key: &[u8]) -> bool {
        match self.kind.routing_key_from_full_key(full_key) {
            Ok(derived) if derived == *routing_key => true,
            Ok(_) => {
                tracing::debug!(
                    "[ds-02] '{}' full key does not address {}",
                    self.name,
                    routing_key
                );
                false
            }
            Err(err) => {
                tracing::debug!(
                    "[ds-02] '{}' unusable full key for {}: {}",
                    self.name,
                    routing_key,
                    err
                );
                false
            }
        }
    }

    fn record_hit(&self, routing_key: &RoutingKey, dont_promote: bool) {
        self.metrics.record_hit();
        if !dont_promote {
            self.recency.lock().promote(routing_key);
        }
    }

    /// Mark `routing_key` most recent and present in the filter.
    fn touch(&self, routing_key: &RoutingKey) {
        let mut recency = self.recency.lock();
        self.filter.insert(routing_key.as_ref());
        recency.insert(*routing_key);
    }

    fn remove_corrupt(&self, routing_key: &RoutingKey) -> Result<(), StoreError> {
        self.records.remove(routing_key)?;
        self.recency.lock().remove(routing_key);
        self.filter.mark_stale(1);
        self.metrics.record_corrupt_removal();
        Ok(())
    }
}
