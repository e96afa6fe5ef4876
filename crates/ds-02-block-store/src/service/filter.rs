//! Membership filter maintenance and persistence.

use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;

use ds_01_membership_filter::MembershipFilter;

use super::BlockStore;
use crate::domain::config::StoreConfig;
use crate::domain::errors::StoreError;
use crate::ports::inbound::BlockStoreApi;
use crate::ports::outbound::RecordStore;

impl<R: RecordStore> BlockStore<R> {
    /// Rebuild the filter from the live key set, dropping stale entries.
    pub fn rebuild_filter(&self) -> Result<(), StoreError> {
        self.rebuild_filter_for(self.max_keys())
    }

    /// Rebuild sized for at least `max_keys` entries, up to the size ceiling.
    pub(crate) fn rebuild_filter_for(&self, max_keys: u64) -> Result<(), StoreError> {
        let recency = self.recency.lock();
        let expected = self
            .config
            .filter_config(max_keys.max(recency.len() as u64))
            .expected_keys;
        self.filter.rebuild(recency.keys(), expected)?;
        Ok(())
    }

    pub(crate) fn maybe_rebuild_filter(&self) -> Result<(), StoreError> {
        let stale = self.filter.stale_entries();
        let threshold = (self.filter.capacity() as f64 * self.config.stale_rebuild_ratio) as u64;
        if stale > threshold {
            tracing::debug!(
                "[ds-02] '{}' filter has {} stale entries (threshold {}), rebuilding",
                self.name,
                stale,
                threshold
            );
            self.rebuild_filter()?;
        }
        Ok(())
    }

    /// Flush records and save the filter image once.
    pub(crate) fn persist_filter(&self) -> Result<(), StoreError> {
        let Some(path) = &self.filter_path else {
            return Ok(());
        };
        if self.filter_saved.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.records.flush()?;
        let recency = self.recency.lock();
        self.filter.save(path, recency.len() as u64)?;
        tracing::info!(
            "[ds-02] '{}' saved filter image ({} keys) to {}",
            self.name,
            recency.len(),
            path.display()
        );
        Ok(())
    }
}

/// Load and delete a saved filter image.
///
/// Returns `None`, so the caller rebuilds, when the image is missing,
/// unreadable, sized differently or was saved for a different key count.
pub(super) fn load_persisted(
    path: &Path,
    config: &StoreConfig,
    live_keys: u64,
) -> Option<MembershipFilter> {
    if !path.exists() {
        return None;
    }
    let loaded = MembershipFilter::load(path, config.filter_config(config.max_keys.max(live_keys)));
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!("[ds-02] Could not delete {}: {}", path.display(), e);
    }

    match loaded {
        Ok((filter, saved_keys)) if saved_keys == live_keys => {
            tracing::info!("[ds-02] Loaded filter image {}", path.display());
            Some(filter)
        }
        Ok((_, saved_keys)) => {
            tracing::warn!(
                "[ds-02] Filter image {} was saved for {} keys, store has {}; rebuilding",
                path.display(),
                saved_keys,
                live_keys
            );
            None
        }
        Err(e) => {
            tracing::warn!(
                "[ds-02] Ignoring filter image {}: {}; rebuilding",
                path.display(),
                e
            );
            None
        }
    }
}
