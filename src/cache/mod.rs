//! Installation caching
//!
//! An installation is cached as a snapshot of its `TEXDIR` under a
//! three-tier key (see [`keys`]). A restore falls into one of three states:
//!
//! | State | Restored | Meaning |
//! |-------|----------|---------|
//! | Hit | yes | Same release and package set |
//! | Partial | yes | Same release, packages must be installed |
//! | Miss | no | Fresh install needed |
//!
//! Store failures never fail a run: a failed restore is a miss and a failed
//! save is logged.

pub mod keys;
pub mod state;
pub mod store;

pub use keys::{CacheKeyManager, CacheKeys, Restoration};
pub use state::SavedState;
pub use store::{CacheStore, LocalCacheStore};

use std::path::PathBuf;
use tracing::{info, warn};

/// What the current run knows about its cache entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
    pub restored: bool,
    /// Implies `restored`
    pub hit: bool,
    /// Save a fresh snapshot even on a hit
    pub forced_update: bool,
    pub target_path: Option<PathBuf>,
    /// Key the entry was restored from
    pub effective_key: Option<String>,
}

impl CacheEntry {
    fn from_restore(keys: &CacheKeys, matched: Option<String>, target: PathBuf) -> Self {
        let restoration = keys.classify(matched.as_deref());
        Self {
            restored: restoration != Restoration::Miss,
            hit: restoration == Restoration::Hit,
            forced_update: false,
            target_path: Some(target),
            effective_key: matched,
        }
    }

    /// Whether the save phase should write a snapshot
    pub fn needs_save(&self) -> bool {
        !self.hit || self.forced_update
    }
}

/// Restore `target` for `keys`, degrading store failures to a miss
pub async fn restore(store: &dyn CacheStore, keys: &CacheKeys, target: PathBuf) -> CacheEntry {
    let matched = match store
        .restore(&[target.clone()], &keys.unique, &keys.restore_keys())
        .await
    {
        Ok(matched) => matched,
        Err(e) => {
            warn!("Cache restore failed, continuing without cache: {}", e);
            None
        }
    };
    let entry = CacheEntry::from_restore(keys, matched, target);
    match entry.effective_key {
        Some(ref key) => info!("Cache {} on {}", keys.classify(Some(key)), key),
        None => info!("Cache miss"),
    }
    entry
}

/// Save `target` under `key`; failures are logged only
pub async fn save(store: &dyn CacheStore, key: &str, target: PathBuf) {
    match store.save(&[target], key).await {
        Ok(Some(size)) => info!("Cache saved as {} ({} bytes)", key, size),
        Ok(None) => info!("Cache entry {} already exists, not saved", key),
        Err(e) => warn!("Cache save failed: {}", e),
    }
}
