//! Bounded decision cache keyed by case fingerprint.
//!
//! Hits are re-issued with a fresh request id and timestamp and flagged
//! `from_cache`. Bundles that contain ERROR outputs are never stored, so a
//! transient critic failure is not replayed.

use moka::future::Cache;
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::{CacheConfig, Case, DecisionBundle};

/// Decision cache backed by moka.
#[derive(Clone)]
pub struct DecisionCache {
    entries: Cache<String, Arc<DecisionBundle>>,
}

impl DecisionCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Cache from configuration; `None` when caching is disabled.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enable_cache
            .then(|| Self::new(config.cache_size))
    }

    /// Look up a previous decision for an identical case.
    pub async fn get(&self, case: &Case) -> Option<DecisionBundle> {
        let fingerprint = case.fingerprint();
        let cached = self.entries.get(&fingerprint).await?;
        debug!(case_id = %case.id, fingerprint = %fingerprint, "Decision cache hit");
        Some(cached.reissued(case.id))
    }

    /// Store a decision unless it contains critic failures.
    ///
    /// Returns whether the bundle was stored.
    pub async fn insert(&self, bundle: &DecisionBundle) -> bool {
        if bundle.error_count() > 0 {
            debug!(
                request_id = %bundle.request_id,
                errors = bundle.error_count(),
                "Not caching decision with critic errors"
            );
            return false;
        }

        self.entries
            .insert(bundle.case_fingerprint.clone(), Arc::new(bundle.clone()))
            .await;
        true
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Approximate number of cached decisions.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl std::fmt::Debug for DecisionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
