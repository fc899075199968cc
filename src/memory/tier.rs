//! Memory Tier Handle
//!
//! Wraps the [`MemoryStore`] in the tier lock and owns the periodic sweep
//! task. All tier operations serialize through the lock, including the
//! sweep, so a sweep and a store never interleave.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::artifact::Artifact;
use crate::config::Config;
use crate::expiration::Expiration;
use crate::memory::{CacheStats, MemoryStore};
use crate::tasks::spawn_cleanup_task;

// == Memory Cache ==
/// The memory tier: a lock-protected [`MemoryStore`] plus its fixed-interval
/// sweep task.
///
/// Must be created inside a Tokio runtime (the sweep task is spawned on
/// construction). Dropping the tier aborts the sweep task.
#[derive(Debug)]
pub struct MemoryCache<A: Artifact> {
    store: Arc<RwLock<MemoryStore<A>>>,
    sweeper: JoinHandle<()>,
}

impl<A: Artifact> MemoryCache<A> {
    // == Constructor ==
    /// Creates the tier from `config` and starts the sweep task.
    pub fn new(config: &Config) -> Self {
        let store = Arc::new(RwLock::new(MemoryStore::new(
            config.count_limit,
            config.cost_limit,
            config.memory_ttl,
        )));
        let sweeper = spawn_cleanup_task(store.clone(), config.clean_interval_secs);

        Self { store, sweeper }
    }

    /// Stores an artifact under `key`, overwriting any previous entry.
    pub async fn store(&self, key: impl Into<String>, artifact: A) {
        self.store.write().await.store(key, artifact);
    }

    /// Stores an artifact with an explicit TTL instead of the tier default.
    pub async fn store_with_expiration(
        &self,
        key: impl Into<String>,
        artifact: A,
        expiration: Expiration,
    ) {
        self.store
            .write()
            .await
            .store_with_expiration(key, artifact, expiration);
    }

    /// Returns a clone of the live artifact for `key`, refreshing its TTL.
    pub async fn lookup(&self, key: &str) -> Option<A> {
        self.store.write().await.lookup(key)
    }

    /// Liveness check with the same TTL-refresh semantics as `lookup`.
    pub async fn contains(&self, key: &str) -> bool {
        self.store.write().await.contains(key)
    }

    /// Deletes the entry for `key`, if any.
    pub async fn remove(&self, key: &str) {
        self.store.write().await.remove(key);
    }

    /// Deletes every entry. The disk tier is untouched.
    pub async fn remove_all(&self) {
        self.store.write().await.remove_all();
    }

    /// Removes expired entries now, without waiting for the next interval.
    /// Returns the number removed.
    pub async fn sweep(&self) -> usize {
        self.store.write().await.sweep()
    }

    /// Current number of entries.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Snapshot of the tier's performance counters.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }
}

impl<A: Artifact> Drop for MemoryCache<A> {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            clean_interval_secs: 3600,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_tier_store_and_lookup() {
        let tier: MemoryCache<Vec<u8>> = MemoryCache::new(&test_config());

        tier.store("k", b"artifact".to_vec()).await;

        assert_eq!(tier.lookup("k").await.as_deref(), Some(b"artifact".as_slice()));
        assert!(tier.contains("k").await);
        assert_eq!(tier.len().await, 1);
    }

    #[tokio::test]
    async fn test_tier_remove_all() {
        let tier: MemoryCache<Vec<u8>> = MemoryCache::new(&test_config());

        tier.store("a", b"1".to_vec()).await;
        tier.store("b", b"2".to_vec()).await;
        tier.remove_all().await;

        assert!(tier.is_empty().await);
    }

    #[tokio::test]
    async fn test_tier_sweep_mixed_policies() {
        let tier: MemoryCache<Vec<u8>> = MemoryCache::new(&test_config());

        tier.store_with_expiration("dead1", b"1".to_vec(), Expiration::Expired)
            .await;
        tier.store_with_expiration("dead2", b"2".to_vec(), Expiration::Expired)
            .await;
        tier.store_with_expiration("kept", b"3".to_vec(), Expiration::Never)
            .await;

        assert_eq!(tier.sweep().await, 2);
        assert_eq!(tier.len().await, 1);
        assert!(tier.lookup("kept").await.is_some());
    }

    #[tokio::test]
    async fn test_dropping_tier_stops_sweeper() {
        let tier: MemoryCache<Vec<u8>> = MemoryCache::new(&test_config());
        let sweeper = tier.sweeper.abort_handle();

        drop(tier);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(sweeper.is_finished());
    }
}
