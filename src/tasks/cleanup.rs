//! Expiry Sweep Task
//!
//! Background task that periodically removes expired memory-tier entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::artifact::Artifact;
use crate::memory::MemoryStore;

/// Spawns a background task that sweeps expired entries out of a memory
/// store on a fixed interval.
///
/// The task sleeps for `interval_secs` between runs and takes the store's
/// write lock for each sweep, so sweeps never interleave with stores or
/// removals. The returned handle is used to abort the task when the owning
/// tier is torn down.
pub fn spawn_cleanup_task<A: Artifact>(
    store: Arc<RwLock<MemoryStore<A>>>,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            interval_secs,
            "Starting expiry sweep task for the memory tier"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut store = store.write().await;
                store.sweep()
            };

            if removed > 0 {
                info!(removed, "Expiry sweep removed entries");
            } else {
                debug!("Expiry sweep found nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::expiration::Expiration;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let store = Arc::new(RwLock::new(MemoryStore::new(
            usize::MAX,
            usize::MAX,
            Expiration::Seconds(1),
        )));

        store.write().await.store("expire_soon", b"value".to_vec());

        let handle = spawn_cleanup_task(store.clone(), 1);

        // Wait for the entry to expire and the sweep to run.
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(
            store.read().await.is_empty(),
            "Expired entry should have been swept"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_live_entries() {
        let store = Arc::new(RwLock::new(MemoryStore::new(
            usize::MAX,
            usize::MAX,
            Expiration::Hours(1),
        )));

        store.write().await.store("long_lived", b"value".to_vec());

        let handle = spawn_cleanup_task(store.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            store.write().await.lookup("long_lived").as_deref(),
            Some(b"value".as_slice()),
            "Live entry should not be removed"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let store = Arc::new(RwLock::new(MemoryStore::<Vec<u8>>::new(
            usize::MAX,
            usize::MAX,
            Expiration::Never,
        )));

        let handle = spawn_cleanup_task(store, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
