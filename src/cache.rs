//! Tiered Cache Facade
//!
//! One artifact-oriented API over both tiers: write-through stores, a
//! memory-first/disk-fallback lookup protocol, composite clears, and the
//! expiry-sweep entrypoints. Disk writes drain through one serial queue so
//! disk latency never blocks the caller and queued operations never race
//! each other.

use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use once_cell::sync::OnceCell;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::artifact::Artifact;
use crate::config::Config;
use crate::disk::DiskCache;
use crate::error::{CacheError, Result};
use crate::expiration::Expiration;
use crate::memory::MemoryCache;

// == Lookup Outcomes ==
/// Which tier answered a liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLocation {
    /// The memory tier holds a live entry (authoritative; disk not checked).
    Memory,
    /// Only the disk tier holds a live entry.
    Disk,
    /// Neither tier holds a live entry.
    None,
}

/// A lookup result carrying the artifact and the tier that served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheHit<A> {
    /// Served from the memory tier.
    Memory(A),
    /// Served from the disk tier (decoded from the stored bytes).
    Disk(A),
    /// No live entry, or the entry could not be read or decoded.
    Miss,
}

impl<A> CacheHit<A> {
    /// The artifact, regardless of which tier served it.
    pub fn into_artifact(self) -> Option<A> {
        match self {
            CacheHit::Memory(artifact) | CacheHit::Disk(artifact) => Some(artifact),
            CacheHit::Miss => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, CacheHit::Miss)
    }
}

// == Store Receipt ==
/// Per-tier outcome of a `store`.
///
/// The memory result is in hand when the call returns; the disk write is
/// queued, and its outcome arrives through [`StoreReceipt::disk`].
#[derive(Debug)]
pub struct StoreReceipt {
    /// Outcome of the synchronous memory-tier store.
    pub memory: Result<()>,
    disk: DiskOutcome,
}

#[derive(Debug)]
enum DiskOutcome {
    /// Persistence was not requested.
    Skipped,
    /// The outcome was known before anything was queued.
    Ready(Result<()>),
    /// A queued write will report here when the queue drains to it.
    Pending(oneshot::Receiver<Result<()>>),
}

impl StoreReceipt {
    /// Waits for the disk-tier outcome. `None` when persistence was skipped.
    ///
    /// A `store` immediately followed by a disk read is not guaranteed to
    /// observe the written entry until this has resolved; the memory tier
    /// has no such gap.
    pub async fn disk(self) -> Option<Result<()>> {
        match self.disk {
            DiskOutcome::Skipped => None,
            DiskOutcome::Ready(result) => Some(result),
            DiskOutcome::Pending(completion) => {
                Some(completion.await.unwrap_or_else(|_| Err(writer_stopped())))
            }
        }
    }
}

// == Disk Write Queue ==
/// Work items for the serial disk worker. Removals travel the same queue as
/// writes so an earlier queued write can never land after a later removal.
enum DiskJob {
    Store {
        key: String,
        bytes: Vec<u8>,
        expiration: Expiration,
        done: oneshot::Sender<Result<()>>,
    },
    Remove {
        key: String,
        done: oneshot::Sender<Result<()>>,
    },
    Clear {
        done: oneshot::Sender<Result<()>>,
    },
}

fn writer_stopped() -> CacheError {
    CacheError::Internal("disk writer task is no longer running".to_string())
}

fn spawn_disk_writer(disk: Arc<DiskCache>, mut jobs: mpsc::UnboundedReceiver<DiskJob>) {
    // The worker runs detached; it exits once every sender to the queue has
    // been dropped.
    let _ = tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            match job {
                DiskJob::Store {
                    key,
                    bytes,
                    expiration,
                    done,
                } => {
                    let result = disk.store(&key, &bytes, expiration);
                    if let Err(err) = &result {
                        warn!(key = %key, error = %err, "Queued disk write failed");
                    }
                    let _ = done.send(result);
                }
                DiskJob::Remove { key, done } => {
                    let result = disk.remove(&key);
                    if let Err(err) = &result {
                        warn!(key = %key, error = %err, "Queued disk removal failed");
                    }
                    let _ = done.send(result);
                }
                DiskJob::Clear { done } => {
                    let result = disk.remove_all();
                    if let Err(err) = &result {
                        warn!(error = %err, "Queued disk clear failed");
                    }
                    let _ = done.send(result);
                }
            }
        }
    });
}

// == Tiered Cache ==
/// Two-tier artifact cache: a memory tier in front of a disk tier.
///
/// Stores write the memory tier synchronously and queue the disk write;
/// lookups check memory first and fall back to disk. Must be created inside
/// a Tokio runtime (the tiers' background tasks are spawned on
/// construction). Dropping the facade drops the queue sender; the worker
/// drains what was already queued and exits.
pub struct TieredCache<A: Artifact> {
    memory: MemoryCache<A>,
    disk: Arc<DiskCache>,
    jobs: mpsc::UnboundedSender<DiskJob>,
    disk_ttl: Expiration,
    promote_disk_hits: bool,
}

impl<A: Artifact> TieredCache<A> {
    // == Constructors ==
    /// Builds a facade over caller-supplied tiers.
    pub fn new(memory: MemoryCache<A>, disk: DiskCache, config: &Config) -> Self {
        let disk = Arc::new(disk);
        let (jobs, queue) = mpsc::unbounded_channel();
        spawn_disk_writer(disk.clone(), queue);

        Self {
            memory,
            disk,
            jobs,
            disk_ttl: config.disk_ttl,
            promote_disk_hits: config.promote_disk_hits,
        }
    }

    /// Builds a facade with system-sized defaults: the memory cost limit is
    /// a quarter of physical memory and the disk tier lives under the user
    /// cache root in a directory named `name`.
    pub fn with_defaults(name: &str) -> Result<Self> {
        let config = Config::sized_from_system();
        let memory = MemoryCache::new(&config);
        let disk = DiskCache::new(default_cache_dir(name)?)?;

        Ok(Self::new(memory, disk, &config))
    }

    // == Store ==
    /// Decodes `bytes`, stores the artifact in the memory tier, and queues
    /// the raw bytes for the disk tier.
    ///
    /// A decode failure reports [`CacheError::ArtifactDecode`] on both
    /// channels of the receipt and persists nothing.
    pub async fn store(&self, key: &str, bytes: &[u8]) -> StoreReceipt {
        self.store_inner(key, bytes, true).await
    }

    /// `store` without the disk tier; the receipt's disk outcome is absent.
    pub async fn store_memory_only(&self, key: &str, bytes: &[u8]) -> StoreReceipt {
        self.store_inner(key, bytes, false).await
    }

    async fn store_inner(&self, key: &str, bytes: &[u8], persist_to_disk: bool) -> StoreReceipt {
        let artifact = match A::decode(bytes) {
            Some(artifact) => artifact,
            None => {
                // Bytes the process cannot decode would also poison every
                // later disk hit, so they are not persisted either.
                return StoreReceipt {
                    memory: Err(CacheError::ArtifactDecode(key.to_string())),
                    disk: DiskOutcome::Ready(Err(CacheError::ArtifactDecode(key.to_string()))),
                };
            }
        };

        self.memory.store(key, artifact).await;

        if !persist_to_disk {
            return StoreReceipt {
                memory: Ok(()),
                disk: DiskOutcome::Skipped,
            };
        }

        let (done, completion) = oneshot::channel();
        let job = DiskJob::Store {
            key: key.to_string(),
            bytes: bytes.to_vec(),
            expiration: self.disk_ttl,
            done,
        };
        let disk = match self.jobs.send(job) {
            Ok(()) => DiskOutcome::Pending(completion),
            Err(_) => DiskOutcome::Ready(Err(writer_stopped())),
        };

        StoreReceipt {
            memory: Ok(()),
            disk,
        }
    }

    // == Is Cached ==
    /// Which tier currently holds a live entry for `key`.
    ///
    /// The memory check refreshes the entry's TTL and short-circuits the
    /// disk check. Disk-tier errors are treated as absence.
    pub async fn is_cached(&self, key: &str) -> CacheLocation {
        if self.memory.contains(key).await {
            return CacheLocation::Memory;
        }

        match self.disk.contains(key) {
            Ok(true) => CacheLocation::Disk,
            Ok(false) => CacheLocation::None,
            Err(err) => {
                debug!(key = %key, error = %err, "Disk liveness check failed; treating as absent");
                CacheLocation::None
            }
        }
    }

    // == Lookup ==
    /// Returns the artifact for `key` from the closest tier holding a live
    /// entry.
    ///
    /// A disk hit refreshes the file's TTL and, when promotion is enabled,
    /// repopulates the memory tier. Disk read and decode failures collapse
    /// to a miss.
    pub async fn lookup(&self, key: &str) -> CacheHit<A> {
        if let Some(artifact) = self.memory.lookup(key).await {
            return CacheHit::Memory(artifact);
        }

        let bytes = match self.disk.lookup(key, self.disk_ttl) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return CacheHit::Miss,
            Err(err) => {
                debug!(key = %key, error = %err, "Disk lookup failed; treating as a miss");
                return CacheHit::Miss;
            }
        };

        match A::decode(&bytes) {
            Some(artifact) => {
                if self.promote_disk_hits {
                    self.memory.store(key, artifact.clone()).await;
                }
                CacheHit::Disk(artifact)
            }
            None => {
                debug!(key = %key, "Cached bytes failed to decode; treating as a miss");
                CacheHit::Miss
            }
        }
    }

    // == Remove ==
    /// Removes `key` from both tiers. The disk removal travels the serial
    /// queue, so it also cancels any queued write for the key; the call
    /// waits for it to complete.
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.memory.remove(key).await;

        let (done, completion) = oneshot::channel();
        self.jobs
            .send(DiskJob::Remove {
                key: key.to_string(),
                done,
            })
            .map_err(|_| writer_stopped())?;

        completion.await.unwrap_or_else(|_| Err(writer_stopped()))
    }

    // == Remove All ==
    /// Clears both tiers. This is the only composite clear; clearing one
    /// tier directly leaves the other untouched.
    pub async fn remove_all(&self) -> Result<()> {
        self.memory.remove_all().await;

        let (done, completion) = oneshot::channel();
        self.jobs
            .send(DiskJob::Clear { done })
            .map_err(|_| writer_stopped())?;

        completion.await.unwrap_or_else(|_| Err(writer_stopped()))
    }

    // == Expiry Sweeps ==
    /// Sweeps expired entries out of the memory tier now and returns the
    /// number removed. This is the entrypoint a low-memory notification
    /// should invoke.
    pub async fn remove_expired(&self) -> usize {
        self.memory.sweep().await
    }

    /// Sweeps expired files out of the disk tier and returns the number
    /// deleted. Independent of the memory sweep.
    pub fn remove_expired_on_disk(&self) -> usize {
        self.disk.sweep()
    }

    // == Tier Access ==
    /// The memory tier.
    pub fn memory(&self) -> &MemoryCache<A> {
        &self.memory
    }

    /// The disk tier.
    pub fn disk(&self) -> &DiskCache {
        &self.disk
    }
}

// == Shared Instance ==
static SHARED: OnceCell<TieredCache<Vec<u8>>> = OnceCell::new();

impl TieredCache<Vec<u8>> {
    /// The lazily-initialized process-wide byte cache, built with
    /// [`TieredCache::with_defaults`] on first use.
    ///
    /// At most one instance is ever created. A failed construction leaves
    /// the slot empty, so a later call tries again.
    pub fn shared() -> Result<&'static Self> {
        SHARED.get_or_try_init(|| Self::with_defaults("tiercache"))
    }
}

fn default_cache_dir(name: &str) -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", name)
        .ok_or_else(|| CacheError::DirectoryCreation(name.to_string()))?;

    Ok(dirs.cache_dir().to_path_buf())
}
