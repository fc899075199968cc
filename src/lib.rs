//! Tiercache - a two-tier TTL cache for binary artifacts
//!
//! A capacity-bounded memory tier in front of a filesystem-persisted disk
//! tier, coordinated by [`TieredCache`]: write-through stores with a serial
//! disk-write queue, memory-first lookups with disk fallback, TTL refresh on
//! every hit, and periodic sweeps that reclaim expired entries.
//!
//! Payloads are raw bytes at the boundary; the [`Artifact`] trait decides
//! what they decode to in memory.

pub mod artifact;
pub mod cache;
pub mod config;
pub mod disk;
pub mod error;
pub mod expiration;
pub mod memory;
pub mod tasks;

pub use artifact::Artifact;
pub use cache::{CacheHit, CacheLocation, StoreReceipt, TieredCache};
pub use config::Config;
pub use disk::DiskCache;
pub use error::{CacheError, Result};
pub use expiration::Expiration;
pub use memory::{CacheStats, MemoryCache};
pub use tasks::spawn_cleanup_task;
