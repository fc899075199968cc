//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for both cache tiers and the facade.
///
/// File-level variants carry the path of the file that failed so callers can
/// report or reclaim it. Construction failures are fatal to the tier;
/// per-operation failures are surfaced to the caller; sweep-time failures
/// are swallowed and logged instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache directory could not be created; the disk tier is unusable.
    #[error("Failed to create cache directory: {0}")]
    DirectoryCreation(String),

    /// Writing a cache file failed.
    #[error("Failed to write cache file: {0}")]
    Write(String),

    /// The expiry timestamp could not be attached to a freshly written file.
    /// The file has been rolled back; the store did not happen.
    #[error("Failed to set expiry metadata on cache file: {0}")]
    MetadataWrite(String),

    /// The expiry timestamp of an existing cache file could not be read.
    #[error("Failed to read expiry metadata of cache file: {0}")]
    MetadataRead(String),

    /// Reading the contents of a cache file failed.
    #[error("Failed to read cache file: {0}")]
    Read(String),

    /// Deleting a cache file failed.
    #[error("Failed to delete cache file: {0}")]
    Delete(String),

    /// Deleting the cache directory failed.
    #[error("Failed to delete cache directory")]
    BulkDelete,

    /// Raw bytes could not be decoded into the in-memory artifact type.
    #[error("Failed to decode artifact for key: {0}")]
    ArtifactDecode(String),

    /// Internal fault, e.g. the disk writer task is no longer running.
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
