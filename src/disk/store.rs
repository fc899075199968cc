//! Disk Tier Module
//!
//! Filesystem-backed key→bytes store. Each key maps to one file under the
//! cache directory; the file's modification timestamp holds the entry's
//! absolute expiry instant rather than the actual edit time. The directory
//! listing is therefore the whole persistent state, with no separate index
//! to fall out of sync.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::expiration::{is_expired_at, now_ms, Expiration};

// == Disk Cache ==
/// Filesystem-persisted cache tier.
///
/// Operations are not locked against each other; the filesystem is the
/// synchronization primitive. Writes go through a temporary file and a
/// rename, so readers never observe a partially written entry, but
/// concurrent same-key operations may still race on the expiry metadata.
#[derive(Debug)]
pub struct DiskCache {
    directory: PathBuf,
}

impl DiskCache {
    // == Constructor ==
    /// Creates the tier, creating `directory` (and parents) if needed.
    ///
    /// Fails with [`CacheError::DirectoryCreation`] when the directory
    /// cannot be created; the tier is unusable in that case.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .map_err(|_| CacheError::DirectoryCreation(directory.display().to_string()))?;

        Ok(Self { directory })
    }

    /// The directory backing this tier.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file a key's bytes live in.
    ///
    /// Filenames are the SHA-256 hex digest of the key, so keys may contain
    /// separators or other path-unsafe characters and may be arbitrarily
    /// long.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();

        self.directory.join(name)
    }

    // == Store ==
    /// Writes `bytes` for `key`, overwriting any previous entry, and encodes
    /// the resolved expiry instant in the file's modification timestamp.
    ///
    /// The store is all-or-nothing: content goes to a temporary file first
    /// and is renamed into place, and if the expiry timestamp cannot be set
    /// afterwards the just-renamed file is deleted again and
    /// [`CacheError::MetadataWrite`] is returned.
    pub fn store(&self, key: &str, bytes: &[u8], expiration: Expiration) -> Result<()> {
        let path = self.path_for(key);
        let tmp = tmp_path(&path);

        if fs::write(&tmp, bytes).is_err() {
            let _ = fs::remove_file(&tmp);
            return Err(CacheError::Write(path.display().to_string()));
        }
        if fs::rename(&tmp, &path).is_err() {
            let _ = fs::remove_file(&tmp);
            return Err(CacheError::Write(path.display().to_string()));
        }

        let mtime = filetime_from_ms(expiration.expires_at_from_now());
        if filetime::set_file_mtime(&path, mtime).is_err() {
            let _ = fs::remove_file(&path);
            return Err(CacheError::MetadataWrite(path.display().to_string()));
        }

        Ok(())
    }

    // == Lookup ==
    /// Returns the bytes for `key` if a live entry exists.
    ///
    /// An entry whose encoded expiry is not strictly in the future is a
    /// logical miss even though the file may persist until the next sweep.
    /// On a hit the expiry timestamp is refreshed from `refresh`,
    /// best-effort.
    pub fn lookup(&self, key: &str, refresh: Expiration) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(_) => return Err(CacheError::MetadataRead(path.display().to_string())),
        };

        let expires_at = ms_from_filetime(FileTime::from_last_modification_time(&meta));
        if is_expired_at(expires_at, now_ms()) {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|_| CacheError::Read(path.display().to_string()))?;

        let refreshed = filetime_from_ms(refresh.expires_at_from_now());
        let _ = filetime::set_file_mtime(&path, refreshed);

        Ok(Some(bytes))
    }

    // == Contains ==
    /// Metadata-only liveness check: no content read, no TTL refresh.
    pub fn contains(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(_) => return Err(CacheError::MetadataRead(path.display().to_string())),
        };

        let expires_at = ms_from_filetime(FileTime::from_last_modification_time(&meta));
        Ok(!is_expired_at(expires_at, now_ms()))
    }

    // == Remove ==
    /// Deletes the entry for `key`. Removing an absent entry succeeds.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.remove_path(&self.path_for(key))
    }

    /// Deletes a cache file by path.
    pub fn remove_path(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(_) => Err(CacheError::Delete(path.display().to_string())),
        }
    }

    // == Remove All ==
    /// Deletes the whole cache directory, then recreates it so the tier
    /// stays usable.
    pub fn remove_all(&self) -> Result<()> {
        fs::remove_dir_all(&self.directory).map_err(|_| CacheError::BulkDelete)?;
        fs::create_dir_all(&self.directory)
            .map_err(|_| CacheError::DirectoryCreation(self.directory.display().to_string()))?;

        Ok(())
    }

    // == Sweep ==
    /// Deletes every file whose encoded expiry has passed or whose metadata
    /// cannot be read. Best-effort: individual failures are logged and
    /// swallowed, never propagated.
    ///
    /// Returns the number of files deleted. Leftover temporary files from
    /// interrupted writes carry a real (past) modification time and are
    /// reclaimed by the same rule.
    pub fn sweep(&self) -> usize {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(error = %err, "Expiry sweep could not list the cache directory");
                return 0;
            }
        };

        let now = now_ms();
        let mut removed = 0;

        for entry in entries.flatten() {
            let path = entry.path();

            let expired = match entry.metadata() {
                Ok(meta) if !meta.is_file() => continue,
                Ok(meta) => {
                    is_expired_at(ms_from_filetime(FileTime::from_last_modification_time(&meta)), now)
                }
                // Unreadable metadata: the expiry is unknowable, reclaim.
                Err(_) => true,
            };

            if !expired {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "Failed to delete expired cache file");
                }
            }
        }

        removed
    }
}

// == Timestamp Codec ==
fn filetime_from_ms(ms: u64) -> FileTime {
    FileTime::from_unix_time((ms / 1000) as i64, ((ms % 1000) * 1_000_000) as u32)
}

fn ms_from_filetime(ft: FileTime) -> u64 {
    let secs = ft.unix_seconds().max(0) as u64;
    secs.saturating_mul(1000)
        .saturating_add(u64::from(ft.nanoseconds() / 1_000_000))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    use tempfile::TempDir;

    fn new_cache() -> (TempDir, DiskCache) {
        let dir = TempDir::new().expect("tempdir");
        let cache = DiskCache::new(dir.path().join("cache")).unwrap();
        (dir, cache)
    }

    #[test]
    fn test_round_trip() {
        let (_dir, cache) = new_cache();

        cache.store("k", b"payload", Expiration::Never).unwrap();
        let bytes = cache.lookup("k", Expiration::Never).unwrap();

        assert_eq!(bytes.as_deref(), Some(b"payload".as_slice()));
    }

    #[test]
    fn test_lookup_absent_key() {
        let (_dir, cache) = new_cache();
        assert!(cache.lookup("missing", Expiration::Never).unwrap().is_none());
    }

    #[test]
    fn test_overwrite_wins() {
        let (_dir, cache) = new_cache();

        cache.store("k", b"one", Expiration::Never).unwrap();
        cache.store("k", b"second", Expiration::Never).unwrap();

        let bytes = cache.lookup("k", Expiration::Never).unwrap();
        assert_eq!(bytes.as_deref(), Some(b"second".as_slice()));
    }

    #[test]
    fn test_expired_entry_is_logical_miss_until_swept() {
        let (_dir, cache) = new_cache();

        cache.store("x", b"abc", Expiration::Seconds(1)).unwrap();
        assert_eq!(
            cache.lookup("x", Expiration::Seconds(1)).unwrap().as_deref(),
            Some(b"abc".as_slice())
        );

        sleep(Duration::from_secs(2));

        // Logical miss; the file is still physically present.
        assert!(cache.lookup("x", Expiration::Seconds(1)).unwrap().is_none());
        assert!(cache.path_for("x").exists());

        // The sweep reclaims it.
        assert_eq!(cache.sweep(), 1);
        assert!(!cache.path_for("x").exists());
    }

    #[test]
    fn test_lookup_refresh_extends_life() {
        let (_dir, cache) = new_cache();

        cache.store("k", b"payload", Expiration::Seconds(1)).unwrap();

        sleep(Duration::from_millis(600));
        assert!(cache.lookup("k", Expiration::Seconds(1)).unwrap().is_some());
        sleep(Duration::from_millis(600));
        assert!(cache.lookup("k", Expiration::Seconds(1)).unwrap().is_some());
    }

    #[test]
    fn test_backdated_mtime_is_expired() {
        let (_dir, cache) = new_cache();

        cache.store("k", b"payload", Expiration::Never).unwrap();
        filetime::set_file_mtime(cache.path_for("k"), FileTime::from_unix_time(0, 0)).unwrap();

        assert!(cache.lookup("k", Expiration::Never).unwrap().is_none());
        assert!(!cache.contains("k").unwrap());
    }

    #[test]
    fn test_contains_does_not_refresh() {
        let (_dir, cache) = new_cache();

        cache.store("k", b"payload", Expiration::Seconds(1)).unwrap();
        assert!(cache.contains("k").unwrap());

        sleep(Duration::from_secs(2));

        assert!(!cache.contains("k").unwrap());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, cache) = new_cache();

        cache.store("k", b"payload", Expiration::Never).unwrap();
        cache.remove("k").unwrap();
        cache.remove("k").unwrap();

        assert!(cache.lookup("k", Expiration::Never).unwrap().is_none());
    }

    #[test]
    fn test_remove_all_recreates_directory() {
        let (_dir, cache) = new_cache();

        cache.store("a", b"1", Expiration::Never).unwrap();
        cache.store("b", b"2", Expiration::Never).unwrap();

        cache.remove_all().unwrap();

        assert!(cache.directory().exists());
        assert!(cache.lookup("a", Expiration::Never).unwrap().is_none());

        // The tier stays usable without reconstruction.
        cache.store("c", b"3", Expiration::Never).unwrap();
        assert!(cache.lookup("c", Expiration::Never).unwrap().is_some());
    }

    #[test]
    fn test_sweep_keeps_live_entries() {
        let (_dir, cache) = new_cache();

        cache.store("dead", b"1", Expiration::Expired).unwrap();
        cache.store("live", b"2", Expiration::Never).unwrap();

        assert_eq!(cache.sweep(), 1);
        assert!(cache.lookup("live", Expiration::Never).unwrap().is_some());
        assert!(!cache.path_for("dead").exists());
    }

    #[test]
    fn test_path_unsafe_keys() {
        let (_dir, cache) = new_cache();
        let key = "https://example.com/a/b?c=../../etc/passwd";

        cache.store(key, b"payload", Expiration::Never).unwrap();

        let path = cache.path_for(key);
        assert_eq!(path.parent(), Some(cache.directory()));
        assert_eq!(
            cache.lookup(key, Expiration::Never).unwrap().as_deref(),
            Some(b"payload".as_slice())
        );
    }

    #[test]
    fn test_distinct_keys_use_distinct_files() {
        let (_dir, cache) = new_cache();

        cache.store("a", b"1", Expiration::Never).unwrap();
        cache.store("b", b"2", Expiration::Never).unwrap();

        assert_ne!(cache.path_for("a"), cache.path_for("b"));
        assert_eq!(cache.lookup("a", Expiration::Never).unwrap().as_deref(), Some(b"1".as_slice()));
        assert_eq!(cache.lookup("b", Expiration::Never).unwrap().as_deref(), Some(b"2".as_slice()));
    }
}
