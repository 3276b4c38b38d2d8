//! Snapshot cache for processed documents.
//!
//! A cache entry is a whole-index snapshot keyed by the pair of document
//! URL and processing variant. Entries live under one directory: a `.vs`
//! blob per key plus a shared `cache_metadata.json` describing them.
//! Snapshots are replaced wholesale, never mutated in place, and there is
//! no eviction; `clear` is the manual escape hatch.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::process::ProcessingVariant;

/// Name of the per-directory metadata file.
const METADATA_FILE: &str = "cache_metadata.json";

/// Extension of snapshot blobs.
const SNAPSHOT_EXT: &str = "vs";

/// Identity of one cache entry.
///
/// First 16 hex characters of SHA-256 over `"{url}::{variant}"`, so the
/// same document processed with different loaders occupies independent
/// entries, and the same (URL, variant) pair always maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a document URL and processing variant.
    #[must_use]
    pub fn for_document(url: &str, variant: ProcessingVariant) -> Self {
        let digest = Sha256::digest(format!("{url}::{variant}").as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex[..16].to_string())
    }

    /// The key as a hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata recorded for one cached snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Source URL of the cached document.
    pub document_url: String,
    /// Absolute path of the snapshot blob.
    pub cache_path: PathBuf,
    /// Unix timestamp of snapshot creation.
    pub created_at: u64,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Number of metadata entries.
    pub entries: usize,
    /// Number of snapshot files present on disk.
    pub files: usize,
    /// Total snapshot bytes on disk.
    pub total_bytes: u64,
    /// Cache directory.
    pub directory: PathBuf,
}

/// Directory-backed snapshot cache.
pub struct SnapshotCache {
    directory: PathBuf,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SnapshotCache {
    /// Open (creating if needed) a cache rooted at `directory` and load its
    /// metadata. Corrupt metadata is discarded with a warning rather than
    /// failing the whole cache.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        let metadata_path = directory.join(METADATA_FILE);
        let entries = if metadata_path.exists() {
            match std::fs::read_to_string(&metadata_path)
                .map_err(StoreError::from)
                .and_then(|raw| serde_json::from_str(&raw).map_err(StoreError::from))
            {
                Ok(map) => map,
                Err(e) => {
                    warn!(error = %e, "discarding unreadable cache metadata");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };
        debug!(directory = %directory.display(), entries = entries.len(), "snapshot cache opened");
        Ok(Self {
            directory,
            entries: Mutex::new(entries),
        })
    }

    /// Whether a usable snapshot exists for `key`.
    pub fn has(&self, key: &CacheKey) -> bool {
        self.snapshot_path(key).is_some()
    }

    /// Path of the snapshot for `key`, when both the metadata entry and the
    /// blob are present.
    pub fn snapshot_path(&self, key: &CacheKey) -> Option<PathBuf> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key.as_str())?;
        entry.cache_path.exists().then(|| entry.cache_path.clone())
    }

    /// Install `snapshot` (a freshly written temp file) as the entry for
    /// `key`, replacing any previous snapshot wholesale.
    pub fn store(
        &self,
        key: &CacheKey,
        snapshot: &Path,
        document_url: &str,
    ) -> Result<(), StoreError> {
        let target = self
            .directory
            .join(format!("{key}.{SNAPSHOT_EXT}"));
        std::fs::rename(snapshot, &target).or_else(|_| {
            // rename fails across filesystems; fall back to copy + remove
            std::fs::copy(snapshot, &target)?;
            std::fs::remove_file(snapshot)
        })?;
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        {
            let mut entries = self.entries.lock().map_err(|_| StoreError::Snapshot {
                message: "cache metadata lock poisoned".to_string(),
            })?;
            entries.insert(
                key.as_str().to_string(),
                CacheEntry {
                    document_url: document_url.to_string(),
                    cache_path: target,
                    created_at,
                },
            );
        }
        self.persist_metadata()?;
        info!(%key, url = document_url, "snapshot cached");
        Ok(())
    }

    /// Remove the entry for `key`, or every entry when `key` is `None`.
    /// Returns the number of entries removed.
    pub fn clear(&self, key: Option<&CacheKey>) -> Result<usize, StoreError> {
        let removed: Vec<CacheEntry> = {
            let mut entries = self.entries.lock().map_err(|_| StoreError::Snapshot {
                message: "cache metadata lock poisoned".to_string(),
            })?;
            match key {
                Some(key) => entries.remove(key.as_str()).into_iter().collect(),
                None => entries.drain().map(|(_, v)| v).collect(),
            }
        };
        for entry in &removed {
            if let Err(e) = std::fs::remove_file(&entry.cache_path) {
                warn!(path = %entry.cache_path.display(), error = %e, "failed to remove snapshot");
            }
        }
        self.persist_metadata()?;
        Ok(removed.len())
    }

    /// Source URLs of every cached document, with creation timestamps.
    pub fn list(&self) -> Vec<(String, CacheEntry)> {
        self.entries
            .lock()
            .map(|entries| {
                let mut list: Vec<_> = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                list.sort_by_key(|(_, v)| v.created_at);
                list
            })
            .unwrap_or_default()
    }

    /// Aggregate statistics over the cache directory.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().map(|e| e.len()).unwrap_or_default();
        let mut files = 0usize;
        let mut total_bytes = 0u64;
        if let Ok(read_dir) = std::fs::read_dir(&self.directory) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == SNAPSHOT_EXT) {
                    files += 1;
                    if let Ok(meta) = entry.metadata() {
                        total_bytes += meta.len();
                    }
                }
            }
        }
        CacheStats {
            entries,
            files,
            total_bytes,
            directory: self.directory.clone(),
        }
    }

    /// Directory the cache lives in.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn persist_metadata(&self) -> Result<(), StoreError> {
        let serialized = {
            let entries = self.entries.lock().map_err(|_| StoreError::Snapshot {
                message: "cache metadata lock poisoned".to_string(),
            })?;
            serde_json::to_string_pretty(&*entries)?
        };
        std::fs::write(self.directory.join(METADATA_FILE), serialized)?;
        Ok(())
    }
}

impl fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

/// Default cache directory (`~/.cache/docquest/vector-store` or a relative
/// fallback when no home directory is available).
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || PathBuf::from(".docquest-cache"),
        |base| base.join("docquest").join("vector-store"),
    )
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn temp_cache() -> (tempfile::TempDir, SnapshotCache) {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let cache = SnapshotCache::open(dir.path())
            .unwrap_or_else(|e| panic!("cache open failed: {e}"));
        (dir, cache)
    }

    fn write_snapshot(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"{\"documents\":[]}")
            .unwrap_or_else(|e| panic!("write failed: {e}"));
        path
    }

    #[test]
    fn test_key_depends_on_url_and_variant() {
        let url = "https://example.com/policy.pdf";
        let fast = CacheKey::for_document(url, ProcessingVariant::Fast);
        let rich = CacheKey::for_document(url, ProcessingVariant::Rich);
        let other = CacheKey::for_document("https://example.com/other.pdf", ProcessingVariant::Fast);
        assert_ne!(fast, rich, "variants must occupy independent entries");
        assert_ne!(fast, other, "different URLs must not collide");
        assert_eq!(
            fast,
            CacheKey::for_document(url, ProcessingVariant::Fast),
            "key derivation must be deterministic"
        );
        assert_eq!(fast.as_str().len(), 16);
        assert!(fast.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_store_then_has_then_clear() {
        let (dir, cache) = temp_cache();
        let key = CacheKey::for_document("https://example.com/a.pdf", ProcessingVariant::Fast);
        assert!(!cache.has(&key));

        let temp = write_snapshot(dir.path(), "incoming.tmp");
        cache
            .store(&key, &temp, "https://example.com/a.pdf")
            .unwrap_or_else(|e| panic!("store failed: {e}"));
        assert!(cache.has(&key));
        assert!(cache.snapshot_path(&key).is_some());

        let removed = cache
            .clear(Some(&key))
            .unwrap_or_else(|e| panic!("clear failed: {e}"));
        assert_eq!(removed, 1);
        assert!(!cache.has(&key));
    }

    #[test]
    fn test_metadata_survives_reopen() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        let key = CacheKey::for_document("https://example.com/b.pdf", ProcessingVariant::Rich);
        {
            let cache = SnapshotCache::open(dir.path())
                .unwrap_or_else(|e| panic!("cache open failed: {e}"));
            let temp = write_snapshot(dir.path(), "incoming.tmp");
            cache
                .store(&key, &temp, "https://example.com/b.pdf")
                .unwrap_or_else(|e| panic!("store failed: {e}"));
        }
        let reopened = SnapshotCache::open(dir.path())
            .unwrap_or_else(|e| panic!("cache reopen failed: {e}"));
        assert!(reopened.has(&key));
        let listed = reopened.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1.document_url, "https://example.com/b.pdf");
    }

    #[test]
    fn test_missing_blob_means_no_hit() {
        let (dir, cache) = temp_cache();
        let key = CacheKey::for_document("https://example.com/c.pdf", ProcessingVariant::Fast);
        let temp = write_snapshot(dir.path(), "incoming.tmp");
        cache
            .store(&key, &temp, "https://example.com/c.pdf")
            .unwrap_or_else(|e| panic!("store failed: {e}"));
        let blob = cache
            .snapshot_path(&key)
            .unwrap_or_else(|| panic!("snapshot path missing"));
        std::fs::remove_file(&blob).unwrap_or_else(|e| panic!("remove failed: {e}"));
        assert!(!cache.has(&key), "a dangling entry must not count as a hit");
    }

    #[test]
    fn test_stats_counts_blobs() {
        let (dir, cache) = temp_cache();
        for (i, url) in ["https://a.example/x.pdf", "https://a.example/y.pdf"]
            .iter()
            .enumerate()
        {
            let key = CacheKey::for_document(url, ProcessingVariant::Fast);
            let temp = write_snapshot(dir.path(), &format!("in-{i}.tmp"));
            cache
                .store(&key, &temp, url)
                .unwrap_or_else(|e| panic!("store failed: {e}"));
        }
        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.files, 2);
        assert!(stats.total_bytes > 0);
    }

    #[test]
    fn test_corrupt_metadata_is_discarded() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
        std::fs::write(dir.path().join(METADATA_FILE), b"not json")
            .unwrap_or_else(|e| panic!("write failed: {e}"));
        let cache = SnapshotCache::open(dir.path())
            .unwrap_or_else(|e| panic!("open should tolerate corrupt metadata: {e}"));
        assert_eq!(cache.list().len(), 0);
    }
}
