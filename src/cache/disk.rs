use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cache::{CacheBackend, CacheEntry};
use crate::error::{Result, SamvadError};

/// Durable tier: one JSON file per key under a namespaced directory.
///
/// The same implementation backs both the session-scoped tier (directory
/// keyed by a per-process id) and the long-term store; only the root
/// directory and TTL differ.
pub struct DiskBackend {
    name: &'static str,
    dir: PathBuf,
}

impl DiskBackend {
    pub fn new(name: &'static str, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| SamvadError::Cache(format!("Failed to create cache directory: {}", e)))?;

        Ok(Self { name, dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        self.dir.join(format!("{:016x}.json", hasher.finish()))
    }
}

#[async_trait]
impl CacheBackend for DiskBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.file_for(key);
        if !path.exists() {
            return Ok(None);
        }

        match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<CacheEntry>(&content) {
                Ok(entry) => {
                    debug!("Cache hit in {} tier: {}", self.name, key);
                    Ok(Some(entry))
                }
                Err(e) => {
                    warn!("Discarding unreadable cache entry {}: {}", path.display(), e);
                    let _ = fs::remove_file(&path).await;
                    Ok(None)
                }
            },
            Err(_) => Ok(None),
        }
    }

    async fn write(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let path = self.file_for(key);
        let content = serde_json::to_string_pretty(&entry)
            .map_err(|e| SamvadError::Cache(format!("Failed to serialize cache entry: {}", e)))?;

        // Atomic write: temp file in the same directory, then rename
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| SamvadError::Cache(format!("Failed to create temp cache file: {}", e)))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| SamvadError::Cache(format!("Failed to write cache entry: {}", e)))?;
        temp.persist(&path)
            .map_err(|e| SamvadError::Cache(format!("Failed to persist cache entry: {}", e)))?;

        debug!("Saved entry to {} tier: {}", self.name, key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.file_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| SamvadError::Cache(format!("Failed to remove cache entry: {}", e)))?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        let mut count = 0;
        if let Ok(mut entries) = fs::read_dir(&self.dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.path().extension().map(|e| e == "json").unwrap_or(false)
                    && fs::remove_file(entry.path()).await.is_ok()
                {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    async fn entry_count(&self) -> Result<u64> {
        let count = WalkDir::new(&self.dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "json").unwrap_or(false))
            .count();
        Ok(count as u64)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut count = 0;
        if let Ok(mut entries) = fs::read_dir(&self.dir).await {
            while let Ok(Some(dir_entry)) = entries.next_entry().await {
                let path = dir_entry.path();
                if !path.extension().map(|e| e == "json").unwrap_or(false) {
                    continue;
                }
                let Ok(content) = fs::read_to_string(&path).await else {
                    continue;
                };
                match serde_json::from_str::<CacheEntry>(&content) {
                    Ok(entry) if entry.is_expired() => {
                        if fs::remove_file(&path).await.is_ok() {
                            count += 1;
                        }
                    }
                    Ok(_) => {}
                    Err(_) => {
                        // Unreadable entries are purged too
                        if fs::remove_file(&path).await.is_ok() {
                            count += 1;
                        }
                    }
                }
            }
        }
        debug!("Purged {} expired entries from {} tier", count, self.name);
        Ok(count)
    }
}
