use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::cache::{CacheBackend, CacheEntry};
use crate::error::Result;

struct MemoryInner {
    entries: HashMap<String, (CacheEntry, u64)>,
    tick: u64,
}

/// In-process tier: fastest, most volatile. Bounded by an LRU eviction
/// policy on top of the shared TTL handling.
pub struct MemoryBackend {
    capacity: usize,
    inner: Mutex<MemoryInner>,
}

impl MemoryBackend {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(MemoryInner {
                entries: HashMap::new(),
                tick: 0,
            }),
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut inner = self.inner.lock().await;
        inner.tick += 1;
        let tick = inner.tick;

        if let Some((entry, last_used)) = inner.entries.get_mut(key) {
            if !entry.is_expired() {
                *last_used = tick;
                return Ok(Some(entry.clone()));
            }
        }
        // Expired or absent; lazy eviction on the way out
        inner.entries.remove(key);
        Ok(None)
    }

    async fn write(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(key.to_string(), (entry, tick));

        while inner.entries.len() > self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, (_, last_used))| *last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    inner.entries.remove(&key);
                }
                None => break,
            }
        }

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.lock().await.entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let count = inner.entries.len() as u64;
        inner.entries.clear();
        Ok(count)
    }

    async fn entry_count(&self) -> Result<u64> {
        Ok(self.inner.lock().await.entries.len() as u64)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        inner.entries.retain(|_, (entry, _)| !entry.is_expired());
        Ok((before - inner.entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn entry(value: &str, ttl_secs: u64) -> CacheEntry {
        CacheEntry::new(json!(value), ttl_secs)
    }

    #[test]
    fn test_read_write_roundtrip() {
        tokio_test::block_on(async {
            let backend = MemoryBackend::new(8);
            backend.write("k1", entry("v1", 60)).await.unwrap();
            let read = backend.read("k1").await.unwrap().unwrap();
            assert_eq!(read.data, json!("v1"));
            assert!(backend.read("missing").await.unwrap().is_none());
        });
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let backend = MemoryBackend::new(8);
        let mut stale = entry("old", 10);
        stale.created_at = Utc::now() - Duration::seconds(11);
        backend.write("k1", stale).await.unwrap();
        assert!(backend.read("k1").await.unwrap().is_none());
        // Lazy eviction removed it
        assert_eq!(backend.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fresh_entry_is_a_hit() {
        let backend = MemoryBackend::new(8);
        let mut fresh = entry("new", 10);
        fresh.created_at = Utc::now() - Duration::seconds(9);
        backend.write("k1", fresh).await.unwrap();
        assert!(backend.read("k1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lru_eviction_at_capacity() {
        let backend = MemoryBackend::new(2);
        backend.write("a", entry("1", 60)).await.unwrap();
        backend.write("b", entry("2", 60)).await.unwrap();
        // Touch "a" so "b" becomes the least recently used
        backend.read("a").await.unwrap();
        backend.write("c", entry("3", 60)).await.unwrap();

        assert!(backend.read("a").await.unwrap().is_some());
        assert!(backend.read("b").await.unwrap().is_none());
        assert!(backend.read("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let backend = MemoryBackend::new(8);
        let mut stale = entry("old", 5);
        stale.created_at = Utc::now() - Duration::seconds(60);
        backend.write("stale", stale).await.unwrap();
        backend.write("fresh", entry("new", 300)).await.unwrap();

        assert_eq!(backend.purge_expired().await.unwrap(), 1);
        assert_eq!(backend.entry_count().await.unwrap(), 1);
    }
}
