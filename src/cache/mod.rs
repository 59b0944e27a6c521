// Multi-tier cache: one generic tiered abstraction over backends ordered by
// speed, with promotion, write-through, lazy expiry and request
// deduplication implemented once.

pub mod disk;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::{Result, SamvadError};

/// Kind of work a cached value came from. Part of every key so results of
/// different operations on the same text never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheOp {
    Detect,
    Transliterate,
    Translate,
}

impl CacheOp {
    fn as_str(&self) -> &'static str {
        match self {
            CacheOp::Detect => "detect",
            CacheOp::Transliterate => "translit",
            CacheOp::Translate => "translate",
        }
    }
}

/// Deterministic cache key: operation kind, language pair, and a digest of
/// the normalized (trimmed) source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(op: CacheOp, text: &str, source: &str, target: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        text.trim().hash(&mut hasher);
        CacheKey(format!(
            "{}:{}:{}:{:016x}",
            op.as_str(),
            source,
            target,
            hasher.finish()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached value with its creation time and lifetime. Owned by whichever
/// tier holds it; freely copied between tiers during promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn new(data: Value, ttl_secs: u64) -> Self {
        Self {
            data,
            created_at: Utc::now(),
            ttl_secs,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.created_at + Duration::seconds(self.ttl_secs as i64)
    }
}

/// Storage interface implemented by each tier. Expiry is the tiered cache's
/// concern; backends store and return entries as-is (they may drop expired
/// entries early as an optimization, never serve them as hits).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn read(&self, key: &str) -> Result<Option<CacheEntry>>;
    async fn write(&self, key: &str, entry: CacheEntry) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn clear(&self) -> Result<u64>;
    async fn entry_count(&self) -> Result<u64>;
    async fn purge_expired(&self) -> Result<u64>;
}

/// One tier: a backend plus the TTL applied to values written into it.
pub struct Tier {
    backend: Arc<dyn CacheBackend>,
    ttl_secs: u64,
}

impl Tier {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl_secs: u64) -> Self {
        Self { backend, ttl_secs }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TierStats {
    pub name: String,
    pub entries: u64,
}

type SharedFetch = std::result::Result<Value, String>;

/// Layered cache consulted fastest-first, with single-flight deduplication
/// of concurrent fetches per key.
pub struct TieredCache {
    tiers: Vec<Tier>,
    inflight: Mutex<HashMap<String, watch::Receiver<Option<SharedFetch>>>>,
}

impl TieredCache {
    /// `tiers` must be ordered fastest/most volatile first.
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self {
            tiers,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// First hit wins; the value is promoted into every faster tier with
    /// that tier's own TTL. Expired entries are evicted on the way.
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        for (idx, tier) in self.tiers.iter().enumerate() {
            let entry = match tier.backend.read(key.as_str()).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Cache tier {} read failed: {}", tier.backend.name(), e);
                    continue;
                }
            };

            if entry.is_expired() {
                let _ = tier.backend.remove(key.as_str()).await;
                continue;
            }

            debug!("Cache hit in tier {} for {}", tier.backend.name(), key);
            for faster in &self.tiers[..idx] {
                let promoted = CacheEntry::new(entry.data.clone(), faster.ttl_secs);
                if let Err(e) = faster.backend.write(key.as_str(), promoted).await {
                    warn!(
                        "Promotion into tier {} failed: {}",
                        faster.backend.name(),
                        e
                    );
                }
            }
            return Some(entry.data);
        }
        None
    }

    /// Write-through to every tier. Caching is best-effort: a failing tier
    /// is skipped with a warning, never an error to the caller.
    pub async fn set(&self, key: &CacheKey, value: &Value) {
        for tier in &self.tiers {
            let entry = CacheEntry::new(value.clone(), tier.ttl_secs);
            if let Err(e) = tier.backend.write(key.as_str(), entry).await {
                warn!("Cache tier {} write failed: {}", tier.backend.name(), e);
            }
        }
    }

    /// At most one in-flight execution of `fetcher` per key: concurrent
    /// callers for the same key share the leader's eventual result, success
    /// or failure. A failed fetch never poisons the key.
    pub async fn get_or_fetch<F, Fut>(&self, key: &CacheKey, fetcher: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let mut rx = {
            let mut inflight = self.inflight.lock().await;
            if let Some(rx) = inflight.get(key.as_str()) {
                rx.clone()
            } else {
                let (tx, rx) = watch::channel(None);
                inflight.insert(key.as_str().to_string(), rx);
                drop(inflight);

                let outcome = fetcher().await;
                if let Ok(value) = &outcome {
                    self.set(key, value).await;
                }

                // Deregister before broadcasting so a failed fetch can be
                // retried immediately
                self.inflight.lock().await.remove(key.as_str());
                let shared = match &outcome {
                    Ok(value) => Ok(value.clone()),
                    Err(e) => Err(e.to_string()),
                };
                let _ = tx.send(Some(shared));
                return outcome;
            }
        };

        loop {
            let current = rx.borrow().clone();
            if let Some(shared) = current {
                return shared.map_err(SamvadError::Cache);
            }
            if rx.changed().await.is_err() {
                return Err(SamvadError::Cache(
                    "in-flight fetch abandoned without a result".to_string(),
                ));
            }
        }
    }

    /// Drop one key from every tier.
    pub async fn invalidate(&self, key: &CacheKey) {
        for tier in &self.tiers {
            if let Err(e) = tier.backend.remove(key.as_str()).await {
                warn!("Cache tier {} remove failed: {}", tier.backend.name(), e);
            }
        }
    }

    /// Empty every tier, returning the total number of removed entries.
    pub async fn clear_all(&self) -> u64 {
        let mut total = 0;
        for tier in &self.tiers {
            match tier.backend.clear().await {
                Ok(count) => total += count,
                Err(e) => warn!("Cache tier {} clear failed: {}", tier.backend.name(), e),
            }
        }
        info!("Cleared {} cache entries across {} tiers", total, self.tiers.len());
        total
    }

    /// Explicit sweep of expired entries. Complements lazy read-time expiry;
    /// never required for correctness.
    pub async fn purge_expired(&self) -> u64 {
        let mut total = 0;
        for tier in &self.tiers {
            match tier.backend.purge_expired().await {
                Ok(count) => total += count,
                Err(e) => warn!("Cache tier {} purge failed: {}", tier.backend.name(), e),
            }
        }
        total
    }

    pub async fn stats(&self) -> Vec<TierStats> {
        let mut stats = Vec::with_capacity(self.tiers.len());
        for tier in &self.tiers {
            let entries = tier.backend.entry_count().await.unwrap_or(0);
            stats.push(TierStats {
                name: tier.backend.name().to_string(),
                entries,
            });
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryBackend;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memory_cache() -> TieredCache {
        TieredCache::new(vec![Tier::new(Arc::new(MemoryBackend::new(64)), 300)])
    }

    fn two_tier_cache() -> (TieredCache, Arc<MemoryBackend>, Arc<MemoryBackend>) {
        let fast = Arc::new(MemoryBackend::new(64));
        let slow = Arc::new(MemoryBackend::new(64));
        let cache = TieredCache::new(vec![
            Tier::new(fast.clone(), 60),
            Tier::new(slow.clone(), 3600),
        ]);
        (cache, fast, slow)
    }

    fn key(text: &str) -> CacheKey {
        CacheKey::new(CacheOp::Translate, text, "hi", "en")
    }

    #[test]
    fn test_key_is_deterministic_and_discriminating() {
        let a = CacheKey::new(CacheOp::Translate, "hello", "en", "te");
        let b = CacheKey::new(CacheOp::Translate, "hello", "en", "te");
        assert_eq!(a, b);

        // Same text, different operation or pair: distinct keys
        let translit = CacheKey::new(CacheOp::Transliterate, "hello", "en", "te");
        let reversed = CacheKey::new(CacheOp::Translate, "hello", "te", "en");
        assert_ne!(a, translit);
        assert_ne!(a, reversed);

        // Normalized text: surrounding whitespace does not change the key
        let padded = CacheKey::new(CacheOp::Translate, "  hello  ", "en", "te");
        assert_eq!(a, padded);
    }

    #[tokio::test]
    async fn test_get_or_fetch_idempotence() {
        let cache = memory_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = key("hello");

        for _ in 0..2 {
            let calls = calls.clone();
            let value = cache
                .get_or_fetch(&key, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("translated"))
                })
                .await
                .unwrap();
            assert_eq!(value, json!("translated"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_dedup_single_invocation() {
        let cache = Arc::new(memory_cache());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = key("dedup");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(&key, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(json!("shared"))
                    })
                    .await
            }));
        }

        for handle in handles {
            let value = handle.await.unwrap().unwrap();
            assert_eq!(value, json!("shared"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_poison_key() {
        let cache = memory_cache();
        let key = key("flaky");

        let first = cache
            .get_or_fetch(&key, || async {
                Err(SamvadError::Translation("backend down".to_string()))
            })
            .await;
        assert!(first.is_err());

        let second = cache
            .get_or_fetch(&key, || async { Ok(json!("recovered")) })
            .await
            .unwrap();
        assert_eq!(second, json!("recovered"));
    }

    #[tokio::test]
    async fn test_promotion_into_faster_tier() {
        let (cache, fast, _slow) = two_tier_cache();
        let key = key("promoted");

        // Seed only the slow tier
        cache.tiers[1]
            .backend
            .write(key.as_str(), CacheEntry::new(json!("v"), 3600))
            .await
            .unwrap();
        assert!(fast.read(key.as_str()).await.unwrap().is_none());

        assert_eq!(cache.get(&key).await, Some(json!("v")));

        // Promoted copy landed in the fast tier with the fast tier's TTL
        let promoted = fast.read(key.as_str()).await.unwrap().unwrap();
        assert_eq!(promoted.data, json!("v"));
        assert_eq!(promoted.ttl_secs, 60);
    }

    #[tokio::test]
    async fn test_write_through_all_tiers() {
        let (cache, fast, slow) = two_tier_cache();
        let key = key("everywhere");
        cache.set(&key, &json!("v")).await;

        assert!(fast.read(key.as_str()).await.unwrap().is_some());
        assert!(slow.read(key.as_str()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failing_tier_is_skipped() {
        let mut failing = MockCacheBackend::new();
        failing.expect_name().return_const("broken");
        failing
            .expect_read()
            .returning(|_| Err(SamvadError::Cache("quota exceeded".to_string())));
        failing
            .expect_write()
            .returning(|_, _| Err(SamvadError::Cache("quota exceeded".to_string())));

        let healthy = Arc::new(MemoryBackend::new(64));
        let cache = TieredCache::new(vec![
            Tier::new(Arc::new(failing), 60),
            Tier::new(healthy.clone(), 3600),
        ]);

        let key = key("resilient");
        cache.set(&key, &json!("v")).await;
        // The healthy tier still serves the value through the failing one
        assert_eq!(cache.get(&key).await, Some(json!("v")));
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let entry = CacheEntry::new(json!("v"), 10);
        let just_before = entry.created_at + Duration::seconds(9);
        let just_after = entry.created_at + Duration::seconds(11);
        assert!(!entry.is_expired_at(just_before));
        assert!(entry.is_expired_at(just_after));
    }

    #[tokio::test]
    async fn test_invalidate_and_clear_all() {
        let (cache, _fast, _slow) = two_tier_cache();
        let key_a = key("a");
        let key_b = key("b");
        cache.set(&key_a, &json!("1")).await;
        cache.set(&key_b, &json!("2")).await;

        cache.invalidate(&key_a).await;
        assert_eq!(cache.get(&key_a).await, None);
        assert_eq!(cache.get(&key_b).await, Some(json!("2")));

        assert!(cache.clear_all().await >= 2);
        assert_eq!(cache.get(&key_b).await, None);
    }
}
