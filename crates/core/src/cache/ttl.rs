use moka::sync::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl<V> Expiry<String, CacheEntry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Key/value store whose entries expire after a per-entry TTL.
///
/// Backed by a concurrent `moka` cache, so operations on one key are
/// linearizable and expired entries are reclaimed during its own
/// housekeeping.
pub struct TtlCache<V> {
    inner: Cache<String, CacheEntry<V>>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Unbounded cache; entries leave only by expiry.
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }

    /// Cache holding at most roughly `max_entries` values.
    pub fn with_max_entries(max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Returns the value for `key` unless it is missing or expired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value)
    }

    /// Stores `value` under `key`, replacing any previous entry and its TTL.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.inner.insert(key.into(), CacheEntry { value, ttl });
    }

    /// Number of live entries after pending housekeeping has run.
    pub fn len(&self) -> usize {
        self.inner.run_pending_tasks();
        self.inner.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // moka keeps its own clock, so expiry is exercised with short real TTLs.
    const SHORT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_get_before_and_after_expiry() {
        let cache = TtlCache::new();
        cache.set("k", "v".to_string(), SHORT);
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        tokio::time::sleep(SHORT * 3).await;
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn test_expired_entries_reclaimed_without_reads() {
        let cache = TtlCache::new();
        cache.set("short", 1u8, SHORT);
        cache.set("long", 2u8, Duration::from_secs(60));
        assert_eq!(cache.len(), 2);

        tokio::time::sleep(SHORT * 3).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[tokio::test]
    async fn test_set_overwrites_and_resets_ttl() {
        let cache = TtlCache::new();
        cache.set("k", 1u32, SHORT);
        cache.set("k", 2u32, Duration::from_secs(60));

        tokio::time::sleep(SHORT * 3).await;
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_key() {
        let cache: TtlCache<String> = TtlCache::new();
        assert!(cache.get("nope").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_bounded_cache_stays_within_capacity() {
        let cache = TtlCache::with_max_entries(8);
        for i in 0..64u32 {
            cache.set(format!("key-{}", i), i, Duration::from_secs(60));
        }
        assert!(cache.len() <= 8);
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let cache = Arc::new(TtlCache::new());
        let mut handles = Vec::new();
        for i in 0..16u32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.set(format!("key-{}", i % 4), i, Duration::from_secs(60));
                cache.get(&format!("key-{}", i % 4))
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }
        assert_eq!(cache.len(), 4);
    }
}
