//! In-memory read cache with LRU eviction and per-entry TTL.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use expensync_core::cache::{pattern_matches, Cache, Result};

/// A single cache entry with optional expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        Self { value, expires_at }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }
}

/// In-memory cache with LRU eviction.
///
/// Expired entries are dropped when they are read. Once `max_entries` is
/// reached the least recently used entry is evicted.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    store: Arc<Mutex<LruCache<String, CacheEntry>>>,
}

impl MemoryCache {
    /// Creates a cache holding at most `max_entries` values (at least one).
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Number of stored entries, including expired ones not yet read.
    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut store = self.store.lock().await;

        let expired = match store.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => true,
            Some(entry) => return Ok(Some(entry.value.clone())),
            None => return Ok(None),
        };

        if expired {
            store.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut store = self.store.lock().await;
        store.put(key.to_string(), CacheEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.lock().await.pop(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        let keys: Vec<String> = store
            .iter()
            .filter(|(key, _)| pattern_matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            store.pop(key);
        }

        tracing::trace!(pattern, removed = keys.len(), "Deleted cache keys by pattern");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expensync_core::cache::{transaction_key, transaction_page_key, transaction_pages_pattern};
    use expensync_core::storage::PageQuery;

    const TEST_MAX_ENTRIES: usize = 100;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);

        cache.set("transaction:1", b"{}", None).await.unwrap();

        assert_eq!(
            cache.get("transaction:1").await.unwrap(),
            Some(b"{}".to_vec())
        );
        assert_eq!(cache.get("transaction:2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped_on_read() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);

        cache
            .set("transaction:1", b"x", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("transaction:1").await.unwrap(), None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = MemoryCache::new(2);

        cache.set("a", b"1", None).await.unwrap();
        cache.set("b", b"2", None).await.unwrap();
        // Touch "a" so "b" becomes least recently used
        cache.get("a").await.unwrap();
        cache.set("c", b"3", None).await.unwrap();

        assert!(cache.get("a").await.unwrap().is_some());
        assert!(cache.get("b").await.unwrap().is_none());
        assert!(cache.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_holds_one_entry() {
        let cache = MemoryCache::new(0);

        cache.set("a", b"1", None).await.unwrap();
        cache.set("b", b"2", None).await.unwrap();

        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_pattern_only_removes_pages() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let tx_key = transaction_key(&"t1".into());
        let first_page = transaction_page_key(&PageQuery::first(50));
        let small_page = transaction_page_key(&PageQuery::first(10));

        cache.set(&tx_key, b"tx", None).await.unwrap();
        cache.set(&first_page, b"page", None).await.unwrap();
        cache.set(&small_page, b"page", None).await.unwrap();

        cache
            .delete_pattern(transaction_pages_pattern())
            .await
            .unwrap();

        assert!(cache.get(&tx_key).await.unwrap().is_some());
        assert!(cache.get(&first_page).await.unwrap().is_none());
        assert!(cache.get(&small_page).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);

        cache.set("a", b"1", None).await.unwrap();
        cache.delete("a").await.unwrap();
        cache.delete("missing").await.unwrap();

        assert_eq!(cache.get("a").await.unwrap(), None);
    }
}
