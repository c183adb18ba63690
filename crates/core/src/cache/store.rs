//! In-memory cache with bounded persistence.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::storage::Storage;
use crate::Error;

/// A domain's last successfully resolved icon URL plus resolution time.
///
/// Entries are immutable once written; a newer resolution replaces the
/// entry wholesale via [`IconCache::put`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Resolved icon URL.
    pub url: String,
    /// Resolution time, epoch milliseconds.
    pub timestamp: i64,
}

/// Persistent, bounded mapping from domain to [`CacheEntry`].
///
/// The map is mutated only by the per-link pipeline and persisted after
/// every successful write and after clear. Persistence evicts down to
/// `max_entries`, keeping the most recently written entries.
pub struct IconCache {
    entries: HashMap<String, CacheEntry>,
    storage: Arc<dyn Storage>,
    max_entries: usize,
}

impl IconCache {
    pub fn new(storage: Arc<dyn Storage>, max_entries: usize) -> Self {
        Self { entries: HashMap::new(), storage, max_entries }
    }

    /// Load the cache from durable storage.
    ///
    /// A missing or malformed record yields an empty cache; this is the
    /// session-start path and must never fail on bad persisted state.
    pub async fn load(storage: Arc<dyn Storage>, max_entries: usize) -> Self {
        let entries = match storage.read().await {
            Ok(Some(payload)) => match serde_json::from_str::<HashMap<String, CacheEntry>>(&payload) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(error = %e, "corrupt cache record, starting empty");
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable cache record, starting empty");
                HashMap::new()
            }
        };

        tracing::debug!(entries = entries.len(), "icon cache loaded");
        Self { entries, storage, max_entries }
    }

    pub fn get(&self, domain: &str) -> Option<&CacheEntry> {
        self.entries.get(domain)
    }

    /// Insert or replace the entry for `domain`.
    pub fn put(&mut self, domain: &str, url: &str, timestamp: i64) {
        self.entries
            .insert(domain.to_string(), CacheEntry { url: url.to_string(), timestamp });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the full map, evicting down to `max_entries` first.
    ///
    /// Eviction keeps the `max_entries` most recently written entries by
    /// timestamp descending. Storage failures are returned for the caller
    /// to log; the in-memory map stays valid either way.
    pub async fn persist(&mut self) -> Result<(), Error> {
        if self.entries.len() > self.max_entries {
            let mut ordered: Vec<(String, CacheEntry)> = self.entries.drain().collect();
            ordered.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
            ordered.truncate(self.max_entries);
            self.entries = ordered.into_iter().collect();
            tracing::debug!(kept = self.entries.len(), "evicted cache entries over limit");
        }

        let payload = serde_json::to_string(&self.entries)?;
        self.storage.write(&payload).await
    }

    /// Empty the in-memory map and remove the durable record.
    pub async fn clear(&mut self) -> Result<(), Error> {
        self.entries.clear();
        self.storage.remove().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::storage::MemoryStorage;
    use async_trait::async_trait;

    /// Storage whose writes always fail, e.g. a full or read-only disk.
    struct BrokenStorage;

    #[async_trait]
    impl Storage for BrokenStorage {
        async fn read(&self) -> Result<Option<String>, Error> {
            Ok(None)
        }

        async fn write(&self, _payload: &str) -> Result<(), Error> {
            Err(Error::Storage("disk full".into()))
        }

        async fn remove(&self) -> Result<(), Error> {
            Err(Error::Storage("disk full".into()))
        }
    }

    fn memory_cache(max: usize) -> (Arc<MemoryStorage>, IconCache) {
        let storage = Arc::new(MemoryStorage::new());
        let cache = IconCache::new(storage.clone(), max);
        (storage, cache)
    }

    #[tokio::test]
    async fn test_put_get() {
        let (_storage, mut cache) = memory_cache(10);
        cache.put("a.com", "https://a.com/favicon.ico", 1);

        let entry = cache.get("a.com").unwrap();
        assert_eq!(entry.url, "https://a.com/favicon.ico");
        assert_eq!(entry.timestamp, 1);
        assert!(cache.get("b.com").is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_entry() {
        let (_storage, mut cache) = memory_cache(10);
        cache.put("a.com", "https://old", 1);
        cache.put("a.com", "https://new", 2);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a.com").unwrap().url, "https://new");
    }

    #[tokio::test]
    async fn test_round_trip_through_fresh_instance() {
        let storage = Arc::new(MemoryStorage::new());
        let mut cache = IconCache::new(storage.clone(), 10);
        cache.put("a.com", "https://a.com/favicon.ico", 42);
        cache.persist().await.unwrap();

        let reloaded = IconCache::load(storage, 10).await;
        assert_eq!(
            reloaded.get("a.com"),
            Some(&CacheEntry { url: "https://a.com/favicon.ico".into(), timestamp: 42 })
        );
    }

    #[tokio::test]
    async fn test_load_missing_record_is_empty() {
        let cache = IconCache::load(Arc::new(MemoryStorage::new()), 10).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_record_is_empty() {
        let storage = Arc::new(MemoryStorage::with_record("{definitely not json"));
        let cache = IconCache::load(storage, 10).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_eviction_keeps_newest() {
        let max = 5;
        let (_storage, mut cache) = memory_cache(max);
        for i in 0..(max as i64 + 5) {
            cache.put(&format!("site{i}.com"), "https://icon", i);
        }

        cache.persist().await.unwrap();

        assert_eq!(cache.len(), max);
        for i in 5..10 {
            assert!(cache.get(&format!("site{i}.com")).is_some(), "expected site{i}.com kept");
        }
        for i in 0..5 {
            assert!(cache.get(&format!("site{i}.com")).is_none(), "expected site{i}.com evicted");
        }
    }

    #[tokio::test]
    async fn test_eviction_survives_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let mut cache = IconCache::new(storage.clone(), 3);
        for i in 0..8i64 {
            cache.put(&format!("site{i}.com"), "https://icon", i);
        }
        cache.persist().await.unwrap();

        let reloaded = IconCache::load(storage, 3).await;
        assert_eq!(reloaded.len(), 3);
        assert!(reloaded.get("site7.com").is_some());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_memory_valid() {
        let mut cache = IconCache::new(Arc::new(BrokenStorage), 10);
        cache.put("a.com", "https://a.com/favicon.ico", 1);

        let result = cache.persist().await;
        assert!(matches!(result, Err(Error::Storage(_))));

        // The entry stays served from memory; durability waits for the
        // next successful persist.
        assert_eq!(cache.get("a.com").unwrap().url, "https://a.com/favicon.ico");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_record() {
        let storage = Arc::new(MemoryStorage::new());
        let mut cache = IconCache::new(storage.clone(), 10);
        cache.put("a.com", "https://icon", 1);
        cache.persist().await.unwrap();

        cache.clear().await.unwrap();

        assert!(cache.is_empty());
        assert!(storage.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(crate::cache::FileStorage::new(dir.path().join("cache.json")));

        let mut cache = IconCache::new(storage.clone(), 10);
        cache.put("a.com", "https://a.com/favicon.ico", 7);
        cache.persist().await.unwrap();

        let reloaded = IconCache::load(storage, 10).await;
        assert_eq!(reloaded.get("a.com").unwrap().timestamp, 7);
    }
}
