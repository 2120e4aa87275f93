//! Bounded LRU cache of chapter content.
//!
//! Entries live at `cache:entry:{version}:{book}:{chapter}` and the recency
//! index at `cache:index`. The index and the entry set always describe the
//! same keys: eviction removes an entry together with its slot, and a slot
//! whose entry is missing or unreadable is dropped the moment it is seen.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use versesync_core::{CacheEntry, ChapterKey, ChapterPayload};

use crate::error::StoreError;
use crate::kv::{KeyValueStore, get_typed, keys, set_typed};

/// Default number of chapters kept.
pub const DEFAULT_CACHE_CAPACITY: usize = 200;

fn entry_key(key: &ChapterKey) -> String {
    format!("{}{}", keys::CACHE_ENTRY_PREFIX, key.storage_suffix())
}

// ============================================================================
// Content Cache
// ============================================================================

/// Chapter cache with strict least-recently-used eviction.
///
/// The in-memory index is ordered oldest first; the back is the most
/// recently touched key.
pub struct ContentCache {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    index: Mutex<VecDeque<ChapterKey>>,
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl ContentCache {
    /// Opens the cache over `store`, rebuilding the recency index.
    ///
    /// Slots whose entry no longer exists are dropped, and an index longer
    /// than `capacity` is trimmed from the oldest end. A capacity of zero is
    /// raised to one.
    #[instrument(skip(store))]
    pub async fn open(store: Arc<dyn KeyValueStore>, capacity: usize) -> Result<Self, StoreError> {
        let capacity = capacity.max(1);
        let persisted: Vec<String> = match get_typed(store.as_ref(), keys::CACHE_INDEX).await {
            Ok(index) => index.unwrap_or_default(),
            Err(e) if e.is_corrupt() => {
                warn!(error = %e, "Cache index unreadable, rebuilding empty");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut index: VecDeque<ChapterKey> = VecDeque::with_capacity(persisted.len());
        for suffix in &persisted {
            let Some(key) = ChapterKey::from_storage_suffix(suffix) else {
                warn!(slot = %suffix, "Dropping malformed cache slot");
                continue;
            };
            if index.contains(&key) {
                continue;
            }
            if store.get(&entry_key(&key)).await?.is_none() {
                warn!(%key, "Dropping cache slot without entry");
                continue;
            }
            index.push_back(key);
        }

        while index.len() > capacity {
            if let Some(old) = index.pop_front() {
                store.remove(&entry_key(&old)).await?;
            }
        }

        // Entries with no slot cannot be reached; remove them.
        let mut orphans = 0usize;
        for k in store.keys_with_prefix(keys::CACHE_ENTRY_PREFIX).await? {
            let reachable = k
                .strip_prefix(keys::CACHE_ENTRY_PREFIX)
                .and_then(ChapterKey::from_storage_suffix)
                .is_some_and(|key| index.contains(&key));
            if !reachable {
                store.remove(&k).await?;
                orphans += 1;
            }
        }

        let cache = Self {
            store,
            capacity,
            index: Mutex::new(index),
        };
        {
            let index = cache.index.lock().await;
            if index.len() != persisted.len() || orphans > 0 {
                cache.persist_index(&index).await?;
            }
            debug!(entries = index.len(), capacity, "Content cache opened");
        }
        Ok(cache)
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the entry for `key` and marks it most recently used.
    ///
    /// A miss is `Ok(None)`. A record that fails to decode is treated as a
    /// miss and its slot is dropped.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn get(&self, key: &ChapterKey) -> Result<Option<CacheEntry>, StoreError> {
        let mut index = self.index.lock().await;
        let Some(pos) = index.iter().position(|k| k == key) else {
            debug!("Cache miss");
            return Ok(None);
        };

        match get_typed::<CacheEntry>(self.store.as_ref(), &entry_key(key)).await {
            Ok(Some(entry)) => {
                if pos + 1 != index.len() {
                    index.remove(pos);
                    index.push_back(key.clone());
                    self.persist_index(&index).await?;
                }
                debug!(hash = %entry.content_hash, "Cache hit");
                Ok(Some(entry))
            }
            Ok(None) => {
                warn!("Cache slot without entry, dropping");
                index.remove(pos);
                self.persist_index(&index).await?;
                Ok(None)
            }
            Err(e) if e.is_corrupt() => {
                warn!(error = %e, "Corrupt cache record, dropping");
                index.remove(pos);
                self.store.remove(&entry_key(key)).await?;
                self.persist_index(&index).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the entry without touching recency. Corrupt records read as
    /// absent.
    pub async fn peek(&self, key: &ChapterKey) -> Result<Option<CacheEntry>, StoreError> {
        if !self.index.lock().await.contains(key) {
            return Ok(None);
        }
        match get_typed(self.store.as_ref(), &entry_key(key)).await {
            Err(e) if e.is_corrupt() => Ok(None),
            other => other,
        }
    }

    /// Stores `payload` under `key`, marks it most recently used, and evicts
    /// the least recently used entries beyond capacity.
    #[instrument(skip(self, payload), fields(key = %key, hash = %payload.content_hash))]
    pub async fn put(
        &self,
        key: &ChapterKey,
        payload: ChapterPayload,
    ) -> Result<CacheEntry, StoreError> {
        let entry = CacheEntry::from_payload(key, payload);
        let mut index = self.index.lock().await;

        set_typed(self.store.as_ref(), &entry_key(key), &entry).await?;
        if let Some(pos) = index.iter().position(|k| k == key) {
            index.remove(pos);
        }
        index.push_back(key.clone());

        while index.len() > self.capacity {
            let Some(evicted) = index.pop_front() else {
                break;
            };
            debug!(evicted = %evicted, "Evicting least recently used chapter");
            if let Err(e) = self.store.remove(&entry_key(&evicted)).await {
                // The entry is still stored, so it keeps its slot.
                warn!(error = %e, %evicted, "Eviction failed, keeping slot");
                index.push_front(evicted);
                if let Err(persist) = self.persist_index(&index).await {
                    warn!(error = %persist, "Could not persist cache index");
                }
                return Err(e);
            }
        }
        self.persist_index(&index).await?;
        Ok(entry)
    }

    /// Number of cached chapters.
    pub async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.is_empty()
    }

    /// Returns true if `key` is cached. Does not touch recency.
    pub async fn contains(&self, key: &ChapterKey) -> bool {
        self.index.lock().await.contains(key)
    }

    /// Cached keys, most recently used first.
    pub async fn keys_by_recency(&self) -> Vec<ChapterKey> {
        self.index.lock().await.iter().rev().cloned().collect()
    }

    /// Removes every entry and the index.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let mut index = self.index.lock().await;
        let removed = index.len();
        for k in self.store.keys_with_prefix(keys::CACHE_ENTRY_PREFIX).await? {
            self.store.remove(&k).await?;
        }
        self.store.remove(keys::CACHE_INDEX).await?;
        index.clear();
        debug!(removed, "Content cache cleared");
        Ok(removed)
    }

    async fn persist_index(&self, index: &VecDeque<ChapterKey>) -> Result<(), StoreError> {
        let suffixes: Vec<String> = index.iter().map(ChapterKey::storage_suffix).collect();
        set_typed(self.store.as_ref(), keys::CACHE_INDEX, &suffixes).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicBool, Ordering};
    use versesync_core::Verse;

    fn payload(text: &str) -> ChapterPayload {
        ChapterPayload {
            content_hash: format!("hash-{text}"),
            verses: vec![Verse::new(1, text)],
        }
    }

    /// Memory store whose removals can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_removes: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StoreError> {
            if self.fail_removes.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("disk full").into());
            }
            self.inner.remove(key).await
        }

        async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
            self.inner.keys_with_prefix(prefix).await
        }
    }

    fn raw_payload(hash: &str) -> ChapterPayload {
        ChapterPayload {
            content_hash: hash.to_string(),
            verses: vec![Verse::new(1, "text")],
        }
    }

    async fn cache(capacity: usize) -> (Arc<MemoryStore>, ContentCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = ContentCache::open(store.clone(), capacity).await.unwrap();
        (store, cache)
    }

    #[tokio::test]
    async fn test_get_after_put_returns_value() {
        let (_, cache) = cache(DEFAULT_CACHE_CAPACITY).await;
        let key = ChapterKey::new("krv", 1, 1);
        let stored = cache.put(&key, payload("태초에")).await.unwrap();

        let got = cache.get(&key).await.unwrap().unwrap();
        assert_eq!(got, stored);
        assert_eq!(got.verses[0].text, "태초에");
    }

    #[tokio::test]
    async fn test_miss_is_not_error() {
        let (_, cache) = cache(10).await;
        assert!(cache.get(&ChapterKey::new("krv", 9, 9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_entry() {
        let (_, cache) = cache(10).await;
        let key = ChapterKey::new("krv", 1, 1);
        cache.put(&key, raw_payload("abc")).await.unwrap();
        cache.put(&key, raw_payload("def")).await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&key).await.unwrap().unwrap().content_hash, "def");
    }

    #[tokio::test]
    async fn test_capacity_scenario_evicts_first_fetched() {
        let (store, cache) = cache(DEFAULT_CACHE_CAPACITY).await;
        for chapter in 1..=200 {
            cache
                .put(&ChapterKey::new("krv", 19, chapter), raw_payload("h"))
                .await
                .unwrap();
        }
        assert_eq!(cache.len().await, 200);

        cache
            .put(&ChapterKey::new("krv", 19, 201), raw_payload("h"))
            .await
            .unwrap();
        assert_eq!(cache.len().await, 200);
        assert!(!cache.contains(&ChapterKey::new("krv", 19, 1)).await);
        assert!(cache.contains(&ChapterKey::new("krv", 19, 2)).await);

        let entries = store
            .keys_with_prefix(keys::CACHE_ENTRY_PREFIX)
            .await
            .unwrap();
        assert_eq!(entries.len(), 200);
    }

    #[tokio::test]
    async fn test_get_marks_most_recent() {
        let (_, cache) = cache(3).await;
        let a = ChapterKey::new("krv", 1, 1);
        let b = ChapterKey::new("krv", 1, 2);
        let c = ChapterKey::new("krv", 1, 3);
        let d = ChapterKey::new("krv", 1, 4);
        for k in [&a, &b, &c] {
            cache.put(k, raw_payload("h")).await.unwrap();
        }

        cache.get(&a).await.unwrap();
        cache.put(&d, raw_payload("h")).await.unwrap();

        assert_eq!(cache.keys_by_recency().await, vec![d, a, c]);
        assert!(!cache.contains(&b).await);
    }

    #[tokio::test]
    async fn test_holds_exactly_most_recent_keys() {
        let (_, cache) = cache(5).await;
        let touches = [1u32, 2, 3, 1, 4, 5, 6, 2, 7, 1, 8];
        for ch in touches {
            cache
                .put(&ChapterKey::new("web", 1, ch), raw_payload("h"))
                .await
                .unwrap();
        }
        let chapters: Vec<u32> = cache
            .keys_by_recency()
            .await
            .into_iter()
            .map(|k| k.chapter)
            .collect();
        assert_eq!(chapters, vec![8, 1, 7, 2, 6]);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_miss_and_slot_dropped() {
        let (store, cache) = cache(10).await;
        let key = ChapterKey::new("krv", 1, 1);
        cache.put(&key, raw_payload("abc")).await.unwrap();

        store
            .set("cache:entry:krv:1:1", json!({"garbage": true}))
            .await
            .unwrap();

        assert!(cache.get(&key).await.unwrap().is_none());
        assert!(!cache.contains(&key).await);
        assert!(store.get("cache:entry:krv:1:1").await.unwrap().is_none());
        let index: Vec<String> = get_typed(store.as_ref(), keys::CACHE_INDEX)
            .await
            .unwrap()
            .unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_restores_recency() {
        let store = Arc::new(MemoryStore::new());
        {
            let cache = ContentCache::open(store.clone(), 10).await.unwrap();
            cache.put(&ChapterKey::new("krv", 1, 1), raw_payload("a")).await.unwrap();
            cache.put(&ChapterKey::new("krv", 1, 2), raw_payload("b")).await.unwrap();
            cache.get(&ChapterKey::new("krv", 1, 1)).await.unwrap();
        }

        let reopened = ContentCache::open(store, 10).await.unwrap();
        let chapters: Vec<u32> = reopened
            .keys_by_recency()
            .await
            .into_iter()
            .map(|k| k.chapter)
            .collect();
        assert_eq!(chapters, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_open_drops_dangling_slots_and_orphans() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(keys::CACHE_INDEX, json!(["krv:1:1", "krv:1:2", "bogus"]))
            .await
            .unwrap();
        set_typed(
            store.as_ref(),
            "cache:entry:krv:1:1",
            &CacheEntry::from_payload(&ChapterKey::new("krv", 1, 1), raw_payload("a")),
        )
        .await
        .unwrap();
        store.set("cache:entry:krv:5:5", json!({})).await.unwrap();

        let cache = ContentCache::open(store.clone(), 10).await.unwrap();
        assert_eq!(cache.keys_by_recency().await, vec![ChapterKey::new("krv", 1, 1)]);
        assert!(store.get("cache:entry:krv:5:5").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_trims_to_smaller_capacity() {
        let store = Arc::new(MemoryStore::new());
        {
            let cache = ContentCache::open(store.clone(), 5).await.unwrap();
            for ch in 1..=5 {
                cache.put(&ChapterKey::new("krv", 1, ch), raw_payload("h")).await.unwrap();
            }
        }
        let cache = ContentCache::open(store.clone(), 2).await.unwrap();
        assert_eq!(cache.len().await, 2);
        assert!(cache.contains(&ChapterKey::new("krv", 1, 5)).await);
        assert_eq!(
            store.keys_with_prefix(keys::CACHE_ENTRY_PREFIX).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (store, cache) = cache(10).await;
        cache.put(&ChapterKey::new("krv", 1, 1), raw_payload("a")).await.unwrap();
        cache.put(&ChapterKey::new("krv", 1, 2), raw_payload("b")).await.unwrap();
        store.set("prefs:ui_language", json!("ko")).await.unwrap();

        assert_eq!(cache.clear().await.unwrap(), 2);
        assert!(cache.is_empty().await);
        assert!(store.keys_with_prefix("cache:").await.unwrap().is_empty());
        assert!(store.get("prefs:ui_language").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_eviction_keeps_index_and_entries_aligned() {
        let store = Arc::new(FlakyStore::default());
        let cache = ContentCache::open(store.clone(), 2).await.unwrap();
        let a = ChapterKey::new("krv", 1, 1);
        let b = ChapterKey::new("krv", 1, 2);
        let c = ChapterKey::new("krv", 1, 3);
        cache.put(&a, raw_payload("a")).await.unwrap();
        cache.put(&b, raw_payload("b")).await.unwrap();

        store.fail_removes.store(true, Ordering::SeqCst);
        assert!(cache.put(&c, raw_payload("c")).await.is_err());

        // Every stored entry still has a slot, in memory and on disk.
        assert_eq!(cache.keys_by_recency().await, vec![c.clone(), b.clone(), a.clone()]);
        let index: Vec<String> = get_typed(store.as_ref(), keys::CACHE_INDEX)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(index, vec!["krv:1:1", "krv:1:2", "krv:1:3"]);
        assert_eq!(
            store.keys_with_prefix(keys::CACHE_ENTRY_PREFIX).await.unwrap().len(),
            3
        );

        store.fail_removes.store(false, Ordering::SeqCst);
        let reopened = ContentCache::open(store, 2).await.unwrap();
        assert_eq!(reopened.keys_by_recency().await, vec![c, b]);
    }

    #[tokio::test]
    async fn test_zero_capacity_raised_to_one() {
        let (_, cache) = cache(0).await;
        assert_eq!(cache.capacity(), 1);
        cache.put(&ChapterKey::new("krv", 1, 1), raw_payload("a")).await.unwrap();
        cache.put(&ChapterKey::new("krv", 1, 2), raw_payload("b")).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }
}
