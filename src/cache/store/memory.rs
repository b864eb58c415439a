//! In-process reference store.
//!
//! LRU-bounded entries with optional expiry, plus a [`TagIndex`] so tag
//! flushes reach every entry written under a flushed tag.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use tracing::debug;

use crate::cache::config::CacheConfig;
use crate::cache::identity::TagSet;
use crate::cache::lock::{rw_read, rw_write};

use super::tag_index::TagIndex;
use super::{Store, StoreResult};

const SOURCE: &str = "cache::store::memory";
const METRIC_STORE_EVICT: &str = "tagcache_store_evict_total";

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory [`Store`] with LRU eviction and a bidirectional tag index.
pub struct MemoryStore {
    entries: RwLock<LruCache<String, Entry>>,
    index: TagIndex,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.store_capacity_non_zero())),
            index: TagIndex::new(),
        }
    }

    /// Number of entries held, expired ones included until next touched.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tag index backing tag flushes.
    pub fn index(&self) -> &TagIndex {
        &self.index
    }

    /// Drop every entry and tag mapping.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
        self.index.clear();
    }

    fn insert(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>, tags: &TagSet) {
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };

        let evicted = rw_write(&self.entries, SOURCE, "insert").push(key.to_string(), entry);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            self.index.unregister(&evicted_key);
            counter!(METRIC_STORE_EVICT).increment(1);
            debug!(evicted_key, "Evicted least recently used cache entry");
        }

        self.index.register(key, tags);
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        match entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }

        entries.pop(key);
        drop(entries);
        self.index.unregister(key);
        Ok(None)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.insert(key, value, Some(ttl), &TagSet::new());
        Ok(())
    }

    fn forever(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.insert(key, value, None, &TagSet::new());
        Ok(())
    }

    fn forget(&self, key: &str) -> StoreResult<bool> {
        let removed = rw_write(&self.entries, SOURCE, "forget").pop(key);
        self.index.unregister(key);
        Ok(removed.is_some_and(|entry| !entry.is_expired(Instant::now())))
    }

    fn put_tagged(
        &self,
        tags: &TagSet,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        self.insert(key, value, ttl, tags);
        Ok(())
    }

    fn flush_tags(&self, tags: &TagSet) -> StoreResult<u64> {
        let keys = self.index.take_tags(tags);
        if keys.is_empty() {
            return Ok(0);
        }

        let mut entries = rw_write(&self.entries, SOURCE, "flush_tags");
        let removed = keys.iter().filter(|key| entries.pop(*key).is_some()).count();
        Ok(removed as u64)
    }
}
