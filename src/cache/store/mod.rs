//! Key-value store contract the cache layer sits on.
//!
//! The layer only reaches the operations enumerated on [`Store`]. Tag-scoped
//! writes and flushes go through a [`ScopedStore`] obtained fresh for every
//! commit or destroy, so one operation's tags never reach the next.

mod memory;
mod tag_index;

use std::time::Duration;

use super::error::CacheError;
use super::identity::{Tag, TagSet};

pub use memory::MemoryStore;
pub use tag_index::TagIndex;

/// Result of a store operation.
pub type StoreResult<T> = Result<T, CacheError>;

/// Backend contract: per-key atomic get/set/forget and per-tag atomic flush.
///
/// Implementations must be thread-safe; the layer adds no locking of its own.
pub trait Store: Send + Sync {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Whether a live entry exists under `key`.
    fn has(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Store a value that expires after `ttl`.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Store a value without expiry.
    fn forever(&self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Remove `key`. Returns whether a live entry existed.
    fn forget(&self, key: &str) -> StoreResult<bool>;

    /// Store a value under `key` and record it against every tag in `tags`.
    ///
    /// `ttl` of `None` means no expiry.
    fn put_tagged(
        &self,
        tags: &TagSet,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> StoreResult<()>;

    /// Remove every entry ever stored under any of `tags`.
    ///
    /// Returns the number of entries removed.
    fn flush_tags(&self, tags: &TagSet) -> StoreResult<u64>;
}

impl dyn Store + '_ {
    /// Scope this store to `tags` for a single commit or flush.
    pub fn tags(&self, tags: impl IntoIterator<Item = Tag>) -> ScopedStore<'_> {
        ScopedStore::new(self, tags)
    }
}

/// A store handle restricted to one set of tags.
pub struct ScopedStore<'a> {
    store: &'a dyn Store,
    tags: TagSet,
}

impl<'a> ScopedStore<'a> {
    pub fn new(store: &'a dyn Store, tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            store,
            tags: tags.into_iter().collect(),
        }
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.store.get(key)
    }

    pub fn has(&self, key: &str) -> StoreResult<bool> {
        self.store.has(key)
    }

    pub fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.store.put_tagged(&self.tags, key, value, Some(ttl))
    }

    pub fn forever(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.store.put_tagged(&self.tags, key, value, None)
    }

    /// Invalidate every entry stored through a scope carrying any of these tags.
    pub fn flush(&self) -> StoreResult<u64> {
        if self.tags.is_empty() {
            return Ok(0);
        }
        self.store.flush_tags(&self.tags)
    }
}
