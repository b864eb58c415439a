//! Cache views: the Single / Collection / Paginated adapters over a [`Store`].
//!
//! A view is a short-lived, fluent configuration object. It builds its own
//! key, decides which tags a produced value carries, and commits through a
//! tag-scoped store handle obtained fresh for every operation.

mod collection;
mod paginated;
mod single;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::{counter, histogram};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::CacheError;
use super::identity::{HasCacheIdentity, Identifier, Tag, TagSet, table_name};
use super::inflect;
use super::keys::{CacheKey, KeyPart, ViewKind, build_key};
use super::store::Store;

pub use collection::CollectionView;
pub use paginated::PaginatedView;
pub use single::SingleView;

const METRIC_HIT: &str = "tagcache_hit_total";
const METRIC_MISS: &str = "tagcache_miss_total";
const METRIC_POPULATE_MS: &str = "tagcache_populate_ms";
const METRIC_FLUSH: &str = "tagcache_flush_total";
const METRIC_FORGET: &str = "tagcache_forget_total";

/// Positional configuration value accepted by [`CacheView::configure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Null,
    Text(String),
    Int(i64),
    /// A domain type; used as a name it becomes the type's table name.
    Type(&'static str),
}

impl Param {
    pub fn of_type<T: HasCacheIdentity + ?Sized>() -> Self {
        Self::Type(T::type_name())
    }

    fn as_name(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Type(type_name) => Some(inflect::table_name(type_name)),
            Self::Null | Self::Int(_) => None,
        }
    }

    fn as_count(&self) -> Option<u32> {
        match self {
            Self::Int(value) => u32::try_from(*value).ok(),
            _ => None,
        }
    }

    fn as_identifier(&self) -> Option<Identifier> {
        match self {
            Self::Int(value) => Some(Identifier::Numeric(*value)),
            Self::Text(text) => Some(Identifier::Text(text.clone())),
            Self::Null | Self::Type(_) => None,
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Qualifiers a view inferred from its first produced value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inferred {
    Cap(u32),
    Pagination { per_page: u32, page: u32 },
}

/// Inferred qualifiers, indexed by the key a view builds before inference.
///
/// Shared by every view one registry manufactures. Later views with the same
/// base key adopt the recorded qualifiers before reading, so they read and
/// repopulate the same key the first population wrote.
#[derive(Debug, Default)]
pub struct QualifierMemo {
    inferred: DashMap<CacheKey, Inferred>,
}

impl QualifierMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, base: &CacheKey) -> Option<Inferred> {
        self.inferred.get(base).map(|entry| *entry.value())
    }

    /// Record `inferred` under `base` unless an earlier inference exists.
    /// Returns the qualifiers now frozen for `base`.
    pub fn record(&self, base: CacheKey, inferred: Inferred) -> Inferred {
        *self.inferred.entry(base).or_insert(inferred).value()
    }

    pub fn len(&self) -> usize {
        self.inferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inferred.is_empty()
    }
}

/// State shared by every view kind.
pub struct ViewCore {
    kind: ViewKind,
    store: Arc<dyn Store>,
    name: Option<String>,
    default_keys: Vec<KeyPart>,
    pending: TagSet,
    memo: Arc<QualifierMemo>,
}

impl ViewCore {
    pub fn new(
        kind: ViewKind,
        store: Arc<dyn Store>,
        default_keys: Vec<KeyPart>,
        memo: Arc<QualifierMemo>,
    ) -> Self {
        Self {
            kind,
            store,
            name: None,
            default_keys,
            pending: TagSet::new(),
            memo,
        }
    }

    /// A core with no namespace and a private qualifier memo.
    pub fn standalone(kind: ViewKind, store: Arc<dyn Store>) -> Self {
        Self::new(kind, store, Vec::new(), Arc::new(QualifierMemo::new()))
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn default_keys(&self) -> &[KeyPart] {
        &self.default_keys
    }

    /// Tags queued for the next commit.
    pub fn pending_tags(&self) -> &TagSet {
        &self.pending
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    fn build(&self, qualifiers: &[Option<KeyPart>]) -> CacheKey {
        build_key(self.kind, &self.default_keys, self.name(), qualifiers)
    }

    fn inferred(&self, base: &CacheKey) -> Option<Inferred> {
        self.memo.get(base)
    }

    fn record_inferred(&self, base: CacheKey, inferred: Inferred) -> Inferred {
        debug!(base = %base, ?inferred, "Froze inferred key qualifiers");
        self.memo.record(base, inferred)
    }

    fn take_pending(&mut self) -> TagSet {
        std::mem::take(&mut self.pending)
    }

    fn lookup<V: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<V>, CacheError> {
        let kind = self.kind.as_str();
        match self.store.get(key.as_str())? {
            Some(bytes) => {
                counter!(METRIC_HIT, "kind" => kind).increment(1);
                debug!(key = %key, "Cache hit");
                serde_json::from_slice(&bytes)
                    .map(Some)
                    .map_err(|err| CacheError::decode(key.as_str(), err.to_string()))
            }
            None => {
                self.miss(key);
                Ok(None)
            }
        }
    }

    /// Count a miss without reading the store, for keys still awaiting
    /// qualifier inference: nothing is ever written under those.
    fn miss(&self, key: &CacheKey) {
        counter!(METRIC_MISS, "kind" => self.kind.as_str()).increment(1);
        debug!(key = %key, "Cache miss");
    }

    fn populate<V, E, F>(&self, key: &CacheKey, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let started_at = Instant::now();
        let value = producer()?;
        histogram!(METRIC_POPULATE_MS, "kind" => self.kind.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(key = %key, "Produced fresh value");
        Ok(value)
    }

    fn commit<V: Serialize>(
        &self,
        key: &CacheKey,
        value: &V,
        ttl: Option<Duration>,
        tags: TagSet,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|err| CacheError::encode(key.as_str(), err.to_string()))?;

        debug!(key = %key, tag_count = tags.len(), ?ttl, "Committing cache entry");

        if tags.is_empty() {
            return match ttl {
                Some(ttl) => self.store.set(key.as_str(), bytes, ttl),
                None => self.store.forever(key.as_str(), bytes),
            };
        }

        let scoped = self.store.tags(tags);
        match ttl {
            Some(ttl) => scoped.set(key.as_str(), bytes, ttl),
            None => scoped.forever(key.as_str(), bytes),
        }
    }

    /// Canonical single-entity key of `(type, identifier)` in this namespace.
    fn canonical_key<T: HasCacheIdentity + ?Sized>(&self, identifier: &Identifier) -> CacheKey {
        let name = table_name::<T>();
        build_key(
            ViewKind::Single,
            &self.default_keys,
            Some(&name),
            &[Some(identifier.clone().into())],
        )
    }

    fn destroy<T: HasCacheIdentity>(&self, object: &T) -> Result<bool, CacheError> {
        let Some(identifier) = object.identifier() else {
            debug!(
                type_name = T::type_name(),
                "Destroy skipped: object has no cache identity"
            );
            return Ok(false);
        };

        let tag = Tag::instance(T::type_name(), &identifier);
        let key = self.canonical_key::<T>(&identifier);

        let flushed = self.store.tags([tag.clone()]).flush()?;
        counter!(METRIC_FLUSH).increment(1);

        let existed = self.store.forget(key.as_str())?;
        counter!(METRIC_FORGET).increment(1);

        info!(
            key = %key,
            tag = %tag,
            flushed,
            existed,
            "Destroyed cached object"
        );
        Ok(existed)
    }
}

/// Fluent surface shared by every view kind.
pub trait CacheView: Sized {
    const KIND: ViewKind;

    fn from_core(core: ViewCore) -> Self;

    fn core(&self) -> &ViewCore;

    fn core_mut(&mut self) -> &mut ViewCore;

    /// Apply positional parameters: the name first, then the view's
    /// qualifiers. Absent or wrongly typed parameters are skipped.
    fn configure(&mut self, params: &[Param]);

    /// Key this view reads and writes.
    fn key(&self) -> Result<CacheKey, CacheError>;

    /// Build an unnamespaced view over `store`.
    fn standalone(store: Arc<dyn Store>) -> Self {
        Self::from_core(ViewCore::standalone(Self::KIND, store))
    }

    /// Name the view explicitly.
    fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core_mut().set_name(name.into());
        self
    }

    /// Name the view after a domain type (`UserProfile` -> `user_profiles`).
    fn with_type<T: HasCacheIdentity + ?Sized>(mut self) -> Self {
        self.core_mut().set_name(table_name::<T>());
        self
    }

    /// Queue extra tags for the next commit.
    fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.core_mut().pending.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Replace the namespace segments prefixed to this view's keys.
    fn set_default_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<KeyPart>,
    {
        self.core_mut().default_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// The underlying store.
    fn driver(&self) -> &Arc<dyn Store> {
        self.core().store()
    }

    /// Flush every entry tagged with `object`'s instance tag, then forget
    /// its canonical single-entity key.
    ///
    /// Returns whether the canonical key existed. Objects without identity
    /// and objects never cached are a silent no-op.
    fn destroy<T: HasCacheIdentity>(&mut self, object: &T) -> Result<bool, CacheError> {
        self.core().destroy(object)
    }
}
