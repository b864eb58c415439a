use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{CacheView, Inferred, Param, ViewCore};
use crate::cache::error::CacheError;
use crate::cache::identity::HasCacheIdentity;
use crate::cache::keys::{CacheKey, KeyPart, ViewKind};
use crate::cache::tags::{Shape, derive_tags};

/// View over a homogeneous sequence, keyed by `(name, cap, offset)`.
///
/// An unset cap is inferred from the first produced value's length and
/// frozen for later views sharing the same base key.
pub struct CollectionView {
    core: ViewCore,
    capped_at: Option<u32>,
    offset: u32,
}

impl CollectionView {
    pub fn capped_at(mut self, cap: u32) -> Self {
        self.capped_at = Some(cap);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn cap(&self) -> Option<u32> {
        self.capped_at
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Return the cached sequence, or produce, tag, cache for `ttl` and
    /// return it.
    pub fn remember<T, E, F>(&mut self, ttl: Duration, producer: F) -> Result<Vec<T>, E>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<Vec<T>, E>,
    {
        self.remember_for(Some(ttl), producer)
    }

    pub fn remember_forever<T, E, F>(&mut self, producer: F) -> Result<Vec<T>, E>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<Vec<T>, E>,
    {
        self.remember_for(None, producer)
    }

    fn remember_for<T, E, F>(&mut self, ttl: Option<Duration>, producer: F) -> Result<Vec<T>, E>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<Vec<T>, E>,
    {
        let mut tags = self.core.take_pending();
        self.adopt_inferred();
        let key = self.key()?;

        if self.capped_at.is_some() {
            if let Some(cached) = self.core.lookup(&key)? {
                return Ok(cached);
            }
        } else {
            self.core.miss(&key);
        }

        let items = self.core.populate(&key, producer)?;
        tags.extend(derive_tags(Shape::Sequence(&items)));

        let key = match self.capped_at {
            Some(_) => key,
            None => {
                let observed = u32::try_from(items.len()).unwrap_or(u32::MAX);
                if let Inferred::Cap(cap) = self
                    .core
                    .record_inferred(self.base_key(), Inferred::Cap(observed))
                {
                    self.capped_at = Some(cap);
                }
                self.qualified_key()
            }
        };

        self.core.commit(&key, &items, ttl, tags)?;
        Ok(items)
    }

    /// Take the cap frozen by an earlier population with the same base key.
    fn adopt_inferred(&mut self) {
        if self.capped_at.is_none() {
            self.capped_at = self.frozen_cap();
        }
    }

    fn frozen_cap(&self) -> Option<u32> {
        match self.core.inferred(&self.base_key()) {
            Some(Inferred::Cap(cap)) => Some(cap),
            _ => None,
        }
    }

    fn qualifiers(&self) -> [Option<KeyPart>; 2] {
        [
            self.capped_at.map(KeyPart::from),
            Some(KeyPart::from(self.offset)),
        ]
    }

    fn qualified_key(&self) -> CacheKey {
        self.core.build(&self.qualifiers())
    }

    /// Key without the cap, which is what inferences are recorded under.
    fn base_key(&self) -> CacheKey {
        self.core.build(&[None, Some(KeyPart::from(self.offset))])
    }
}

impl CacheView for CollectionView {
    const KIND: ViewKind = ViewKind::Collection;

    fn from_core(core: ViewCore) -> Self {
        Self {
            core,
            capped_at: None,
            offset: 0,
        }
    }

    fn core(&self) -> &ViewCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ViewCore {
        &mut self.core
    }

    fn configure(&mut self, params: &[Param]) {
        if let Some(name) = params.first().and_then(Param::as_name) {
            self.core.set_name(name);
        }
        if let Some(cap) = params.get(1).and_then(Param::as_count) {
            self.capped_at = Some(cap);
        }
        if let Some(offset) = params.get(2).and_then(Param::as_count) {
            self.offset = offset;
        }
    }

    /// Before the cap is known, explicitly or by inference, this is the
    /// base key; nothing is read or written under it.
    fn key(&self) -> Result<CacheKey, CacheError> {
        let cap = self.capped_at.or_else(|| self.frozen_cap());
        Ok(match cap {
            Some(cap) => self.core.build(&[
                Some(KeyPart::from(cap)),
                Some(KeyPart::from(self.offset)),
            ]),
            None => self.base_key(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::Deserialize;

    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::identity::{Identifier, Tag, TagSet};
    use crate::cache::store::{MemoryStore, ScopedStore, Store};
    use crate::cache::view::QualifierMemo;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: i64,
    }

    impl HasCacheIdentity for User {
        fn type_name() -> &'static str {
            "User"
        }

        fn identifier(&self) -> Option<Identifier> {
            Some(Identifier::Numeric(self.id))
        }
    }

    fn users(ids: &[i64]) -> Vec<User> {
        ids.iter().map(|id| User { id: *id }).collect()
    }

    fn shared_view(store: &Arc<dyn Store>, memo: &Arc<QualifierMemo>) -> CollectionView {
        CollectionView::from_core(ViewCore::new(
            ViewKind::Collection,
            store.clone(),
            Vec::new(),
            memo.clone(),
        ))
        .with_type::<User>()
    }

    #[test]
    fn explicit_qualifiers_build_the_key() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let view = CollectionView::standalone(store)
            .with_name("users")
            .capped_at(15)
            .with_offset(30);
        assert_eq!(view.key().expect("key").as_str(), "collection:users:15:30");
    }

    #[test]
    fn cap_is_inferred_from_first_population_and_frozen() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let memo = Arc::new(QualifierMemo::new());

        let mut first = shared_view(&store, &memo);
        assert_eq!(first.key().expect("key").as_str(), "collection:users:0");
        first
            .remember_forever(|| Ok::<_, CacheError>(users(&[1, 2, 3])))
            .expect("populate");
        assert_eq!(first.cap(), Some(3));
        assert!(store.has("collection:users:3:0").expect("has"));

        let mut second = shared_view(&store, &memo);
        assert_eq!(second.key().expect("key").as_str(), "collection:users:3:0");
        let cached: Vec<User> = second
            .remember_forever(|| Err(CacheError::store("producer", "must not be called")))
            .expect("hit");
        assert_eq!(cached, users(&[1, 2, 3]));
    }

    #[test]
    fn entries_are_tagged_with_every_member() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let mut view = CollectionView::standalone(store.clone())
            .with_type::<User>()
            .capped_at(2)
            .tags(["admins"]);
        view.remember(Duration::from_secs(60), || {
            Ok::<_, CacheError>(users(&[1, 2]))
        })
        .expect("populate");
        assert!(view.core().pending_tags().is_empty());

        let flushed = ScopedStore::new(store.as_ref(), [Tag::label("users-2")])
            .flush()
            .expect("flush");
        assert_eq!(flushed, 1);
        assert!(!store.has("collection:users:2:0").expect("has"));
    }

    #[test]
    fn empty_sequences_are_cached_untagged() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let mut view = CollectionView::standalone(store.clone()).with_type::<User>();

        let items: Vec<User> = view
            .remember_forever(|| Ok::<_, CacheError>(Vec::new()))
            .expect("populate");

        assert!(items.is_empty());
        assert!(store.has("collection:users:0:0").expect("has"));
        assert_eq!(
            store
                .flush_tags(&TagSet::from([Tag::label("users-1")]))
                .expect("flush"),
            0
        );
    }

    #[test]
    fn configure_ignores_invalid_counts() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let mut view = CollectionView::standalone(store);
        view.configure(&[Param::from("users"), Param::from(-5), Param::from(10)]);

        assert_eq!(view.cap(), None);
        assert_eq!(view.offset(), 10);
    }
}
