use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{CacheView, Inferred, Param, ViewCore};
use crate::cache::error::CacheError;
use crate::cache::identity::HasCacheIdentity;
use crate::cache::keys::{CacheKey, KeyPart, ViewKind};
use crate::cache::page::Page;
use crate::cache::tags::{Shape, derive_tags};

const UNSET_QUALIFIER: &str = "*";

/// View over one page of results, keyed by `(name, per_page, page)`.
///
/// Unset qualifiers are taken from the first produced page's own metadata
/// and frozen for later views sharing the same base key.
pub struct PaginatedView {
    core: ViewCore,
    per_page: Option<u32>,
    page: Option<u32>,
}

impl PaginatedView {
    pub fn showing(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(&self) -> Option<u32> {
        self.per_page
    }

    pub fn page(&self) -> Option<u32> {
        self.page
    }

    pub fn remember<T, E, F>(&mut self, ttl: Duration, producer: F) -> Result<Page<T>, E>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<Page<T>, E>,
    {
        self.remember_for(Some(ttl), producer)
    }

    pub fn remember_forever<T, E, F>(&mut self, producer: F) -> Result<Page<T>, E>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<Page<T>, E>,
    {
        self.remember_for(None, producer)
    }

    fn remember_for<T, E, F>(&mut self, ttl: Option<Duration>, producer: F) -> Result<Page<T>, E>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<Page<T>, E>,
    {
        let mut tags = self.core.take_pending();
        self.adopt_inferred();
        let key = self.key()?;

        if self.is_resolved() {
            if let Some(cached) = self.core.lookup(&key)? {
                return Ok(cached);
            }
        } else {
            self.core.miss(&key);
        }

        let page = self.core.populate(&key, producer)?;
        tags.extend(derive_tags(Shape::Paginated(&page)));

        let key = if self.is_resolved() {
            key
        } else {
            let observed = Inferred::Pagination {
                per_page: self.per_page.unwrap_or(page.per_page),
                page: self.page.unwrap_or(page.current_page),
            };
            if let Inferred::Pagination { per_page, page } =
                self.core.record_inferred(self.base_key(), observed)
            {
                self.per_page = Some(per_page);
                self.page = Some(page);
            }
            self.qualified_key()
        };

        self.core.commit(&key, &page, ttl, tags)?;
        Ok(page)
    }

    fn is_resolved(&self) -> bool {
        self.per_page.is_some() && self.page.is_some()
    }

    /// Fill unset qualifiers from an earlier inference with the same base key.
    fn adopt_inferred(&mut self) {
        if let Some((per_page, page)) = self.frozen_qualifiers() {
            self.per_page.get_or_insert(per_page);
            self.page.get_or_insert(page);
        }
    }

    fn frozen_qualifiers(&self) -> Option<(u32, u32)> {
        if self.is_resolved() {
            return None;
        }
        match self.core.inferred(&self.base_key()) {
            Some(Inferred::Pagination { per_page, page }) => Some((per_page, page)),
            _ => None,
        }
    }

    fn qualified_key(&self) -> CacheKey {
        self.core.build(&[
            self.per_page.map(KeyPart::from),
            self.page.map(KeyPart::from),
        ])
    }

    /// Memo key with unset qualifiers held in place. Keeps `showing(4)` and
    /// `on_page(4)` apart. Never read from or written to the store.
    fn base_key(&self) -> CacheKey {
        let unset = || KeyPart::from(UNSET_QUALIFIER);
        self.core.build(&[
            Some(self.per_page.map_or_else(unset, KeyPart::from)),
            Some(self.page.map_or_else(unset, KeyPart::from)),
        ])
    }
}

impl CacheView for PaginatedView {
    const KIND: ViewKind = ViewKind::Paginated;

    fn from_core(core: ViewCore) -> Self {
        Self {
            core,
            per_page: None,
            page: None,
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
        if let Some(per_page) = params.get(1).and_then(Param::as_count) {
            self.per_page = Some(per_page);
        }
        if let Some(page) = params.get(2).and_then(Param::as_count) {
            self.page = Some(page);
        }
    }

    fn key(&self) -> Result<CacheKey, CacheError> {
        Ok(match self.frozen_qualifiers() {
            Some((per_page, page)) => self.core.build(&[
                Some(KeyPart::from(self.per_page.unwrap_or(per_page))),
                Some(KeyPart::from(self.page.unwrap_or(page))),
            ]),
            None if self.is_resolved() => self.qualified_key(),
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
    use crate::cache::identity::{Identifier, Tag};
    use crate::cache::store::{MemoryStore, ScopedStore, Store};
    use crate::cache::view::QualifierMemo;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Post {
        id: i64,
    }

    impl HasCacheIdentity for Post {
        fn type_name() -> &'static str {
            "Post"
        }

        fn identifier(&self) -> Option<Identifier> {
            Some(Identifier::Numeric(self.id))
        }
    }

    fn page(ids: &[i64], per_page: u32, current_page: u32) -> Page<Post> {
        Page::new(
            ids.iter().map(|id| Post { id: *id }).collect(),
            per_page,
            current_page,
        )
    }

    fn shared_view(store: &Arc<dyn Store>, memo: &Arc<QualifierMemo>) -> PaginatedView {
        PaginatedView::from_core(ViewCore::new(
            ViewKind::Paginated,
            store.clone(),
            Vec::new(),
            memo.clone(),
        ))
        .with_type::<Post>()
    }

    #[test]
    fn explicit_qualifiers_build_the_key() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let view = PaginatedView::standalone(store)
            .with_type::<Post>()
            .showing(20)
            .on_page(3);
        assert_eq!(view.key().expect("key").as_str(), "paginator:posts:20:3");
    }

    #[test]
    fn missing_qualifiers_come_from_the_page_and_stay_frozen() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let memo = Arc::new(QualifierMemo::new());

        let mut first = shared_view(&store, &memo);
        first
            .remember_forever(|| Ok::<_, CacheError>(page(&[16, 17], 15, 2)))
            .expect("populate");
        assert_eq!(first.per_page(), Some(15));
        assert_eq!(first.page(), Some(2));
        assert!(store.has("paginator:posts:15:2").expect("has"));

        let second = shared_view(&store, &memo);
        assert_eq!(second.key().expect("key").as_str(), "paginator:posts:15:2");
    }

    #[test]
    fn repopulation_after_a_flush_writes_the_frozen_key() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let memo = Arc::new(QualifierMemo::new());

        let mut first = shared_view(&store, &memo);
        first
            .remember_forever(|| Ok::<_, CacheError>(page(&[16, 17], 15, 2)))
            .expect("populate");
        ScopedStore::new(store.as_ref(), [Tag::label("posts-16")])
            .flush()
            .expect("flush");

        let mut second = shared_view(&store, &memo);
        second
            .remember_forever(|| Ok::<_, CacheError>(page(&[17], 20, 1)))
            .expect("repopulate");
        assert_eq!(second.per_page(), Some(15));
        assert_eq!(second.page(), Some(2));
        assert!(store.has("paginator:posts:15:2").expect("has"));
        assert!(!store.has("paginator:posts:20:1").expect("has"));

        let mut third = shared_view(&store, &memo);
        let cached: Page<Post> = third
            .remember_forever(|| Err(CacheError::store("producer", "must not be called")))
            .expect("hit");
        assert_eq!(cached.items, vec![Post { id: 17 }]);
    }

    #[test]
    fn explicit_page_keeps_priority_over_inference() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let mut view = PaginatedView::standalone(store.clone())
            .with_type::<Post>()
            .on_page(4);

        view.remember(Duration::from_secs(60), || {
            Ok::<_, CacheError>(page(&[1], 10, 1))
        })
        .expect("populate");

        assert_eq!(view.key().expect("key").as_str(), "paginator:posts:10:4");
        assert!(store.has("paginator:posts:10:4").expect("has"));
    }

    #[test]
    fn page_entries_are_tagged_with_their_items() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let mut view = PaginatedView::standalone(store.clone())
            .with_type::<Post>()
            .showing(15)
            .on_page(1);
        view.remember_forever(|| Ok::<_, CacheError>(page(&[1, 2], 15, 1)))
            .expect("populate");

        let flushed = ScopedStore::new(store.as_ref(), [Tag::label("posts-2")])
            .flush()
            .expect("flush");

        assert_eq!(flushed, 1);
        assert!(!store.has("paginator:posts:15:1").expect("has"));
    }
}
