//! View registry.
//!
//! Manufactures configured views over one shared store, carrying the
//! process-wide namespace and the qualifier memo into each of them.

use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use super::config::CacheConfig;
use super::keys::{KeyPart, ViewKind};
use super::lock::{mutex_lock, rw_read, rw_write};
use super::store::Store;
use super::view::{
    CacheView, CollectionView, PaginatedView, Param, QualifierMemo, SingleView, ViewCore,
};

const SOURCE: &str = "cache::registry";

/// A freshly resolved view of any kind.
pub enum ResolvedView {
    Single(SingleView),
    Collection(CollectionView),
    Paginated(PaginatedView),
}

impl ResolvedView {
    pub fn kind(&self) -> ViewKind {
        match self {
            Self::Single(_) => ViewKind::Single,
            Self::Collection(_) => ViewKind::Collection,
            Self::Paginated(_) => ViewKind::Paginated,
        }
    }

    pub fn into_single(self) -> Option<SingleView> {
        match self {
            Self::Single(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<CollectionView> {
        match self {
            Self::Collection(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_paginated(self) -> Option<PaginatedView> {
        match self {
            Self::Paginated(view) => Some(view),
            _ => None,
        }
    }
}

/// Entry point for consumers wanting a cached read or write.
///
/// Every resolution returns an independent view; only the store, the
/// namespace and the qualifier memo are shared.
pub struct ViewRegistry {
    store: Arc<dyn Store>,
    default_keys: RwLock<Vec<KeyPart>>,
    appendable: Mutex<Vec<Param>>,
    memo: Arc<QualifierMemo>,
}

impl ViewRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            default_keys: RwLock::new(Vec::new()),
            appendable: Mutex::new(Vec::new()),
            memo: Arc::new(QualifierMemo::new()),
        }
    }

    /// Registry whose namespace comes from `config.default_keys`.
    pub fn from_config(store: Arc<dyn Store>, config: &CacheConfig) -> Self {
        let registry = Self::new(store);
        registry.set_default_keys(config.default_key_parts());
        registry
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Replace the namespace segments applied to every view resolved from now on.
    pub fn set_default_keys<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<KeyPart>,
    {
        *rw_write(&self.default_keys, SOURCE, "set_default_keys") =
            keys.into_iter().map(Into::into).collect();
    }

    pub fn default_keys(&self) -> Vec<KeyPart> {
        rw_read(&self.default_keys, SOURCE, "default_keys").clone()
    }

    /// Queue parameters for the next resolution only.
    pub fn append<I>(&self, params: I) -> &Self
    where
        I: IntoIterator<Item = Param>,
    {
        mutex_lock(&self.appendable, SOURCE, "append").extend(params);
        self
    }

    /// Resolve a view of `kind` (Single when `None`) configured with the
    /// queued parameters followed by `params`.
    pub fn resolve(&self, kind: Option<ViewKind>, params: &[Param]) -> ResolvedView {
        match kind.unwrap_or(ViewKind::Single) {
            ViewKind::Single => ResolvedView::Single(self.build(params)),
            ViewKind::Collection => ResolvedView::Collection(self.build(params)),
            ViewKind::Paginated => ResolvedView::Paginated(self.build(params)),
        }
    }

    pub fn single(&self, params: &[Param]) -> SingleView {
        self.build(params)
    }

    pub fn collection(&self, params: &[Param]) -> CollectionView {
        self.build(params)
    }

    pub fn paginator(&self, params: &[Param]) -> PaginatedView {
        self.build(params)
    }

    /// Unconfigured view sharing the store, namespace and memo. Leaves the
    /// appended parameters queued for the next consumer resolution.
    pub(crate) fn fresh<V: CacheView>(&self) -> V {
        V::from_core(ViewCore::new(
            V::KIND,
            self.store.clone(),
            self.default_keys(),
            self.memo.clone(),
        ))
    }

    fn build<V: CacheView>(&self, params: &[Param]) -> V {
        let queued = std::mem::take(&mut *mutex_lock(&self.appendable, SOURCE, "build"));
        let mut view = self.fresh::<V>();
        if !queued.is_empty() {
            view.configure(&queued);
        }
        if !params.is_empty() {
            view.configure(params);
        }

        debug!(
            kind = V::KIND.as_str(),
            queued = queued.len(),
            params = params.len(),
            "Resolved cache view"
        );
        view
    }
}
