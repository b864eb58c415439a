use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{CacheView, Param, ViewCore};
use crate::cache::error::CacheError;
use crate::cache::identity::{HasCacheIdentity, Identifier, table_name};
use crate::cache::keys::{CacheKey, ViewKind};

/// View over one domain object, keyed by `(name, identifier)`.
///
/// Values stored through this view carry no derived tags: they are removed
/// by `destroy` forgetting the canonical key directly.
pub struct SingleView {
    core: ViewCore,
    identifier: Option<Identifier>,
}

impl SingleView {
    pub fn identified_by(mut self, identifier: impl Into<Identifier>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    /// Return the cached value, or produce, cache for `ttl` and return it.
    pub fn remember<T, E, F>(&mut self, ttl: Duration, producer: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.remember_for(Some(ttl), producer)
    }

    /// As [`SingleView::remember`], without expiry.
    pub fn remember_forever<T, E, F>(&mut self, producer: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.remember_for(None, producer)
    }

    fn remember_for<T, E, F>(&mut self, ttl: Option<Duration>, producer: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        let tags = self.core.take_pending();
        let key = self.key()?;

        if let Some(cached) = self.core.lookup(&key)? {
            return Ok(cached);
        }

        let value = self.core.populate(&key, producer)?;
        self.core.commit(&key, &value, ttl, tags)?;
        Ok(value)
    }
}

impl CacheView for SingleView {
    const KIND: ViewKind = ViewKind::Single;

    fn from_core(core: ViewCore) -> Self {
        Self {
            core,
            identifier: None,
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
        if let Some(identifier) = params.get(1).and_then(Param::as_identifier) {
            self.identifier = Some(identifier);
        }
    }

    fn key(&self) -> Result<CacheKey, CacheError> {
        let identifier = self
            .identifier
            .clone()
            .ok_or_else(|| CacheError::missing_qualifier(Self::KIND, "identifier"))?;
        Ok(self.core.build(&[Some(identifier.into())]))
    }

    /// Also points this view at the destroyed object, so a following
    /// `remember` repopulates exactly the key that was forgotten.
    fn destroy<T: HasCacheIdentity>(&mut self, object: &T) -> Result<bool, CacheError> {
        if let Some(identifier) = object.identifier() {
            self.core.set_name(table_name::<T>());
            self.identifier = Some(identifier);
        }
        self.core.destroy(object)
    }
}
