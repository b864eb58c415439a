//! Domain-object lifecycle reactions.
//!
//! Writes to cached domain objects bust every composite view carrying the
//! object's instance tag, then re-cache the object's own single-entity entry.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::config::CacheConfig;
use super::error::CacheError;
use super::identity::{HasCacheIdentity, Identifier, table_name};
use super::registry::ViewRegistry;
use super::view::{CacheView, SingleView};

/// Lifecycle signal emitted at the point of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Created,
    Updated,
    Deleted,
    Restored,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Restored => "restored",
        }
    }

    fn busts(self) -> bool {
        !matches!(self, Self::Created)
    }

    fn populates(self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reacts to lifecycle signals on objects that opt in to caching.
///
/// Busting always precedes re-caching so a composite view can never be
/// read back holding the object's previous state.
pub struct InvalidationCoordinator {
    registry: Arc<ViewRegistry>,
    config: CacheConfig,
}

impl InvalidationCoordinator {
    pub fn new(registry: Arc<ViewRegistry>, config: CacheConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<ViewRegistry> {
        &self.registry
    }

    pub fn created<T>(&self, object: &T) -> Result<(), CacheError>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned + Clone,
    {
        self.handle(Lifecycle::Created, object)
    }

    pub fn updated<T>(&self, object: &T) -> Result<(), CacheError>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned + Clone,
    {
        self.handle(Lifecycle::Updated, object)
    }

    pub fn deleted<T>(&self, object: &T) -> Result<(), CacheError>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned + Clone,
    {
        self.handle(Lifecycle::Deleted, object)
    }

    pub fn restored<T>(&self, object: &T) -> Result<(), CacheError>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned + Clone,
    {
        self.handle(Lifecycle::Restored, object)
    }

    pub fn handle<T>(&self, lifecycle: Lifecycle, object: &T) -> Result<(), CacheError>
    where
        T: HasCacheIdentity + Serialize + DeserializeOwned + Clone,
    {
        if !self.config.is_enabled() {
            debug!(%lifecycle, "Lifecycle reaction skipped: cache disabled");
            return Ok(());
        }

        let Some(identifier) = object.identifier() else {
            debug!(
                %lifecycle,
                type_name = T::type_name(),
                "Lifecycle reaction skipped: object has no cache identity"
            );
            return Ok(());
        };

        let mut view = self.single_for::<T>(&identifier);

        let busted = if lifecycle.busts() {
            view.destroy(object)?
        } else {
            false
        };

        let populated = lifecycle.populates() && self.config.populate_on_write;
        if populated {
            view.remember_forever(|| Ok::<T, CacheError>(object.clone()))?;
        }

        info!(
            %lifecycle,
            type_name = T::type_name(),
            %identifier,
            busted,
            populated,
            "Handled lifecycle signal"
        );
        Ok(())
    }

    fn single_for<T: HasCacheIdentity>(&self, identifier: &Identifier) -> SingleView {
        self.registry
            .fresh::<SingleView>()
            .with_name(table_name::<T>())
            .identified_by(identifier.clone())
    }
}
