//! Route-style lookups: resolve a domain object from an identifier string,
//! going through its single-entity cache entry first.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::CacheError;
use super::identity::{HasCacheIdentity, Identifier, table_name};
use super::inflect;
use super::registry::ViewRegistry;
use super::view::{CacheView, SingleView};

/// Cached finder for one domain type.
pub struct RouteBinder<T> {
    registry: Arc<ViewRegistry>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RouteBinder<T>
where
    T: HasCacheIdentity + Serialize + DeserializeOwned,
{
    pub fn new(registry: Arc<ViewRegistry>) -> Self {
        Self {
            registry,
            _marker: PhantomData,
        }
    }

    /// Placeholder name the type is bound under, e.g. `user_profile`.
    pub fn binding_key() -> String {
        inflect::binding_key(T::type_name())
    }

    /// Resolve `value`, caching the finder's result for `T::cacheable_for()`.
    pub fn bind<E, F>(&self, value: &str, finder: F) -> Result<T, E>
    where
        E: From<CacheError>,
        F: FnOnce(&str) -> Result<T, E>,
    {
        self.view(value)
            .remember(T::cacheable_for(), || finder(value))
    }

    /// Resolve `identifier`, caching the finder's result without expiry.
    pub fn find_in_cache<E, F>(&self, identifier: &str, finder: F) -> Result<T, E>
    where
        E: From<CacheError>,
        F: FnOnce(&str) -> Result<T, E>,
    {
        self.view(identifier)
            .remember_forever(|| finder(identifier))
    }

    fn view(&self, identifier: &str) -> SingleView {
        self.registry
            .fresh::<SingleView>()
            .with_name(table_name::<T>())
            .identified_by(Identifier::from(identifier))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use serde::Deserialize;

    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::keys::ViewKind;
    use crate::cache::store::{MemoryStore, Store};
    use crate::cache::view::Param;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct UserProfile {
        id: i64,
    }

    impl HasCacheIdentity for UserProfile {
        fn type_name() -> &'static str {
            "app::UserProfile"
        }

        fn identifier(&self) -> Option<Identifier> {
            Some(Identifier::Numeric(self.id))
        }

        fn cacheable_for() -> Duration {
            Duration::from_secs(5)
        }
    }

    fn binder() -> RouteBinder<UserProfile> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        RouteBinder::new(Arc::new(ViewRegistry::new(store)))
    }

    #[test]
    fn binding_key_is_singular_snake_case() {
        assert_eq!(RouteBinder::<UserProfile>::binding_key(), "user_profile");
    }

    #[test]
    fn bind_calls_the_finder_once() {
        let binder = binder();
        let calls = Cell::new(0);
        let finder = |value: &str| {
            calls.set(calls.get() + 1);
            let id = value
                .parse()
                .map_err(|_| CacheError::store("finder", "bad identifier"))?;
            Ok::<_, CacheError>(UserProfile { id })
        };

        let first = binder.bind("7", finder).expect("first bind");
        let second = binder.bind("7", finder).expect("second bind");

        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert!(binder.registry.store().has("eloquent:user_profiles:7").expect("has"));
    }

    #[test]
    fn find_in_cache_propagates_finder_errors() {
        let binder = binder();
        let result = binder.find_in_cache("missing", |_| {
            Err::<UserProfile, _>(CacheError::store("finder", "not found"))
        });

        assert!(result.is_err());
        assert!(
            !binder
                .registry
                .store()
                .has("eloquent:user_profiles:missing")
                .expect("has")
        );
    }

    #[test]
    fn binding_leaves_params_queued_for_the_consumer() {
        let binder = binder();
        binder
            .registry
            .append([Param::from("users"), Param::from(15), Param::from(30)]);

        binder
            .find_in_cache("3", |_| Ok::<_, CacheError>(UserProfile { id: 3 }))
            .expect("bind");

        let view = binder
            .registry
            .resolve(Some(ViewKind::Collection), &[])
            .into_collection()
            .expect("collection view");
        assert_eq!(view.key().expect("key").as_str(), "collection:users:15:30");
    }
}
