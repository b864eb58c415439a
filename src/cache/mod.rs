//! Tag-based cache invalidation.
//!
//! Domain objects, sequences of them and pages of them are cached through
//! [`CacheView`]s resolved from a [`ViewRegistry`]. Composite entries are
//! tagged with the instance tag of every object they contain, so a write to
//! one object busts every composite that embeds it:
//!
//! - **Single** (`eloquent:<name>:<id>`): one object, untagged
//! - **Collection** (`collection:<name>:<cap>:<offset>`): tagged per member
//! - **Paginated** (`paginator:<name>:<per_page>:<page>`): tagged per item
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! store_capacity = 10000
//! default_ttl_secs = 1800
//! default_keys = ["tenant-3"]
//! populate_on_write = true
//! ```

mod config;
mod coordinator;
mod error;
mod identity;
pub mod inflect;
mod keys;
mod lock;
mod lookup;
mod page;
mod registry;
mod store;
mod tags;
mod view;

pub use config::CacheConfig;
pub use coordinator::{InvalidationCoordinator, Lifecycle};
pub use error::CacheError;
pub use identity::{HasCacheIdentity, Identifier, TAG_DELIMITER, Tag, TagSet, table_name};
pub use keys::{CacheKey, KEY_SEPARATOR, KeyPart, ViewKind, build_key};
pub use lookup::RouteBinder;
pub use page::Page;
pub use registry::{ResolvedView, ViewRegistry};
pub use store::{MemoryStore, ScopedStore, Store, StoreResult, TagIndex};
pub use tags::{Shape, derive_tags};
pub use view::{
    CacheView, CollectionView, Inferred, PaginatedView, Param, QualifierMemo, SingleView,
    ViewCore,
};
