//! Tag derivation for values about to be cached.

use super::identity::{HasCacheIdentity, Tag, TagSet};
use super::page::Page;

/// The shape a view declares for the value it caches.
#[derive(Debug)]
pub enum Shape<'a, T> {
    Single(&'a T),
    Sequence(&'a [T]),
    Paginated(&'a Page<T>),
}

/// Compute the instance tags a value must be stored under.
///
/// Entries lacking identity are skipped; a value with no identity at all
/// yields an empty set rather than an error.
pub fn derive_tags<T: HasCacheIdentity>(shape: Shape<'_, T>) -> TagSet {
    match shape {
        Shape::Single(object) => Tag::of(object).into_iter().collect(),
        Shape::Sequence(items) => items.iter().filter_map(Tag::of).collect(),
        Shape::Paginated(page) => derive_tags(Shape::Sequence(page.items())),
    }
}
