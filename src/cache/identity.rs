//! Cache identity of domain objects and the tags derived from it.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use super::inflect;
use super::keys::KeyPart;

/// Delimiter between the type segment and the identifier of an instance tag.
pub const TAG_DELIMITER: &str = "-";

const DEFAULT_CACHEABLE_FOR: Duration = Duration::from_secs(30 * 60);

/// Identifier a domain object is cached as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Numeric(i64),
    Text(String),
}

impl Identifier {
    /// Numeric identifiers, including numeric strings, are combined with the
    /// type name when tagging. Everything else is a caller-chosen label.
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Numeric(_) => true,
            Self::Text(text) => is_numeric_str(text),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

impl From<i32> for Identifier {
    fn from(value: i32) -> Self {
        Self::Numeric(i64::from(value))
    }
}

impl From<u32> for Identifier {
    fn from(value: u32) -> Self {
        Self::Numeric(i64::from(value))
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Identifier> for KeyPart {
    fn from(value: Identifier) -> Self {
        match value {
            Identifier::Numeric(number) => KeyPart::Int(number),
            Identifier::Text(text) => KeyPart::Text(text),
        }
    }
}

fn is_numeric_str(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || digits.starts_with('.') || digits.ends_with('.') {
        return false;
    }
    let mut seen_dot = false;
    digits.chars().all(|c| match c {
        '0'..='9' => true,
        '.' if !seen_dot => {
            seen_dot = true;
            true
        }
        _ => false,
    })
}

/// Capability implemented by domain types that opt in to caching.
///
/// # Implementation Requirements
///
/// - `type_name()` must be stable for every instance of the type
/// - `identifier()` returns `None` for objects without identity yet (e.g.
///   unsaved records); such objects are skipped when tagging and ignored by
///   destroy and lifecycle reactions
pub trait HasCacheIdentity {
    /// Type identifier. Only the last path segment is used.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Identifier this object is cached as.
    fn identifier(&self) -> Option<Identifier>;

    /// How long route lookups keep this type cached.
    fn cacheable_for() -> Duration {
        DEFAULT_CACHEABLE_FOR
    }
}

/// View name for a type: pluralised, lower-cased, snake-cased basename.
pub fn table_name<T: HasCacheIdentity + ?Sized>() -> String {
    inflect::table_name(T::type_name())
}

/// Invalidation-group label attached to cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// An arbitrary caller-supplied label.
    pub fn label(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Instance tag reconstructed from `(type name, identifier)` alone.
    pub fn instance(type_name: &str, identifier: &Identifier) -> Self {
        if identifier.is_numeric() {
            Self(format!(
                "{}{TAG_DELIMITER}{identifier}",
                inflect::table_name(type_name)
            ))
        } else {
            Self(identifier.to_string())
        }
    }

    /// Instance tag of an object, if it has identity.
    pub fn of<T: HasCacheIdentity>(object: &T) -> Option<Self> {
        object
            .identifier()
            .map(|identifier| Self::instance(T::type_name(), &identifier))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::label(value)
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Self::label(value)
    }
}

/// Ordered, de-duplicated set of tags.
pub type TagSet = BTreeSet<Tag>;
