//! Cache key definitions.
//!
//! Every key is `kind[:defaults...][:name][:qualifiers...]` joined with
//! [`KEY_SEPARATOR`]. Absent qualifiers are dropped before joining; present
//! zero values are kept.

use std::fmt;

/// Separator between key segments.
pub const KEY_SEPARATOR: &str = ":";

/// The three shapes of cacheable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// One entity looked up by identifier.
    Single,
    /// A capped, offset sequence of entities.
    Collection,
    /// One page of a paginated sequence.
    Paginated,
}

impl ViewKind {
    /// Discriminator used as the first key segment.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "eloquent",
            Self::Collection => "collection",
            Self::Paginated => "paginator",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segment of a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Text(String),
    Int(i64),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// A fully built cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a key from its view kind, namespace defaults, name and qualifiers.
///
/// Pure and deterministic. Qualifier order is significant.
pub fn build_key(
    kind: ViewKind,
    defaults: &[KeyPart],
    name: Option<&str>,
    qualifiers: &[Option<KeyPart>],
) -> CacheKey {
    let mut segments: Vec<String> = Vec::with_capacity(2 + defaults.len() + qualifiers.len());
    segments.push(kind.as_str().to_string());
    segments.extend(defaults.iter().map(ToString::to_string));
    if let Some(name) = name {
        segments.push(name.to_string());
    }
    segments.extend(qualifiers.iter().flatten().map(ToString::to_string));
    CacheKey(segments.join(KEY_SEPARATOR))
}
