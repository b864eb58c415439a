use thiserror::Error;

use super::keys::ViewKind;

/// Failures raised by the cache layer itself.
///
/// Producer failures never pass through this type: `remember` is generic over
/// the producer's error and only converts *store* failures into it.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store failed during `{op}`: {message}")]
    Store { op: &'static str, message: String },
    #[error("failed to encode cached value for `{key}`: {message}")]
    Encode { key: String, message: String },
    #[error("failed to decode cached value for `{key}`: {message}")]
    Decode { key: String, message: String },
    #[error("{kind} view requires `{qualifier}` before its key can be built")]
    MissingQualifier {
        kind: ViewKind,
        qualifier: &'static str,
    },
}

impl CacheError {
    pub fn store(op: &'static str, message: impl Into<String>) -> Self {
        Self::Store {
            op,
            message: message.into(),
        }
    }

    pub fn encode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn missing_qualifier(kind: ViewKind, qualifier: &'static str) -> Self {
        Self::MissingQualifier { kind, qualifier }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let error = CacheError::store("flush_tags", "connection reset");
        assert_eq!(
            error.to_string(),
            "cache store failed during `flush_tags`: connection reset"
        );
    }

    #[test]
    fn missing_qualifier_display() {
        let error = CacheError::missing_qualifier(ViewKind::Single, "identifier");
        assert_eq!(
            error.to_string(),
            "eloquent view requires `identifier` before its key can be built"
        );
    }
}
