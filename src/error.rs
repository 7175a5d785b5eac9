//! Error types for the region cache
//!
//! Provides unified error handling using thiserror. Only failures that indicate
//! a genuine configuration defect reach the cache's caller; everything else is
//! recovered where it happens.

use thiserror::Error;

use crate::version::DataKind;

// == Cache Error Enum ==
/// Unified error type for the region cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A region descriptor could not produce the comparator it declared
    #[error("Version comparator unavailable: {0}")]
    ComparatorUnavailable(String),

    /// Comparator resolution failed while constructing a cache
    #[error("Failed to resolve {kind} version comparator for region '{region}': {reason}")]
    ComparatorResolution {
        region: String,
        kind: DataKind,
        reason: String,
    },

    /// An invalidation delivery carried a payload that could not be decoded
    #[error("Malformed invalidation payload: {0}")]
    MalformedPayload(String),
}

// == Result Type Alias ==
/// Convenience Result type for the region cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparator_resolution_message_names_region_and_kind() {
        let err = CacheError::ComparatorResolution {
            region: "orders".to_string(),
            kind: DataKind::Collection,
            reason: "no comparator".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("orders"));
        assert!(msg.contains("collection"));
        assert!(msg.contains("no comparator"));
    }
}
