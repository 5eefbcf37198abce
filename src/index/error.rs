//! Index error types
//!
//! Every failing mutation leaves the index exactly as it was before the call,
//! so callers can abort or roll back the enclosing write on any of these.

use crate::document::ShaperError;
use crate::index::{IndexId, IndexKind};
use std::collections::TryReserveError;
use thiserror::Error;

/// Errors surfaced by index operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// An allocation could not be satisfied
    #[error("Out of memory")]
    OutOfMemory,

    /// A unique index already holds an element with the same key
    #[error("Unique constraint violated")]
    UniqueConstraintViolated,

    /// Search key has the wrong number of values for this index
    #[error("Invalid search key: {supplied} value(s) supplied, index has {fields} field(s)")]
    InvalidSearchKey { supplied: usize, fields: usize },

    /// Operator cannot be evaluated by the index
    #[error("Unsupported index operator: {0}")]
    UnsupportedOperator(&'static str),

    /// Query shape not supported by this kind of index
    #[error("Range queries are not supported by {kind} indexes")]
    UnsupportedQuery { kind: IndexKind },

    /// Index definition is not acceptable
    #[error("Invalid index definition: {0}")]
    InvalidDefinition(String),

    /// No index with this id
    #[error("Index not found: {0}")]
    UnknownIndex(IndexId),

    /// Unexpected extraction or bookkeeping failure
    #[error("Internal index error: {0}")]
    Internal(String),
}

impl From<TryReserveError> for IndexError {
    fn from(_: TryReserveError) -> Self {
        IndexError::OutOfMemory
    }
}

impl From<ShaperError> for IndexError {
    fn from(err: ShaperError) -> Self {
        IndexError::Internal(err.to_string())
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PathId;

    #[test]
    fn test_error_display() {
        let err = IndexError::InvalidSearchKey {
            supplied: 3,
            fields: 2,
        };
        assert_eq!(
            err.to_string(),
            "Invalid search key: 3 value(s) supplied, index has 2 field(s)"
        );

        let err = IndexError::UnsupportedQuery {
            kind: IndexKind::Hash,
        };
        assert_eq!(err.to_string(), "Range queries are not supported by hash indexes");
    }

    #[test]
    fn test_shaper_error_is_internal() {
        let err: IndexError = ShaperError::UnknownPath(PathId(4)).into();
        assert!(matches!(err, IndexError::Internal(_)));
    }

    #[test]
    fn test_reserve_error_is_oom() {
        let mut v: Vec<u64> = Vec::new();
        let err: IndexError = v.try_reserve(usize::MAX).unwrap_err().into();
        assert_eq!(err, IndexError::OutOfMemory);
    }
}
