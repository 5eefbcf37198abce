//! Query error types
//!
//! Defines the error conditions of condition parsing and lowering.

use crate::index::IndexError;
use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Query parsing failed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Condition names a field the index does not cover
    #[error("Field not indexed: {0}")]
    UnknownField(String),

    /// Query shape cannot be answered by a single index
    #[error("Unsupported query: {0}")]
    Unsupported(String),

    /// Index error while evaluating the query
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
