//! Secondary index structures
//!
//! Provides per-collection indexes over one or more attribute paths:
//!
//! - **HashIndex**: exact-match lookups on the full composite key
//! - **SkiplistIndex**: ordered index supporting exact and range queries
//! - **SecondaryIndex**: one dispatch surface over both kinds
//! - **IndexManager**: keeps every index of a collection in step with its documents
//!
//! # Architecture
//!
//! ```text
//! Mutation: Document → extract (Shaper) → IndexElement → HashIndex | SkipList
//!
//! Query:    IndexOperator → intervals → RangeIterator → documents in key order
//!             age >= 5 AND age <= 10
//!             → (node before first 5, node after last 10)
//! ```

mod element;
mod error;
mod hash_index;
mod iterator;
mod manager;
mod range;
mod secondary;
mod skiplist;
mod skiplist_index;

pub use element::{compare_key_element, extract, Extracted, IndexElement, MissingPolicy, SearchKey};
pub use error::{IndexError, IndexResult};
pub use hash_index::HashIndex;
pub use iterator::RangeIterator;
pub use manager::IndexManager;
pub use range::{IndexOperator, Interval};
pub use secondary::SecondaryIndex;
pub use skiplist::{NodeId, SkipList, MAX_LEVELS};
pub use skiplist_index::SkiplistIndex;

use crate::document::PathId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an index within its collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId(pub u64);

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structure backing an index, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Hash,
    Skiplist,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Hash => write!(f, "hash"),
            IndexKind::Skiplist => write!(f, "skiplist"),
        }
    }
}

impl std::str::FromStr for IndexKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hash" => Ok(IndexKind::Hash),
            "skiplist" | "skip-list" | "ordered" => Ok(IndexKind::Skiplist),
            other => Err(IndexError::InvalidDefinition(format!(
                "unknown index type '{}'",
                other
            ))),
        }
    }
}

/// Definition of an index: kind, attribute paths and flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub id: IndexId,
    pub kind: IndexKind,
    /// Indexed attribute paths, in key order
    pub paths: Vec<PathId>,
    pub unique: bool,
    /// Exclude documents missing any indexed attribute
    pub sparse: bool,
}

impl IndexDefinition {
    /// Create a non-unique, non-sparse definition
    pub fn new(kind: IndexKind, paths: Vec<PathId>) -> Self {
        Self {
            id: IndexId(0),
            kind,
            paths,
            unique: false,
            sparse: false,
        }
    }

    pub fn hash(paths: Vec<PathId>) -> Self {
        Self::new(IndexKind::Hash, paths)
    }

    pub fn skiplist(paths: Vec<PathId>) -> Self {
        Self::new(IndexKind::Skiplist, paths)
    }

    /// Builder method: set uniqueness
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Builder method: set sparseness
    pub fn sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    /// Builder method: set the id
    pub fn with_id(mut self, id: IndexId) -> Self {
        self.id = id;
        self
    }

    pub fn field_count(&self) -> usize {
        self.paths.len()
    }

    /// What to do with documents that lack an indexed attribute
    pub fn missing_policy(&self) -> MissingPolicy {
        if self.unique || self.sparse {
            MissingPolicy::Skip
        } else {
            MissingPolicy::NullPlaceholder
        }
    }
}

/// Administrative description of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub id: IndexId,
    #[serde(rename = "type")]
    pub kind: IndexKind,
    pub unique: bool,
    pub sparse: bool,
    pub fields: Vec<String>,
}

/// Statistics about the indexes of a collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of indexes
    pub indexes: usize,
    /// Number of elements across all indexes
    pub entries: usize,
    /// Tracked memory across all indexes
    pub memory_bytes: usize,
}
