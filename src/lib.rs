//! # docindex
//!
//! Secondary-index engine for a document database: per-collection indexes over
//! one or more attribute paths of semi-structured documents.
//!
//! ## Features
//!
//! - **Hash indexes**: exact-match lookups on composite keys, unique or multi
//! - **Skiplist indexes**: ordered indexes answering equality, prefix and range
//!   queries combined with AND
//! - **Heterogeneous ordering**: one total order across nulls, booleans,
//!   numbers, strings, lists and objects
//! - **Atomic failures**: a rejected mutation leaves every index untouched
//!
//! ## Modules
//!
//! - [`value`]: typed values and their total order
//! - [`document`]: document handles and the shaper interface
//! - [`index`]: hash and skiplist indexes, interval algebra, index manager
//! - [`query`]: textual conditions lowered to index operators
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use docindex::document::{AttributeShaper, Document};
//! use docindex::index::{IndexDefinition, IndexManager, IndexOperator, SearchKey};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut shaper = AttributeShaper::new();
//! let age = shaper.register("age").unwrap();
//!
//! let mut manager = IndexManager::new(Arc::new(shaper));
//! let id = manager.create_index(IndexDefinition::skiplist(vec![age])).unwrap();
//!
//! manager.insert(&Document::new(1, "A", json!({"age": 5}))).unwrap();
//! manager.insert(&Document::new(2, "B", json!({"age": 10}))).unwrap();
//! manager.insert(&Document::new(3, "D", json!({}))).unwrap();
//!
//! let range = IndexOperator::Ge(SearchKey::single(5)).and(IndexOperator::Le(SearchKey::single(10)));
//! let keys: Vec<&str> = manager.scan(id, &range).unwrap().map(|h| h.key()).collect();
//! assert_eq!(keys, vec!["A", "B"]);
//! ```

pub mod config;
pub mod document;
pub mod index;
pub mod query;
pub mod value;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError};

pub use document::{AttributeShaper, Document, DocumentHandle, DocumentId, PathId, Shaper};

pub use index::{
    HashIndex, IndexDefinition, IndexDescription, IndexError, IndexId, IndexKind, IndexManager,
    IndexOperator, IndexResult, IndexStats, RangeIterator, SearchKey, SecondaryIndex,
    SkiplistIndex,
};

pub use query::{compile, Condition, QueryError};

pub use value::{CompareMode, Value};
