//! Shaper - typed attribute access for indexes
//!
//! Indexes never walk document payloads themselves. They ask a [`Shaper`] to
//! resolve each indexed attribute path, once per field per operation.
//!
//! [`AttributeShaper`] is the reference implementation: dotted attribute paths
//! (`"address.city"`) resolved against object values.

use super::Document;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Identifier of a registered attribute path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(pub u32);

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised while resolving attributes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaperError {
    /// Path id was never registered
    #[error("Unknown attribute path: {0}")]
    UnknownPath(PathId),

    /// Path name cannot be registered
    #[error("Invalid attribute path '{0}'")]
    InvalidPath(String),

    /// Document encoding cannot be read
    #[error("Corrupt document at '{path}': {reason}")]
    Corrupt { path: String, reason: String },
}

/// Resolves typed sub-values of documents
///
/// Implementations must be pure: the same document and path always resolve
/// to the same value.
pub trait Shaper: Send + Sync {
    /// Resolve `path` in `document`; `Ok(None)` when the attribute is absent
    fn resolve(&self, document: &Document, path: PathId) -> Result<Option<Value>, ShaperError>;

    /// Attribute name of a registered path
    fn path_name(&self, path: PathId) -> Option<String>;
}

/// Dotted-path shaper over object values
#[derive(Debug, Default)]
pub struct AttributeShaper {
    paths: Vec<Vec<String>>,
    by_name: HashMap<String, PathId>,
}

impl AttributeShaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dotted attribute path, returning the existing id if known
    pub fn register(&mut self, name: &str) -> Result<PathId, ShaperError> {
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }

        let segments: Vec<String> = name.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ShaperError::InvalidPath(name.to_string()));
        }

        let id = PathId(self.paths.len() as u32);
        self.paths.push(segments);
        self.by_name.insert(name.to_string(), id);

        Ok(id)
    }

    /// Register several paths in order
    pub fn register_all<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<PathId>, ShaperError> {
        names.into_iter().map(|name| self.register(name)).collect()
    }

    /// Look up a registered path by name
    pub fn lookup(&self, name: &str) -> Option<PathId> {
        self.by_name.get(name).copied()
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }
}

impl Shaper for AttributeShaper {
    fn resolve(&self, document: &Document, path: PathId) -> Result<Option<Value>, ShaperError> {
        let segments = self
            .paths
            .get(path.0 as usize)
            .ok_or(ShaperError::UnknownPath(path))?;

        let mut current = document.body();
        for segment in segments {
            match current.get(segment) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }

        Ok(Some(current.clone()))
    }

    fn path_name(&self, path: PathId) -> Option<String> {
        self.paths.get(path.0 as usize).map(|segments| segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_is_idempotent() {
        let mut shaper = AttributeShaper::new();

        let a = shaper.register("age").unwrap();
        let b = shaper.register("address.city").unwrap();
        let again = shaper.register("age").unwrap();

        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(shaper.path_count(), 2);
        assert_eq!(shaper.lookup("address.city"), Some(b));
        assert_eq!(shaper.path_name(b).as_deref(), Some("address.city"));
    }

    #[test]
    fn test_register_rejects_empty_segments() {
        let mut shaper = AttributeShaper::new();

        assert!(matches!(shaper.register(""), Err(ShaperError::InvalidPath(_))));
        assert!(matches!(shaper.register("a..b"), Err(ShaperError::InvalidPath(_))));
    }

    #[test]
    fn test_resolve_nested() {
        let mut shaper = AttributeShaper::new();
        let city = shaper.register("address.city").unwrap();
        let zip = shaper.register("address.zip").unwrap();
        let deep = shaper.register("address.city.name").unwrap();

        let doc = Document::new(1, "k1", json!({"address": {"city": "Oslo"}}));

        assert_eq!(shaper.resolve(&doc, city).unwrap(), Some(Value::from("Oslo")));
        assert_eq!(shaper.resolve(&doc, zip).unwrap(), None);
        // A scalar in the middle of a path means the attribute is absent
        assert_eq!(shaper.resolve(&doc, deep).unwrap(), None);
    }

    #[test]
    fn test_resolve_explicit_null() {
        let mut shaper = AttributeShaper::new();
        let age = shaper.register("age").unwrap();

        let doc = Document::new(1, "k1", json!({"age": null}));
        assert_eq!(shaper.resolve(&doc, age).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_resolve_unknown_path() {
        let shaper = AttributeShaper::new();
        let doc = Document::new(1, "k1", json!({}));

        assert_eq!(
            shaper.resolve(&doc, PathId(9)),
            Err(ShaperError::UnknownPath(PathId(9)))
        );
    }
}
