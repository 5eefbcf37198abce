//! Index facade - one operation set over every index kind
//!
//! The kind, uniqueness and sparseness of an index are fixed when it is
//! created; every call dispatches on the variant.

use crate::config::Config;
use crate::document::{Document, DocumentHandle, Shaper};
use crate::index::{
    HashIndex, IndexDefinition, IndexDescription, IndexError, IndexId, IndexKind, IndexOperator,
    IndexResult, RangeIterator, SearchKey, SkiplistIndex,
};
use std::sync::Arc;

/// A secondary index of either kind
#[derive(Debug)]
pub enum SecondaryIndex {
    Hash(HashIndex),
    Skiplist(SkiplistIndex),
}

impl SecondaryIndex {
    /// Create an empty index for `definition`
    ///
    /// Hash indexes reserve `config.index.hash_initial_capacity` keys.
    pub fn new(
        definition: IndexDefinition,
        shaper: Arc<dyn Shaper>,
        config: &Config,
    ) -> IndexResult<Self> {
        if definition.paths.is_empty() {
            return Err(IndexError::InvalidDefinition(
                "index needs at least one field".to_string(),
            ));
        }

        let mut seen = definition.paths.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != definition.paths.len() {
            return Err(IndexError::InvalidDefinition(
                "index fields must be distinct".to_string(),
            ));
        }

        let index = match definition.kind {
            IndexKind::Hash => {
                let mut index = HashIndex::new(definition, shaper);
                if config.index.hash_initial_capacity > 0 {
                    index.size_hint(config.index.hash_initial_capacity)?;
                }
                SecondaryIndex::Hash(index)
            }
            IndexKind::Skiplist => {
                SecondaryIndex::Skiplist(SkiplistIndex::new(definition, shaper, &config.skiplist))
            }
        };

        Ok(index)
    }

    pub fn definition(&self) -> &IndexDefinition {
        match self {
            SecondaryIndex::Hash(index) => index.definition(),
            SecondaryIndex::Skiplist(index) => index.definition(),
        }
    }

    pub fn id(&self) -> IndexId {
        self.definition().id
    }

    pub fn kind(&self) -> IndexKind {
        self.definition().kind
    }

    pub fn is_unique(&self) -> bool {
        self.definition().unique
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        match self {
            SecondaryIndex::Hash(index) => index.len(),
            SecondaryIndex::Skiplist(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&mut self, document: &Document) -> IndexResult<()> {
        match self {
            SecondaryIndex::Hash(index) => index.insert(document),
            SecondaryIndex::Skiplist(index) => index.insert(document),
        }
    }

    pub fn remove(&mut self, document: &Document) -> IndexResult<()> {
        match self {
            SecondaryIndex::Hash(index) => index.remove(document),
            SecondaryIndex::Skiplist(index) => index.remove(document),
        }
    }

    /// Exact-match lookup
    ///
    /// Hash indexes need a value for every field; skiplist indexes also
    /// accept a key prefix.
    pub fn find(&self, key: &SearchKey) -> IndexResult<Vec<DocumentHandle>> {
        match self {
            SecondaryIndex::Hash(index) => index.find(key),
            SecondaryIndex::Skiplist(index) => index.find(key),
        }
    }

    /// Range scan; only ordered indexes support it
    pub fn scan(&self, operator: &IndexOperator) -> IndexResult<RangeIterator<'_>> {
        match self {
            SecondaryIndex::Hash(_) => Err(IndexError::UnsupportedQuery {
                kind: IndexKind::Hash,
            }),
            SecondaryIndex::Skiplist(index) => index.scan(operator),
        }
    }

    pub fn size_hint(&mut self, size: usize) -> IndexResult<()> {
        match self {
            SecondaryIndex::Hash(index) => index.size_hint(size),
            SecondaryIndex::Skiplist(index) => index.size_hint(size),
        }
    }

    pub fn memory_usage(&self) -> usize {
        match self {
            SecondaryIndex::Hash(index) => index.memory_usage(),
            SecondaryIndex::Skiplist(index) => index.memory_usage(),
        }
    }

    /// Administrative description with resolved field names
    pub fn describe(&self) -> IndexDescription {
        let definition = self.definition();
        let fields = match self {
            SecondaryIndex::Hash(index) => index.field_names(),
            SecondaryIndex::Skiplist(index) => index.field_names(),
        };

        IndexDescription {
            id: definition.id,
            kind: definition.kind,
            unique: definition.unique,
            sparse: definition.sparse,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AttributeShaper, PathId};
    use serde_json::json;

    fn build(kind: IndexKind, names: &[&str], unique: bool) -> SecondaryIndex {
        let mut shaper = AttributeShaper::new();
        let paths = shaper.register_all(names.iter().copied()).unwrap();
        let definition = IndexDefinition::new(kind, paths)
            .unique(unique)
            .with_id(IndexId(5));

        SecondaryIndex::new(definition, Arc::new(shaper), &Config::default()).unwrap()
    }

    #[test]
    fn test_dispatch_by_kind() {
        for kind in [IndexKind::Hash, IndexKind::Skiplist] {
            let mut index = build(kind, &["age"], false);
            assert_eq!(index.kind(), kind);
            assert_eq!(index.id(), IndexId(5));

            let doc = Document::new(1, "a", json!({"age": 4}));
            index.insert(&doc).unwrap();

            let found = index.find(&SearchKey::single(4)).unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(index.len(), 1);

            index.remove(&doc).unwrap();
            assert!(index.is_empty());
        }
    }

    #[test]
    fn test_hash_scan_unsupported() {
        let index = build(IndexKind::Hash, &["age"], false);

        let err = index
            .scan(&IndexOperator::Ge(SearchKey::single(1)))
            .unwrap_err();
        assert_eq!(
            err,
            IndexError::UnsupportedQuery {
                kind: IndexKind::Hash
            }
        );
    }

    #[test]
    fn test_describe() {
        let index = build(IndexKind::Skiplist, &["address.city", "age"], true);
        let description = index.describe();

        assert_eq!(description.id, IndexId(5));
        assert_eq!(description.kind, IndexKind::Skiplist);
        assert!(description.unique);
        assert!(!description.sparse);
        assert_eq!(description.fields, vec!["address.city", "age"]);
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let shaper: Arc<dyn Shaper> = Arc::new(AttributeShaper::new());

        let empty = IndexDefinition::hash(Vec::new());
        assert!(matches!(
            SecondaryIndex::new(empty, shaper.clone(), &Config::default()),
            Err(IndexError::InvalidDefinition(_))
        ));

        let repeated = IndexDefinition::skiplist(vec![PathId(0), PathId(0)]);
        assert!(matches!(
            SecondaryIndex::new(repeated, shaper, &Config::default()),
            Err(IndexError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_hash_initial_capacity() {
        let mut shaper = AttributeShaper::new();
        let paths = shaper.register_all(["k"]).unwrap();
        let mut config = Config::default();
        config.index.hash_initial_capacity = 64;

        let index =
            SecondaryIndex::new(IndexDefinition::hash(paths), Arc::new(shaper), &config).unwrap();
        assert!(index.is_empty());
    }
}
