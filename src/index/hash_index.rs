//! Hash Index - exact-match lookups on composite keys
//!
//! Maps the full composite key of a document to its element(s):
//!
//! - **unique**: key → one element; a second document with the same key is
//!   rejected with [`IndexError::UniqueConstraintViolated`]
//! - **multi**: key → bucket of elements, one per document
//!
//! # Memory accounting
//!
//! The index keeps a counter of the bytes it holds: one key copy per map entry
//! plus [`IndexElement::memory_size`] per element. Inserting and then removing
//! the same document restores the counter exactly.

use crate::document::{Document, DocumentHandle, PathId, Shaper};
use crate::index::element::{extract, try_clone_values, values_size, Extracted, IndexElement};
use crate::index::{IndexDefinition, IndexError, IndexResult, SearchKey};
use crate::value::Value;
use std::collections::HashMap;
use std::mem::size_of;
use std::sync::Arc;

enum HashTable {
    Unique(HashMap<Vec<Value>, IndexElement>),
    Multi(HashMap<Vec<Value>, Vec<IndexElement>>),
}

/// Hash index over one or more attribute paths
pub struct HashIndex {
    definition: IndexDefinition,
    shaper: Arc<dyn Shaper>,
    table: HashTable,
    /// Bytes of live key copies and elements
    memory_used: usize,
    /// Number of live elements
    entries: usize,
}

impl std::fmt::Debug for HashIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashIndex")
            .field("definition", &self.definition)
            .field("entries", &self.entries)
            .field("memory_used", &self.memory_used)
            .finish()
    }
}

/// Bytes accounted to one stored key copy
fn key_size(key: &[Value]) -> usize {
    size_of::<Vec<Value>>() + values_size(key)
}

impl HashIndex {
    /// Create an empty hash index
    pub fn new(definition: IndexDefinition, shaper: Arc<dyn Shaper>) -> Self {
        let table = if definition.unique {
            HashTable::Unique(HashMap::new())
        } else {
            HashTable::Multi(HashMap::new())
        };

        Self {
            definition,
            shaper,
            table,
            memory_used: 0,
            entries: 0,
        }
    }

    pub fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    pub fn paths(&self) -> &[PathId] {
        &self.definition.paths
    }

    pub fn is_unique(&self) -> bool {
        self.definition.unique
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        match &self.table {
            HashTable::Unique(map) => map.len(),
            HashTable::Multi(map) => map.len(),
        }
    }

    fn element_for(&self, document: &Document) -> IndexResult<Extracted> {
        extract(
            self.shaper.as_ref(),
            document,
            &self.definition.paths,
            self.definition.missing_policy(),
        )
    }

    /// Index a document
    ///
    /// Documents skipped by the missing-attribute policy succeed without
    /// being stored. On error nothing changes.
    pub fn insert(&mut self, document: &Document) -> IndexResult<()> {
        let element = match self.element_for(document)? {
            Extracted::Element(element) => element,
            Extracted::Skipped => {
                tracing::trace!(index = %self.definition.id, key = document.key(), "document skipped");
                return Ok(());
            }
        };

        let element_bytes = element.memory_size();

        match &mut self.table {
            HashTable::Unique(map) => {
                if map.contains_key(element.values()) {
                    tracing::debug!(
                        index = %self.definition.id,
                        key = document.key(),
                        "unique constraint violated"
                    );
                    return Err(IndexError::UniqueConstraintViolated);
                }

                let key = try_clone_values(element.values())?;
                let key_bytes = key_size(&key);
                map.try_reserve(1)?;
                map.insert(key, element);

                self.memory_used += key_bytes + element_bytes;
            }
            HashTable::Multi(map) => {
                if let Some(bucket) = map.get_mut(element.values()) {
                    if bucket
                        .iter()
                        .any(|e| e.document().id() == element.document().id())
                    {
                        return Err(IndexError::Internal(format!(
                            "document '{}' is already indexed",
                            document.key()
                        )));
                    }

                    bucket.try_reserve(1)?;
                    bucket.push(element);
                    self.memory_used += element_bytes;
                } else {
                    let key = try_clone_values(element.values())?;
                    let key_bytes = key_size(&key);
                    let mut bucket = Vec::new();
                    bucket.try_reserve_exact(1)?;
                    bucket.push(element);
                    map.try_reserve(1)?;
                    map.insert(key, bucket);

                    self.memory_used += key_bytes + element_bytes;
                }
            }
        }

        self.entries += 1;
        Ok(())
    }

    /// Remove a document
    ///
    /// A document that is not indexed is not an error, so rollbacks can
    /// replay removals freely.
    pub fn remove(&mut self, document: &Document) -> IndexResult<()> {
        let element = match self.element_for(document)? {
            Extracted::Element(element) => element,
            Extracted::Skipped => return Ok(()),
        };

        let removed_bytes = match &mut self.table {
            HashTable::Unique(map) => {
                let matches = map
                    .get(element.values())
                    .map(|stored| stored.document().id() == document.id())
                    .unwrap_or(false);

                if !matches {
                    return Ok(());
                }

                match map.remove_entry(element.values()) {
                    Some((key, stored)) => key_size(&key) + stored.memory_size(),
                    None => return Ok(()),
                }
            }
            HashTable::Multi(map) => {
                let Some(bucket) = map.get_mut(element.values()) else {
                    return Ok(());
                };
                let Some(position) = bucket.iter().position(|e| e.document().id() == document.id())
                else {
                    return Ok(());
                };

                let stored = bucket.remove(position);
                let mut bytes = stored.memory_size();

                if bucket.is_empty() {
                    if let Some((key, _)) = map.remove_entry(element.values()) {
                        bytes += key_size(&key);
                    }
                }

                bytes
            }
        };

        self.memory_used -= removed_bytes;
        self.entries -= 1;
        Ok(())
    }

    /// Find all documents whose key equals `key`
    ///
    /// The key must supply a value for every indexed field. Multi indexes
    /// return documents in bucket order.
    pub fn find(&self, key: &SearchKey) -> IndexResult<Vec<DocumentHandle>> {
        if key.len() != self.definition.field_count() {
            return Err(IndexError::InvalidSearchKey {
                supplied: key.len(),
                fields: self.definition.field_count(),
            });
        }

        let mut results = Vec::new();

        match &self.table {
            HashTable::Unique(map) => {
                if let Some(element) = map.get(key.values()) {
                    results.try_reserve_exact(1)?;
                    results.push(element.document().clone());
                }
            }
            HashTable::Multi(map) => {
                if let Some(bucket) = map.get(key.values()) {
                    results.try_reserve_exact(bucket.len())?;
                    results.extend(bucket.iter().map(|e| e.document().clone()));
                }
            }
        }

        Ok(results)
    }

    /// Reserve room for `size` additional keys
    pub fn size_hint(&mut self, size: usize) -> IndexResult<()> {
        match &mut self.table {
            HashTable::Unique(map) => map.try_reserve(size)?,
            HashTable::Multi(map) => map.try_reserve(size)?,
        }

        tracing::debug!(index = %self.definition.id, size, "hash index resized");
        Ok(())
    }

    /// Memory held by the index in bytes
    pub fn memory_usage(&self) -> usize {
        size_of::<Self>() + self.memory_used
    }

    /// Field names resolved through the shaper
    pub fn field_names(&self) -> Vec<String> {
        self.definition
            .paths
            .iter()
            .map(|&path| self.shaper.path_name(path).unwrap_or_else(|| path.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::AttributeShaper;
    use serde_json::json;

    fn shaper(names: &[&str]) -> (Arc<dyn Shaper>, Vec<PathId>) {
        let mut shaper = AttributeShaper::new();
        let paths = shaper.register_all(names.iter().copied()).unwrap();
        (Arc::new(shaper), paths)
    }

    fn unique_index(names: &[&str]) -> HashIndex {
        let (shaper, paths) = shaper(names);
        HashIndex::new(IndexDefinition::hash(paths).unique(true), shaper)
    }

    fn multi_index(names: &[&str]) -> HashIndex {
        let (shaper, paths) = shaper(names);
        HashIndex::new(IndexDefinition::hash(paths), shaper)
    }

    #[test]
    fn test_unique_insert_and_find() {
        let mut index = unique_index(&["email"]);

        index
            .insert(&Document::new(1, "a", json!({"email": "a@x"})))
            .unwrap();
        index
            .insert(&Document::new(2, "b", json!({"email": "b@x"})))
            .unwrap();

        let found = index.find(&SearchKey::single("b@x")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key(), "b");

        assert!(index.find(&SearchKey::single("c@x")).unwrap().is_empty());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_unique_violation_leaves_index_unchanged() {
        let mut index = unique_index(&["email"]);
        index
            .insert(&Document::new(1, "a", json!({"email": "same"})))
            .unwrap();
        let memory = index.memory_usage();

        let err = index
            .insert(&Document::new(2, "b", json!({"email": "same"})))
            .unwrap_err();

        assert_eq!(err, IndexError::UniqueConstraintViolated);
        assert_eq!(index.len(), 1);
        assert_eq!(index.memory_usage(), memory);
        assert_eq!(index.find(&SearchKey::single("same")).unwrap()[0].key(), "a");
    }

    #[test]
    fn test_unique_skips_missing_attribute() {
        let mut index = unique_index(&["email"]);

        index.insert(&Document::new(1, "a", json!({}))).unwrap();
        index.insert(&Document::new(2, "b", json!({}))).unwrap();

        assert!(index.is_empty());
        assert_eq!(index.memory_usage(), size_of::<HashIndex>());
    }

    #[test]
    fn test_multi_buckets() {
        let mut index = multi_index(&["city"]);

        for (id, key) in [(1, "a"), (2, "b"), (3, "c")] {
            index
                .insert(&Document::new(id, key, json!({"city": "Oslo"})))
                .unwrap();
        }
        index
            .insert(&Document::new(4, "d", json!({"city": "Rome"})))
            .unwrap();

        let oslo = index.find(&SearchKey::single("Oslo")).unwrap();
        let mut keys: Vec<&str> = oslo.iter().map(|h| h.key()).collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);

        assert_eq!(index.key_count(), 2);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_multi_missing_attribute_is_null() {
        let mut index = multi_index(&["city"]);

        index.insert(&Document::new(1, "a", json!({}))).unwrap();

        let found = index.find(&SearchKey::single(Value::Null)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key(), "a");
    }

    #[test]
    fn test_multi_rejects_same_document_twice() {
        let mut index = multi_index(&["city"]);
        let doc = Document::new(1, "a", json!({"city": "Oslo"}));

        index.insert(&doc).unwrap();
        assert!(matches!(index.insert(&doc), Err(IndexError::Internal(_))));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_insert_remove_round_trip() {
        for mut index in [unique_index(&["a", "b"]), multi_index(&["a", "b"])] {
            let before = index.memory_usage();
            let doc = Document::new(9, "k9", json!({"a": "some text", "b": [1, 2, 3]}));

            index.insert(&doc).unwrap();
            assert!(index.memory_usage() > before);

            index.remove(&doc).unwrap();
            assert_eq!(index.memory_usage(), before);
            assert_eq!(index.len(), 0);
        }
    }

    #[test]
    fn test_remove_absent_is_success() {
        let mut index = multi_index(&["city"]);
        index
            .insert(&Document::new(1, "a", json!({"city": "Oslo"})))
            .unwrap();
        let memory = index.memory_usage();

        index
            .remove(&Document::new(2, "b", json!({"city": "Oslo"})))
            .unwrap();
        index
            .remove(&Document::new(3, "c", json!({"city": "Rome"})))
            .unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.memory_usage(), memory);
    }

    #[test]
    fn test_unique_remove_checks_identity() {
        let mut index = unique_index(&["email"]);
        index
            .insert(&Document::new(1, "a", json!({"email": "x"})))
            .unwrap();

        // Same key, different document: nothing to remove
        index
            .remove(&Document::new(2, "b", json!({"email": "x"})))
            .unwrap();

        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_find_requires_full_key() {
        let index = multi_index(&["a", "b"]);

        let err = index.find(&SearchKey::single(1)).unwrap_err();
        assert_eq!(
            err,
            IndexError::InvalidSearchKey {
                supplied: 1,
                fields: 2
            }
        );
    }

    #[test]
    fn test_numeric_keys_match_across_representations() {
        let mut index = multi_index(&["n"]);
        index
            .insert(&Document::new(1, "a", json!({"n": 0})))
            .unwrap();

        assert_eq!(index.find(&SearchKey::single(-0.0)).unwrap().len(), 1);
    }

    #[test]
    fn test_size_hint() {
        let mut index = unique_index(&["email"]);
        index.size_hint(1024).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_field_names() {
        let index = multi_index(&["address.city", "age"]);
        assert_eq!(index.field_names(), vec!["address.city", "age"]);
    }
}
