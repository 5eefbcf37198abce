//! Index Manager - keeps every index of a collection in step
//!
//! The collection layer calls the manager once per document mutation and the
//! manager fans the call out to each attached index:
//!
//! ```text
//! insert(doc):  idx1.insert ─▶ idx2.insert ─▶ idx3.insert ✗
//!                                   │
//!               idx1.remove ◀─ idx2.remove ◀┘   rollback, error returned
//! ```
//!
//! A failed insert or update leaves every index as it was before the call.

use crate::config::Config;
use crate::document::{Document, DocumentHandle, Shaper};
use crate::index::{
    IndexDefinition, IndexDescription, IndexError, IndexId, IndexOperator, IndexResult,
    IndexStats, RangeIterator, SearchKey, SecondaryIndex,
};
use std::sync::Arc;

/// Coordinates all indexes attached to one collection
pub struct IndexManager {
    /// Resolves attribute paths for every index
    shaper: Arc<dyn Shaper>,
    /// Indexes in creation order
    indexes: Vec<SecondaryIndex>,
    next_id: u64,
    config: Config,
}

impl IndexManager {
    /// Create a manager with default settings
    pub fn new(shaper: Arc<dyn Shaper>) -> Self {
        Self::with_config(shaper, Config::default())
    }

    /// Create with custom configuration
    pub fn with_config(shaper: Arc<dyn Shaper>, config: Config) -> Self {
        Self {
            shaper,
            indexes: Vec::new(),
            next_id: 1,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Definition Methods ====================

    /// Attach a new, empty index and return its id
    ///
    /// Every path must be known to the shaper. The id in `definition` is
    /// replaced by a fresh one.
    pub fn create_index(&mut self, definition: IndexDefinition) -> IndexResult<IndexId> {
        let index = self.build_index(definition)?;
        let id = index.id();

        self.indexes.try_reserve(1)?;
        self.indexes.push(index);
        self.next_id += 1;

        tracing::debug!(index = %id, "index created");
        Ok(id)
    }

    /// Attach a new index populated from existing documents
    ///
    /// If any document is rejected the index is discarded and the error
    /// returned.
    pub fn create_index_from<'d, I>(
        &mut self,
        definition: IndexDefinition,
        documents: I,
    ) -> IndexResult<IndexId>
    where
        I: IntoIterator<Item = &'d Document>,
    {
        let mut index = self.build_index(definition)?;
        let id = index.id();

        let documents = documents.into_iter();
        let (lower, _) = documents.size_hint();
        if lower > 0 {
            index.size_hint(lower)?;
        }

        for document in documents {
            if let Err(e) = index.insert(document) {
                tracing::debug!(index = %id, key = document.key(), error = %e, "index build failed");
                return Err(e);
            }
        }

        self.indexes.try_reserve(1)?;
        self.indexes.push(index);
        self.next_id += 1;

        tracing::debug!(index = %id, "index created from existing documents");
        Ok(id)
    }

    fn build_index(&self, definition: IndexDefinition) -> IndexResult<SecondaryIndex> {
        if let Some(path) = definition
            .paths
            .iter()
            .find(|&&path| self.shaper.path_name(path).is_none())
        {
            return Err(IndexError::InvalidDefinition(format!(
                "unknown attribute path {}",
                path
            )));
        }

        let definition = definition.with_id(IndexId(self.next_id));
        SecondaryIndex::new(definition, self.shaper.clone(), &self.config)
    }

    /// Detach an index, returning it
    pub fn drop_index(&mut self, id: IndexId) -> IndexResult<SecondaryIndex> {
        let position = self.position(id)?;
        let index = self.indexes.remove(position);

        tracing::debug!(index = %id, "index dropped");
        Ok(index)
    }

    fn position(&self, id: IndexId) -> IndexResult<usize> {
        self.indexes
            .iter()
            .position(|index| index.id() == id)
            .ok_or(IndexError::UnknownIndex(id))
    }

    /// Look up an index by id
    pub fn index(&self, id: IndexId) -> IndexResult<&SecondaryIndex> {
        self.position(id).map(|position| &self.indexes[position])
    }

    /// All indexes in creation order
    pub fn indexes(&self) -> impl Iterator<Item = &SecondaryIndex> {
        self.indexes.iter()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    // ==================== Update Methods ====================

    /// Index a document in every index
    ///
    /// On failure the document is removed again from the indexes that
    /// already accepted it.
    pub fn insert(&mut self, document: &Document) -> IndexResult<()> {
        for position in 0..self.indexes.len() {
            if let Err(e) = self.indexes[position].insert(document) {
                tracing::debug!(
                    index = %self.indexes[position].id(),
                    key = document.key(),
                    error = %e,
                    "insert failed, rolling back"
                );
                self.rollback_insert(position, document);
                return Err(e);
            }
        }

        Ok(())
    }

    fn rollback_insert(&mut self, failed: usize, document: &Document) {
        for index in self.indexes[..failed].iter_mut().rev() {
            if let Err(e) = index.remove(document) {
                tracing::warn!(index = %index.id(), key = document.key(), error = %e, "rollback remove failed");
            }
        }
    }

    /// Remove a document from every index
    ///
    /// Every index is visited; the first error is returned.
    pub fn remove(&mut self, document: &Document) -> IndexResult<()> {
        let mut result = Ok(());

        for index in &mut self.indexes {
            if let Err(e) = index.remove(document) {
                tracing::debug!(index = %index.id(), key = document.key(), error = %e, "remove failed");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        result
    }

    /// Replace `old` with `new` in every index
    ///
    /// On failure `old` is restored everywhere.
    pub fn update(&mut self, old: &Document, new: &Document) -> IndexResult<()> {
        for position in 0..self.indexes.len() {
            let index = &mut self.indexes[position];

            if let Err(e) = index.remove(old) {
                tracing::debug!(
                    index = %index.id(),
                    key = old.key(),
                    error = %e,
                    "update failed, rolling back"
                );
                self.rollback_update(position, old, new);
                return Err(e);
            }

            if let Err(e) = index.insert(new) {
                tracing::debug!(
                    index = %index.id(),
                    key = new.key(),
                    error = %e,
                    "update failed, rolling back"
                );
                if let Err(restore) = index.insert(old) {
                    tracing::warn!(index = %index.id(), error = %restore, "rollback insert failed");
                }
                self.rollback_update(position, old, new);
                return Err(e);
            }
        }

        Ok(())
    }

    fn rollback_update(&mut self, failed: usize, old: &Document, new: &Document) {
        for index in self.indexes[..failed].iter_mut().rev() {
            let restored = index.remove(new).and_then(|_| index.insert(old));
            if let Err(e) = restored {
                tracing::warn!(index = %index.id(), key = old.key(), error = %e, "rollback update failed");
            }
        }
    }

    // ==================== Query Methods ====================

    /// Exact-match lookup on one index
    pub fn find(&self, id: IndexId, key: &SearchKey) -> IndexResult<Vec<DocumentHandle>> {
        self.index(id)?.find(key)
    }

    /// Range scan on one index
    pub fn scan(&self, id: IndexId, operator: &IndexOperator) -> IndexResult<RangeIterator<'_>> {
        self.index(id)?.scan(operator)
    }

    // ==================== Stats Methods ====================

    /// Get statistics about all indexes
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            indexes: self.indexes.len(),
            entries: self.indexes.iter().map(SecondaryIndex::len).sum(),
            memory_bytes: self.indexes.iter().map(SecondaryIndex::memory_usage).sum(),
        }
    }

    /// Describe every index in creation order
    pub fn describe_all(&self) -> Vec<IndexDescription> {
        self.indexes.iter().map(SecondaryIndex::describe).collect()
    }
}
