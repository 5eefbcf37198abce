//! Skiplist Index - ordered index with exact and range queries
//!
//! Keeps one element per document in a [`SkipList`] ordered by the composite
//! key, ties broken by primary key. Queries are [`IndexOperator`] trees
//! evaluated into intervals and walked with a [`RangeIterator`].

use crate::config::SkiplistSettings;
use crate::document::{Document, DocumentHandle, PathId, Shaper};
use crate::index::element::{extract, Extracted};
use crate::index::range::intervals;
use crate::index::skiplist::SkipList;
use crate::index::{IndexDefinition, IndexOperator, IndexResult, RangeIterator, SearchKey};
use std::mem::size_of;
use std::sync::Arc;

/// Ordered index over one or more attribute paths
pub struct SkiplistIndex {
    definition: IndexDefinition,
    shaper: Arc<dyn Shaper>,
    list: SkipList,
}

impl std::fmt::Debug for SkiplistIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkiplistIndex")
            .field("definition", &self.definition)
            .field("list", &self.list)
            .finish()
    }
}

impl SkiplistIndex {
    /// Create an empty skiplist index
    pub fn new(
        definition: IndexDefinition,
        shaper: Arc<dyn Shaper>,
        settings: &SkiplistSettings,
    ) -> Self {
        let list = SkipList::new(
            definition.unique,
            settings.max_level,
            settings.seed,
        );

        Self {
            definition,
            shaper,
            list,
        }
    }

    pub fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    pub fn paths(&self) -> &[PathId] {
        &self.definition.paths
    }

    /// Underlying skiplist
    pub fn list(&self) -> &SkipList {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    fn element_for(&self, document: &Document) -> IndexResult<Extracted> {
        extract(
            self.shaper.as_ref(),
            document,
            &self.definition.paths,
            self.definition.missing_policy(),
        )
    }

    /// Index a document; on error the index is unchanged
    pub fn insert(&mut self, document: &Document) -> IndexResult<()> {
        match self.element_for(document)? {
            Extracted::Element(element) => self.list.insert(element).map_err(|e| {
                tracing::debug!(
                    index = %self.definition.id,
                    key = document.key(),
                    error = %e,
                    "skiplist insert rejected"
                );
                e
            }),
            Extracted::Skipped => {
                tracing::trace!(index = %self.definition.id, key = document.key(), "document skipped");
                Ok(())
            }
        }
    }

    /// Remove a document; absent documents are not an error
    pub fn remove(&mut self, document: &Document) -> IndexResult<()> {
        if let Extracted::Element(element) = self.element_for(document)? {
            if self.list.remove(&element).is_none() {
                tracing::trace!(index = %self.definition.id, key = document.key(), "document not indexed");
            }
        }
        Ok(())
    }

    /// Start a range scan
    pub fn scan(&self, operator: &IndexOperator) -> IndexResult<RangeIterator<'_>> {
        let intervals = intervals(&self.list, operator, self.definition.field_count())?;

        tracing::trace!(
            index = %self.definition.id,
            operator = %operator,
            intervals = intervals.len(),
            "range scan"
        );

        Ok(RangeIterator::new(&self.list, intervals))
    }

    /// Documents whose key (or key prefix) equals `key`, in index order
    pub fn find(&self, key: &SearchKey) -> IndexResult<Vec<DocumentHandle>> {
        let mut results = Vec::new();

        for handle in self.scan(&IndexOperator::Eq(key.clone()))? {
            results.try_reserve(1)?;
            results.push(handle.clone());
        }

        Ok(results)
    }

    /// Reserve room for `size` additional documents
    pub fn size_hint(&mut self, size: usize) -> IndexResult<()> {
        self.list.reserve(size)?;
        tracing::debug!(index = %self.definition.id, size, "skiplist index resized");
        Ok(())
    }

    /// Memory held by the index in bytes
    pub fn memory_usage(&self) -> usize {
        size_of::<Self>() - size_of::<SkipList>() + self.list.memory_usage()
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
