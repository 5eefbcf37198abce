//! Index elements and key extraction
//!
//! An [`IndexElement`] is what an index stores per document: one owned value
//! per indexed field plus the document handle. Elements are built by
//! [`extract`], which applies the missing-attribute policy:
//!
//! | index              | attribute missing        |
//! |--------------------|--------------------------|
//! | unique or sparse   | document skipped, no error |
//! | non-unique         | `null` placeholder stored |

use crate::document::{Document, DocumentHandle, PathId, Shaper};
use crate::index::IndexResult;
use crate::value::{CompareMode, Value};
use std::cmp::Ordering;
use std::mem::size_of;

/// Per-document entry owned by an index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexElement {
    document: DocumentHandle,
    values: Vec<Value>,
}

impl IndexElement {
    pub fn new(document: DocumentHandle, values: Vec<Value>) -> Self {
        Self { document, values }
    }

    pub fn document(&self) -> &DocumentHandle {
        &self.document
    }

    /// Key values, one per indexed field
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Bytes accounted to this element
    pub fn memory_size(&self) -> usize {
        size_of::<Self>() + values_size(&self.values)
    }

    /// Compare two elements field by field
    ///
    /// The same document always compares equal to itself. Under
    /// [`CompareMode::TotalOrder`] equal keys are ordered by primary key.
    pub fn compare(&self, other: &Self, mode: CompareMode) -> Ordering {
        if self.document.id() == other.document.id() {
            return Ordering::Equal;
        }

        let ordering = self.values.iter().cmp(other.values.iter());
        if ordering != Ordering::Equal || mode == CompareMode::Preorder {
            return ordering;
        }

        self.document
            .key()
            .as_bytes()
            .cmp(other.document.key().as_bytes())
    }
}

/// Bytes accounted to a slice of key values
pub(crate) fn values_size(values: &[Value]) -> usize {
    values
        .iter()
        .map(|v| size_of::<Value>() + v.heap_size())
        .sum()
}

/// Copy key values, failing instead of aborting when memory is short
pub(crate) fn try_clone_values(values: &[Value]) -> IndexResult<Vec<Value>> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(values.len())?;
    copy.extend_from_slice(values);
    Ok(copy)
}

/// Typed value tuple supplied by a query
///
/// May hold fewer values than the index has fields (prefix match).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchKey {
    values: Vec<Value>,
}

impl SearchKey {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Key with a single value
    pub fn single(value: impl Into<Value>) -> Self {
        Self {
            values: vec![value.into()],
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for SearchKey {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Compare a search key with an element over the key's fields only
pub fn compare_key_element(key: &SearchKey, element: &IndexElement) -> Ordering {
    key.values
        .iter()
        .zip(element.values.iter())
        .map(|(k, v)| k.cmp(v))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Treatment of documents lacking an indexed attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Leave the document out of the index
    Skip,
    /// Index the document with `null` in place of the attribute
    NullPlaceholder,
}

/// Outcome of extracting a document's key
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Element(IndexElement),
    /// Attribute missing under [`MissingPolicy::Skip`]
    Skipped,
}

/// Build the index element for `document` over `paths`
///
/// An explicit `null` attribute counts as missing for the skip policy.
/// Shaper failures are fatal for the operation and surface as
/// [`IndexError::Internal`].
pub fn extract(
    shaper: &dyn Shaper,
    document: &Document,
    paths: &[PathId],
    policy: MissingPolicy,
) -> IndexResult<Extracted> {
    let mut values = Vec::new();
    values.try_reserve_exact(paths.len())?;

    for &path in paths {
        let value = match shaper.resolve(document, path)? {
            Some(Value::Null) | None if policy == MissingPolicy::Skip => {
                return Ok(Extracted::Skipped);
            }
            Some(value) => value,
            None => Value::Null,
        };
        values.push(value);
    }

    Ok(Extracted::Element(IndexElement::new(
        document.handle().clone(),
        values,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AttributeShaper, DocumentId, ShaperError};
    use crate::index::IndexError;
    use serde_json::json;

    fn element(id: u64, key: &str, values: Vec<Value>) -> IndexElement {
        IndexElement::new(DocumentHandle::new(DocumentId(id), key), values)
    }

    fn shaper_with(names: &[&str]) -> (AttributeShaper, Vec<PathId>) {
        let mut shaper = AttributeShaper::new();
        let paths = shaper.register_all(names.iter().copied()).unwrap();
        (shaper, paths)
    }

    struct FailingShaper;

    impl Shaper for FailingShaper {
        fn resolve(&self, _: &Document, path: PathId) -> Result<Option<Value>, ShaperError> {
            Err(ShaperError::Corrupt {
                path: path.to_string(),
                reason: "bad shape".to_string(),
            })
        }

        fn path_name(&self, _: PathId) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_preorder_ignores_identity() {
        let a = element(1, "a", vec![Value::from(10)]);
        let b = element(2, "b", vec![Value::from(10)]);

        assert_eq!(a.compare(&b, CompareMode::Preorder), Ordering::Equal);
        assert_eq!(a.compare(&b, CompareMode::TotalOrder), Ordering::Less);
        assert_eq!(b.compare(&a, CompareMode::TotalOrder), Ordering::Greater);
    }

    #[test]
    fn test_same_document_is_equal() {
        let a = element(1, "a", vec![Value::from(10)]);
        let a_again = element(1, "a", vec![Value::from(10)]);

        assert_eq!(a.compare(&a_again, CompareMode::TotalOrder), Ordering::Equal);
    }

    #[test]
    fn test_key_values_decide_before_identity() {
        let a = element(1, "z", vec![Value::from(1), Value::from("x")]);
        let b = element(2, "a", vec![Value::from(1), Value::from("y")]);

        assert_eq!(a.compare(&b, CompareMode::TotalOrder), Ordering::Less);
    }

    #[test]
    fn test_prefix_key_compare() {
        let e = element(1, "a", vec![Value::from(5), Value::from("m")]);

        assert_eq!(
            compare_key_element(&SearchKey::single(5), &e),
            Ordering::Equal
        );
        assert_eq!(
            compare_key_element(&SearchKey::new(vec![Value::from(5), Value::from("a")]), &e),
            Ordering::Less
        );
        assert_eq!(
            compare_key_element(&SearchKey::single(6), &e),
            Ordering::Greater
        );
    }

    #[test]
    fn test_extract_present_attributes() {
        let (shaper, paths) = shaper_with(&["age", "name"]);
        let doc = Document::new(1, "k1", json!({"age": 5, "name": "a"}));

        let extracted = extract(&shaper, &doc, &paths, MissingPolicy::Skip).unwrap();
        match extracted {
            Extracted::Element(e) => {
                assert_eq!(e.values(), &[Value::from(5), Value::from("a")]);
                assert_eq!(e.document().key(), "k1");
            }
            Extracted::Skipped => panic!("document should be indexed"),
        }
    }

    #[test]
    fn test_extract_missing_skip() {
        let (shaper, paths) = shaper_with(&["age", "name"]);
        let doc = Document::new(1, "k1", json!({"age": 5}));

        assert_eq!(
            extract(&shaper, &doc, &paths, MissingPolicy::Skip).unwrap(),
            Extracted::Skipped
        );
    }

    #[test]
    fn test_extract_explicit_null_skip() {
        let (shaper, paths) = shaper_with(&["age"]);
        let doc = Document::new(1, "k1", json!({"age": null}));

        assert_eq!(
            extract(&shaper, &doc, &paths, MissingPolicy::Skip).unwrap(),
            Extracted::Skipped
        );
    }

    #[test]
    fn test_extract_missing_placeholder() {
        let (shaper, paths) = shaper_with(&["age", "name"]);
        let doc = Document::new(1, "k1", json!({"name": "a"}));

        match extract(&shaper, &doc, &paths, MissingPolicy::NullPlaceholder).unwrap() {
            Extracted::Element(e) => {
                assert_eq!(e.values(), &[Value::Null, Value::from("a")]);
            }
            Extracted::Skipped => panic!("non-unique index keeps the document"),
        }
    }

    #[test]
    fn test_extract_shaper_failure_is_internal() {
        let doc = Document::new(1, "k1", json!({"age": 1}));

        let result = extract(&FailingShaper, &doc, &[PathId(0)], MissingPolicy::NullPlaceholder);
        assert!(matches!(result, Err(IndexError::Internal(_))));
    }

    #[test]
    fn test_memory_size_counts_values() {
        let small = element(1, "a", vec![Value::Null]);
        let large = element(1, "a", vec![Value::from("0123456789")]);

        assert_eq!(large.memory_size() - small.memory_size(), 10);
    }
}
