//! Documents as seen by the index engine
//!
//! The storage engine owns documents; indexes only keep [`DocumentHandle`]s,
//! which carry the document's identity and its primary key (the final
//! tie-breaker of the total order). Typed attribute access goes through a
//! [`Shaper`].

mod shaper;

pub use shaper::{AttributeShaper, PathId, Shaper, ShaperError};

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Attribute holding the primary key in JSON documents
pub const KEY_ATTRIBUTE: &str = "_key";

/// Storage-assigned document identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-owning reference to a document: identity plus primary key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle {
    id: DocumentId,
    key: Arc<str>,
}

impl DocumentHandle {
    pub fn new(id: DocumentId, key: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            key: key.into(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Primary key string
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A document handed to the index by the collection layer
#[derive(Debug, Clone)]
pub struct Document {
    handle: DocumentHandle,
    body: Value,
}

impl Document {
    pub fn new(id: u64, key: impl Into<Arc<str>>, body: impl Into<Value>) -> Self {
        Self {
            handle: DocumentHandle::new(DocumentId(id), key),
            body: body.into(),
        }
    }

    /// Build a document from JSON, taking the primary key from `_key`
    pub fn from_json(id: u64, json: serde_json::Value) -> Result<Self, ShaperError> {
        let key = match json.get(KEY_ATTRIBUTE) {
            Some(serde_json::Value::String(key)) if !key.is_empty() => key.clone(),
            Some(other) => {
                return Err(ShaperError::Corrupt {
                    path: KEY_ATTRIBUTE.to_string(),
                    reason: format!("primary key must be a non-empty string, got {}", other),
                })
            }
            None => {
                return Err(ShaperError::Corrupt {
                    path: KEY_ATTRIBUTE.to_string(),
                    reason: "document has no primary key".to_string(),
                })
            }
        };

        Ok(Self::new(id, key, json))
    }

    pub fn handle(&self) -> &DocumentHandle {
        &self.handle
    }

    pub fn id(&self) -> DocumentId {
        self.handle.id
    }

    pub fn key(&self) -> &str {
        self.handle.key()
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// Parse a JSON array or JSON-lines text into documents
///
/// Documents get ids 1, 2, ... in input order. Blank lines are ignored.
pub fn parse_documents(text: &str) -> Result<Vec<Document>, ShaperError> {
    let malformed = |line: usize, e: serde_json::Error| ShaperError::Corrupt {
        path: format!("line {}", line),
        reason: e.to_string(),
    };

    let values: Vec<serde_json::Value> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text).map_err(|e| malformed(e.line(), e))?
    } else {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| serde_json::from_str(line).map_err(|e| malformed(i + 1, e)))
            .collect::<Result<_, _>>()?
    };

    values
        .into_iter()
        .enumerate()
        .map(|(i, json)| Document::from_json(i as u64 + 1, json))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_takes_key() {
        let doc = Document::from_json(7, json!({"_key": "abc", "age": 3})).unwrap();

        assert_eq!(doc.id(), DocumentId(7));
        assert_eq!(doc.key(), "abc");
        assert_eq!(doc.body().get("age"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_from_json_requires_string_key() {
        assert!(Document::from_json(1, json!({"age": 3})).is_err());
        assert!(Document::from_json(1, json!({"_key": 12})).is_err());
        assert!(Document::from_json(1, json!({"_key": ""})).is_err());
    }

    #[test]
    fn test_parse_documents_array_and_lines() {
        let array = parse_documents(r#"[{"_key": "a", "n": 1}, {"_key": "b"}]"#).unwrap();
        let lines = parse_documents("{\"_key\": \"a\", \"n\": 1}\n\n{\"_key\": \"b\"}\n").unwrap();

        for docs in [array, lines] {
            assert_eq!(docs.len(), 2);
            assert_eq!(docs[0].id(), DocumentId(1));
            assert_eq!(docs[1].key(), "b");
        }
    }

    #[test]
    fn test_parse_documents_errors() {
        assert!(parse_documents("{\"_key\": \"a\"}\nnot json").is_err());
        assert!(parse_documents(r#"[{"n": 1}]"#).is_err());
    }

    #[test]
    fn test_handles_compare_by_identity_and_key() {
        let a = DocumentHandle::new(DocumentId(1), "a");
        let b = DocumentHandle::new(DocumentId(1), "a");
        let c = DocumentHandle::new(DocumentId(2), "a");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
