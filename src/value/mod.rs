//! Typed values seen by the index engine
//!
//! The shaper hands the engine one [`Value`] per indexed attribute. Values of
//! different classes are totally ordered so that a single index can hold
//! heterogeneous documents:
//!
//! ```text
//! undefined < null < boolean < number < string < list < object
//! ```
//!
//! - **compare**: the [`Ord`] implementation plus the [`CompareMode`] switch
//!   between preorder and total order used by index elements

mod compare;

pub use compare::{compare_values, CompareMode};

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::size_of;

/// A typed sub-value extracted from a document
///
/// Equality, ordering and hashing all follow the cross-class total order, so
/// `Value::Number(0.0) == Value::Number(-0.0)`.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value (distinct from an explicit `null`)
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

/// Value classes in ascending sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueClass {
    Undefined,
    Null,
    Bool,
    Number,
    String,
    List,
    Object,
}

impl ValueClass {
    /// Lowercase name used in descriptions and error messages
    pub fn name(&self) -> &'static str {
        match self {
            ValueClass::Undefined => "undefined",
            ValueClass::Null => "null",
            ValueClass::Bool => "boolean",
            ValueClass::Number => "number",
            ValueClass::String => "string",
            ValueClass::List => "list",
            ValueClass::Object => "object",
        }
    }
}

impl Value {
    /// The class this value sorts in
    pub fn class(&self) -> ValueClass {
        match self {
            Value::Undefined => ValueClass::Undefined,
            Value::Null => ValueClass::Null,
            Value::Bool(_) => ValueClass::Bool,
            Value::Number(_) => ValueClass::Number,
            Value::String(_) => ValueClass::String,
            Value::List(_) => ValueClass::List,
            Value::Object(_) => ValueClass::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Look up a direct attribute of an object value
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(attribute),
            _ => None,
        }
    }

    /// Bytes owned on the heap by this value
    ///
    /// Computed from lengths rather than capacities so that the figure is a
    /// pure function of the value; index memory counters rely on that.
    pub fn heap_size(&self) -> usize {
        match self {
            Value::String(s) => s.len(),
            Value::List(items) => items
                .iter()
                .map(|v| size_of::<Value>() + v.heap_size())
                .sum(),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| size_of::<String>() + k.len() + size_of::<Value>() + v.heap_size())
                .sum(),
            _ => 0,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        compare_values(self, other)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class().hash(state);
        match self {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => canonical_bits(*n).hash(state),
            Value::String(s) => s.as_bytes().hash(state),
            Value::List(items) => {
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            Value::Object(map) => {
                map.len().hash(state);
                for (k, v) in map {
                    k.as_bytes().hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

/// Bit pattern that is identical for numbers comparing equal
fn canonical_bits(n: f64) -> u64 {
    if n == 0.0 {
        0.0f64.to_bits()
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{:?}:{}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Into::into).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}
