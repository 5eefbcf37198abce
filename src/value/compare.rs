//! Cross-class value ordering
//!
//! Within a class: `false < true`, numbers by natural order (NaN after every
//! other number), strings by byte order, lists and objects element-wise with
//! the shorter sequence first on a common prefix. Objects compare as their
//! sorted `(attribute, value)` sequences.

use super::Value;
use std::cmp::Ordering;

/// How index elements with equal key values are related
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Equal key values are equal, whatever document they belong to.
    /// Used when building intervals.
    Preorder,
    /// Equal key values are ordered by the documents' primary keys.
    /// Used for structural insert, remove and uniqueness checks.
    TotalOrder,
}

/// Compare two values under the cross-class total order
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => compare_numbers(*a, *b),
        (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
        (Value::List(a), Value::List(b)) => a.iter().cmp(b.iter()),
        (Value::Object(a), Value::Object(b)) => a
            .iter()
            .map(|(k, v)| (k.as_bytes(), v))
            .cmp(b.iter().map(|(k, v)| (k.as_bytes(), v))),
        _ => left.class().cmp(&right.class()),
    }
}

fn compare_numbers(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_class_order() {
        let ascending = [
            Value::Undefined,
            Value::Null,
            Value::Bool(false),
            Value::Number(-1e300),
            Value::from(""),
            Value::List(vec![]),
            Value::from(json!({})),
        ];

        for pair in ascending.windows(2) {
            assert_eq!(compare_values(&pair[0], &pair[1]), Ordering::Less);
            assert_eq!(compare_values(&pair[1], &pair[0]), Ordering::Greater);
        }
    }

    #[test]
    fn test_booleans() {
        assert!(Value::Bool(false) < Value::Bool(true));
        assert_eq!(Value::Bool(true), Value::Bool(true));
    }

    #[test]
    fn test_numbers() {
        assert!(Value::Number(-3.5) < Value::Number(2.0));
        assert!(Value::Number(10.0) > Value::Number(9.999));
        assert!(Value::Number(f64::NAN) > Value::Number(f64::INFINITY));
        assert_eq!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn test_strings_are_byte_ordered() {
        assert!(Value::from("B") < Value::from("a"));
        assert!(Value::from("abc") < Value::from("abd"));
        assert!(Value::from("ab") < Value::from("abc"));
        // 'é' encodes as 0xC3 0xA9 and sorts after every ASCII letter
        assert!(Value::from("z") < Value::from("é"));
    }

    #[test]
    fn test_lists_elementwise() {
        let short = Value::from(json!([1, 2]));
        let long = Value::from(json!([1, 2, 0]));
        let bigger = Value::from(json!([1, 3]));

        assert!(short < long);
        assert!(long < bigger);
        assert!(Value::from(json!([null])) < Value::from(json!([false])));
    }

    #[test]
    fn test_objects_by_sorted_attributes() {
        let a = Value::from(json!({"a": 1, "b": 2}));
        let b = Value::from(json!({"b": 2, "a": 1}));
        let c = Value::from(json!({"a": 1, "c": 0}));
        let d = Value::from(json!({"a": 2}));

        assert_eq!(a, b);
        assert!(a < c);
        assert!(c < d);
    }
}
