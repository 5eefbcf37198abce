//! Range predicates and interval algebra over a skiplist
//!
//! An [`IndexOperator`] tree is lowered into a list of [`Interval`]s. Both
//! bounds of an interval are exclusive:
//!
//! ```text
//! age >= 5 AND age <= 10
//!
//!   HEAD ─▶ D(null) ─▶ A(5) ─▶ B(10) ─▶ C(10) ─▶ E(12) ─▶ ∅
//!           ^left                                ^right
//! ```
//!
//! `left` is the node just before the first match (the head stands for −∞)
//! and `right` the first node after the last match (`None` stands for +∞).

use crate::index::element::{compare_key_element, SearchKey};
use crate::index::skiplist::{NodeId, SkipList};
use crate::index::{IndexError, IndexResult};
use std::cmp::Ordering;
use std::fmt;

/// Predicate tree evaluated by an ordered index
///
/// Leaves compare the index key (or a prefix of it) with a search key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOperator {
    Eq(SearchKey),
    Lt(SearchKey),
    Le(SearchKey),
    Gt(SearchKey),
    Ge(SearchKey),
    And(Box<IndexOperator>, Box<IndexOperator>),
    /// Never evaluated by an index; unions belong above the index
    Or(Box<IndexOperator>, Box<IndexOperator>),
}

impl IndexOperator {
    /// Combine with another operator under AND
    pub fn and(self, other: IndexOperator) -> Self {
        IndexOperator::And(Box::new(self), Box::new(other))
    }

    /// Combine with another operator under OR
    pub fn or(self, other: IndexOperator) -> Self {
        IndexOperator::Or(Box::new(self), Box::new(other))
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndexOperator::Eq(_) => "==",
            IndexOperator::Lt(_) => "<",
            IndexOperator::Le(_) => "<=",
            IndexOperator::Gt(_) => ">",
            IndexOperator::Ge(_) => ">=",
            IndexOperator::And(..) => "AND",
            IndexOperator::Or(..) => "OR",
        }
    }
}

impl fmt::Display for IndexOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexOperator::And(l, r) | IndexOperator::Or(l, r) => {
                write!(f, "({} {} {})", l, self.name(), r)
            }
            IndexOperator::Eq(key)
            | IndexOperator::Lt(key)
            | IndexOperator::Le(key)
            | IndexOperator::Gt(key)
            | IndexOperator::Ge(key) => {
                write!(f, "key {} [", self.name())?;
                for (i, value) in key.values().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Pair of exclusive bounds over a skiplist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// Node before the first match; the head for an open start
    pub left: NodeId,
    /// Node after the last match; `None` for an open end
    pub right: Option<NodeId>,
}

/// Lower `operator` into valid intervals over `list`
///
/// `fields` is the number of indexed fields. Each search key must supply
/// between one and `fields` values.
pub(crate) fn intervals(
    list: &SkipList,
    operator: &IndexOperator,
    fields: usize,
) -> IndexResult<Vec<Interval>> {
    match operator {
        IndexOperator::And(l, r) => {
            let lhs = intervals(list, l, fields)?;
            let rhs = intervals(list, r, fields)?;

            let mut result = Vec::new();
            for a in &lhs {
                for b in &rhs {
                    if let Some(interval) = intersect(list, a, b) {
                        result.try_reserve(1)?;
                        result.push(interval);
                    }
                }
            }

            Ok(result)
        }
        IndexOperator::Or(..) => Err(IndexError::UnsupportedOperator("OR")),
        IndexOperator::Eq(key)
        | IndexOperator::Lt(key)
        | IndexOperator::Le(key)
        | IndexOperator::Gt(key)
        | IndexOperator::Ge(key) => {
            if key.is_empty() || key.len() > fields {
                return Err(IndexError::InvalidSearchKey {
                    supplied: key.len(),
                    fields,
                });
            }

            let interval = leaf_interval(list, operator, key, fields);
            let mut result = Vec::new();
            if is_valid(list, &interval) {
                result.try_reserve_exact(1)?;
                result.push(interval);
            }

            Ok(result)
        }
    }
}

fn leaf_interval(list: &SkipList, operator: &IndexOperator, key: &SearchKey, fields: usize) -> Interval {
    let after = |node: NodeId| list.next(node);

    match operator {
        IndexOperator::Eq(_) if list.is_unique() && key.len() == fields => {
            // At most one element can match a full unique key
            let left = list.left_key_lookup(key);
            let right = match after(left) {
                Some(candidate)
                    if list
                        .element(candidate)
                        .map(|e| compare_key_element(key, e) == Ordering::Equal)
                        .unwrap_or(false) =>
                {
                    after(candidate)
                }
                other => other,
            };
            Interval { left, right }
        }
        IndexOperator::Eq(_) => Interval {
            left: list.left_key_lookup(key),
            right: after(list.right_key_lookup(key)),
        },
        IndexOperator::Le(_) => Interval {
            left: list.start(),
            right: after(list.right_key_lookup(key)),
        },
        IndexOperator::Lt(_) => Interval {
            left: list.start(),
            right: after(list.left_key_lookup(key)),
        },
        IndexOperator::Ge(_) => Interval {
            left: list.left_key_lookup(key),
            right: None,
        },
        _ => Interval {
            left: list.right_key_lookup(key),
            right: None,
        },
    }
}

/// Whether `interval` contains at least one node
pub(crate) fn is_valid(list: &SkipList, interval: &Interval) -> bool {
    if list.is_empty() {
        return false;
    }
    if Some(interval.left) == interval.right {
        return false;
    }
    if list.next(interval.left) == interval.right {
        return false;
    }
    if let Some(right) = interval.right {
        if list.next(right) == Some(interval.left) {
            return false;
        }
    }

    match interval.right {
        _ if interval.left.is_head() => true,
        None => true,
        Some(right) => list.compare_nodes(interval.left, right) == Ordering::Less,
    }
}

/// Intersection of two intervals, if it is non-empty
fn intersect(list: &SkipList, a: &Interval, b: &Interval) -> Option<Interval> {
    let left = if list.compare_nodes(a.left, b.left) == Ordering::Greater {
        a.left
    } else {
        b.left
    };

    let right = match (a.right, b.right) {
        (None, other) | (other, None) => other,
        (Some(x), Some(y)) => {
            if list.compare_nodes(x, y) == Ordering::Less {
                Some(x)
            } else {
                Some(y)
            }
        }
    };

    let interval = Interval { left, right };
    is_valid(list, &interval).then_some(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentHandle, DocumentId};
    use crate::index::IndexElement;
    use crate::value::Value;

    fn list_of(unique: bool, values: &[i64]) -> SkipList {
        let mut list = SkipList::new(unique, 8, Some(11));
        for (i, v) in values.iter().enumerate() {
            let handle = DocumentHandle::new(DocumentId(i as u64), format!("k{:03}", i));
            list.insert(IndexElement::new(handle, vec![Value::from(*v)]))
                .unwrap();
        }
        list
    }

    fn matched(list: &SkipList, operator: &IndexOperator) -> Vec<i64> {
        let mut out = Vec::new();
        for interval in intervals(list, operator, 1).unwrap() {
            let mut node = interval.left;
            while let Some(next) = list.next(node) {
                if Some(next) == interval.right {
                    break;
                }
                if let Some(Value::Number(n)) = list.element(next).map(|e| e.values()[0].clone()) {
                    out.push(n as i64);
                }
                node = next;
            }
        }
        out
    }

    fn key(v: i64) -> SearchKey {
        SearchKey::single(v)
    }

    #[test]
    fn test_leaf_operators() {
        let list = list_of(false, &[1, 3, 3, 5, 7]);

        assert_eq!(matched(&list, &IndexOperator::Eq(key(3))), vec![3, 3]);
        assert_eq!(matched(&list, &IndexOperator::Lt(key(5))), vec![1, 3, 3]);
        assert_eq!(matched(&list, &IndexOperator::Le(key(5))), vec![1, 3, 3, 5]);
        assert_eq!(matched(&list, &IndexOperator::Gt(key(3))), vec![5, 7]);
        assert_eq!(matched(&list, &IndexOperator::Ge(key(3))), vec![3, 3, 5, 7]);
    }

    #[test]
    fn test_empty_results() {
        let list = list_of(false, &[1, 3, 5]);

        assert!(intervals(&list, &IndexOperator::Eq(key(4)), 1).unwrap().is_empty());
        assert!(intervals(&list, &IndexOperator::Lt(key(1)), 1).unwrap().is_empty());
        assert!(intervals(&list, &IndexOperator::Gt(key(5)), 1).unwrap().is_empty());
        assert!(intervals(&list, &IndexOperator::Ge(key(6)), 1).unwrap().is_empty());
    }

    #[test]
    fn test_empty_list_has_no_intervals() {
        let list = list_of(false, &[]);

        assert!(intervals(&list, &IndexOperator::Ge(key(0)), 1).unwrap().is_empty());
        assert!(intervals(&list, &IndexOperator::Le(key(0)), 1).unwrap().is_empty());
    }

    #[test]
    fn test_unique_eq_shortcut() {
        let list = list_of(true, &[2, 4, 6]);

        assert_eq!(matched(&list, &IndexOperator::Eq(key(4))), vec![4]);
        assert!(matched(&list, &IndexOperator::Eq(key(5))).is_empty());
    }

    #[test]
    fn test_and_closed_range() {
        let list = list_of(false, &[1, 5, 7, 10, 10, 12]);
        let op = IndexOperator::Ge(key(5)).and(IndexOperator::Le(key(10)));

        assert_eq!(matched(&list, &op), vec![5, 7, 10, 10]);
    }

    #[test]
    fn test_and_open_range() {
        let list = list_of(false, &[1, 5, 7, 10, 10, 12]);
        let op = IndexOperator::Gt(key(5)).and(IndexOperator::Lt(key(10)));

        assert_eq!(matched(&list, &op), vec![7]);
    }

    #[test]
    fn test_and_disjoint_is_empty() {
        let list = list_of(false, &[1, 5, 7, 10]);

        let op = IndexOperator::Lt(key(5)).and(IndexOperator::Gt(key(7)));
        assert!(intervals(&list, &op, 1).unwrap().is_empty());

        let op = IndexOperator::Gt(key(5)).and(IndexOperator::Lt(key(7)));
        assert!(intervals(&list, &op, 1).unwrap().is_empty());
    }

    #[test]
    fn test_and_eq_eq() {
        let list = list_of(false, &[1, 5, 5, 7]);

        let same = IndexOperator::Eq(key(5)).and(IndexOperator::Eq(key(5)));
        assert_eq!(matched(&list, &same), vec![5, 5]);

        let different = IndexOperator::Eq(key(5)).and(IndexOperator::Eq(key(7)));
        assert!(intervals(&list, &different, 1).unwrap().is_empty());
    }

    #[test]
    fn test_or_is_rejected() {
        let list = list_of(false, &[1]);
        let op = IndexOperator::Eq(key(1)).or(IndexOperator::Eq(key(2)));

        assert_eq!(
            intervals(&list, &op, 1),
            Err(IndexError::UnsupportedOperator("OR"))
        );
    }

    #[test]
    fn test_search_key_arity() {
        let list = list_of(false, &[1]);

        let too_long = IndexOperator::Eq(SearchKey::new(vec![Value::from(1), Value::from(2)]));
        assert_eq!(
            intervals(&list, &too_long, 1),
            Err(IndexError::InvalidSearchKey {
                supplied: 2,
                fields: 1
            })
        );

        let empty = IndexOperator::Ge(SearchKey::new(Vec::new()));
        assert!(matches!(
            intervals(&list, &empty, 1),
            Err(IndexError::InvalidSearchKey { supplied: 0, .. })
        ));
    }

    #[test]
    fn test_display() {
        let op = IndexOperator::Ge(key(5)).and(IndexOperator::Le(key(10)));
        assert_eq!(op.to_string(), "(key >= [5] AND key <= [10])");
    }
}
