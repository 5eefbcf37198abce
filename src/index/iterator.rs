//! Cursor over the intervals of a range query

use crate::document::DocumentHandle;
use crate::index::range::Interval;
use crate::index::skiplist::{NodeId, SkipList};

/// Lazy cursor walking a list of intervals in key order
///
/// Borrows the skiplist for its whole lifetime, so the index cannot change
/// while a scan is in progress. Dropping the iterator ends the scan.
#[derive(Debug)]
pub struct RangeIterator<'a> {
    list: &'a SkipList,
    intervals: Vec<Interval>,
    /// Interval currently being walked
    index: usize,
    /// Last node returned from that interval; `None` before its first node
    cursor: Option<NodeId>,
}

impl<'a> RangeIterator<'a> {
    pub fn new(list: &'a SkipList, intervals: Vec<Interval>) -> Self {
        Self {
            list,
            intervals,
            index: 0,
            cursor: None,
        }
    }

    /// Intervals this iterator walks
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Position of the next node without moving the cursor
    fn peek(&self) -> Option<(usize, NodeId)> {
        let mut index = self.index;
        let mut cursor = self.cursor;

        while let Some(interval) = self.intervals.get(index) {
            let from = cursor.unwrap_or(interval.left);
            match self.list.next(from) {
                Some(node) if Some(node) != interval.right => return Some((index, node)),
                _ => {
                    index += 1;
                    cursor = None;
                }
            }
        }

        None
    }

    /// Whether another document remains
    pub fn has_next(&self) -> bool {
        self.peek().is_some()
    }

    /// Advance `count` documents and return the last one reached
    ///
    /// Returns `None` when `count` is zero or fewer than `count` documents
    /// remain; the iterator is exhausted in the latter case.
    pub fn next_n(&mut self, count: usize) -> Option<&'a DocumentHandle> {
        if count == 0 {
            return None;
        }

        let mut reached = None;
        for _ in 0..count {
            reached = Some(self.next()?);
        }
        reached
    }
}

impl<'a> Iterator for RangeIterator<'a> {
    type Item = &'a DocumentHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let Some((index, node)) = self.peek() else {
            self.index = self.intervals.len();
            return None;
        };

        self.index = index;
        self.cursor = Some(node);

        self.list.element(node).map(|e| e.document())
    }
}
