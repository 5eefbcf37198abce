//! Arena-backed skiplist of index elements
//!
//! Nodes live in a `Vec` and are addressed by [`NodeId`]. Slot 0 is the
//! start-of-list sentinel ([`NodeId::HEAD`]); it holds no element and has a
//! forward link for every possible level. Freed slots are recycled through a
//! free list.
//!
//! ```text
//! level 2: HEAD ─────────────────────▶ n3 ──────────────▶ ∅
//! level 1: HEAD ─────────▶ n1 ───────▶ n3 ──────────────▶ ∅
//! level 0: HEAD ─▶ n2 ───▶ n1 ─▶ n4 ─▶ n3 ─▶ n5 ───────▶ ∅
//! ```
//!
//! Elements are kept ascending under [`CompareMode::TotalOrder`]. Node
//! heights follow a geometric distribution with p = 1/2.

use crate::index::element::{compare_key_element, IndexElement, SearchKey};
use crate::index::{IndexError, IndexResult};
use crate::value::CompareMode;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::fmt;
use std::mem::size_of;

/// Hard cap on node height
pub const MAX_LEVELS: usize = 64;

/// Handle of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Start-of-list sentinel
    pub const HEAD: NodeId = NodeId(0);

    pub fn is_head(self) -> bool {
        self == Self::HEAD
    }
}

struct Node {
    /// `None` for the head and for vacant slots
    element: Option<IndexElement>,
    /// Forward links, one per level of this node
    next: Vec<Option<NodeId>>,
    /// Level-0 back link
    prev: Option<NodeId>,
}

impl Node {
    fn vacant() -> Self {
        Self {
            element: None,
            next: Vec::new(),
            prev: None,
        }
    }
}

/// Bytes accounted to a linked node
fn node_bytes(levels: usize, element: &IndexElement) -> usize {
    size_of::<Node>() + levels * size_of::<Option<NodeId>>() + element.memory_size()
}

/// Ordered skiplist, unique or multi
pub struct SkipList {
    nodes: Vec<Node>,
    /// Vacant slots; capacity always covers every non-head slot
    free: Vec<NodeId>,
    unique: bool,
    /// Number of levels currently in use
    height: usize,
    max_level: usize,
    rng: StdRng,
    len: usize,
    memory_used: usize,
}

impl fmt::Debug for SkipList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipList")
            .field("unique", &self.unique)
            .field("len", &self.len)
            .field("height", &self.height)
            .field("max_level", &self.max_level)
            .finish()
    }
}

impl SkipList {
    /// Create an empty list
    ///
    /// `max_level` is clamped to `1..=MAX_LEVELS`. With a `seed`, node heights
    /// are reproducible across runs.
    pub fn new(unique: bool, max_level: usize, seed: Option<u64>) -> Self {
        let max_level = max_level.clamp(1, MAX_LEVELS);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let head = Node {
            element: None,
            next: vec![None; max_level],
            prev: None,
        };

        Self {
            nodes: vec![head],
            free: Vec::new(),
            unique,
            height: 1,
            max_level,
            rng,
            len: 0,
            memory_used: 0,
        }
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Number of stored elements
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels currently in use
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Memory held by the list in bytes
    pub fn memory_usage(&self) -> usize {
        size_of::<Self>()
            + size_of::<Node>()
            + self.max_level * size_of::<Option<NodeId>>()
            + self.memory_used
    }

    /// Reserve arena room for `additional` nodes
    pub fn reserve(&mut self, additional: usize) -> IndexResult<()> {
        self.nodes.try_reserve(additional)?;
        Ok(())
    }

    /// Start-of-list sentinel
    pub fn start(&self) -> NodeId {
        NodeId::HEAD
    }

    /// Level-0 successor; `None` past the last node
    pub fn next(&self, node: NodeId) -> Option<NodeId> {
        self.forward(node, 0)
    }

    /// Level-0 predecessor; the first node's predecessor is the head
    pub fn prev(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.prev)
    }

    /// Element stored at `node`; `None` for the head
    pub fn element(&self, node: NodeId) -> Option<&IndexElement> {
        self.nodes.get(node.0).and_then(|n| n.element.as_ref())
    }

    /// Elements in ascending order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            current: self.next(NodeId::HEAD),
        }
    }

    fn forward(&self, node: NodeId, level: usize) -> Option<NodeId> {
        self.nodes
            .get(node.0)
            .and_then(|n| n.next.get(level).copied().flatten())
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < self.max_level && self.rng.gen_bool(0.5) {
            level += 1;
        }
        level
    }

    /// Walk down from the top level, recording the last node at each level
    /// whose element satisfies `before`
    ///
    /// `before` must hold for a prefix of the list. Returns the level-0
    /// predecessor, or the head.
    fn predecessors<F>(&self, mut before: F, preds: &mut [NodeId; MAX_LEVELS]) -> NodeId
    where
        F: FnMut(&IndexElement) -> bool,
    {
        let mut current = NodeId::HEAD;

        for level in (0..self.height).rev() {
            while let Some(candidate) = self.forward(current, level) {
                match self.element(candidate) {
                    Some(element) if before(element) => current = candidate,
                    _ => break,
                }
            }
            preds[level] = current;
        }

        current
    }

    fn last_matching<F>(&self, before: F) -> NodeId
    where
        F: FnMut(&IndexElement) -> bool,
    {
        let mut preds = [NodeId::HEAD; MAX_LEVELS];
        self.predecessors(before, &mut preds)
    }

    /// Last node whose key is strictly less than `key`, or the head
    pub fn left_key_lookup(&self, key: &SearchKey) -> NodeId {
        self.last_matching(|e| compare_key_element(key, e) == Ordering::Greater)
    }

    /// Last node whose key is less than or equal to `key`, or the head
    pub fn right_key_lookup(&self, key: &SearchKey) -> NodeId {
        self.last_matching(|e| compare_key_element(key, e) != Ordering::Less)
    }

    /// Order two nodes under the total order, the head first
    pub fn compare_nodes(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }

        match (self.element(a), self.element(b)) {
            (Some(x), Some(y)) => x.compare(y, CompareMode::TotalOrder),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Link `element` into the list
    ///
    /// Fails with [`IndexError::UniqueConstraintViolated`] when a unique list
    /// already holds an element with equal key values, and with
    /// [`IndexError::Internal`] when the same element is already linked. On
    /// any error the list is unchanged.
    pub fn insert(&mut self, element: IndexElement) -> IndexResult<()> {
        let mut preds = [NodeId::HEAD; MAX_LEVELS];
        let pred = self.predecessors(
            |e| e.compare(&element, CompareMode::TotalOrder) == Ordering::Less,
            &mut preds,
        );
        let successor = self.next(pred);

        if self.unique {
            let neighbours = [self.element(pred), successor.and_then(|s| self.element(s))];
            if neighbours
                .into_iter()
                .flatten()
                .any(|e| e.compare(&element, CompareMode::Preorder) == Ordering::Equal)
            {
                return Err(IndexError::UniqueConstraintViolated);
            }
        }

        if let Some(existing) = successor.and_then(|s| self.element(s)) {
            if existing.compare(&element, CompareMode::TotalOrder) == Ordering::Equal {
                return Err(IndexError::Internal(format!(
                    "document '{}' is already indexed",
                    element.document().key()
                )));
            }
        }

        // Allocate everything before touching any link
        let level = self.random_level();
        let mut next = Vec::new();
        next.try_reserve_exact(level)?;
        next.resize(level, None);

        let slot = match self.free.last() {
            Some(&slot) => slot,
            None => {
                self.nodes.try_reserve(1)?;
                self.free.try_reserve(self.nodes.len())?;
                NodeId(self.nodes.len())
            }
        };

        let bytes = node_bytes(level, &element);
        let node = Node {
            element: Some(element),
            next,
            prev: Some(pred),
        };

        if slot.0 < self.nodes.len() {
            self.free.pop();
            self.nodes[slot.0] = node;
        } else {
            self.nodes.push(node);
        }

        // Levels above the current height have the head as predecessor
        if level > self.height {
            self.height = level;
        }

        for (l, p) in preds.iter().enumerate().take(level) {
            let after = self.nodes[p.0].next[l];
            self.nodes[slot.0].next[l] = after;
            self.nodes[p.0].next[l] = Some(slot);
        }

        if let Some(after) = self.nodes[slot.0].next[0] {
            self.nodes[after.0].prev = Some(slot);
        }

        self.len += 1;
        self.memory_used += bytes;

        Ok(())
    }

    /// Unlink the element of the same document, located by total order
    ///
    /// Returns the removed element, or `None` when it is not present.
    pub fn remove(&mut self, element: &IndexElement) -> Option<IndexElement> {
        let mut preds = [NodeId::HEAD; MAX_LEVELS];
        let pred = self.predecessors(
            |e| e.compare(element, CompareMode::TotalOrder) == Ordering::Less,
            &mut preds,
        );

        let target = self.next(pred)?;
        let found = self
            .element(target)
            .map(|e| e.document().id() == element.document().id())
            .unwrap_or(false);
        if !found {
            return None;
        }

        let levels = self.nodes[target.0].next.len();
        for (l, p) in preds.iter().enumerate().take(levels) {
            if self.nodes[p.0].next[l] == Some(target) {
                self.nodes[p.0].next[l] = self.nodes[target.0].next[l];
            }
        }

        if let Some(after) = self.nodes[target.0].next[0] {
            self.nodes[after.0].prev = Some(pred);
        }

        let node = std::mem::replace(&mut self.nodes[target.0], Node::vacant());
        // Capacity was reserved when the slot was first allocated
        self.free.push(target);

        while self.height > 1 && self.nodes[0].next[self.height - 1].is_none() {
            self.height -= 1;
        }

        let removed = node.element?;
        self.memory_used -= node_bytes(levels, &removed);
        self.len -= 1;

        Some(removed)
    }
}

/// Ascending iterator over stored elements
pub struct Iter<'a> {
    list: &'a SkipList,
    current: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a IndexElement;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = self.list.next(node);
        self.list.element(node)
    }
}
