//! MemTable Iterator
//!
//! In-order traversal driven by an explicit path stack.

use crate::error::{BurrowError, Result};

use super::tree::Node;
use super::IndexEntry;

/// Single-pass ascending iterator over a [`MemTable`](super::MemTable)
///
/// The stack holds the left spine of the subtree still to visit; the top is
/// always the next entry. [`restart`](Self::restart) rewinds to the smallest
/// key without re-borrowing the tree.
pub struct MemTableIterator<'a> {
    root: Option<&'a Node>,
    stack: Vec<&'a Node>,
}

impl<'a> MemTableIterator<'a> {
    pub(super) fn new(root: Option<&'a Node>) -> Self {
        let mut iter = Self {
            root,
            stack: Vec::new(),
        };
        iter.push_left_spine(root);
        iter
    }

    fn push_left_spine(&mut self, mut cur: Option<&'a Node>) {
        while let Some(node) = cur {
            self.stack.push(node);
            cur = node.left.as_deref();
        }
    }

    /// Whether another entry remains
    pub fn has_next(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Advance to the next entry in key order
    ///
    /// Fails with `IteratorExhausted` once every entry has been returned.
    pub fn next_entry(&mut self) -> Result<&'a IndexEntry> {
        let node = self.stack.pop().ok_or(BurrowError::IteratorExhausted)?;
        self.push_left_spine(node.right.as_deref());
        Ok(&node.entry)
    }

    /// Rewind to the smallest key
    pub fn restart(&mut self) {
        self.stack.clear();
        self.push_left_spine(self.root);
    }
}

impl<'a> Iterator for MemTableIterator<'a> {
    type Item = &'a IndexEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().ok()
    }
}
