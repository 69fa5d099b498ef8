//! MemTable implementation
//!
//! Unbalanced binary search tree with tombstone markers.

use std::cmp::Ordering;

use crate::error::{BurrowError, Result};

use super::iter::MemTableIterator;
use super::IndexEntry;

pub(super) type Link = Option<Box<Node>>;

/// Tree node: the entry plus the two owned subtrees
pub(super) struct Node {
    pub(super) entry: IndexEntry,
    pub(super) left: Link,
    pub(super) right: Link,
}

impl Node {
    fn leaf(key: Vec<u8>, value: Vec<u8>, live: bool) -> Box<Self> {
        Box::new(Self {
            entry: IndexEntry::new(key, value, live),
            left: None,
            right: None,
        })
    }
}

/// In-memory index for recent writes
///
/// Keys compare lexicographically over raw bytes and are unique. Deleting a
/// key only flips its marker; nodes are never removed until the whole tree
/// is dropped by [`reinitialize`](MemTable::reinitialize).
pub struct MemTable {
    root: Link,
    /// Node count, tombstones included
    len: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self { root: None, len: 0 }
    }

    /// Insert or overwrite a key as live
    ///
    /// An existing key is revived even if it was a tombstone.
    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.insert(key, value, true);
    }

    /// Insert or overwrite a key as a tombstone, keeping `value` as payload
    ///
    /// Used when a lower layer still holds a value for the key and the top
    /// layer has to shadow it.
    pub fn set_as_deleted(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.insert(key, value, false);
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>, live: bool) {
        let mut slot = &mut self.root;
        loop {
            match slot {
                Some(node) => match key.as_slice().cmp(node.entry.key()) {
                    Ordering::Equal => {
                        node.entry.value = value;
                        node.entry.live = live;
                        return;
                    }
                    Ordering::Less => slot = &mut node.left,
                    Ordering::Greater => slot = &mut node.right,
                },
                None => {
                    *slot = Some(Node::leaf(key, value, live));
                    self.len += 1;
                    return;
                }
            }
        }
    }

    /// Look up a live value
    ///
    /// Returns:
    /// - `Ok(value)`: key is live
    /// - `Err(Deleted)`: key is a tombstone; older layers must not be consulted
    /// - `Err(KeyNotFound)`: key is absent; older layers may hold it
    pub fn get(&self, key: &[u8]) -> Result<&[u8]> {
        match self.find(key) {
            Some(entry) if entry.is_live() => Ok(entry.value()),
            Some(_) => Err(BurrowError::Deleted),
            None => Err(BurrowError::KeyNotFound),
        }
    }

    /// Look up the raw entry, tombstones included
    pub fn entry(&self, key: &[u8]) -> Option<&IndexEntry> {
        self.find(key)
    }

    /// Whether the key is present at all (live or tombstone)
    pub fn contains(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Logically delete a live key
    ///
    /// Flips the marker in place. Fails with `KeyNotFound` if the key is not
    /// in the tree and `AlreadyDeleted` if it is already a tombstone.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        match self.find_mut(key) {
            Some(entry) if entry.live => {
                entry.live = false;
                Ok(())
            }
            Some(_) => Err(BurrowError::AlreadyDeleted),
            None => Err(BurrowError::KeyNotFound),
        }
    }

    /// Smallest key present (tombstones included)
    pub fn min(&self) -> Option<&[u8]> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some(node.entry.key())
    }

    /// Largest key present (tombstones included)
    pub fn max(&self) -> Option<&[u8]> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some(node.entry.key())
    }

    /// Node count, tombstones included
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// In-order traversal; stops as soon as `visit` returns `false`
    pub fn ascend<F>(&self, mut visit: F)
    where
        F: FnMut(&IndexEntry) -> bool,
    {
        for entry in self.iter() {
            if !visit(entry) {
                break;
            }
        }
    }

    /// Ascending iterator over all entries (tombstones included)
    pub fn iter(&self) -> MemTableIterator<'_> {
        MemTableIterator::new(self.root.as_deref())
    }

    /// Drop every entry (after a successful flush)
    pub fn reinitialize(&mut self) {
        teardown(self.root.take());
        self.len = 0;
    }

    fn find(&self, key: &[u8]) -> Option<&IndexEntry> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            cur = match key.cmp(node.entry.key()) {
                Ordering::Equal => return Some(&node.entry),
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
            };
        }
        None
    }

    fn find_mut(&mut self, key: &[u8]) -> Option<&mut IndexEntry> {
        let mut cur = self.root.as_deref_mut();
        while let Some(node) = cur {
            cur = match key.cmp(node.entry.key()) {
                Ordering::Equal => return Some(&mut node.entry),
                Ordering::Less => node.left.as_deref_mut(),
                Ordering::Greater => node.right.as_deref_mut(),
            };
        }
        None
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemTable {
    fn drop(&mut self) {
        teardown(self.root.take());
    }
}

impl std::fmt::Debug for MemTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTable").field("len", &self.len).finish()
    }
}

/// Free a subtree without recursion; a sorted insert order builds a
/// list-shaped tree whose recursive drop would overflow the stack.
fn teardown(root: Link) {
    let mut pending: Vec<Box<Node>> = root.into_iter().collect();
    while let Some(mut node) = pending.pop() {
        pending.extend(node.left.take());
        pending.extend(node.right.take());
    }
}
