//! MemTable Module
//!
//! In-memory ordered index for recent writes.
//!
//! ## Responsibilities
//! - Absorb every write before it reaches disk
//! - Keep deletes as tombstones (logical delete, no structural removal)
//! - Distinguish "not found" from "deleted" for the layered read path
//! - Ordered iteration for SSTable creation and merging
//!
//! ## Data Structure Choice
//! An unbalanced binary search tree keyed by raw bytes:
//! - Children are owned `Box`es; there are no parent back-links
//! - In-order iteration keeps an explicit path stack instead
//! - No rebalancing: adversarial insertion order degrades to O(n) depth
//!
//! The tree itself is not synchronized. The engine wraps it in a single
//! `RwLock`, which is the coarse lock every read/write path goes through.

mod iter;
mod tree;

pub use iter::MemTableIterator;
pub use tree::MemTable;

/// One key in the index, live or tombstoned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    key: Vec<u8>,
    value: Vec<u8>,
    live: bool,
}

impl IndexEntry {
    pub(crate) fn new(key: Vec<u8>, value: Vec<u8>, live: bool) -> Self {
        Self { key, value, live }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Value payload; tombstones keep the last value they shadowed
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// `true` = set, `false` = tombstone
    pub fn is_live(&self) -> bool {
        self.live
    }
}
