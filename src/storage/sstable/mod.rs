//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (18 bytes + both keys)                           │
//! │   Magic: u32 = 1234 (4) | EntryCount: u32 (4)           │
//! │   SmallestKeyLen: u32 (4) | SmallestKey                 │
//! │   LargestKeyLen: u32 (4)  | LargestKey                  │
//! │   Version: u16 (2)                                      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (EntryCount entries, strictly ascending)     │
//! │   [Marker: u16][KeyLen: u32][Key][ValueLen: u32][Value] │
//! │   (Marker 1 = live, 0 = tombstone)                      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   CRC32-IEEE over every preceding byte                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//! All integers are big-endian (see [`crate::codec`]).

mod builder;
mod iterator;
mod reader;

use std::path::PathBuf;

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::SSTableReader;

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Magic number identifying an SSTable file
pub const MAGIC: u32 = 1234;

/// Current SSTable format version
pub const VERSION: u16 = 1;

/// Fixed header bytes: magic, count, two key lengths, version
pub const FIXED_HEADER_SIZE: u64 = 4 + 4 + 4 + 4 + 2;

/// Trailing checksum size
pub const CHECKSUM_SIZE: u64 = 4;

/// Entry marker for a live value
pub const MARKER_LIVE: u16 = 1;

/// Entry marker for a tombstone
pub const MARKER_TOMBSTONE: u16 = 0;

// =============================================================================
// SSTable Metadata
// =============================================================================

/// In-memory handle for one immutable SSTable file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SSTable {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Smallest key covered (inclusive)
    pub smallest_key: Vec<u8>,
    /// Largest key covered (inclusive)
    pub largest_key: Vec<u8>,
    /// Number of entries in the data block
    pub entry_count: u32,
    /// Format version from the header
    pub version: u16,
    /// Stored trailing CRC32
    pub checksum: u32,
    /// Offset of the first entry
    pub data_offset: u64,
    /// File size in bytes
    pub file_size: u64,
}

impl SSTable {
    /// Get the number of entries
    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false if key is definitely outside [smallest_key, largest_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        key >= self.smallest_key.as_slice() && key <= self.largest_key.as_slice()
    }
}

/// One record from an SSTable data block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SSTableEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub live: bool,
}
