//! Storage Module
//!
//! Persistent storage layer: immutable sorted tables on disk.
//!
//! ## Responsibilities
//! - Persist flushed index contents in sorted, checksummed files
//! - Point lookups across tables, newest first
//! - Pairwise compaction that keeps the table count bounded
//!
//! See [`sstable`] for the file format.

pub mod sstable;
mod manager;

pub use manager::StorageManager;
pub use sstable::{SSTable, SSTableBuilder, SSTableEntry, SSTableIterator, SSTableReader};
