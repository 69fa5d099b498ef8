//! Storage Manager
//!
//! Manages the ordered set of SSTables and coordinates flushes, reads and
//! compaction.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup, skipping damaged files
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from index flushes
//! - Merge adjacent pairs once the table count reaches the threshold

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{BurrowError, Result};
use crate::memtable::MemTable;

use super::{SSTable, SSTableBuilder, SSTableEntry, SSTableReader};

/// Manages the storage layer
///
/// ## Concurrency:
/// - `tables`: RwLock. Searches share it; flush and compaction take it
///   exclusively, so a search never observes a half-compacted list
/// - `next_sstable_id`: Atomic counter (lock-free)
/// - Readers open their own file handle per search, so `&self` suffices
pub struct StorageManager {
    /// Directory where SSTables are stored
    dir: PathBuf,

    /// Loaded tables, ordered oldest → newest (by file id)
    tables: RwLock<Vec<SSTable>>,

    /// Next ID for creating new SSTables
    next_sstable_id: AtomicU64,

    /// Table count that triggers compaction after a flush
    compaction_threshold: usize,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Remove leftover `.tmp` files from interrupted writes
    /// 3. Open and validate every `sstable_NNNNNN.sst`, oldest first
    /// 4. Skip (with a warning) files failing magic or checksum checks
    pub fn open(path: &Path, compaction_threshold: usize) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut found: Vec<(u64, PathBuf)> = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();
            if !file_path.is_file() {
                continue;
            }

            if file_path.extension().map_or(false, |ext| ext == "tmp") {
                tracing::warn!("Removing incomplete SSTable {}", file_path.display());
                fs::remove_file(&file_path)?;
                continue;
            }

            match Self::parse_sstable_id(&file_path) {
                Some(id) => found.push((id, file_path)),
                None => tracing::debug!("Ignoring {}", file_path.display()),
            }
        }
        found.sort_by_key(|(id, _)| *id);

        let mut tables = Vec::with_capacity(found.len());
        for (_, table_path) in &found {
            match SSTableReader::open(table_path) {
                Ok(reader) => tables.push(reader.into_table()),
                Err(e) if e.is_corrupt() => {
                    tracing::warn!("Skipping SSTable {}: {}", table_path.display(), e);
                }
                Err(e) => return Err(e),
            }
        }

        // Skipped files keep their ids so nothing ever overwrites them
        let next_id = found.last().map(|(id, _)| id + 1).unwrap_or(1);

        tracing::info!(
            "Loaded {} SSTables from {} (next id {})",
            tables.len(),
            path.display(),
            next_id
        );

        Ok(Self {
            dir: path.to_path_buf(),
            tables: RwLock::new(tables),
            next_sstable_id: AtomicU64::new(next_id),
            compaction_threshold,
        })
    }

    /// Look a key up across all SSTables, newest → oldest
    ///
    /// Returns:
    /// - `Ok(value)`: the newest table holding the key has it live
    /// - `Err(Deleted)`: the newest table holding the key has a tombstone
    /// - `Err(KeyNotFound)`: no table holds the key
    ///
    /// Any other error (an unreadable or damaged table) is fatal to the
    /// lookup and is returned as-is.
    pub fn search(&self, key: &[u8]) -> Result<Vec<u8>> {
        let tables = self.tables.read();

        for table in tables.iter().rev() {
            // Skip SSTable if key is outside its range (O(1) check)
            if !table.might_contain(key) {
                continue;
            }

            match SSTableReader::for_table(table)?.get(key) {
                Ok(value) => return Ok(value),
                Err(BurrowError::Deleted) => return Err(BurrowError::Deleted),
                Err(BurrowError::KeyNotFound) => continue,
                Err(e) => {
                    tracing::error!("Search in {} failed: {}", table.path.display(), e);
                    return Err(e);
                }
            }
        }

        Err(BurrowError::KeyNotFound)
    }

    /// Flush the index to a new SSTable
    ///
    /// Writes every entry, tombstones included, in ascending key order with
    /// the index's min and max as the header range. Runs compaction inline
    /// afterwards if the table count reached the threshold.
    ///
    /// Once the new table is written and listed the flush has succeeded; a
    /// failed compaction pass is logged and left for the next trigger.
    pub fn flush(&self, index: &MemTable) -> Result<SSTable> {
        let (smallest, largest) = match (index.min(), index.max()) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(BurrowError::Storage(
                    "Cannot flush an empty index".to_string(),
                ))
            }
        };

        let mut tables = self.tables.write();

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let mut builder = SSTableBuilder::new(&path, index.len() as u32, smallest, largest)?;
        for entry in index.iter() {
            builder.add(entry.key(), entry.value(), entry.is_live())?;
        }
        let table = builder.finish()?;

        tracing::info!(
            "Flushed {} entries to {}",
            table.entry_count,
            table.path.display()
        );
        tables.push(table.clone());

        if tables.len() >= self.compaction_threshold {
            if let Err(e) = Self::compact_locked(&mut tables) {
                tracing::warn!("Compaction after flushing {} failed: {}", table.path.display(), e);
            }
        }

        Ok(table)
    }

    /// Merge adjacent pairs regardless of the threshold
    ///
    /// Returns the table count afterwards.
    pub fn compact(&self) -> Result<usize> {
        let mut tables = self.tables.write();
        Self::compact_locked(&mut tables)?;
        Ok(tables.len())
    }

    /// Merge two tables into one, newer entries winning on equal keys
    ///
    /// The result takes over `newer`'s file name (written to a temporary
    /// file and renamed over it) and `older`'s file is removed, so file ids
    /// keep matching recency. Tombstones survive unless `drop_tombstones`
    /// is set, which is only safe when nothing older than `older` exists.
    ///
    /// Returns `None` when nothing survives; both files are removed then.
    pub fn merge(older: &SSTable, newer: &SSTable, drop_tombstones: bool) -> Result<Option<SSTable>> {
        let older_entries = Self::read_all(older)?;
        let newer_entries = Self::read_all(newer)?;

        let mut merged = Vec::with_capacity(older_entries.len() + newer_entries.len());
        let mut old_iter = older_entries.into_iter().peekable();
        let mut new_iter = newer_entries.into_iter().peekable();
        loop {
            let next = match (old_iter.peek(), new_iter.peek()) {
                (Some(o), Some(n)) => match o.key.cmp(&n.key) {
                    std::cmp::Ordering::Less => old_iter.next(),
                    std::cmp::Ordering::Greater => new_iter.next(),
                    std::cmp::Ordering::Equal => {
                        old_iter.next();
                        new_iter.next()
                    }
                },
                (Some(_), None) => old_iter.next(),
                (None, Some(_)) => new_iter.next(),
                (None, None) => break,
            };
            if let Some(entry) = next {
                if entry.live || !drop_tombstones {
                    merged.push(entry);
                }
            }
        }

        if merged.is_empty() {
            tracing::debug!(
                "Merge of {} and {} left nothing; removing both",
                older.path.display(),
                newer.path.display()
            );
            // Never leave older on disk without newer
            fs::remove_file(&older.path)?;
            fs::remove_file(&newer.path)?;
            return Ok(None);
        }

        // Header range spans both inputs
        let smallest = std::cmp::min(&older.smallest_key, &newer.smallest_key);
        let largest = std::cmp::max(&older.largest_key, &newer.largest_key);

        let mut builder = SSTableBuilder::new(&newer.path, merged.len() as u32, smallest, largest)?;
        for entry in &merged {
            builder.add(&entry.key, &entry.value, entry.live)?;
        }
        let table = builder.finish()?;
        fs::remove_file(&older.path)?;

        tracing::debug!(
            "Merged {} + {} into {} ({} entries)",
            older.path.display(),
            newer.path.display(),
            table.path.display(),
            table.entry_count
        );

        Ok(Some(table))
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Snapshot of the loaded tables, oldest first
    pub fn tables(&self) -> Vec<SSTable> {
        self.tables.read().clone()
    }

    /// Get the SSTable directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// One compaction pass over the (write-locked) table list
    ///
    /// Pairs (0,1), (2,3), ... are merged; an odd last table is kept as is
    /// and stays newest. Only the oldest pair may drop tombstones.
    fn compact_locked(tables: &mut Vec<SSTable>) -> Result<()> {
        if tables.len() < 2 {
            return Ok(());
        }

        let before = tables.len();
        let old = std::mem::take(tables);
        let mut pending = old.into_iter();
        let mut pair_index = 0;

        while let Some(older) = pending.next() {
            let newer = match pending.next() {
                Some(newer) => newer,
                None => {
                    tables.push(older);
                    break;
                }
            };

            match Self::merge(&older, &newer, pair_index == 0) {
                Ok(Some(table)) => tables.push(table),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Compaction stopped: {}", e);
                    // The merge may have rewritten or removed its inputs
                    tables.extend(Self::reload(older));
                    tables.extend(Self::reload(newer));
                    tables.extend(pending);
                    return Err(e);
                }
            }
            pair_index += 1;
        }

        tracing::info!("Compacted {} SSTables into {}", before, tables.len());
        Ok(())
    }

    /// Metadata for whatever a failed merge left at `table.path`
    ///
    /// Returns `None` if the file is gone. A file that no longer opens keeps
    /// its old metadata so lookups reaching it still report the damage.
    fn reload(table: SSTable) -> Option<SSTable> {
        if !table.path.exists() {
            tracing::warn!("SSTable {} was removed before compaction failed", table.path.display());
            return None;
        }
        match SSTableReader::open(&table.path) {
            Ok(reader) => Some(reader.into_table()),
            Err(e) => {
                tracing::error!("SSTable {} is unreadable: {}", table.path.display(), e);
                Some(table)
            }
        }
    }

    /// Read every entry of a table, validating its checksum first
    fn read_all(table: &SSTable) -> Result<Vec<SSTableEntry>> {
        let mut reader = SSTableReader::open(&table.path)?;
        let entries = reader.iter()?.collect::<Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Generate the file path for an SSTable with given ID
    fn sstable_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("sstable_{:06}.sst", id))
    }

    /// Parse SSTable ID from filename
    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let id_str = name.strip_prefix("sstable_")?;
        id_str.parse().ok()
    }
}
