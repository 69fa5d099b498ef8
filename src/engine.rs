//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Route get/set/delete through the layers, newest data first
//! - Trigger flushes when the index reaches the configured size
//! - Replay the WAL on startup

use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{BurrowError, Result};
use crate::memtable::{IndexEntry, MemTable};
use crate::storage::StorageManager;
use crate::wal::{Wal, WalEntry};

/// The main storage engine
///
/// ## Concurrency Model: one coarse lock
///
/// - **Writes** (set/delete/flush/compact) take `index` exclusively; the
///   WAL append, the index mutation and any triggered flush all happen
///   under that one guard
/// - **Reads** (get) share `index` and keep holding it while falling back
///   to the SSTables, so a flush can never run between the two lookups
/// - The WAL and the storage manager carry their own internal locks
///   (Mutex and RwLock) for callers that use them directly
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// In-memory index for recent writes
    index: RwLock<MemTable>,

    /// Write-ahead log for durability
    wal: Wal,

    /// Persistent storage manager
    storage: StorageManager,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config, create directories
    /// 2. Load existing SSTables (damaged files are skipped)
    /// 3. Replay WAL entries written after the last watermark
    /// 4. Flush straight away if replay filled the index
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Open storage manager (loads existing SSTables)
        let storage = StorageManager::open(&config.sstable_dir(), config.compaction_threshold)?;

        // Step 3: Open WAL and rebuild the index from its tail
        let wal = Wal::open(&config.wal_path(), config.wal_sync_strategy)?;
        let mut index = MemTable::new();
        let recovery = wal.recover(&mut index)?;

        if recovery.entries_replayed > 0 || recovery.replay_errors > 0 {
            tracing::info!(
                "WAL recovery: {} entries replayed, {} skipped, watermark at {:?}",
                recovery.entries_replayed,
                recovery.replay_errors,
                recovery.watermark_offset
            );
        }

        let engine = Self {
            config,
            index: RwLock::new(index),
            wal,
            storage,
        };

        // Step 4: Recovered entries count toward the flush threshold
        {
            let mut index = engine.index.write();
            if index.len() >= engine.config.flush_threshold {
                tracing::info!("Flushing {} recovered entries", index.len());
                engine.flush_locked(&mut index)?;
            }
        }

        tracing::info!(
            "Engine opened at {} ({} SSTables, {} entries in memory)",
            engine.config.data_dir.display(),
            engine.storage.sstable_count(),
            engine.memtable_len()
        );

        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. Index (most recent writes); a tombstone there ends the search
    /// 2. SSTables (newest to oldest)
    ///
    /// Returns `Ok(None)` for keys that are absent or deleted.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let index = self.index.read();

        match index.get(key) {
            Ok(value) => return Ok(Some(value.to_vec())),
            Err(BurrowError::Deleted) => return Ok(None),
            Err(BurrowError::KeyNotFound) => {}
            Err(e) => return Err(e),
        }

        match self.storage.search(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_miss() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a key-value pair
    ///
    /// Steps:
    /// 1. Acquire the index write lock
    /// 2. Append to WAL (rejects empty key or value before any I/O)
    /// 3. Write to the index
    /// 4. Flush if the index reached the threshold
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut index = self.index.write();

        let entry = WalEntry::set(key.to_vec(), value.to_vec());
        self.wal.append(&entry)?;
        index.set(entry.key, entry.value);

        self.maybe_flush(&mut index)
    }

    /// Delete a key
    ///
    /// - Empty key: `KeyNotFound`, since `set` never stores one
    /// - Live in the index: log a Delete and tombstone it
    /// - Tombstoned in the index: `KeyNotFound`
    /// - Absent from the index: if the SSTables hold it live, log a Set of
    ///   the stored value followed by a Delete, and insert it as a
    ///   tombstone; otherwise `KeyNotFound`
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(BurrowError::KeyNotFound);
        }

        let mut index = self.index.write();

        match index.entry(key).map(IndexEntry::is_live) {
            Some(true) => {
                self.wal.append(&WalEntry::delete(key.to_vec()))?;
                index.delete(key)?;
            }
            Some(false) => return Err(BurrowError::KeyNotFound),
            None => {
                let value = match self.storage.search(key) {
                    Ok(value) => value,
                    Err(e) if e.is_miss() => return Err(BurrowError::KeyNotFound),
                    Err(e) => return Err(e),
                };

                // Replay must rebuild the tombstone without the SSTables
                self.wal.append(&WalEntry::set(key.to_vec(), value.clone()))?;
                self.wal.append(&WalEntry::delete(key.to_vec()))?;
                index.set_as_deleted(key.to_vec(), value);
            }
        }

        self.maybe_flush(&mut index)
    }

    /// Flush the index to disk (public API)
    ///
    /// Forces a flush regardless of index size; no-op when empty
    pub fn flush(&self) -> Result<()> {
        let mut index = self.index.write();
        if index.is_empty() {
            return Ok(());
        }
        self.flush_locked(&mut index)
    }

    /// Run one compaction pass regardless of the table count
    ///
    /// Returns the number of SSTables afterwards.
    pub fn compact(&self) -> Result<usize> {
        let _index = self.index.write();
        self.storage.compact()
    }

    /// Close the engine gracefully
    ///
    /// Flushes any pending data and syncs the WAL
    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.wal.sync()?;
        tracing::info!("Engine at {} closed", self.config.data_dir.display());
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of entries (tombstones included) in the index
    pub fn memtable_len(&self) -> usize {
        self.index.read().len()
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    /// Ascending copy of the index, tombstones included
    pub fn dump(&self) -> Vec<IndexEntry> {
        self.index.read().iter().cloned().collect()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn wal(&self) -> &Wal {
        &self.wal
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn maybe_flush(&self, index: &mut MemTable) -> Result<()> {
        if index.len() >= self.config.flush_threshold {
            self.flush_locked(index)?;
        }
        Ok(())
    }

    /// Flush sequence (called with the index write lock held)
    ///
    /// SSTable first, then clear the index, then the watermark. A crash
    /// before the watermark only means the same entries replay again.
    fn flush_locked(&self, index: &mut MemTable) -> Result<()> {
        let table = self.storage.flush(index)?;
        let flushed = index.len();
        index.reinitialize();
        self.wal.watermark()?;

        tracing::debug!(
            "Flushed {} entries to {} ({} SSTables)",
            flushed,
            table.path.display(),
            self.storage.sstable_count()
        );
        Ok(())
    }
}
