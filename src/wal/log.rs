//! Write-Ahead Log handle
//!
//! The shared, thread-safe face of the WAL used by the engine.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::WalSyncStrategy;
use crate::error::Result;
use crate::memtable::MemTable;

use super::{RecoveryResult, WalEntry, WalRecovery, WalWriter};

/// Append-only durability log
///
/// A single mutex serializes appends, so on-disk order always matches the
/// order in which callers were admitted.
pub struct Wal {
    path: PathBuf,
    writer: Mutex<WalWriter>,
}

impl Wal {
    /// Open or create the log at `path`
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let writer = WalWriter::open(path, sync_strategy)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
        })
    }

    /// Append one Set or Delete entry
    ///
    /// Rejects an empty key, or an empty value on Set, before any I/O.
    pub fn append(&self, entry: &WalEntry) -> Result<()> {
        entry.validate()?;
        self.writer.lock().append(entry)
    }

    /// Mark everything written so far as flushed
    pub fn watermark(&self) -> Result<()> {
        self.writer.lock().watermark()
    }

    /// Offset of the last watermark, if one exists
    pub fn find_last_watermark_position(&self) -> Result<Option<u64>> {
        let _writer = self.writer.lock();
        WalRecovery::find_last_watermark_position(&self.path)
    }

    /// Replay the entries written since the last watermark onto `index`
    pub fn recover(&self, index: &mut MemTable) -> Result<RecoveryResult> {
        let _writer = self.writer.lock();
        WalRecovery::recover(&self.path, index)
    }

    pub fn sync(&self) -> Result<()> {
        self.writer.lock().sync()
    }

    /// Empty the log file; not part of the flush path
    pub fn truncate(&self) -> Result<()> {
        self.writer.lock().truncate()
    }

    /// CRC32 of the whole file, for diagnostics
    pub fn checksum(&self) -> Result<u32> {
        let _writer = self.writer.lock();
        WalRecovery::checksum(&self.path)
    }

    /// Current file length in bytes
    pub fn len(&self) -> Result<u64> {
        self.writer.lock().len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.writer.lock().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
