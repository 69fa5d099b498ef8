//! WAL Writer
//!
//! Handles appending entries and watermarks to the WAL file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::Result;

use super::{WalEntry, WATERMARK};

/// Writes entries to the WAL file
///
/// Not synchronized on its own; [`Wal`](super::Wal) puts it behind a mutex.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    sync_strategy: WalSyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
    /// Entries appended through this writer
    entries_written: u64,
}

impl WalWriter {
    /// Open or create a WAL file; writes always go to the end
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_strategy,
            unsynced: 0,
            entries_written: 0,
        })
    }

    /// Validate, encode and append one entry
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        let bytes = entry.serialize()?;
        self.file.write_all(&bytes)?;
        self.entries_written += 1;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Append the watermark token; always synced
    pub fn watermark(&mut self) -> Result<()> {
        self.file.write_all(WATERMARK)?;
        self.sync()
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Discard the whole log
    ///
    /// The engine never calls this; the watermark bounds replay instead.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Current file length in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
