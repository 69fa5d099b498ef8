//! Configuration for burrowkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{BurrowError, Result};

/// Main configuration for a burrowkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files (WAL, SSTables)
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── sstables/        (SSTable files)
    pub data_dir: PathBuf,

    /// Explicit WAL location; `None` means `{data_dir}/wal.log`
    pub wal_path: Option<PathBuf>,

    /// Explicit SSTable directory; `None` means `{data_dir}/sstables`
    pub sstable_dir: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Flush / Compaction Configuration
    // -------------------------------------------------------------------------
    /// Index entry count (tombstones included) that triggers a flush
    pub flush_threshold: usize,

    /// SSTable count that triggers a compaction pass
    pub compaction_threshold: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./burrow_data"),
            wal_path: None,
            sstable_dir: None,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            flush_threshold: 500,
            compaction_threshold: 4,
        }
    }
}

impl Config {
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolved WAL file path
    pub fn wal_path(&self) -> PathBuf {
        self.wal_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(Self::WAL_FILENAME))
    }

    /// Resolved SSTable directory
    pub fn sstable_dir(&self) -> PathBuf {
        self.sstable_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(Self::SSTABLE_DIR))
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.flush_threshold == 0 {
            return Err(BurrowError::Config(
                "flush_threshold must be at least 1".to_string(),
            ));
        }
        if self.compaction_threshold < 2 {
            return Err(BurrowError::Config(format!(
                "compaction_threshold must be at least 2, got {}",
                self.compaction_threshold
            )));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(BurrowError::Config(
                "WAL sync interval must be at least 1 entry".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Override the WAL file location
    pub fn wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_path = Some(path.into());
        self
    }

    /// Override the SSTable directory
    pub fn sstable_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.sstable_dir = Some(path.into());
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the index entry count that triggers a flush
    pub fn flush_threshold(mut self, entries: usize) -> Self {
        self.config.flush_threshold = entries;
        self
    }

    /// Set the SSTable count that triggers compaction
    pub fn compaction_threshold(mut self, tables: usize) -> Self {
        self.config.compaction_threshold = tables;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
