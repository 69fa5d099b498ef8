//! WAL Recovery
//!
//! Rebuilds the in-memory index from the entries written since the last
//! successful flush.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{BurrowError, Result};
use crate::memtable::MemTable;

use super::reader::{find_last_watermark, WalReader, WalRecord};
use super::{Command, WalEntry};

/// Handles WAL replay after a restart or crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Entries applied to the index
    pub entries_replayed: u64,

    /// Start of the watermark replay began after, if any
    pub watermark_offset: Option<u64>,

    /// Deletes that found nothing to delete in the rebuilt index
    pub replay_errors: u64,
}

impl WalRecovery {
    /// Replay the tail of the WAL onto `index`
    ///
    /// 1. Walk the log from the start, recording where each watermark sits
    /// 2. Keep only the entries after the last one (all of them if none)
    /// 3. Apply Set as `index.set`, Delete as `index.delete`
    ///
    /// A missing WAL file is an empty log. A truncated or malformed entry
    /// aborts recovery with `WalCorruption` before the index is touched.
    pub fn recover(path: &Path, index: &mut MemTable) -> Result<RecoveryResult> {
        let (entries, watermark_offset) = Self::read_tail(path)?;

        let mut result = RecoveryResult {
            watermark_offset,
            ..Default::default()
        };

        for entry in entries {
            match entry.command {
                Command::Set => index.set(entry.key, entry.value),
                Command::Delete => {
                    if let Err(e) = index.delete(&entry.key) {
                        tracing::debug!(
                            "WAL replay: delete of {:?} skipped ({})",
                            String::from_utf8_lossy(&entry.key),
                            e
                        );
                        result.replay_errors += 1;
                        continue;
                    }
                }
            }
            result.entries_replayed += 1;
        }

        Ok(result)
    }

    /// Check that the replayable tail parses, without applying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (entries, watermark_offset) = Self::read_tail(path)?;
        Ok(RecoveryResult {
            entries_replayed: entries.len() as u64,
            watermark_offset,
            replay_errors: 0,
        })
    }

    /// Offset of the last watermark in the file, if any
    ///
    /// Only tokens at record boundaries count; see [`WalReader::last_watermark`].
    pub fn find_last_watermark_position(path: &Path) -> Result<Option<u64>> {
        if !path.exists() {
            return Ok(None);
        }
        let mut file = File::open(path)?;
        find_last_watermark(&mut file)
    }

    /// CRC32 (IEEE) of the whole WAL file
    ///
    /// Diagnostic only: appends and replay do not maintain or check it.
    pub fn checksum(path: &Path) -> Result<u32> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = crc32fast::Hasher::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
        }
        Ok(hasher.finalize())
    }

    /// Parse every entry after the last watermark
    fn read_tail(path: &Path) -> Result<(Vec<WalEntry>, Option<u64>)> {
        if !path.exists() {
            return Ok((Vec::new(), None));
        }

        let mut watermark = None;
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        loop {
            match reader.next_record() {
                Ok(Some(WalRecord::Entry(entry))) => entries.push(entry),
                // Everything before a watermark is already in an SSTable
                Ok(Some(WalRecord::Watermark { offset })) => {
                    entries.clear();
                    watermark = Some(offset);
                }
                Ok(None) => break,
                Err(e @ BurrowError::WalCorruption(_)) => {
                    tracing::error!(
                        "WAL {} is corrupt at offset {}: {}",
                        path.display(),
                        reader.position(),
                        e
                    );
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok((entries, watermark))
    }
}
