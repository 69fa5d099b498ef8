//! SSTable Builder
//!
//! Writes sorted entries to a new SSTable file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::{BurrowError, Result};
use crate::memtable::IndexEntry;

use super::{SSTable, CHECKSUM_SIZE, FIXED_HEADER_SIZE, MAGIC, MARKER_LIVE, MARKER_TOMBSTONE, VERSION};

/// Builder for creating new SSTables from sorted entries
///
/// The header needs the entry count and key range up front, so both are
/// passed to [`new`](Self::new). Output goes to `<path>.tmp` and is renamed
/// into place by [`finish`](Self::finish) once fsynced.
pub struct SSTableBuilder {
    /// Final file path
    path: PathBuf,
    /// Path written while building
    tmp_path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Running CRC over every byte written so far
    hasher: crc32fast::Hasher,
    /// Metadata promised by the header
    entry_count: u32,
    smallest_key: Vec<u8>,
    largest_key: Vec<u8>,
    /// Progress
    entries_written: u32,
    bytes_written: u64,
    last_key: Option<Vec<u8>>,
}

impl SSTableBuilder {
    /// Create a new SSTable builder
    ///
    /// Writes the header immediately; call `add()` in strictly ascending key
    /// order exactly `entry_count` times, then `finish()`.
    pub fn new(path: &Path, entry_count: u32, smallest_key: &[u8], largest_key: &[u8]) -> Result<Self> {
        if smallest_key > largest_key {
            return Err(BurrowError::Storage(format!(
                "smallest key {:?} sorts after largest key {:?}",
                String::from_utf8_lossy(smallest_key),
                String::from_utf8_lossy(largest_key)
            )));
        }

        let tmp_path = tmp_path_for(path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut builder = Self {
            path: path.to_path_buf(),
            tmp_path,
            writer: BufWriter::new(file),
            hasher: crc32fast::Hasher::new(),
            entry_count,
            smallest_key: smallest_key.to_vec(),
            largest_key: largest_key.to_vec(),
            entries_written: 0,
            bytes_written: 0,
            last_key: None,
        };

        let mut header =
            Vec::with_capacity(FIXED_HEADER_SIZE as usize + smallest_key.len() + largest_key.len());
        header.extend_from_slice(&codec::encode_u32(MAGIC));
        header.extend_from_slice(&codec::encode_u32(entry_count));
        codec::put_bytes(&mut header, smallest_key);
        codec::put_bytes(&mut header, largest_key);
        header.extend_from_slice(&codec::encode_u16(VERSION));
        builder.write_hashed(&header)?;

        Ok(builder)
    }

    /// Write a whole SSTable from already sorted index entries
    pub fn write_entries<'a, I>(path: &Path, entries: I) -> Result<SSTable>
    where
        I: IntoIterator<Item = &'a IndexEntry>,
    {
        let entries: Vec<&IndexEntry> = entries.into_iter().collect();
        let (first, last) = match (entries.first(), entries.last()) {
            (Some(first), Some(last)) => (first.key(), last.key()),
            _ => {
                return Err(BurrowError::Storage(
                    "Cannot write an SSTable with no entries".to_string(),
                ))
            }
        };

        let mut builder = Self::new(path, entries.len() as u32, first, last)?;
        for entry in &entries {
            builder.add(entry.key(), entry.value(), entry.is_live())?;
        }
        builder.finish()
    }

    /// Add one entry (must be called in strictly ascending key order)
    pub fn add(&mut self, key: &[u8], value: &[u8], live: bool) -> Result<()> {
        if self.entries_written >= self.entry_count {
            return Err(BurrowError::Storage(format!(
                "SSTable header declares {} entries, got more",
                self.entry_count
            )));
        }
        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return Err(BurrowError::Storage(format!(
                    "SSTable keys out of order: {:?} after {:?}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(last)
                )));
            }
        }
        if key < self.smallest_key.as_slice() || key > self.largest_key.as_slice() {
            return Err(BurrowError::Storage(format!(
                "key {:?} outside the declared SSTable range",
                String::from_utf8_lossy(key)
            )));
        }

        let marker = if live { MARKER_LIVE } else { MARKER_TOMBSTONE };
        let mut record = Vec::with_capacity(2 + 4 + key.len() + 4 + value.len());
        record.extend_from_slice(&codec::encode_u16(marker));
        codec::put_bytes(&mut record, key);
        codec::put_bytes(&mut record, value);
        self.write_hashed(&record)?;

        self.entries_written += 1;
        self.last_key = Some(key.to_vec());
        Ok(())
    }

    /// Finish building: write the checksum, sync, move into place
    pub fn finish(mut self) -> Result<SSTable> {
        if self.entries_written != self.entry_count {
            return Err(BurrowError::Storage(format!(
                "SSTable header declares {} entries, wrote {}",
                self.entry_count, self.entries_written
            )));
        }

        let checksum = self.hasher.clone().finalize();
        self.writer.write_all(&codec::encode_u32(checksum))?;
        self.writer.flush()?;

        let file = self.writer.into_inner().map_err(|e| {
            BurrowError::Storage(format!("Failed to flush SSTable: {}", e))
        })?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.tmp_path, &self.path)?;

        Ok(SSTable {
            path: self.path,
            data_offset: FIXED_HEADER_SIZE
                + self.smallest_key.len() as u64
                + self.largest_key.len() as u64,
            smallest_key: self.smallest_key,
            largest_key: self.largest_key,
            entry_count: self.entry_count,
            version: VERSION,
            checksum,
            file_size: self.bytes_written + CHECKSUM_SIZE,
        })
    }

    fn write_hashed(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.hasher.update(bytes);
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

/// Temporary path used while an SSTable is being written
pub(crate) fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
