//! SSTable Iterator
//!
//! Sequential iteration over all entries in an SSTable.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::{BurrowError, Result};

use super::reader::corrupt;
use super::{SSTableEntry, MARKER_LIVE, MARKER_TOMBSTONE};

/// Iterator over SSTable entries in sorted key order
pub struct SSTableIterator<'a> {
    file: &'a mut BufReader<File>,
    path: PathBuf,
    /// Entries left to read
    remaining: u32,
    /// Set after the first error; iteration stops there
    failed: bool,
}

impl<'a> SSTableIterator<'a> {
    /// Create a new iterator starting from the data block
    pub(super) fn new(
        file: &'a mut BufReader<File>,
        path: PathBuf,
        data_offset: u64,
        entry_count: u32,
    ) -> Result<Self> {
        file.seek(SeekFrom::Start(data_offset))?;
        Ok(Self {
            file,
            path,
            remaining: entry_count,
            failed: false,
        })
    }
}

impl<'a> Iterator for SSTableIterator<'a> {
    type Item = Result<SSTableEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.failed {
            return None;
        }

        match read_entry(&mut *self.file, &self.path) {
            Ok(entry) => {
                self.remaining -= 1;
                Some(Ok(entry))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.failed { 0 } else { self.remaining as usize };
        (0, Some(n))
    }
}

/// Decode one `[marker:2][keyLen:4][key][valueLen:4][value]` record
pub(super) fn read_entry<R: Read>(reader: &mut R, path: &Path) -> Result<SSTableEntry> {
    let marker = codec::read_u16(reader).map_err(corrupt(path, "entry marker"))?;
    let live = match marker {
        MARKER_LIVE => true,
        MARKER_TOMBSTONE => false,
        other => {
            return Err(BurrowError::Corrupt(format!(
                "{}: invalid entry marker {}",
                path.display(),
                other
            )))
        }
    };
    let key = codec::read_bytes(reader).map_err(corrupt(path, "entry key"))?;
    let value = codec::read_bytes(reader).map_err(corrupt(path, "entry value"))?;

    Ok(SSTableEntry { key, value, live })
}
