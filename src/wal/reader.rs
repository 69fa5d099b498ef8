//! WAL Reader
//!
//! Handles reading entries and watermarks from the WAL file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::codec;
use crate::error::{BurrowError, Result};

use super::entry::truncated;
use super::{Command, WalEntry, WATERMARK};

/// One item in the log: an entry or a flush watermark
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    Entry(WalEntry),
    /// Watermark starting at `offset`
    Watermark { offset: u64 },
}

/// Reads records sequentially from the WAL file
pub struct WalReader<R = File> {
    reader: BufReader<R>,
    position: u64,
}

impl WalReader<File> {
    /// Open a WAL file for reading from the start
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read + Seek> WalReader<R> {
    /// Continue reading from `offset`
    ///
    /// `offset` must be a record boundary; anything else reads garbage.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        Ok(())
    }
}

impl<R: Read> WalReader<R> {
    /// Read records from any byte source, starting at offset 0
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            position: 0,
        }
    }

    /// Current byte offset
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next record
    ///
    /// Returns `Ok(None)` at a clean end of file. A record cut short by the
    /// end of file is `WalCorruption`, never silently dropped.
    pub fn next_record(&mut self) -> Result<Option<WalRecord>> {
        let offset = self.position;
        let tag = match codec::try_read_u32(&mut self.reader) {
            Ok(None) => return Ok(None),
            Ok(Some(tag)) => tag,
            Err(e) => return Err(truncated("command")(e)),
        };

        // Command tags are 0 or 1, so a leading "WATE" can only be a watermark
        if codec::encode_u32(tag)[..] == WATERMARK[..codec::U32_SIZE] {
            let mut rest = [0u8; 5];
            self.reader
                .read_exact(&mut rest)
                .map_err(truncated("watermark"))?;
            if rest[..] != WATERMARK[codec::U32_SIZE..] {
                return Err(BurrowError::WalCorruption(format!(
                    "invalid command tag {:#010x} at offset {}",
                    tag, offset
                )));
            }
            self.position += WATERMARK.len() as u64;
            return Ok(Some(WalRecord::Watermark { offset }));
        }

        let entry = WalEntry::read_body(Command::from_tag(tag)?, &mut self.reader)?;
        self.position += entry.encoded_len() as u64;
        Ok(Some(WalRecord::Entry(entry)))
    }

    /// Read the next entry, stepping over watermarks
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        loop {
            match self.next_record()? {
                Some(WalRecord::Entry(entry)) => return Ok(Some(entry)),
                Some(WalRecord::Watermark { .. }) => continue,
                None => return Ok(None),
            }
        }
    }

    /// Walk the remaining records and return the start of the last watermark
    ///
    /// Tokens are only recognised where a record begins, so a key or value
    /// that happens to contain `WATERMARK` is never mistaken for one.
    pub fn last_watermark(&mut self) -> Result<Option<u64>> {
        let mut last = None;
        while let Some(record) = self.next_record()? {
            if let WalRecord::Watermark { offset } = record {
                last = Some(offset);
            }
        }
        Ok(last)
    }

    /// Iterate over the remaining entries
    pub fn entries(self) -> WalIterator<R> {
        WalIterator {
            reader: self,
            failed: false,
        }
    }
}

/// Iterator over WAL entries; ends after the first error
pub struct WalIterator<R = File> {
    reader: WalReader<R>,
    failed: bool,
}

impl<R: Read> Iterator for WalIterator<R> {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Offset of the last watermark in a complete log
///
/// The log is parsed from the start, so every record before the watermark
/// must be intact. Damage anywhere is `WalCorruption`.
pub fn find_last_watermark<F: Read>(file: F) -> Result<Option<u64>> {
    WalReader::from_reader(file).last_watermark()
}
