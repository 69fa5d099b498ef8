//! SSTable Reader
//!
//! Opens SSTable files, validates them and answers point lookups with a
//! linear scan of the sorted data block.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::codec;
use crate::error::{BurrowError, Result};

use super::iterator::{read_entry, SSTableIterator};
use super::{SSTable, CHECKSUM_SIZE, FIXED_HEADER_SIZE, MAGIC, VERSION};

/// Reader over one SSTable file
pub struct SSTableReader {
    /// File handle for reading entries
    pub(super) file: BufReader<File>,
    /// Parsed header and file facts
    table: SSTable,
}

impl SSTableReader {
    /// Open and fully validate an SSTable
    ///
    /// Checks the magic number and the trailing CRC32 before parsing the
    /// header. Any mismatch or short file is reported as `Corrupt`.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < FIXED_HEADER_SIZE + CHECKSUM_SIZE {
            return Err(BurrowError::Corrupt(format!(
                "{}: {} bytes is too small for an SSTable",
                path.display(),
                file_size
            )));
        }

        // Magic first, so foreign files get a clearer error than a bad CRC
        let magic = codec::read_u32(&mut file).map_err(corrupt(path, "magic"))?;
        if magic != MAGIC {
            return Err(BurrowError::Corrupt(format!(
                "{}: invalid magic {}, expected {}",
                path.display(),
                magic,
                MAGIC
            )));
        }

        file.seek(SeekFrom::Start(0))?;
        let checksum = validate_checksum(&mut file, file_size, path)?;

        file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(file);
        let table = read_header(&mut reader, path, file_size, checksum)?;

        Ok(Self {
            file: reader,
            table,
        })
    }

    /// Reopen a table that was validated when it was loaded or written
    ///
    /// Only the magic number and file size are rechecked; entry decoding
    /// still reports damage as `Corrupt`.
    pub fn for_table(table: &SSTable) -> Result<Self> {
        let mut file = File::open(&table.path)?;
        let file_size = file.metadata()?.len();
        if file_size != table.file_size {
            return Err(BurrowError::Corrupt(format!(
                "{}: size changed from {} to {} bytes",
                table.path.display(),
                table.file_size,
                file_size
            )));
        }

        let magic = codec::read_u32(&mut file).map_err(corrupt(&table.path, "magic"))?;
        if magic != MAGIC {
            return Err(BurrowError::Corrupt(format!(
                "{}: invalid magic {}, expected {}",
                table.path.display(),
                magic,
                MAGIC
            )));
        }

        Ok(Self {
            file: BufReader::new(file),
            table: table.clone(),
        })
    }

    /// Recompute the CRC32 of `path` and compare it with the stored one
    pub fn verify_checksum(path: &Path) -> Result<u32> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        if file_size < CHECKSUM_SIZE {
            return Err(BurrowError::Corrupt(format!(
                "{}: no room for a checksum",
                path.display()
            )));
        }
        validate_checksum(&mut file, file_size, path)
    }

    pub fn table(&self) -> &SSTable {
        &self.table
    }

    pub fn into_table(self) -> SSTable {
        self.table
    }

    /// Point lookup
    ///
    /// - `Ok(value)`: live entry
    /// - `Err(Deleted)`: tombstone
    /// - `Err(KeyNotFound)`: not in this table
    ///
    /// The scan stops as soon as a stored key sorts after `key`.
    pub fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        if !self.table.might_contain(key) {
            return Err(BurrowError::KeyNotFound);
        }

        self.file.seek(SeekFrom::Start(self.table.data_offset))?;
        for _ in 0..self.table.entry_count {
            let entry = read_entry(&mut self.file, &self.table.path)?;
            match entry.key.as_slice().cmp(key) {
                std::cmp::Ordering::Less => continue,
                std::cmp::Ordering::Equal if entry.live => return Ok(entry.value),
                std::cmp::Ordering::Equal => return Err(BurrowError::Deleted),
                std::cmp::Ordering::Greater => break,
            }
        }

        Err(BurrowError::KeyNotFound)
    }

    /// Iterate over all entries in key order, tombstones included
    pub fn iter(&mut self) -> Result<SSTableIterator<'_>> {
        SSTableIterator::new(
            &mut self.file,
            self.table.path.clone(),
            self.table.data_offset,
            self.table.entry_count,
        )
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Map a short read while decoding `what` to a corruption error
pub(super) fn corrupt<'a>(path: &'a Path, what: &'a str) -> impl Fn(io::Error) -> BurrowError + 'a {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            BurrowError::Corrupt(format!("{}: truncated {}", path.display(), what))
        } else {
            BurrowError::Io(e)
        }
    }
}

/// Stream every byte but the last four through CRC32 and compare
fn validate_checksum(file: &mut File, file_size: u64, path: &Path) -> Result<u32> {
    let body_len = file_size - CHECKSUM_SIZE;
    let computed = {
        let mut body = BufReader::new(&mut *file).take(body_len);
        let mut hasher = crc32fast::Hasher::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = body.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
        }
        hasher.finalize()
    };

    file.seek(SeekFrom::Start(body_len))?;
    let stored = codec::read_u32(file).map_err(corrupt(path, "checksum"))?;
    if stored != computed {
        return Err(BurrowError::Corrupt(format!(
            "{}: checksum mismatch (stored {:#010x}, computed {:#010x})",
            path.display(),
            stored,
            computed
        )));
    }
    Ok(stored)
}

/// Parse the header; the reader must be positioned at offset 0
fn read_header<R: Read>(reader: &mut R, path: &Path, file_size: u64, checksum: u32) -> Result<SSTable> {
    let magic = codec::read_u32(reader).map_err(corrupt(path, "magic"))?;
    if magic != MAGIC {
        return Err(BurrowError::Corrupt(format!(
            "{}: invalid magic {}",
            path.display(),
            magic
        )));
    }
    let entry_count = codec::read_u32(reader).map_err(corrupt(path, "entry count"))?;
    let smallest_key = codec::read_bytes(reader).map_err(corrupt(path, "smallest key"))?;
    let largest_key = codec::read_bytes(reader).map_err(corrupt(path, "largest key"))?;
    let version = codec::read_u16(reader).map_err(corrupt(path, "version"))?;

    if version != VERSION {
        return Err(BurrowError::Corrupt(format!(
            "{}: unsupported version {}",
            path.display(),
            version
        )));
    }
    if smallest_key > largest_key {
        return Err(BurrowError::Corrupt(format!(
            "{}: smallest key sorts after largest key",
            path.display()
        )));
    }

    let data_offset = FIXED_HEADER_SIZE + smallest_key.len() as u64 + largest_key.len() as u64;
    if data_offset + CHECKSUM_SIZE > file_size {
        return Err(BurrowError::Corrupt(format!(
            "{}: header runs past the end of the file",
            path.display()
        )));
    }

    Ok(SSTable {
        path: path.to_path_buf(),
        smallest_key,
        largest_key,
        entry_count,
        version,
        checksum,
        data_offset,
        file_size,
    })
}
