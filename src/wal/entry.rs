//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::io::Cursor;

use crate::codec;
use crate::error::{BurrowError, Result};

/// Literal token appended after every successful flush
///
/// Everything before the last watermark is already durable in an SSTable.
pub const WATERMARK: &[u8; 9] = b"WATERMARK";

/// Fixed bytes per entry: command (4) + key length (4) + value length (4)
pub const HEADER_SIZE: usize = 12;

/// Mutation recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Set,
    Delete,
}

impl Command {
    /// On-disk tag: Set = 0, Delete = 1
    pub fn tag(self) -> u32 {
        match self {
            Command::Set => 0,
            Command::Delete => 1,
        }
    }

    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(Command::Set),
            1 => Ok(Command::Delete),
            other => Err(BurrowError::WalCorruption(format!(
                "invalid command tag {:#010x}",
                other
            ))),
        }
    }
}

/// A single entry in the WAL
///
/// Layout: `[command:4][keyLen:4][key][valueLen:4][value]`, integers
/// big-endian. Delete entries carry an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    pub command: Command,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl WalEntry {
    pub fn set(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            command: Command::Set,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self {
            command: Command::Delete,
            key: key.into(),
            value: Vec::new(),
        }
    }

    /// Key must be non-empty; a Set must also carry a non-empty value
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(BurrowError::Validation("empty key".to_string()));
        }
        if self.command == Command::Set && self.value.is_empty() {
            return Err(BurrowError::Validation(
                "empty value for set".to_string(),
            ));
        }
        Ok(())
    }

    /// Size of this entry on disk
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }

    /// Validate and encode into the on-disk layout
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&codec::encode_u32(self.command.tag()));
        codec::put_bytes(&mut buf, &self.key);
        codec::put_bytes(&mut buf, &self.value);
        Ok(buf)
    }

    /// Decode one entry that occupies exactly `bytes`
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let tag = codec::read_u32(&mut cursor).map_err(truncated("command"))?;
        let entry = Self::read_body(Command::from_tag(tag)?, &mut cursor)?;

        if cursor.position() as usize != bytes.len() {
            return Err(BurrowError::WalCorruption(format!(
                "{} trailing bytes after entry",
                bytes.len() - cursor.position() as usize
            )));
        }
        Ok(entry)
    }

    /// Read key and value once the command tag has been consumed
    pub(super) fn read_body<R: std::io::Read>(command: Command, reader: &mut R) -> Result<Self> {
        let key = codec::read_bytes(reader).map_err(truncated("key"))?;
        let value = codec::read_bytes(reader).map_err(truncated("value"))?;
        Ok(Self {
            command,
            key,
            value,
        })
    }
}

/// Map a short read to `WalCorruption`, keep other I/O errors as-is
pub(super) fn truncated(field: &'static str) -> impl Fn(std::io::Error) -> BurrowError {
    move |e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            BurrowError::WalCorruption(format!("truncated entry: incomplete {}", field))
        } else {
            BurrowError::Io(e)
        }
    }
}
