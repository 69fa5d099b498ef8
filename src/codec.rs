//! Fixed-width integer codec
//!
//! Every on-disk structure (WAL entries, SSTable headers and records) stores
//! integers through this module: 4-byte big-endian for lengths, counts and
//! the magic number, 2-byte big-endian for markers and the format version.
//! There are no variable-length or signed encodings anywhere in the formats.

use std::io::{self, Read};

use bytes::{Buf, BufMut};

/// Width of the 4-byte integer form
pub const U32_SIZE: usize = 4;

/// Width of the 2-byte integer form
pub const U16_SIZE: usize = 2;

/// Encode a `u32` as 4 big-endian bytes
pub fn encode_u32(value: u32) -> [u8; U32_SIZE] {
    let mut out = [0u8; U32_SIZE];
    (&mut out[..]).put_u32(value);
    out
}

/// Decode the first 4 bytes of `src` as a big-endian `u32`
///
/// Returns `None` if fewer than 4 bytes are available.
pub fn decode_u32(mut src: &[u8]) -> Option<u32> {
    if src.remaining() < U32_SIZE {
        return None;
    }
    Some(src.get_u32())
}

/// Encode a `u16` as 2 big-endian bytes
pub fn encode_u16(value: u16) -> [u8; U16_SIZE] {
    let mut out = [0u8; U16_SIZE];
    (&mut out[..]).put_u16(value);
    out
}

/// Decode the first 2 bytes of `src` as a big-endian `u16`
pub fn decode_u16(mut src: &[u8]) -> Option<u16> {
    if src.remaining() < U16_SIZE {
        return None;
    }
    Some(src.get_u16())
}

/// Append a length-prefixed byte string: `[len:4][bytes]`
pub fn put_bytes(buf: &mut impl BufMut, bytes: &[u8]) {
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

/// Read a big-endian `u32` from a reader
pub fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut raw = [0u8; U32_SIZE];
    reader.read_exact(&mut raw)?;
    Ok(u32::from_be_bytes(raw))
}

/// Read a big-endian `u16` from a reader
pub fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut raw = [0u8; U16_SIZE];
    reader.read_exact(&mut raw)?;
    Ok(u16::from_be_bytes(raw))
}

/// Read a big-endian `u32`, distinguishing a clean end of stream
///
/// - `Ok(None)`: the reader was already at EOF (zero bytes available)
/// - `Err(UnexpectedEof)`: between 1 and 3 bytes were available
pub fn try_read_u32<R: Read>(reader: &mut R) -> io::Result<Option<u32>> {
    let mut raw = [0u8; U32_SIZE];
    let mut filled = 0;
    while filled < U32_SIZE {
        match reader.read(&mut raw[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    match filled {
        0 => Ok(None),
        U32_SIZE => Ok(Some(u32::from_be_bytes(raw))),
        _ => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("partial integer: {} of {} bytes", filled, U32_SIZE),
        )),
    }
}

/// Read a `[len:4][bytes]` string from a reader
///
/// The payload is read incrementally, so a corrupt length prefix cannot
/// force a huge up-front allocation.
pub fn read_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let len = read_u32(reader)? as u64;
    let mut out = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut out)?;
    if (out.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, found {}", len, out.len()),
        ));
    }
    Ok(out)
}
