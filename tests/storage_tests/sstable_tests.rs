//! Tests for SSTable
//!
//! These tests verify:
//! - Header and entry byte layout
//! - Point lookups: live, tombstone, miss, early exit
//! - Sequential iteration
//! - Checksum and magic validation
//! - Builder contract (ordering, declared count, temp file)

use std::fs;
use std::path::PathBuf;

use burrowkv::memtable::MemTable;
use burrowkv::storage::sstable::{MAGIC, VERSION};
use burrowkv::storage::{SSTableBuilder, SSTableReader};
use burrowkv::BurrowError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sstable_000001.sst");
    (temp_dir, path)
}

/// a=1, b=(tombstone), c=3, ... in ascending order
fn sample_memtable() -> MemTable {
    let mut memtable = MemTable::new();
    memtable.set(b"apple".to_vec(), b"red".to_vec());
    memtable.set(b"banana".to_vec(), b"yellow".to_vec());
    memtable.set(b"cherry".to_vec(), b"dark".to_vec());
    memtable.set(b"grape".to_vec(), b"green".to_vec());
    memtable.delete(b"banana").unwrap();
    memtable
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_file_layout() {
    let (_temp, path) = setup_temp_dir();
    let mut builder = SSTableBuilder::new(&path, 2, b"a", b"b").unwrap();
    builder.add(b"a", b"1", true).unwrap();
    builder.add(b"b", b"2", false).unwrap();
    let table = builder.finish().unwrap();

    let bytes = fs::read(&path).unwrap();
    let mut expected: Vec<u8> = Vec::new();
    expected.extend(MAGIC.to_be_bytes());
    expected.extend(2u32.to_be_bytes());
    expected.extend([0, 0, 0, 1, b'a']);
    expected.extend([0, 0, 0, 1, b'b']);
    expected.extend(VERSION.to_be_bytes());
    expected.extend([0, 1, 0, 0, 0, 1, b'a', 0, 0, 0, 1, b'1']);
    expected.extend([0, 0, 0, 0, 0, 1, b'b', 0, 0, 0, 1, b'2']);
    let crc = crc32fast::hash(&expected);
    expected.extend(crc.to_be_bytes());

    assert_eq!(bytes, expected);
    assert_eq!(&bytes[..4], &[0x00, 0x00, 0x04, 0xD2]);
    assert_eq!(table.checksum, crc);
    assert_eq!(table.file_size, bytes.len() as u64);
    assert_eq!(table.data_offset, 18 + 2);
}

#[test]
fn test_write_entries_from_memtable() {
    let (_temp, path) = setup_temp_dir();
    let memtable = sample_memtable();

    let table = SSTableBuilder::write_entries(&path, memtable.iter()).unwrap();

    assert_eq!(table.entry_count(), 4);
    assert_eq!(table.smallest_key, b"apple");
    assert_eq!(table.largest_key, b"grape");
    assert!(path.exists());
}

#[test]
fn test_write_entries_empty_fails() {
    let (_temp, path) = setup_temp_dir();
    let memtable = MemTable::new();

    let result = SSTableBuilder::write_entries(&path, memtable.iter());
    assert!(matches!(result, Err(BurrowError::Storage(_))));
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_get_live_tombstone_and_miss() {
    let (_temp, path) = setup_temp_dir();
    SSTableBuilder::write_entries(&path, sample_memtable().iter()).unwrap();

    let mut reader = SSTableReader::open(&path).unwrap();

    assert_eq!(reader.get(b"apple").unwrap(), b"red");
    assert_eq!(reader.get(b"grape").unwrap(), b"green");
    assert!(matches!(reader.get(b"banana"), Err(BurrowError::Deleted)));
    // Inside the range, stops at "cherry"
    assert!(matches!(reader.get(b"blueberry"), Err(BurrowError::KeyNotFound)));
    // Outside the range
    assert!(matches!(reader.get(b"aaa"), Err(BurrowError::KeyNotFound)));
    assert!(matches!(reader.get(b"zucchini"), Err(BurrowError::KeyNotFound)));
}

#[test]
fn test_for_table_reopens_without_full_check() {
    let (_temp, path) = setup_temp_dir();
    let table = SSTableBuilder::write_entries(&path, sample_memtable().iter()).unwrap();

    let mut reader = SSTableReader::for_table(&table).unwrap();
    assert_eq!(reader.get(b"cherry").unwrap(), b"dark");
    assert_eq!(reader.table(), &table);
}

#[test]
fn test_many_entries() {
    let (_temp, path) = setup_temp_dir();
    let mut memtable = MemTable::new();
    for i in 0..2_000 {
        memtable.set(format!("key_{:05}", i).into_bytes(), format!("v{}", i).into_bytes());
    }
    SSTableBuilder::write_entries(&path, memtable.iter()).unwrap();

    let mut reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.get(b"key_00000").unwrap(), b"v0");
    assert_eq!(reader.get(b"key_01234").unwrap(), b"v1234");
    assert_eq!(reader.get(b"key_01999").unwrap(), b"v1999");
    assert!(matches!(reader.get(b"key_00500x"), Err(BurrowError::KeyNotFound)));
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iterator_returns_all_in_order() {
    let (_temp, path) = setup_temp_dir();
    let memtable = sample_memtable();
    SSTableBuilder::write_entries(&path, memtable.iter()).unwrap();

    let mut reader = SSTableReader::open(&path).unwrap();
    let entries: Vec<_> = reader.iter().unwrap().map(|e| e.unwrap()).collect();

    let expected: Vec<_> = memtable
        .iter()
        .map(|e| (e.key().to_vec(), e.value().to_vec(), e.is_live()))
        .collect();
    let actual: Vec<_> = entries
        .into_iter()
        .map(|e| (e.key, e.value, e.live))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_iterator_after_get() {
    let (_temp, path) = setup_temp_dir();
    SSTableBuilder::write_entries(&path, sample_memtable().iter()).unwrap();

    let mut reader = SSTableReader::open(&path).unwrap();
    reader.get(b"grape").unwrap();

    assert_eq!(reader.iter().unwrap().count(), 4);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_verify_checksum() {
    let (_temp, path) = setup_temp_dir();
    let table = SSTableBuilder::write_entries(&path, sample_memtable().iter()).unwrap();

    assert_eq!(SSTableReader::verify_checksum(&path).unwrap(), table.checksum);
}

#[test]
fn test_flipped_byte_fails_checksum() {
    let (_temp, path) = setup_temp_dir();
    SSTableBuilder::write_entries(&path, sample_memtable().iter()).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(SSTableReader::open(&path), Err(BurrowError::Corrupt(_))));
    assert!(matches!(SSTableReader::verify_checksum(&path), Err(BurrowError::Corrupt(_))));
}

#[test]
fn test_bad_magic() {
    let (_temp, path) = setup_temp_dir();
    SSTableBuilder::write_entries(&path, sample_memtable().iter()).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[3] = 0xD3;
    fs::write(&path, &bytes).unwrap();

    let err = SSTableReader::open(&path).err().unwrap();
    assert!(matches!(err, BurrowError::Corrupt(ref msg) if msg.contains("magic")));
}

#[test]
fn test_file_too_small() {
    let (_temp, path) = setup_temp_dir();
    fs::write(&path, [0, 0, 4, 0xD2]).unwrap();

    assert!(matches!(SSTableReader::open(&path), Err(BurrowError::Corrupt(_))));
}

#[test]
fn test_for_table_detects_replaced_file() {
    let (_temp, path) = setup_temp_dir();
    let table = SSTableBuilder::write_entries(&path, sample_memtable().iter()).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes.truncate(bytes.len() - 6);
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(SSTableReader::for_table(&table), Err(BurrowError::Corrupt(_))));
}

// =============================================================================
// Builder Contract Tests
// =============================================================================

#[test]
fn test_builder_rejects_unsorted_keys() {
    let (_temp, path) = setup_temp_dir();
    let mut builder = SSTableBuilder::new(&path, 2, b"a", b"z").unwrap();
    builder.add(b"m", b"1", true).unwrap();

    assert!(matches!(builder.add(b"c", b"2", true), Err(BurrowError::Storage(_))));
    assert!(matches!(builder.add(b"m", b"2", true), Err(BurrowError::Storage(_))));
}

#[test]
fn test_builder_rejects_key_outside_range() {
    let (_temp, path) = setup_temp_dir();
    let mut builder = SSTableBuilder::new(&path, 1, b"b", b"d").unwrap();

    assert!(matches!(builder.add(b"e", b"1", true), Err(BurrowError::Storage(_))));
}

#[test]
fn test_builder_count_mismatch() {
    let (_temp, path) = setup_temp_dir();
    let mut builder = SSTableBuilder::new(&path, 2, b"a", b"b").unwrap();
    builder.add(b"a", b"1", true).unwrap();

    assert!(matches!(builder.finish(), Err(BurrowError::Storage(_))));
    assert!(!path.exists());
}

#[test]
fn test_builder_writes_via_temp_file() {
    let (temp, path) = setup_temp_dir();
    let mut builder = SSTableBuilder::new(&path, 1, b"a", b"a").unwrap();
    builder.add(b"a", b"1", true).unwrap();

    // Not visible under the final name until finish()
    assert!(!path.exists());
    builder.finish().unwrap();
    assert!(path.exists());

    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|name| name.to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
