//! Tests for WAL Reader
//!
//! These tests verify:
//! - Sequential reading of entries and watermarks
//! - Clean EOF vs truncated tail
//! - Watermark lookup at record boundaries, including tokens embedded in data

use std::fs::{self, OpenOptions};
use std::io::{Cursor, Write};
use std::path::PathBuf;

use burrowkv::config::WalSyncStrategy;
use burrowkv::wal::{find_last_watermark, WalEntry, WalReader, WalRecord, WalWriter, WATERMARK};
use burrowkv::BurrowError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("wal.log");
    (temp_dir, wal_path)
}

fn writer(path: &PathBuf) -> WalWriter {
    WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap()
}

fn set_bytes(key: &[u8], value: &[u8]) -> Vec<u8> {
    WalEntry::set(key.to_vec(), value.to_vec()).serialize().unwrap()
}

// =============================================================================
// Sequential Read Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    writer(&wal_path);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.next_record().unwrap(), None);
}

#[test]
fn test_read_entries_and_watermarks() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut w = writer(&wal_path);
    let first = WalEntry::set(b"a".to_vec(), b"1".to_vec());
    let second = WalEntry::delete(b"a".to_vec());
    w.append(&first).unwrap();
    w.watermark().unwrap();
    w.append(&second).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.next_record().unwrap(), Some(WalRecord::Entry(first.clone())));
    assert_eq!(
        reader.next_record().unwrap(),
        Some(WalRecord::Watermark {
            offset: first.encoded_len() as u64
        })
    );
    assert_eq!(reader.next_record().unwrap(), Some(WalRecord::Entry(second)));
    assert_eq!(reader.next_record().unwrap(), None);
    assert_eq!(reader.position(), fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_next_entry_skips_watermarks() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut w = writer(&wal_path);
    w.watermark().unwrap();
    w.append(&WalEntry::set(b"x".to_vec(), b"1".to_vec())).unwrap();
    w.watermark().unwrap();
    w.watermark().unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.next_entry().unwrap().unwrap().key, b"x");
    assert!(reader.next_entry().unwrap().is_none());
}

#[test]
fn test_seek_to_offset() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut w = writer(&wal_path);
    let first = WalEntry::set(b"a".to_vec(), b"1".to_vec());
    w.append(&first).unwrap();
    w.append(&WalEntry::set(b"b".to_vec(), b"2".to_vec())).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    reader.seek_to(first.encoded_len() as u64).unwrap();
    assert_eq!(reader.next_entry().unwrap().unwrap().key, b"b");
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_truncated_tail_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut w = writer(&wal_path);
    w.append(&WalEntry::set(b"a".to_vec(), b"1".to_vec())).unwrap();
    w.append(&WalEntry::set(b"bbbb".to_vec(), b"2222".to_vec())).unwrap();

    let len = fs::metadata(&wal_path).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(&wal_path)
        .unwrap()
        .set_len(len - 3)
        .unwrap();

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(BurrowError::WalCorruption(_))));
}

#[test]
fn test_partial_command_tag_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut w = writer(&wal_path);
    w.append(&WalEntry::set(b"a".to_vec(), b"1".to_vec())).unwrap();
    drop(w);

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0, 0]).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_record().unwrap().is_some());
    assert!(matches!(reader.next_record(), Err(BurrowError::WalCorruption(_))));
}

#[test]
fn test_partial_watermark_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, b"WATERM").unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(matches!(reader.next_record(), Err(BurrowError::WalCorruption(_))));
}

#[test]
fn test_garbage_tag_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, [0, 0, 0, 5, 0, 0, 0, 1, b'k', 0, 0, 0, 0]).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(matches!(reader.next_record(), Err(BurrowError::WalCorruption(_))));
}

// =============================================================================
// Watermark Lookup Tests
// =============================================================================

#[test]
fn test_find_last_watermark_none() {
    let mut log = Vec::new();
    log.extend(WalEntry::set(b"a".to_vec(), b"1".to_vec()).serialize().unwrap());

    assert_eq!(find_last_watermark(&mut Cursor::new(log)).unwrap(), None);
    assert_eq!(find_last_watermark(&mut Cursor::new(Vec::new())).unwrap(), None);
}

#[test]
fn test_find_last_watermark_picks_latest() {
    let entry = WalEntry::set(b"a".to_vec(), b"1".to_vec()).serialize().unwrap();
    let mut log = Vec::new();
    log.extend(&entry);
    log.extend(WATERMARK);
    log.extend(&entry);
    let last = log.len() as u64;
    log.extend(WATERMARK);
    log.extend(&entry);

    assert_eq!(find_last_watermark(&mut Cursor::new(log)).unwrap(), Some(last));
}

#[test]
fn test_find_last_watermark_at_end_of_file() {
    let mut log = WalEntry::delete(b"z".to_vec()).serialize().unwrap();
    let offset = log.len() as u64;
    log.extend(WATERMARK);

    assert_eq!(find_last_watermark(&mut Cursor::new(log)).unwrap(), Some(offset));
}

#[test]
fn test_watermark_inside_value_is_ignored() {
    let mut log = Vec::new();
    log.extend(WATERMARK);
    log.extend(set_bytes(b"k", b"xxWATERMARKyy"));
    log.extend(set_bytes(b"k2", b"v"));

    assert_eq!(find_last_watermark(&mut Cursor::new(log)).unwrap(), Some(0));
}

#[test]
fn test_key_ending_in_watermark_is_ignored() {
    let mut log = set_bytes(b"a", b"1");
    // Followed by the value length, whose first byte is 0x00
    log.extend(set_bytes(b"kWATERMARK", b"v"));

    assert_eq!(find_last_watermark(&mut Cursor::new(log)).unwrap(), None);
}

#[test]
fn test_value_ending_in_watermark_mid_log_is_ignored() {
    let mut log = set_bytes(b"a", b"1");
    let real = log.len() as u64;
    log.extend(WATERMARK);
    // Followed by the next command tag, whose first byte is 0x00
    log.extend(set_bytes(b"b", b"xWATERMARK"));
    log.extend(set_bytes(b"c", b"3"));

    assert_eq!(find_last_watermark(&mut Cursor::new(log)).unwrap(), Some(real));
}

#[test]
fn test_value_ending_in_watermark_at_end_of_file_is_ignored() {
    let mut log = set_bytes(b"a", b"1");
    log.extend(set_bytes(b"b", b"WATERMARK"));

    assert_eq!(find_last_watermark(&mut Cursor::new(log)).unwrap(), None);
}

#[test]
fn test_find_last_watermark_in_large_log() {
    let entry = set_bytes(b"key", &[b'v'; 1000]);
    let mut log = Vec::new();
    log.extend(WATERMARK);
    for _ in 0..200 {
        log.extend(&entry);
    }

    assert_eq!(find_last_watermark(&mut Cursor::new(log)).unwrap(), Some(0));
}

#[test]
fn test_find_last_watermark_rejects_damaged_prefix() {
    let mut log = vec![0xFF, 0xFF, 0xFF];
    log.extend(WATERMARK);

    assert!(matches!(
        find_last_watermark(&mut Cursor::new(log)),
        Err(BurrowError::WalCorruption(_))
    ));
}

#[test]
fn test_last_watermark_from_reader() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut w = writer(&wal_path);
    w.append(&WalEntry::set(b"a".to_vec(), b"WATERMARK".to_vec())).unwrap();
    w.watermark().unwrap();
    w.append(&WalEntry::set(b"bWATERMARK".to_vec(), b"2".to_vec())).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(
        reader.last_watermark().unwrap(),
        Some(WalEntry::set(b"a".to_vec(), b"WATERMARK".to_vec()).encoded_len() as u64)
    );
    assert_eq!(reader.position(), fs::metadata(&wal_path).unwrap().len());
}
