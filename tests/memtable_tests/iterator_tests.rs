//! MemTable Iterator Tests
//!
//! Tests verify:
//! - In-order traversal, tombstones included
//! - has_next / next_entry / restart
//! - Exhaustion error

use burrowkv::memtable::MemTable;
use burrowkv::BurrowError;

fn sample_table() -> MemTable {
    let mut memtable = MemTable::new();
    for key in ["d", "b", "f", "a", "c", "e", "g"] {
        memtable.set(key.as_bytes().to_vec(), key.to_uppercase().into_bytes());
    }
    memtable
}

#[test]
fn test_empty_iterator() {
    let memtable = MemTable::new();
    let mut iter = memtable.iter();

    assert!(!iter.has_next());
    assert!(matches!(iter.next_entry(), Err(BurrowError::IteratorExhausted)));
    assert!(iter.next().is_none());
}

#[test]
fn test_next_entry_walks_in_order() {
    let memtable = sample_table();
    let mut iter = memtable.iter();

    let mut keys = Vec::new();
    while iter.has_next() {
        let entry = iter.next_entry().unwrap();
        keys.push(String::from_utf8(entry.key().to_vec()).unwrap());
    }

    assert_eq!(keys, vec!["a", "b", "c", "d", "e", "f", "g"]);
    assert!(matches!(iter.next_entry(), Err(BurrowError::IteratorExhausted)));
}

#[test]
fn test_values_follow_keys() {
    let memtable = sample_table();

    for entry in memtable.iter() {
        assert_eq!(entry.value(), entry.key().to_ascii_uppercase().as_slice());
    }
}

#[test]
fn test_iterator_yields_tombstones() {
    let mut memtable = sample_table();
    memtable.delete(b"c").unwrap();
    memtable.delete(b"f").unwrap();

    let dead: Vec<&[u8]> = memtable
        .iter()
        .filter(|e| !e.is_live())
        .map(|e| e.key())
        .collect();

    assert_eq!(memtable.iter().count(), 7);
    assert_eq!(dead, vec![&b"c"[..], &b"f"[..]]);
}

#[test]
fn test_restart_rewinds() {
    let memtable = sample_table();
    let mut iter = memtable.iter();

    iter.next_entry().unwrap();
    iter.next_entry().unwrap();
    iter.next_entry().unwrap();
    iter.restart();

    assert!(iter.has_next());
    assert_eq!(iter.next_entry().unwrap().key(), b"a");
}

#[test]
fn test_restart_after_exhaustion() {
    let memtable = sample_table();
    let mut iter = memtable.iter();

    assert_eq!(iter.by_ref().count(), 7);
    assert!(!iter.has_next());

    iter.restart();
    assert_eq!(iter.count(), 7);
}

#[test]
fn test_single_entry() {
    let mut memtable = MemTable::new();
    memtable.set(b"only".to_vec(), b"one".to_vec());

    let mut iter = memtable.iter();
    assert!(iter.has_next());
    assert_eq!(iter.next_entry().unwrap().value(), b"one");
    assert!(!iter.has_next());
}
