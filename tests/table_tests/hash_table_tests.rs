//! Tests for HashTable
//!
//! These tests verify:
//! - Creating and reopening the .dir/.pag file pair
//! - Put/get/delete with chained buckets
//! - Slot reuse after delete
//! - Chain-order scans with TableCursor
//! - Recovery from torn and unlinked slots, and corruption detection

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use cdvault::config::Config;
use cdvault::table::{HashTable, TableCursor, TableHeader, TableLayout, HEADER_SIZE};
use cdvault::VaultError;
use tempfile::TempDir;

const KEY_SIZE: usize = 8;
const VALUE_SIZE: usize = 16;

// =============================================================================
// Helper Functions
// =============================================================================

fn layout() -> TableLayout {
    TableLayout::new(KEY_SIZE, VALUE_SIZE)
}

fn config(temp_dir: &TempDir, buckets: u32) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .bucket_count(buckets)
        .build()
}

fn setup_temp_table(buckets: u32) -> (TempDir, PathBuf, HashTable) {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("table");
    let table = HashTable::open(&base, layout(), &config(&temp_dir, buckets)).unwrap();
    (temp_dir, base, table)
}

fn key(n: u32) -> Vec<u8> {
    let mut k = format!("k{}", n).into_bytes();
    k.resize(KEY_SIZE, 0);
    k
}

fn value(n: u32) -> Vec<u8> {
    let mut v = format!("value-{}", n).into_bytes();
    v.resize(VALUE_SIZE, 0);
    v
}

// =============================================================================
// Open/Create Tests
// =============================================================================

#[test]
fn test_open_creates_both_files() {
    let (_temp, base, table) = setup_temp_table(4);
    let (dir_path, pag_path) = HashTable::file_paths(&base);

    assert!(dir_path.exists());
    assert!(pag_path.exists());
    assert_eq!(fs::metadata(&dir_path).unwrap().len(), HEADER_SIZE + 4 * 8);
    assert_eq!(fs::metadata(&pag_path).unwrap().len(), HEADER_SIZE);
    assert_eq!(table.bucket_count(), 4);
    assert!(table.is_empty());
}

#[test]
fn test_file_paths_use_dbm_extensions() {
    let (dir_path, pag_path) = HashTable::file_paths(&PathBuf::from("/tmp/cdc_data"));

    assert_eq!(dir_path, PathBuf::from("/tmp/cdc_data.dir"));
    assert_eq!(pag_path, PathBuf::from("/tmp/cdc_data.pag"));
}

#[test]
fn test_header_is_eighteen_bytes() {
    let header = TableHeader::new(b"CDDR", layout(), 4);
    let mut bytes = Vec::new();
    header.write_to(&mut bytes).unwrap();

    assert_eq!(bytes.len() as u64, HEADER_SIZE);
    assert_eq!(&bytes[..4], b"CDDR");
}

#[cfg(unix)]
#[test]
fn test_files_created_with_configured_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("table");
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .file_mode(0o600)
        .build();
    let _table = HashTable::open(&base, layout(), &config).unwrap();

    let (dir_path, pag_path) = HashTable::file_paths(&base);
    for path in [dir_path, pag_path] {
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}

// =============================================================================
// Record Operation Tests
// =============================================================================

#[test]
fn test_put_get() {
    let (_temp, _base, mut table) = setup_temp_table(4);

    table.put(&key(1), &value(1)).unwrap();

    assert_eq!(table.get(&key(1)).unwrap(), Some(value(1)));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_get_missing_key() {
    let (_temp, _base, mut table) = setup_temp_table(4);

    assert_eq!(table.get(&key(1)).unwrap(), None);
}

#[test]
fn test_put_replaces_value() {
    let (_temp, _base, mut table) = setup_temp_table(4);

    table.put(&key(1), &value(1)).unwrap();
    table.put(&key(1), &value(2)).unwrap();

    assert_eq!(table.get(&key(1)).unwrap(), Some(value(2)));
    assert_eq!(table.len(), 1);
    assert_eq!(table.slot_count(), 1);
}

#[test]
fn test_delete() {
    let (_temp, _base, mut table) = setup_temp_table(4);

    table.put(&key(1), &value(1)).unwrap();
    table.delete(&key(1)).unwrap();

    assert_eq!(table.get(&key(1)).unwrap(), None);
    assert!(table.is_empty());
}

#[test]
fn test_delete_missing_key() {
    let (_temp, _base, mut table) = setup_temp_table(4);
    table.put(&key(1), &value(1)).unwrap();

    let result = table.delete(&key(2));

    assert!(matches!(result, Err(VaultError::KeyNotFound)));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_wrong_key_size() {
    let (_temp, _base, mut table) = setup_temp_table(4);

    assert!(matches!(table.get(b"short"), Err(VaultError::InvalidArgument(_))));
    assert!(matches!(
        table.put(b"short", &value(1)),
        Err(VaultError::InvalidArgument(_))
    ));
}

#[test]
fn test_wrong_value_size() {
    let (_temp, _base, mut table) = setup_temp_table(4);

    let result = table.put(&key(1), b"tiny");

    assert!(matches!(result, Err(VaultError::InvalidArgument(_))));
    assert!(table.is_empty());
}

#[test]
fn test_single_bucket_chain() {
    let (_temp, _base, mut table) = setup_temp_table(1);

    for n in 0..10 {
        table.put(&key(n), &value(n)).unwrap();
    }

    // Unlink from the middle, head and tail of the chain
    table.delete(&key(5)).unwrap();
    table.delete(&key(9)).unwrap();
    table.delete(&key(0)).unwrap();

    for n in 0..10 {
        let expected = if [0, 5, 9].contains(&n) { None } else { Some(value(n)) };
        assert_eq!(table.get(&key(n)).unwrap(), expected, "key {}", n);
    }
    assert_eq!(table.len(), 7);
}

#[test]
fn test_freed_slots_are_reused() {
    let (_temp, _base, mut table) = setup_temp_table(4);

    for n in 0..3 {
        table.put(&key(n), &value(n)).unwrap();
    }
    table.delete(&key(1)).unwrap();
    table.put(&key(7), &value(7)).unwrap();

    assert_eq!(table.slot_count(), 3);
    assert_eq!(table.len(), 3);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_preserves_records() {
    let (temp, base, mut table) = setup_temp_table(8);
    for n in 0..20 {
        table.put(&key(n), &value(n)).unwrap();
    }
    table.delete(&key(3)).unwrap();
    table.sync().unwrap();
    drop(table);

    let mut table = HashTable::open(&base, layout(), &config(&temp, 8)).unwrap();

    assert_eq!(table.len(), 19);
    assert_eq!(table.get(&key(3)).unwrap(), None);
    assert_eq!(table.get(&key(12)).unwrap(), Some(value(12)));
}

#[test]
fn test_reopen_keeps_stored_bucket_count() {
    let (temp, base, table) = setup_temp_table(8);
    drop(table);

    let table = HashTable::open(&base, layout(), &config(&temp, 64)).unwrap();

    assert_eq!(table.bucket_count(), 8);
}

#[test]
fn test_reopen_with_different_layout() {
    let (temp, base, table) = setup_temp_table(4);
    drop(table);

    let result = HashTable::open(&base, TableLayout::new(KEY_SIZE, 32), &config(&temp, 4));

    assert!(matches!(result, Err(VaultError::Corruption(_))));
}

#[test]
fn test_missing_page_file() {
    let (temp, base, table) = setup_temp_table(4);
    drop(table);
    let (_, pag_path) = HashTable::file_paths(&base);
    fs::remove_file(&pag_path).unwrap();

    let result = HashTable::open(&base, layout(), &config(&temp, 4));

    assert!(matches!(result, Err(VaultError::Corruption(_))));
}

#[test]
fn test_zero_length_files_open_as_new_table() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("table");
    let (dir_path, pag_path) = HashTable::file_paths(&base);
    fs::write(&dir_path, b"").unwrap();
    fs::write(&pag_path, b"").unwrap();

    let mut table = HashTable::open(&base, layout(), &config(&temp, 4)).unwrap();
    table.put(&key(1), &value(1)).unwrap();
    drop(table);

    let mut table = HashTable::open(&base, layout(), &config(&temp, 4)).unwrap();
    assert_eq!(table.get(&key(1)).unwrap(), Some(value(1)));
    assert_eq!(fs::metadata(&dir_path).unwrap().len(), HEADER_SIZE + 4 * 8);
}

#[test]
fn test_page_header_without_directory_opens_as_new_table() {
    let (temp, base, table) = setup_temp_table(4);
    drop(table);

    // Left behind when a create stops before the directory is in place
    let (dir_path, _) = HashTable::file_paths(&base);
    fs::remove_file(&dir_path).unwrap();

    let table = HashTable::open(&base, layout(), &config(&temp, 8)).unwrap();

    assert!(table.is_empty());
    assert_eq!(table.bucket_count(), 8);
    assert!(dir_path.exists());
}

#[test]
fn test_remove_files() {
    let (_temp, base, table) = setup_temp_table(4);
    drop(table);

    HashTable::remove_files(&base).unwrap();
    // Removing again is not an error
    HashTable::remove_files(&base).unwrap();

    let (dir_path, pag_path) = HashTable::file_paths(&base);
    assert!(!dir_path.exists());
    assert!(!pag_path.exists());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_torn_trailing_slot_is_truncated() {
    let (temp, base, mut table) = setup_temp_table(4);
    table.put(&key(1), &value(1)).unwrap();
    table.put(&key(2), &value(2)).unwrap();
    drop(table);

    let (_, pag_path) = HashTable::file_paths(&base);
    let full_len = fs::metadata(&pag_path).unwrap().len();
    let mut file = OpenOptions::new().append(true).open(&pag_path).unwrap();
    file.write_all(&[1, 2, 3, 4, 5]).unwrap();
    drop(file);

    let mut table = HashTable::open(&base, layout(), &config(&temp, 4)).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.get(&key(2)).unwrap(), Some(value(2)));
    assert_eq!(fs::metadata(&pag_path).unwrap().len(), full_len);
}

#[test]
fn test_unlinked_slot_is_reclaimed() {
    let (temp, base, mut table) = setup_temp_table(1);
    table.put(&key(1), &value(1)).unwrap();
    drop(table);

    // Reset the only bucket head, as if the crash hit before the link
    let (dir_path, _) = HashTable::file_paths(&base);
    let mut dir = OpenOptions::new().write(true).open(&dir_path).unwrap();
    dir.seek(SeekFrom::Start(HEADER_SIZE)).unwrap();
    dir.write_all(&u64::MAX.to_le_bytes()).unwrap();
    drop(dir);

    let mut table = HashTable::open(&base, layout(), &config(&temp, 1)).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.get(&key(1)).unwrap(), None);

    table.put(&key(2), &value(2)).unwrap();
    assert_eq!(table.slot_count(), 1);
}

#[test]
fn test_corrupted_slot_is_detected() {
    let (temp, base, mut table) = setup_temp_table(4);
    table.put(&key(1), &value(1)).unwrap();
    drop(table);

    // Flip a byte inside the first slot's value
    let (_, pag_path) = HashTable::file_paths(&base);
    let mut pag = OpenOptions::new().write(true).open(&pag_path).unwrap();
    pag.seek(SeekFrom::Start(HEADER_SIZE + 1 + 8 + KEY_SIZE as u64 + 2))
        .unwrap();
    pag.write_all(&[0xAA]).unwrap();
    drop(pag);

    let result = HashTable::open(&base, layout(), &config(&temp, 4));

    assert!(matches!(result, Err(VaultError::Corruption(_))));
}

#[test]
fn test_bad_magic_is_detected() {
    let (temp, base, table) = setup_temp_table(4);
    drop(table);

    let (dir_path, _) = HashTable::file_paths(&base);
    let mut dir = OpenOptions::new().write(true).open(&dir_path).unwrap();
    dir.write_all(b"XXXX").unwrap();
    drop(dir);

    let result = HashTable::open(&base, layout(), &config(&temp, 4));

    assert!(matches!(result, Err(VaultError::Corruption(_))));
}

#[test]
fn test_oversized_bucket_count_is_detected() {
    let (temp, base, table) = setup_temp_table(4);
    drop(table);

    // Claim u32::MAX buckets in both headers
    let (dir_path, pag_path) = HashTable::file_paths(&base);
    for path in [&dir_path, &pag_path] {
        let mut file = OpenOptions::new().write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(14)).unwrap();
        file.write_all(&u32::MAX.to_le_bytes()).unwrap();
    }

    let result = HashTable::open(&base, layout(), &config(&temp, 4));

    assert!(matches!(result, Err(VaultError::Corruption(_))));
}

#[test]
fn test_truncated_directory_is_detected() {
    let (temp, base, table) = setup_temp_table(4);
    drop(table);

    let (dir_path, _) = HashTable::file_paths(&base);
    let dir = OpenOptions::new().write(true).open(&dir_path).unwrap();
    dir.set_len(HEADER_SIZE + 8).unwrap();
    drop(dir);

    let result = HashTable::open(&base, layout(), &config(&temp, 4));

    assert!(matches!(result, Err(VaultError::Corruption(_))));
}

#[test]
fn test_directory_shorter_than_header_is_detected() {
    let (temp, base, mut table) = setup_temp_table(4);
    table.put(&key(1), &value(1)).unwrap();
    drop(table);

    let (dir_path, _) = HashTable::file_paths(&base);
    fs::write(&dir_path, b"CDDR").unwrap();

    let result = HashTable::open(&base, layout(), &config(&temp, 4));

    assert!(matches!(result, Err(VaultError::Corruption(_))));
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_returns_every_key_once() {
    let (_temp, _base, mut table) = setup_temp_table(4);
    for n in 0..25 {
        table.put(&key(n), &value(n)).unwrap();
    }

    let mut cursor = TableCursor::new();
    let mut seen = HashSet::new();
    while let Some(entry) = table.advance(&mut cursor).unwrap() {
        assert!(seen.insert(entry.key.clone()), "duplicate key in scan");
        assert_eq!(entry.value.len(), VALUE_SIZE);
    }

    assert_eq!(seen.len(), 25);
    assert!(cursor.is_exhausted());
}

#[test]
fn test_scan_empty_table() {
    let (_temp, _base, mut table) = setup_temp_table(4);

    let mut cursor = TableCursor::new();

    assert_eq!(table.advance(&mut cursor).unwrap(), None);
    assert!(cursor.is_exhausted());
}

#[test]
fn test_exhausted_cursor_stays_exhausted() {
    let (_temp, _base, mut table) = setup_temp_table(4);
    table.put(&key(1), &value(1)).unwrap();

    let mut cursor = TableCursor::new();
    assert!(table.advance(&mut cursor).unwrap().is_some());
    assert!(table.advance(&mut cursor).unwrap().is_none());

    table.put(&key(2), &value(2)).unwrap();
    assert!(table.advance(&mut cursor).unwrap().is_none());
}

#[test]
fn test_independent_cursors() {
    let (_temp, _base, mut table) = setup_temp_table(2);
    for n in 0..6 {
        table.put(&key(n), &value(n)).unwrap();
    }

    let mut a = TableCursor::new();
    let mut b = TableCursor::new();

    let first_a = table.advance(&mut a).unwrap().unwrap();
    let first_b = table.advance(&mut b).unwrap().unwrap();
    assert_eq!(first_a, first_b);

    let mut count_a = 1;
    while table.advance(&mut a).unwrap().is_some() {
        count_a += 1;
    }
    let mut count_b = 1;
    while table.advance(&mut b).unwrap().is_some() {
        count_b += 1;
    }
    assert_eq!(count_a, 6);
    assert_eq!(count_b, 6);
}
