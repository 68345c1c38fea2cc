//! Tests for maintenance operations
//!
//! These tests verify:
//! - Age-based deletion (explicit threshold and the 62-day rule)
//! - Clearing a store
//! - Merging stores and store files
//! - Invariants and capacity after every bulk operation

use std::fs;
use std::path::Path;
use std::sync::Arc;

use lrustore::store::UNTOUCHED_LIMIT_SECS;
use lrustore::{fingerprint, LruError, LruStore, ManualClock};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const START: u32 = 1_700_000_000;

fn open_store(path: &Path, value_size: usize, capacity: usize, clock: &ManualClock) -> LruStore {
    let mut store = LruStore::create_with_params(path, value_size, capacity, 0).unwrap();
    store.set_clock(Arc::new(clock.clone()));
    store
}

fn setup_store(capacity: usize) -> (TempDir, LruStore, ManualClock) {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let store = open_store(&temp_dir.path().join("lru.db"), 4, capacity, &clock);
    (temp_dir, store, clock)
}

/// Insert `key` with the clock pinned to `at`
fn insert_at(store: &mut LruStore, clock: &ManualClock, key: &str, value: &[u8], at: u32) {
    clock.set(at);
    store.insert(key, value).unwrap();
}

fn values(store: &LruStore) -> Vec<String> {
    store
        .get_all_values()
        .into_iter()
        .map(|v| String::from_utf8(v).unwrap())
        .collect()
}

// =============================================================================
// GetAllValues Tests
// =============================================================================

#[test]
fn test_get_all_values_empty_store() {
    let (_temp, store, _clock) = setup_store(4);

    assert!(store.get_all_values().is_empty());
    assert!(store.entries().is_empty());
}

#[test]
fn test_entries_match_values_order() {
    let (_temp, mut store, clock) = setup_store(4);
    insert_at(&mut store, &clock, "a", b"AAAA", START);
    insert_at(&mut store, &clock, "b", b"BBBB", START + 1);

    let entries = store.entries();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].value, b"BBBB");
    assert_eq!(entries[0].last_access_time, START + 1);
    assert_eq!(entries[1].value, b"AAAA");
    assert_eq!(entries[1].fingerprint, lrustore::fingerprint("a", 0));
}

// =============================================================================
// DeleteElementsBefore Tests
// =============================================================================

#[test]
fn test_delete_elements_before_removes_exact_set() {
    let (_temp, mut store, clock) = setup_store(8);
    insert_at(&mut store, &clock, "a", b"AAAA", START);
    insert_at(&mut store, &clock, "b", b"BBBB", START + 10);
    insert_at(&mut store, &clock, "c", b"CCCC", START + 20);
    insert_at(&mut store, &clock, "d", b"DDDD", START + 30);

    let removed = store.delete_elements_before(START + 20).unwrap();

    assert_eq!(removed, 2);
    assert_eq!(values(&store), vec!["DDDD", "CCCC"]);
    assert_eq!(store.lookup("a"), None);
    assert_eq!(store.lookup("b"), None);
    store.debug_validate_invariants();

    assert_eq!(store.delete_elements_before(START + 20).unwrap(), 0);
}

#[test]
fn test_delete_elements_before_respects_touch() {
    let (_temp, mut store, clock) = setup_store(8);
    insert_at(&mut store, &clock, "a", b"AAAA", START);
    insert_at(&mut store, &clock, "b", b"BBBB", START + 10);
    clock.set(START + 50);
    store.touch("a").unwrap();

    let removed = store.delete_elements_before(START + 20).unwrap();

    assert_eq!(removed, 1);
    assert_eq!(values(&store), vec!["AAAA"]);
}

#[test]
fn test_delete_elements_before_everything_and_nothing() {
    let (_temp, mut store, clock) = setup_store(8);
    for i in 0..5 {
        insert_at(&mut store, &clock, &format!("k{}", i), b"vvvv", START + i);
    }

    assert_eq!(store.delete_elements_before(START).unwrap(), 0);
    assert_eq!(store.delete_elements_before(u32::MAX).unwrap(), 5);
    assert_eq!(store.used_size(), 0);
    store.debug_validate_invariants();
}

#[test]
fn test_freed_slots_are_reused_after_age_deletion() {
    let (_temp, mut store, clock) = setup_store(3);
    insert_at(&mut store, &clock, "a", b"AAAA", START);
    insert_at(&mut store, &clock, "b", b"BBBB", START + 1);
    insert_at(&mut store, &clock, "c", b"CCCC", START + 2);
    store.delete_elements_before(START + 2).unwrap();

    insert_at(&mut store, &clock, "d", b"DDDD", START + 3);
    insert_at(&mut store, &clock, "e", b"EEEE", START + 4);

    assert_eq!(values(&store), vec!["EEEE", "DDDD", "CCCC"]);
    store.debug_validate_invariants();
}

#[test]
fn test_delete_elements_untouched_for_62_days() {
    let (_temp, mut store, clock) = setup_store(8);
    let day = 24 * 60 * 60;
    let now = START + 100 * day;
    insert_at(&mut store, &clock, "ancient", b"AAAA", now - 90 * day);
    insert_at(&mut store, &clock, "old", b"OOOO", now - 63 * day);
    insert_at(&mut store, &clock, "edge", b"EEEE", now - 62 * day);
    insert_at(&mut store, &clock, "recent", b"RRRR", now - 61 * day);
    clock.set(now);

    let removed = store.delete_elements_untouched_for_62_days().unwrap();

    assert_eq!(UNTOUCHED_LIMIT_SECS, 62 * day);
    assert_eq!(removed, 2);
    assert_eq!(values(&store), vec!["RRRR", "EEEE"]);
    store.debug_validate_invariants();
}

#[test]
fn test_age_deletion_persists() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("lru.db");
    let clock = ManualClock::new(START);
    {
        let mut store = open_store(&path, 4, 4, &clock);
        insert_at(&mut store, &clock, "a", b"AAAA", START);
        insert_at(&mut store, &clock, "b", b"BBBB", START + 5);
        store.delete_elements_before(START + 1).unwrap();
    }

    let store = LruStore::create(&path).unwrap();

    assert_eq!(values(&store), vec!["BBBB"]);
}

// =============================================================================
// Clear Tests
// =============================================================================

#[test]
fn test_clear_empties_store_and_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("lru.db");
    let clock = ManualClock::new(START);
    let mut store = open_store(&path, 4, 3, &clock);
    store.insert("a", b"AAAA").unwrap();
    store.insert("b", b"BBBB").unwrap();

    store.clear().unwrap();

    assert_eq!(store.used_size(), 0);
    assert!(store.get_all_values().is_empty());
    assert_eq!(store.lookup("a"), None);
    assert_eq!(store.size(), 3);
    assert_eq!(store.value_size(), 4);
    store.debug_validate_invariants();

    let data = fs::read(&path).unwrap();
    assert_eq!(&data[..12], &[4, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0]);
    assert!(data[12..].iter().all(|&b| b == 0));
}

#[test]
fn test_clear_then_fill_to_capacity() {
    let (_temp, mut store, _clock) = setup_store(2);
    store.insert("a", b"AAAA").unwrap();
    store.insert("b", b"BBBB").unwrap();
    store.clear().unwrap();

    store.insert("c", b"CCCC").unwrap();
    store.insert("d", b"DDDD").unwrap();
    store.insert("e", b"EEEE").unwrap();

    assert_eq!(values(&store), vec!["EEEE", "DDDD"]);
    store.debug_validate_invariants();
}

#[test]
fn test_clear_discards_raw_writes() {
    let (_temp, mut store, clock) = setup_store(2);
    insert_at(&mut store, &clock, "a", b"AAAA", START);
    store.write(1, fingerprint("raw", 0), b"RRRR", START).unwrap();

    store.clear().unwrap();
    store.debug_validate_invariants();

    insert_at(&mut store, &clock, "b", b"BBBB", START + 1);
    insert_at(&mut store, &clock, "c", b"CCCC", START + 2);
    assert_eq!(values(&store), vec!["CCCC", "BBBB"]);
    store.debug_validate_invariants();
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_newer_source_wins() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let mut x = open_store(&temp.path().join("x.db"), 4, 4, &clock);
    let mut y = open_store(&temp.path().join("y.db"), 4, 4, &clock);
    insert_at(&mut x, &clock, "k", b"v1v1", 100);
    insert_at(&mut y, &clock, "k", b"v2v2", 200);

    x.merge(&y).unwrap();

    assert_eq!(x.lookup_with_time("k"), Some((&b"v2v2"[..], 200)));
    assert_eq!(x.used_size(), 1);
    x.debug_validate_invariants();
}

#[test]
fn test_insert_after_merging_future_entries_stays_in_front() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let mut x = open_store(&temp.path().join("x.db"), 4, 4, &clock);
    let mut y = open_store(&temp.path().join("y.db"), 4, 4, &clock);
    insert_at(&mut y, &clock, "future", b"FFFF", START + 1000);
    x.merge(&y).unwrap();

    insert_at(&mut x, &clock, "now", b"NNNN", START);

    assert_eq!(values(&x), vec!["NNNN", "FFFF"]);
    assert_eq!(x.lookup_with_time("now").unwrap().1, START + 1000);
    x.debug_validate_invariants();
}

#[test]
fn test_merge_older_source_loses() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let mut x = open_store(&temp.path().join("x.db"), 4, 4, &clock);
    let mut y = open_store(&temp.path().join("y.db"), 4, 4, &clock);
    insert_at(&mut y, &clock, "k", b"old!", 100);
    insert_at(&mut x, &clock, "k", b"new!", 200);

    x.merge(&y).unwrap();

    assert_eq!(x.lookup_with_time("k"), Some((&b"new!"[..], 200)));
}

#[test]
fn test_merge_tie_keeps_destination() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let mut x = open_store(&temp.path().join("x.db"), 4, 4, &clock);
    let mut y = open_store(&temp.path().join("y.db"), 4, 4, &clock);
    insert_at(&mut x, &clock, "k", b"mine", 150);
    insert_at(&mut y, &clock, "k", b"them", 150);

    x.merge(&y).unwrap();

    assert_eq!(x.lookup("k"), Some(&b"mine"[..]));
}

#[test]
fn test_merge_interleaves_by_timestamp() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let mut x = open_store(&temp.path().join("x.db"), 4, 8, &clock);
    let mut y = open_store(&temp.path().join("y.db"), 4, 8, &clock);
    insert_at(&mut x, &clock, "a", b"AAAA", 10);
    insert_at(&mut x, &clock, "c", b"CCCC", 30);
    insert_at(&mut y, &clock, "b", b"BBBB", 20);
    insert_at(&mut y, &clock, "d", b"DDDD", 40);

    x.merge(&y).unwrap();

    assert_eq!(values(&x), vec!["DDDD", "CCCC", "BBBB", "AAAA"]);
    assert_eq!(values(&y), vec!["DDDD", "BBBB"]);
    x.debug_validate_invariants();
}

#[test]
fn test_merge_never_exceeds_capacity() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let mut x = open_store(&temp.path().join("x.db"), 4, 3, &clock);
    let mut y = open_store(&temp.path().join("y.db"), 4, 10, &clock);
    insert_at(&mut x, &clock, "x0", b"X000", 5);
    insert_at(&mut x, &clock, "x1", b"X001", 50);
    for i in 0..6u32 {
        insert_at(&mut y, &clock, &format!("y{}", i), format!("Y{:03}", i).as_bytes(), 10 * i);
    }

    x.merge(&y).unwrap();

    assert_eq!(x.used_size(), 3);
    assert_eq!(x.size(), 3);
    assert_eq!(values(&x), vec!["X001", "Y005", "Y004"]);
    x.debug_validate_invariants();
}

#[test]
fn test_merge_file_and_persist() {
    let temp = TempDir::new().unwrap();
    let x_path = temp.path().join("x.db");
    let y_path = temp.path().join("y.db");
    let clock = ManualClock::new(START);
    {
        let mut y = open_store(&y_path, 4, 4, &clock);
        insert_at(&mut y, &clock, "b", b"BBBB", START + 2);
    }
    let mut x = open_store(&x_path, 4, 4, &clock);
    insert_at(&mut x, &clock, "a", b"AAAA", START + 1);

    x.merge_file(&y_path).unwrap();
    assert_eq!(values(&x), vec!["BBBB", "AAAA"]);

    insert_at(&mut x, &clock, "c", b"CCCC", START + 10);
    assert_eq!(values(&x), vec!["CCCC", "BBBB", "AAAA"]);
    x.debug_validate_invariants();
    x.close().unwrap();

    let reopened = LruStore::create(&x_path).unwrap();
    assert_eq!(values(&reopened), vec!["CCCC", "BBBB", "AAAA"]);
}

#[test]
fn test_merge_rejects_value_size_mismatch() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let mut x = open_store(&temp.path().join("x.db"), 4, 4, &clock);
    let mut y = open_store(&temp.path().join("y.db"), 8, 4, &clock);
    x.insert("a", b"AAAA").unwrap();
    y.insert("b", b"BBBBBBBB").unwrap();

    let result = x.merge(&y);

    assert!(matches!(
        result,
        Err(LruError::ValueSizeMismatch { ours: 4, theirs: 8 })
    ));
    assert_eq!(values(&x), vec!["AAAA"]);
}

#[test]
fn test_merge_missing_file_leaves_destination_untouched() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let mut x = open_store(&temp.path().join("x.db"), 4, 4, &clock);
    x.insert("a", b"AAAA").unwrap();

    let result = x.merge_file(temp.path().join("nope.db"));

    assert!(matches!(result, Err(LruError::Io(_))));
    assert_eq!(values(&x), vec!["AAAA"]);
    x.debug_validate_invariants();
}

#[test]
fn test_merge_into_closed_store_fails() {
    let temp = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let y = open_store(&temp.path().join("y.db"), 4, 4, &clock);
    let mut x = LruStore::new();

    assert!(matches!(x.merge(&y), Err(LruError::Closed)));
}

#[test]
fn test_merge_keeps_unindexed_raw_writes() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let x_path = temp_dir.path().join("x.db");
    let y_path = temp_dir.path().join("y.db");
    {
        let mut x = open_store(&x_path, 4, 4, &clock);
        let y = open_store(&y_path, 4, 4, &clock);
        x.write(0, fingerprint("bulk", 0), b"BULK", 100).unwrap();

        x.merge(&y).unwrap();

        assert_eq!(x.used_size(), 1);
        assert_eq!(x.lookup_with_time("bulk"), Some((&b"BULK"[..], 100)));
        x.debug_validate_invariants();
    }

    let x = open_store(&x_path, 4, 4, &clock);
    assert_eq!(x.lookup("bulk"), Some(&b"BULK"[..]));
}

#[test]
fn test_merge_takes_raw_writes_from_source() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(START);
    let mut x = open_store(&temp_dir.path().join("x.db"), 4, 4, &clock);
    let mut y = open_store(&temp_dir.path().join("y.db"), 4, 4, &clock);
    insert_at(&mut x, &clock, "a", b"AAAA", START);
    y.write(3, fingerprint("raw", 0), b"RRRR", START + 5).unwrap();

    x.merge(&y).unwrap();

    assert_eq!(values(&x), vec!["RRRR", "AAAA"]);
    x.debug_validate_invariants();
}
