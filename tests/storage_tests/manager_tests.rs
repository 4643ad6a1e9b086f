//! Tests for SegmentManager
//!
//! These tests verify:
//! - Initialization (empty directory, existing segments)
//! - Rotation at the size threshold
//! - Newest-first lookup across segments
//! - Reopen restores sealed and active segments

use std::fs;
use std::path::Path;

use segkv::hash::fingerprint;
use segkv::storage::{SegmentManager, SegmentOptions};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn options(segment_size: u64) -> SegmentOptions {
    SegmentOptions {
        segment_size,
        bloom_bits: 1024,
        ..SegmentOptions::default()
    }
}

fn open(dir: &Path, segment_size: u64) -> SegmentManager {
    SegmentManager::open(dir, options(segment_size)).unwrap()
}

fn append(manager: &SegmentManager, key: &str, value: &str) -> u64 {
    manager
        .append(fingerprint(key.as_bytes()), key.as_bytes(), value.as_bytes())
        .unwrap()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_open_empty_directory() {
    let temp = TempDir::new().unwrap();
    let manager = open(temp.path(), 1024);

    assert_eq!(manager.segment_count(), 1);
    assert_eq!(manager.active_segment_id(), 1);
    assert_eq!(manager.next_segment_id(), 2);
    assert!(manager.sealed_segment_ids().is_empty());
    assert!(temp.path().join("segment_1.kv").exists());
}

#[test]
fn test_open_creates_missing_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("nested").join("store");
    let manager = open(&dir, 1024);

    assert!(dir.is_dir());
    assert_eq!(manager.data_dir(), dir.as_path());
}

#[test]
fn test_unrelated_files_are_ignored() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("notes.txt"), b"hi").unwrap();
    fs::write(temp.path().join("segment_x.kv"), b"").unwrap();
    fs::write(temp.path().join("segment_0.kv"), b"").unwrap();

    let manager = open(temp.path(), 1024);
    assert_eq!(manager.segment_count(), 1);
    assert_eq!(manager.active_segment_id(), 1);
}

// =============================================================================
// Rotation Tests
// =============================================================================

#[test]
fn test_no_rotation_below_threshold() {
    let temp = TempDir::new().unwrap();
    let manager = open(temp.path(), 1024);

    append(&manager, "a", "hello");
    append(&manager, "b", "world12345");

    assert_eq!(manager.segment_count(), 1);
}

#[test]
fn test_rotation_once_threshold_reached() {
    let temp = TempDir::new().unwrap();
    let manager = open(temp.path(), 24);

    assert_eq!(append(&manager, "a", "hello"), 0); // 24 bytes
    assert_eq!(manager.segment_count(), 1);

    assert_eq!(append(&manager, "b", "world12345"), 24);
    assert_eq!(manager.segment_count(), 2);
    assert_eq!(manager.sealed_segment_ids(), vec![1]);
    assert_eq!(manager.active_segment_id(), 2);

    assert!(temp.path().join("segment_1.idx").exists());
    assert!(temp.path().join("segment_1.bf").exists());
    assert_eq!(fs::metadata(manager.log_path(1)).unwrap().len(), 53);
    assert!(manager.log_path(2).exists());
    assert_eq!(fs::metadata(manager.log_path(2)).unwrap().len(), 0);
}

#[test]
fn test_rotation_follows_record_offset_not_log_end() {
    let temp = TempDir::new().unwrap();
    let manager = open(temp.path(), 40);

    assert_eq!(append(&manager, "a", "hello"), 0);
    // Log now ends at 48, past the threshold, but this record starts at 24
    assert_eq!(append(&manager, "b", "hello"), 24);
    assert_eq!(manager.segment_count(), 1);

    assert_eq!(append(&manager, "c", "hello"), 48);
    assert_eq!(manager.segment_count(), 2);
    assert_eq!(manager.active_segment_id(), 2);
}

#[test]
fn test_exact_threshold_rotates() {
    let temp = TempDir::new().unwrap();
    let manager = open(temp.path(), 24);

    // A record starting at offset 0 never rotates, however large
    append(&manager, "a", "hello");
    assert_eq!(manager.active_segment_id(), 1);

    // The next one starts exactly at the threshold
    append(&manager, "b", "hello");
    assert_eq!(manager.active_segment_id(), 2);
}

#[test]
fn test_oversized_first_record_stays_in_segment() {
    let temp = TempDir::new().unwrap();
    let manager = open(temp.path(), 16);

    let value = "v".repeat(100);
    assert_eq!(append(&manager, "big", &value), 0);
    assert_eq!(manager.segment_count(), 1);
    assert_eq!(fs::metadata(manager.log_path(1)).unwrap().len(), 121);
}

#[test]
fn test_many_rotations_keep_every_record_reachable() {
    let temp = TempDir::new().unwrap();
    let manager = open(temp.path(), 100);

    let mut expected = Vec::new();
    for i in 0..50 {
        let key = format!("key{:02}", i);
        let offset = append(&manager, &key, "value");
        expected.push((key, offset));
    }

    assert!(manager.segment_count() > 5);
    let sealed = manager.sealed_segment_ids();
    assert!(sealed.windows(2).all(|w| w[0] < w[1]));

    for (key, offset) in &expected {
        let location = manager.lookup(fingerprint(key.as_bytes())).unwrap();
        assert_eq!(location.offset, *offset);
    }
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_lookup_missing_key() {
    let temp = TempDir::new().unwrap();
    let manager = open(temp.path(), 1024);
    append(&manager, "a", "1");

    assert!(manager.lookup(fingerprint(b"zzz")).is_none());
}

#[test]
fn test_lookup_prefers_newest_segment() {
    let temp = TempDir::new().unwrap();
    let manager = open(temp.path(), 30);

    append(&manager, "k", "old-value-1234567890"); // 39 bytes at offset 0
    append(&manager, "pad", "x"); // offset 39, rotates
    append(&manager, "k", "new");

    let location = manager.lookup(fingerprint(b"k")).unwrap();
    assert_eq!(location.segment_id, 2);
    assert_eq!(location.offset, 0);
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_reopen_restores_segments() {
    let temp = TempDir::new().unwrap();
    {
        let manager = open(temp.path(), 24);
        append(&manager, "a", "hello");
        append(&manager, "b", "world12345"); // offset 24, rotates
        append(&manager, "c", "tail");
        manager.close().unwrap();
    }

    let manager = open(temp.path(), 24);
    assert_eq!(manager.sealed_segment_ids(), vec![1]);
    assert_eq!(manager.active_segment_id(), 2);
    assert_eq!(manager.next_segment_id(), 3);

    assert_eq!(manager.lookup(fingerprint(b"a")).unwrap().segment_id, 1);
    assert_eq!(manager.lookup(fingerprint(b"c")).unwrap().segment_id, 2);
}

#[test]
fn test_reopen_continues_appending_to_active() {
    let temp = TempDir::new().unwrap();
    {
        let manager = open(temp.path(), 1024);
        append(&manager, "a", "1");
        manager.close().unwrap();
    }

    let manager = open(temp.path(), 1024);
    let offset = append(&manager, "b", "2");
    assert_eq!(offset, 20);
    assert_eq!(manager.active_segment_id(), 1);
}
