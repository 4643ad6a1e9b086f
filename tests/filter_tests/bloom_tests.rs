//! Tests for the bloom filter
//!
//! These tests verify:
//! - No false negatives
//! - A false-positive rate in line with the filter's sizing
//! - The unpacked on-disk format and its corruption checks

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segkv::filter::BloomFilter;
use segkv::hash::fingerprint;
use segkv::KvError;

// =============================================================================
// Membership
// =============================================================================

#[test]
fn test_empty_filter_contains_nothing() {
    let filter = BloomFilter::new(1024, 4);
    assert_eq!(filter.count_ones(), 0);
    for fp in 0..1000u64 {
        assert!(!filter.maybe_contains(fp));
    }
}

#[test]
fn test_added_fingerprints_are_found() {
    let mut filter = BloomFilter::new(8192, 4);
    let keys: Vec<u64> = (0..500).map(|i| fingerprint(format!("key{}", i).as_bytes())).collect();

    for &fp in &keys {
        filter.add(fp);
    }
    for &fp in &keys {
        assert!(filter.maybe_contains(fp));
    }
}

#[test]
fn test_add_sets_at_most_k_bits() {
    let mut filter = BloomFilter::new(8192, 4);
    filter.add(fingerprint(b"hello"));
    let ones = filter.count_ones();
    assert!((1..=4).contains(&ones));
}

#[test]
fn test_false_positive_rate_is_bounded() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut filter = BloomFilter::new(8192, 4);

    // n = 500, m = 8192, k = 4 → expected rate ≈ 0.2%
    for _ in 0..500 {
        filter.add(rng.gen());
    }

    let trials = 20_000;
    let false_positives = (0..trials)
        .filter(|_| filter.maybe_contains(rng.gen()))
        .count();

    let rate = false_positives as f64 / trials as f64;
    assert!(rate < 0.02, "false positive rate too high: {}", rate);
}

#[test]
fn test_zero_bits_is_rounded_up() {
    let mut filter = BloomFilter::new(0, 3);
    assert_eq!(filter.size(), 1);
    filter.add(123);
    assert!(filter.maybe_contains(456));
}

// =============================================================================
// Serialization
// =============================================================================

#[test]
fn test_to_bytes_layout() {
    let mut filter = BloomFilter::new(16, 2);
    filter.set_bit(0, true);
    filter.set_bit(15, true);

    let bytes = filter.to_bytes();
    assert_eq!(bytes.len(), 8 + 16);
    assert_eq!(&bytes[..8], &16u64.to_le_bytes());
    assert_eq!(bytes[8], 1);
    assert_eq!(bytes[8 + 15], 1);
    assert!(bytes[9..8 + 15].iter().all(|&b| b == 0));
}

#[test]
fn test_from_bytes_restores_bits() {
    let mut filter = BloomFilter::new(1000, 3);
    for fp in [1u64, 99, 12345, u64::MAX] {
        filter.add(fp);
    }

    let restored = BloomFilter::from_bytes(&filter.to_bytes(), 3).unwrap();
    assert_eq!(restored, filter);
    assert!(restored.maybe_contains(12345));
}

#[test]
fn test_from_bytes_rejects_length_mismatch() {
    let mut bytes = BloomFilter::new(64, 2).to_bytes();
    bytes.pop();

    let result = BloomFilter::from_bytes(&bytes, 2);
    assert!(matches!(result, Err(KvError::Corruption(_))));
}

#[test]
fn test_from_bytes_rejects_non_binary_byte() {
    let mut bytes = BloomFilter::new(64, 2).to_bytes();
    bytes[20] = 7;

    let result = BloomFilter::from_bytes(&bytes, 2);
    assert!(matches!(result, Err(KvError::Corruption(_))));
}

#[test]
fn test_from_bytes_rejects_short_input() {
    assert!(BloomFilter::from_bytes(&[1, 2, 3], 2).is_err());
}
