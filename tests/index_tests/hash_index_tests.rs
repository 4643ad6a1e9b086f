//! Tests for the Robin Hood hash index
//!
//! These tests verify:
//! - Insert, overwrite, lookup and erase semantics
//! - Growth across several prime capacities
//! - Backward-shift deletion keeps neighbours reachable
//! - Behaviour under randomized churn against a reference map

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segkv::index::{HashIndex, DEFAULT_CAPACITY, MAX_LOAD_FACTOR};

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_new_index_is_empty() {
    let index: HashIndex<u64, u64> = HashIndex::new();
    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
    assert_eq!(index.capacity(), DEFAULT_CAPACITY);
    assert_eq!(index.get(&7), None);
}

#[test]
fn test_put_and_get() {
    let mut index = HashIndex::new();
    assert!(index.put(1u64, 100u64));
    assert!(index.put(2, 200));

    assert_eq!(index.get(&1), Some(&100));
    assert_eq!(index.get(&2), Some(&200));
    assert_eq!(index.get(&3), None);
    assert_eq!(index.len(), 2);
}

#[test]
fn test_put_overwrites_existing_key() {
    let mut index = HashIndex::new();
    assert!(index.put(42u64, 1u64));
    assert!(!index.put(42, 2));

    assert_eq!(index.get(&42), Some(&2));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_erase() {
    let mut index = HashIndex::new();
    index.put(5u64, 50u64);

    assert!(index.erase(&5));
    assert!(!index.erase(&5));
    assert!(!index.contains_key(&5));
    assert!(index.is_empty());
}

#[test]
fn test_erase_missing_key_on_empty_index() {
    let mut index: HashIndex<u64, u64> = HashIndex::new();
    assert!(!index.erase(&1));
}

#[test]
fn test_clear_keeps_capacity() {
    let mut index = HashIndex::new();
    for i in 0..100u64 {
        index.put(i, i);
    }
    let capacity = index.capacity();

    index.clear();

    assert!(index.is_empty());
    assert_eq!(index.capacity(), capacity);
    assert_eq!(index.get(&10), None);
}

#[test]
fn test_string_keys() {
    let mut index = HashIndex::new();
    index.put("alpha".to_string(), 1);
    index.put("beta".to_string(), 2);

    assert_eq!(index.get(&"alpha".to_string()), Some(&1));
    assert_eq!(index.get(&"gamma".to_string()), None);
}

// =============================================================================
// Growth
// =============================================================================

#[test]
fn test_growth_preserves_entries() {
    let mut index = HashIndex::new();
    for i in 0..10_000u64 {
        index.put(i, i * 2);
    }

    // 53 → 107 → 223 → ... several rehashes
    assert!(index.capacity() > 10_000);
    assert!(index.len() as f64 <= index.capacity() as f64 * MAX_LOAD_FACTOR);
    for i in 0..10_000u64 {
        assert_eq!(index.get(&i), Some(&(i * 2)), "key {}", i);
    }
}

#[test]
fn test_first_growth_happens_past_load_factor() {
    let mut index = HashIndex::new();
    // floor(53 * 0.75) = 39 entries fit without growing
    for i in 0..39u64 {
        index.put(i, i);
    }
    assert_eq!(index.capacity(), 53);

    index.put(39, 39);
    assert_eq!(index.capacity(), 107);
}

#[test]
fn test_with_capacity_rounds_to_prime() {
    let index: HashIndex<u64, u64> = HashIndex::with_capacity(100);
    assert_eq!(index.capacity(), 101);
}

// =============================================================================
// Iteration
// =============================================================================

#[test]
fn test_iter_and_get_all_match_contents() {
    let mut index = HashIndex::new();
    for i in 0..200u64 {
        index.put(i, i + 1);
    }
    for i in (0..200u64).step_by(2) {
        index.erase(&i);
    }

    let mut all = index.get_all();
    all.sort_unstable();
    let expected: Vec<(u64, u64)> = (0..200u64).filter(|i| i % 2 == 1).map(|i| (i, i + 1)).collect();
    assert_eq!(all, expected);
    assert_eq!(index.iter().count(), 100);
}

// =============================================================================
// Churn
// =============================================================================

#[test]
fn test_erase_keeps_neighbours_reachable() {
    let mut index = HashIndex::with_capacity(53);
    for i in 0..39u64 {
        index.put(i, i);
    }

    for victim in 0..39u64 {
        let mut copy = index.clone();
        assert!(copy.erase(&victim));
        for other in (0..39u64).filter(|&k| k != victim) {
            assert_eq!(copy.get(&other), Some(&other), "lost {} after erasing {}", other, victim);
        }
    }
}

#[test]
fn test_random_churn_matches_reference() {
    let mut rng = StdRng::seed_from_u64(0x5eed_cafe);
    let mut index = HashIndex::new();
    let mut reference: HashMap<u64, u64> = HashMap::new();

    for step in 0..50_000u64 {
        let key = rng.gen_range(0..4_000u64);
        match rng.gen_range(0..10) {
            0..=5 => {
                let inserted = index.put(key, step);
                assert_eq!(inserted, reference.insert(key, step).is_none());
            }
            6..=8 => {
                assert_eq!(index.erase(&key), reference.remove(&key).is_some());
            }
            _ => {
                assert_eq!(index.get(&key), reference.get(&key));
            }
        }
    }

    assert_eq!(index.len(), reference.len());
    for (key, value) in &reference {
        assert_eq!(index.get(key), Some(value));
    }
}
