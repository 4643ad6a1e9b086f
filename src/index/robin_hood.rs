//! Robin Hood hash index
//!
//! Open-addressing map with linear probing and Robin Hood displacement.

use std::hash::{Hash, Hasher};
use std::mem;

use crate::hash::Fnv1aHasher;

/// Initial bucket count of a fresh index (prime)
pub const DEFAULT_CAPACITY: usize = 53;

/// Load factor above which the table is rebuilt at roughly twice the size
pub const MAX_LOAD_FACTOR: f64 = 0.75;

/// An occupied bucket
#[derive(Debug, Clone)]
struct Bucket<K, V> {
    key: K,
    val: V,
    /// Distance from the key's ideal slot
    probe_len: usize,
}

/// Fixed-capacity open-addressing map, rebuilt when it grows too full.
///
/// Invariant: walking forward from any key's ideal slot never crosses an
/// empty bucket or an entry closer to its own ideal slot before reaching the
/// key. Lookups rely on this to stop early; [`HashIndex::erase`] preserves it
/// by shifting the following run back one slot.
#[derive(Debug, Clone)]
pub struct HashIndex<K, V> {
    buckets: Vec<Option<Bucket<K, V>>>,
    len: usize,
}

impl<K: Hash + Eq, V> HashIndex<K, V> {
    /// Create an empty index with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty index with at least `capacity` buckets (rounded up to a prime)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: empty_buckets(next_prime(capacity)),
            len: 0,
        }
    }

    /// Insert or overwrite a value.
    ///
    /// Returns `true` if the key was not present before.
    pub fn put(&mut self, key: K, val: V) -> bool {
        if let Some(slot) = self.find_slot(&key) {
            if let Some(bucket) = self.buckets[slot].as_mut() {
                bucket.val = val;
            }
            return false;
        }

        if (self.len + 1) as f64 > self.capacity() as f64 * MAX_LOAD_FACTOR {
            self.grow();
        }

        self.insert_absent(Bucket {
            key,
            val,
            probe_len: 0,
        });
        self.len += 1;
        true
    }

    /// Look up the value stored for `key`
    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = self.find_slot(key)?;
        self.buckets[slot].as_ref().map(|bucket| &bucket.val)
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &K) -> bool {
        self.find_slot(key).is_some()
    }

    /// Remove `key`, returning whether it was present.
    ///
    /// Backward-shift deletion: every following entry that is not in its
    /// ideal slot moves one bucket back, until an empty bucket or an entry
    /// sitting in its ideal slot is reached.
    pub fn erase(&mut self, key: &K) -> bool {
        let Some(mut hole) = self.find_slot(key) else {
            return false;
        };

        let capacity = self.capacity();
        self.buckets[hole] = None;

        let mut next = (hole + 1) % capacity;
        loop {
            match self.buckets[next].take() {
                Some(mut bucket) if bucket.probe_len > 0 => {
                    bucket.probe_len -= 1;
                    self.buckets[hole] = Some(bucket);
                    hole = next;
                    next = (next + 1) % capacity;
                }
                other => {
                    self.buckets[next] = other;
                    break;
                }
            }
        }

        self.len -= 1;
        true
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Drop every entry, keeping the current capacity
    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(|bucket| *bucket = None);
        self.len = 0;
    }

    /// Iterate over all entries in bucket order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.buckets
            .iter()
            .flatten()
            .map(|bucket| (&bucket.key, &bucket.val))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ideal_slot(&self, key: &K) -> usize {
        let mut hasher = Fnv1aHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.capacity() as u64) as usize
    }

    /// Bucket index holding `key`, if any
    fn find_slot(&self, key: &K) -> Option<usize> {
        let capacity = self.capacity();
        let mut slot = self.ideal_slot(key);

        for distance in 0..capacity {
            let bucket = self.buckets[slot].as_ref()?;
            // An entry closer to home than we are proves the key is absent
            if bucket.probe_len < distance {
                return None;
            }
            if bucket.key == *key {
                return Some(slot);
            }
            slot = (slot + 1) % capacity;
        }

        None
    }

    /// Place an entry known not to be in the table.
    fn insert_absent(&mut self, mut entry: Bucket<K, V>) {
        let capacity = self.capacity();
        let mut slot = self.ideal_slot(&entry.key);

        loop {
            if self.buckets[slot].is_none() {
                self.buckets[slot] = Some(entry);
                return;
            }

            if let Some(incumbent) = self.buckets[slot].as_mut() {
                if incumbent.probe_len < entry.probe_len {
                    mem::swap(incumbent, &mut entry);
                }
            }

            slot = (slot + 1) % capacity;
            entry.probe_len += 1;
        }
    }

    /// Full rebuild into the next prime at least twice the current size
    fn grow(&mut self) {
        let new_capacity = next_prime(self.capacity() * 2);
        let old = mem::replace(&mut self.buckets, empty_buckets(new_capacity));

        for bucket in old.into_iter().flatten() {
            self.insert_absent(Bucket {
                probe_len: 0,
                ..bucket
            });
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> HashIndex<K, V> {
    /// Snapshot of every entry (order unspecified)
    pub fn get_all(&self) -> Vec<(K, V)> {
        self.iter()
            .map(|(key, val)| (key.clone(), val.clone()))
            .collect()
    }
}

impl<K: Hash + Eq, V> Default for HashIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_buckets<K, V>(capacity: usize) -> Vec<Option<Bucket<K, V>>> {
    (0..capacity).map(|_| None).collect()
}

fn next_prime(n: usize) -> usize {
    let mut candidate = n.max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut divisor = 3;
    while divisor * divisor <= n {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}
