//! Bloom filter
//!
//! Fixed-size bit array probed `k` times per fingerprint via double hashing.

use crate::error::{KvError, Result};

/// Size of the bit-count prefix in the serialized form
const BIT_COUNT_SIZE: usize = 8;

/// A bloom filter over 64-bit key fingerprints.
///
/// Sized once at segment creation and never resized. Bits are packed into
/// words in memory; [`BloomFilter::to_bytes`] writes the unpacked
/// byte-per-bit layout used by `.bf` files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// Packed bit array
    words: Vec<u64>,
    /// Number of bits (m)
    num_bits: usize,
    /// Number of probe positions per fingerprint (k)
    num_hashes: usize,
}

impl BloomFilter {
    /// Create an empty filter with `num_bits` bits and `num_hashes` probes.
    ///
    /// A zero bit count is rounded up to one bit.
    pub fn new(num_bits: usize, num_hashes: usize) -> Self {
        let num_bits = num_bits.max(1);
        Self {
            words: vec![0; num_bits.div_ceil(64)],
            num_bits,
            num_hashes,
        }
    }

    /// Record a fingerprint
    pub fn add(&mut self, fingerprint: u64) {
        for i in 0..self.num_hashes {
            let idx = self.probe(fingerprint, i);
            self.set_bit(idx, true);
        }
    }

    /// `false` means the fingerprint was definitely never added
    #[must_use]
    pub fn maybe_contains(&self, fingerprint: u64) -> bool {
        (0..self.num_hashes).all(|i| self.get_bit(self.probe(fingerprint, i)))
    }

    /// Number of bits (m)
    pub fn size(&self) -> usize {
        self.num_bits
    }

    /// Number of probes per fingerprint (k)
    pub fn hash_count(&self) -> usize {
        self.num_hashes
    }

    /// Number of bits currently set
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Set or clear a single bit
    pub fn set_bit(&mut self, idx: usize, value: bool) {
        let mask = 1u64 << (idx % 64);
        if value {
            self.words[idx / 64] |= mask;
        } else {
            self.words[idx / 64] &= !mask;
        }
    }

    /// Read a single bit
    pub fn get_bit(&self, idx: usize) -> bool {
        self.words[idx / 64] & (1u64 << (idx % 64)) != 0
    }

    /// Serialize as `bit_count: u64 LE` followed by one byte per bit
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BIT_COUNT_SIZE + self.num_bits);
        out.extend_from_slice(&(self.num_bits as u64).to_le_bytes());
        out.extend((0..self.num_bits).map(|idx| u8::from(self.get_bit(idx))));
        out
    }

    /// Restore a filter written by [`BloomFilter::to_bytes`].
    ///
    /// The probe count is not part of the format and must be supplied.
    pub fn from_bytes(bytes: &[u8], num_hashes: usize) -> Result<Self> {
        if bytes.len() < BIT_COUNT_SIZE {
            return Err(KvError::Corruption(format!(
                "bloom filter too short: {} bytes",
                bytes.len()
            )));
        }

        let (prefix, bits) = bytes.split_at(BIT_COUNT_SIZE);
        let mut count = [0u8; BIT_COUNT_SIZE];
        count.copy_from_slice(prefix);
        let num_bits = u64::from_le_bytes(count);

        if num_bits == 0 || num_bits != bits.len() as u64 {
            return Err(KvError::Corruption(format!(
                "bloom filter declares {} bits but carries {}",
                num_bits,
                bits.len()
            )));
        }

        let mut filter = Self::new(bits.len(), num_hashes);
        for (idx, &byte) in bits.iter().enumerate() {
            match byte {
                0 => {}
                1 => filter.set_bit(idx, true),
                other => {
                    return Err(KvError::Corruption(format!(
                        "bloom filter bit {} has value {}",
                        idx, other
                    )))
                }
            }
        }

        Ok(filter)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Double hashing: `h1` is the low half zero-extended, `h2` the word with
    /// its halves swapped.
    fn probe(&self, fingerprint: u64, i: usize) -> usize {
        let h1 = fingerprint & 0xFFFF_FFFF;
        let h2 = fingerprint.rotate_left(32);
        let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
        (combined % self.num_bits as u64) as usize
    }
}
