//! Key fingerprinting
//!
//! 64-bit FNV-1a over raw key bytes. Non-cryptographic, well distributed, and
//! stable across processes, so fingerprints can be persisted in `.idx` files.

use std::hash::Hasher;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Fingerprint of a key as stored in segment indexes and filters
pub fn fingerprint(key: &[u8]) -> u64 {
    let mut hasher = Fnv1aHasher::default();
    hasher.write(key);
    hasher.finish()
}

/// Streaming FNV-1a hasher, also used to place keys in the hash index
#[derive(Debug, Clone, Copy)]
pub struct Fnv1aHasher {
    state: u64,
}

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.state
    }
}
