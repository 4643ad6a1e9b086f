//! Index Module
//!
//! In-memory hash index used as each segment's local index.
//!
//! ## Responsibilities
//! - Map key fingerprints to record offsets in O(1) expected time
//! - Grow by full rehash into a larger prime-sized table
//! - Enumerate all entries for persistence to the `.idx` companion file
//!
//! ## Data Structure Choice
//! Open addressing with Robin Hood displacement:
//! - Probe sequences stay short and uniform under high load
//! - Lookups stop early once the probe distance exceeds the incumbent's
//! - Deletion uses backward shifting, so the table never holds tombstones

mod robin_hood;

pub use robin_hood::{HashIndex, DEFAULT_CAPACITY, MAX_LOAD_FACTOR};
