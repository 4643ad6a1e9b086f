//! # SegKV
//!
//! An embedded, segmented, append-only key-value store with:
//! - Bounded segment logs rotated at a size threshold
//! - Per-segment Robin Hood hash index and bloom filter
//! - CRC32-verified reads and in-place tombstones
//! - Single-writer/multi-reader concurrency model
//! - TCP-based client protocol and a small full-text index on top
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │               TCP Server  /  SearchIndex                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   StorageEngine                              │
//! │        (fingerprint, RwLock, verify on read)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  SegmentManager                              │
//! │          (rotation, newest → oldest lookup)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼────────────┐
//!          ▼            ▼            ▼
//!   ┌─────────────┐ ┌────────┐ ┌─────────────┐
//!   │ segment_N.kv│ │  .idx  │ │     .bf     │
//!   │  (records)  │ │(index) │ │  (filter)   │
//!   └─────────────┘ └────────┘ └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod filter;
pub mod hash;
pub mod index;
pub mod network;
pub mod protocol;
pub mod search;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, SyncStrategy};
pub use engine::StorageEngine;
pub use error::{KvError, Result};
pub use search::SearchIndex;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SegKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
