//! Filter Module
//!
//! Per-segment membership filter used to skip segments that cannot hold a key.
//!
//! ## Responsibilities
//! - Answer "definitely absent" / "maybe present" for a key fingerprint
//! - Persist to and restore from the `.bf` companion file
//!
//! ## File Format
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────┐
//! │ BitCount: u64 LE (8) │ One byte per bit (0 or 1), unpacked  │
//! └──────────────────────┴──────────────────────────────────────┘
//! ```
//! The probe count is not stored; it comes from configuration on load.

mod bloom;

pub use bloom::BloomFilter;
