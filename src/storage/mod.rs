//! Storage Module
//!
//! Persistent storage layer: a directory of append-only segment logs.
//!
//! ## Responsibilities
//! - Encode records with a CRC32 integrity check
//! - Append to the active segment and rotate it past the size threshold
//! - Route lookups through per-segment bloom filters and hash indexes
//! - Persist indexes and filters next to each log
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── segment_1.kv    (records)
//!   ├── segment_1.idx   (fingerprint → offset pairs)
//!   ├── segment_1.bf    (bloom filter bits)
//!   └── segment_2.kv ... (ids start at 1 and are never reused)
//! ```
//!
//! ## Record Format (all integers little-endian)
//! ```text
//! ┌───────────────┬────────────┬────────────┬─────────┬────────────┬─────┬───────┬──────────┐
//! │ RecordLen (4) │ KeyLen (4) │ ValLen (4) │ Flags(1)│Reserved (1)│ Key │ Value │ CRC32(4) │
//! └───────────────┴────────────┴────────────┴─────────┴────────────┴─────┴───────┴──────────┘
//!                 └──────────────── covered by CRC32 ───────────────────────────┘
//! ```
//! `RecordLen` counts every byte after itself. `Flags` is 1 for a live record
//! and 0 for a tombstone; erasing a key rewrites only that byte.

mod iterator;
mod manager;
pub mod record;
mod segment;

use std::fs;
use std::path::{Path, PathBuf};

pub use iterator::RecordIterator;
pub use manager::SegmentManager;
pub use record::{Record, RecordHeader};
pub use segment::{Segment, SegmentOptions};

/// Extension of segment log files
pub const LOG_EXTENSION: &str = ".kv";

/// File name prefix shared by a segment's log and companion files
pub const SEGMENT_PREFIX: &str = "segment_";

/// Location of a record: which segment, and where in its log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentOffset {
    pub segment_id: u64,
    /// Byte offset of the record's `record_len` field
    pub offset: u64,
}

/// "segment_42" + ".kv" → "segment_42.kv"
pub fn segment_file_name(id: u64, extension: &str) -> String {
    format!("{}{}{}", SEGMENT_PREFIX, id, extension)
}

/// Path of segment `id`'s log inside `dir`
pub fn segment_log_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(segment_file_name(id, LOG_EXTENSION))
}

/// Parse a segment id from a log file name
/// "segment_42.kv" → Some(42)
pub fn parse_segment_id(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let id_str = name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(LOG_EXTENSION)?;
    id_str.parse::<u64>().ok().filter(|&id| id > 0)
}

/// Ids of every segment log in `dir`, ascending
pub fn list_segment_ids(dir: &Path) -> crate::Result<Vec<u64>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if let Some(id) = parse_segment_id(&path) {
                ids.push(id);
            }
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Every `.kv` log in `dir`, in scan order
///
/// Logs that are not named `segment_<id>.kv` come first, sorted by name,
/// followed by segment logs in ascending id order. A full scan in this order
/// lets the newest segment records win.
pub fn list_log_files(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    let mut foreign = Vec::new();
    let mut segments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(LOG_EXTENSION));
        if !is_log || !path.is_file() {
            continue;
        }
        match parse_segment_id(&path) {
            Some(id) => segments.push((id, path)),
            None => foreign.push(path),
        }
    }
    foreign.sort();
    segments.sort_unstable_by_key(|(id, _)| *id);
    foreign.extend(segments.into_iter().map(|(_, path)| path));
    Ok(foreign)
}
