//! Segment Manager
//!
//! Owns every segment of one store directory.
//!
//! ## Responsibilities
//! - Discover existing segments on startup
//! - Append to the active segment, rotating it past the size threshold
//! - Search segments newest → oldest for lookups
//! - Persist the active segment's index and filter on close

use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::Result;

use super::{list_segment_ids, segment_log_path, Segment, SegmentOffset, SegmentOptions};

/// The segments of a store: one active, the rest sealed in rotation order
struct SegmentSet {
    active: Segment,
    /// Oldest first
    sealed: Vec<Segment>,
    next_id: u64,
}

/// Manages the segments of one store directory
///
/// ## Concurrency:
/// - `segments`: Protected by RwLock (appends/rotation exclusive, lookups shared)
/// - All methods use `&self` (no exclusive access needed)
///
/// Segments are held by value and never handed out; callers only ever see
/// [`SegmentOffset`] locations.
pub struct SegmentManager {
    /// Directory where segments are stored
    dir: PathBuf,

    /// Settings every new segment is opened with
    options: SegmentOptions,

    /// Active and sealed segments
    segments: RwLock<SegmentSet>,
}

impl SegmentManager {
    /// Open or create a store in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing segment logs
    /// 3. Reopen all but the newest as sealed (loads indexes and filters)
    /// 4. Reopen the newest as active, or create segment 1
    pub fn open(dir: &Path, options: SegmentOptions) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let ids = list_segment_ids(dir)?;
        let (active_id, sealed_ids) = match ids.split_last() {
            Some((&last, rest)) => (last, rest),
            None => (1, &[][..]),
        };

        let mut sealed = Vec::with_capacity(sealed_ids.len());
        for &id in sealed_ids {
            let mut segment = Segment::open(dir, id, &options)?;
            segment.mark_sealed();
            sealed.push(segment);
        }

        let active = Segment::open(dir, active_id, &options)?;

        tracing::info!(
            dir = %dir.display(),
            active_id,
            sealed = sealed.len(),
            "segment manager opened"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            options,
            segments: RwLock::new(SegmentSet {
                active,
                sealed,
                next_id: active_id + 1,
            }),
        })
    }

    /// Append a record to the active segment and return its offset.
    ///
    /// Rotation is checked after the write: if the record starts at or past
    /// the size threshold the segment is sealed and a new one takes its
    /// place. The check looks at the record's offset, not the end of the
    /// log, so a segment may exceed the threshold by up to one record.
    pub fn append(&self, fingerprint: u64, key: &[u8], value: &[u8]) -> Result<u64> {
        let mut segments = self.segments.write();

        let offset = segments.active.append_record(fingerprint, key, value)?;

        if offset >= self.options.segment_size {
            self.rotate(&mut segments)?;
        }

        Ok(offset)
    }

    /// Locate the newest record for a fingerprint
    ///
    /// Search order: active segment, then sealed segments newest → oldest.
    pub fn lookup(&self, fingerprint: u64) -> Option<SegmentOffset> {
        let segments = self.segments.read();

        segments.active.lookup(fingerprint).or_else(|| {
            segments
                .sealed
                .iter()
                .rev()
                .find_map(|segment| segment.lookup(fingerprint))
        })
    }

    /// Persist the active segment's index and filter
    ///
    /// Sealed segments were persisted when they were rotated out.
    pub fn close(&self) -> Result<()> {
        let mut segments = self.segments.write();
        segments.active.persist()?;
        tracing::debug!(active_id = segments.active.id(), "segment manager closed");
        Ok(())
    }

    /// Total number of segments, active included
    pub fn segment_count(&self) -> usize {
        self.segments.read().sealed.len() + 1
    }

    /// Id of the segment currently receiving appends
    pub fn active_segment_id(&self) -> u64 {
        self.segments.read().active.id()
    }

    /// Ids of the sealed segments, oldest first
    pub fn sealed_segment_ids(&self) -> Vec<u64> {
        self.segments.read().sealed.iter().map(Segment::id).collect()
    }

    /// Id the next rotation will use (for testing/debugging)
    pub fn next_segment_id(&self) -> u64 {
        self.segments.read().next_id
    }

    /// Get the store directory path
    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a segment's log file
    pub fn log_path(&self, id: u64) -> PathBuf {
        segment_log_path(&self.dir, id)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Seal the active segment and open the next one (write lock held)
    fn rotate(&self, segments: &mut SegmentSet) -> Result<()> {
        let next = Segment::open(&self.dir, segments.next_id, &self.options)?;
        segments.next_id += 1;

        let mut previous = mem::replace(&mut segments.active, next);
        let sealed = previous.seal();

        tracing::info!(
            sealed_id = previous.id(),
            sealed_size = previous.size(),
            active_id = segments.active.id(),
            "rotated segment"
        );

        // Keep the segment reachable even if its companions failed to write;
        // drop will try again.
        segments.sealed.push(previous);
        sealed
    }
}
