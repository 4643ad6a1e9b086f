//! Segment
//!
//! One bounded append-only log file plus its derived index and bloom filter.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::{Config, SyncStrategy};
use crate::error::{KvError, Result};
use crate::filter::BloomFilter;
use crate::index::{HashIndex, DEFAULT_CAPACITY};

use super::record::encode_record;
use super::{segment_file_name, SegmentOffset, LOG_EXTENSION};

/// Size of one `(fingerprint, offset)` pair in an `.idx` file
const INDEX_ENTRY_SIZE: usize = 16;

/// The subset of [`Config`] a segment needs
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Rotation threshold, checked by the manager after each append
    pub segment_size: u64,
    pub index_extension: String,
    pub bloom_extension: String,
    pub bloom_bits: usize,
    pub bloom_hashes: usize,
    pub sync_strategy: SyncStrategy,
}

impl From<&Config> for SegmentOptions {
    fn from(config: &Config) -> Self {
        Self {
            segment_size: config.segment_size,
            index_extension: config.index_extension.clone(),
            bloom_extension: config.bloom_extension.clone(),
            bloom_bits: config.bloom_bits,
            bloom_hashes: config.bloom_hashes,
            sync_strategy: config.sync_strategy,
        }
    }
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// A single segment of the store.
///
/// The index maps fingerprints to record offsets in this log only; the
/// filter summarizes every fingerprint ever appended. Both are rebuilt from
/// their companion files on open and written back when the segment is sealed,
/// closed, or dropped with unsaved changes.
pub struct Segment {
    id: u64,
    log_path: PathBuf,
    index_path: PathBuf,
    filter_path: PathBuf,
    /// Log file, read + write
    file: File,
    /// Current log length in bytes
    size: u64,
    index: HashIndex<u64, u64>,
    filter: BloomFilter,
    sync_strategy: SyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
    /// Index or filter changed since the companions were written
    dirty: bool,
    sealed: bool,
}

impl Segment {
    /// Open or create segment `id` in `dir`, loading its companion files
    pub fn open(dir: &Path, id: u64, options: &SegmentOptions) -> Result<Self> {
        let log_path = dir.join(segment_file_name(id, LOG_EXTENSION));
        let index_path = dir.join(segment_file_name(id, &options.index_extension));
        let filter_path = dir.join(segment_file_name(id, &options.bloom_extension));

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&log_path)?;
        let size = file.metadata()?.len();

        let mut segment = Self {
            id,
            log_path,
            index_path,
            filter_path,
            file,
            size,
            index: HashIndex::new(),
            filter: BloomFilter::new(options.bloom_bits, options.bloom_hashes),
            sync_strategy: options.sync_strategy,
            unsynced: 0,
            dirty: false,
            sealed: false,
        };

        segment.load_index();
        segment.load_filter();

        tracing::debug!(
            segment_id = id,
            size = segment.size,
            entries = segment.index.len(),
            "segment opened"
        );

        Ok(segment)
    }

    /// Append a record and return the offset of its first byte.
    ///
    /// The record is written in one call at the end of the log and synced
    /// according to the sync strategy before the index and filter learn
    /// about it.
    pub fn append_record(&mut self, fingerprint: u64, key: &[u8], value: &[u8]) -> Result<u64> {
        if self.sealed {
            return Err(KvError::Storage(format!(
                "segment {} is sealed",
                self.id
            )));
        }

        let record = encode_record(key, value)?;
        let offset = self.file.seek(SeekFrom::End(0))?;

        if let Err(e) = self.write_and_sync(&record) {
            // Drop whatever part of the record made it to the file
            if let Err(truncate_err) = self.file.set_len(offset) {
                tracing::error!(
                    segment_id = self.id,
                    offset,
                    error = %truncate_err,
                    "failed to trim partial record"
                );
            }
            return Err(e);
        }

        self.size = offset + record.len() as u64;
        self.filter.add(fingerprint);
        self.index.put(fingerprint, offset);
        self.dirty = true;

        Ok(offset)
    }

    /// Resolve a fingerprint to a record location in this segment.
    ///
    /// A negative filter answer skips the index entirely.
    pub fn lookup(&self, fingerprint: u64) -> Option<SegmentOffset> {
        if !self.filter.maybe_contains(fingerprint) {
            return None;
        }
        self.index.get(&fingerprint).map(|&offset| SegmentOffset {
            segment_id: self.id,
            offset,
        })
    }

    /// Sync the log and write both companion files
    pub fn persist(&mut self) -> Result<()> {
        self.file.sync_all()?;
        self.unsynced = 0;
        self.save_index()?;
        self.save_filter()?;
        self.dirty = false;
        Ok(())
    }

    /// Persist and refuse further appends
    pub fn seal(&mut self) -> Result<()> {
        self.persist()?;
        self.sealed = true;
        Ok(())
    }

    /// Refuse further appends without writing anything.
    ///
    /// Used for segments that were already sealed before the store was
    /// reopened.
    pub(crate) fn mark_sealed(&mut self) {
        self.sealed = true;
    }

    // =========================================================================
    // Companion Files
    // =========================================================================

    /// Replace the in-memory index with the contents of the `.idx` file.
    ///
    /// A missing or malformed file leaves the index empty.
    pub fn load_index(&mut self) {
        let bytes = match fs::read(&self.index_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if self.size > 0 {
                    tracing::warn!(
                        segment_id = self.id,
                        path = %self.index_path.display(),
                        "index file missing; existing records are unreachable"
                    );
                }
                return;
            }
            Err(e) => {
                tracing::warn!(segment_id = self.id, error = %e, "cannot read index file");
                return;
            }
        };

        if bytes.len() % INDEX_ENTRY_SIZE != 0 {
            tracing::warn!(
                segment_id = self.id,
                len = bytes.len(),
                "index file is truncated; treating index as empty"
            );
            return;
        }

        let entries = bytes.len() / INDEX_ENTRY_SIZE;
        let mut index = HashIndex::with_capacity((entries * 2).max(DEFAULT_CAPACITY));
        for chunk in bytes.chunks_exact(INDEX_ENTRY_SIZE) {
            let (fp, off) = chunk.split_at(8);
            let fingerprint = u64::from_le_bytes(to_array(fp));
            let offset = u64::from_le_bytes(to_array(off));
            index.put(fingerprint, offset);
        }
        self.index = index;
    }

    /// Write every index entry as `(fingerprint, offset)` pairs
    pub fn save_index(&self) -> Result<()> {
        let mut bytes = Vec::with_capacity(self.index.len() * INDEX_ENTRY_SIZE);
        for (fingerprint, offset) in self.index.iter() {
            bytes.extend_from_slice(&fingerprint.to_le_bytes());
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        fs::write(&self.index_path, bytes)?;
        Ok(())
    }

    /// Restore the filter from the `.bf` file.
    ///
    /// A missing or malformed file leaves the filter empty, then refilled
    /// from whatever the index holds.
    pub fn load_filter(&mut self) {
        let hashes = self.filter.hash_count();
        match fs::read(&self.filter_path) {
            Ok(bytes) => match BloomFilter::from_bytes(&bytes, hashes) {
                Ok(filter) => {
                    self.filter = filter;
                    return;
                }
                Err(e) => {
                    tracing::warn!(segment_id = self.id, error = %e, "discarding bloom filter");
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(segment_id = self.id, error = %e, "cannot read bloom filter");
            }
        }

        if !self.index.is_empty() {
            for (&fingerprint, _) in self.index.iter() {
                self.filter.add(fingerprint);
            }
            self.dirty = true;
            tracing::info!(
                segment_id = self.id,
                entries = self.index.len(),
                "bloom filter rebuilt from index"
            );
        }
    }

    /// Write the filter in its unpacked on-disk form
    pub fn save_filter(&self) -> Result<()> {
        fs::write(&self.filter_path, self.filter.to_bytes())?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current log length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of fingerprints in the local index
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn filter_path(&self) -> &Path {
        &self.filter_path
    }

    pub fn index(&self) -> &HashIndex<u64, u64> {
        &self.index
    }

    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_and_sync(&mut self, record: &[u8]) -> Result<()> {
        self.file.write_all(record)?;
        self.file.flush()?;

        self.unsynced += 1;
        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.file.sync_data()?;
            self.unsynced = 0;
        }
        Ok(())
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        if !self.dirty {
            return;
        }
        if let Err(e) = self.persist() {
            tracing::error!(
                segment_id = self.id,
                error = %e,
                "failed to persist segment on drop"
            );
        }
    }
}

fn to_array(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(bytes);
    out
}
