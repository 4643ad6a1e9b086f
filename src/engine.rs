//! Engine Module
//!
//! The public key-value facade over the segment store.
//!
//! ## Responsibilities
//! - Fingerprint keys
//! - Gate concurrent access with one reader/writer lock
//! - Re-read and verify records on the hit path instead of trusting the index
//! - Flip tombstone flags in place on erase
//! - Full-scan export of all live pairs

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::hash::fingerprint;
use crate::protocol::{encode_pairs, Command, MAX_PAYLOAD_SIZE};
use crate::storage::record::{FLAGS_OFFSET, FLAG_TOMBSTONE};
use crate::storage::{
    list_log_files, segment_log_path, Record, RecordIterator, SegmentManager, SegmentOffset,
    SegmentOptions,
};

/// The storage engine
///
/// ## Concurrency Model
///
/// - **Writes** (put/erase): exclusive `lock` for the whole operation
/// - **Reads** (get): shared `lock` only while resolving the record location;
///   the file read and checksum verification run unlocked. Sealed segment
///   files are never deleted, so a resolved location stays valid across
///   rotations.
/// - **Scans** (get_all): no lock; a best-effort snapshot that may miss
///   records appended while it runs
///
/// Every per-record failure on the read path (missing file, torn record,
/// key mismatch, checksum mismatch) is logged and reported as "not found".
pub struct StorageEngine {
    /// Engine configuration
    config: Config,

    /// Directory holding every segment file
    dir: PathBuf,

    /// Owner of all segments
    segments: SegmentManager,

    /// Orders puts and erases against lookups
    lock: RwLock<()>,
}

impl StorageEngine {
    /// Open or create a store with the given config
    ///
    /// Fails if the config is invalid or the data directory cannot be
    /// created; both are unrecoverable for the caller.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let dir = config.data_dir.clone();
        let segments = SegmentManager::open(&dir, SegmentOptions::from(&config))?;

        tracing::info!(
            dir = %dir.display(),
            segment_size = config.segment_size,
            segments = segments.segment_count(),
            "storage engine opened"
        );

        Ok(Self {
            config,
            dir,
            segments,
            lock: RwLock::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a protocol command
    ///
    /// `Ok(None)` means success without payload; absent keys surface as
    /// [`KvError::KeyNotFound`]. A scan whose payload would not fit in one
    /// frame fails with [`KvError::Protocol`].
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some).ok_or(KvError::KeyNotFound),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                if self.erase(&key)? {
                    Ok(None)
                } else {
                    Err(KvError::KeyNotFound)
                }
            }
            Command::Scan => {
                let payload = encode_pairs(&self.get_all()?);
                if payload.len() > MAX_PAYLOAD_SIZE as usize {
                    return Err(KvError::Protocol(format!(
                        "scan result too large: {} bytes (max {})",
                        payload.len(),
                        MAX_PAYLOAD_SIZE
                    )));
                }
                Ok(Some(payload))
            }
            Command::Ping => Ok(Some(b"PONG".to_vec())),
        }
    }

    /// Store a key-value pair
    ///
    /// An empty value is written as a tombstone, so it reads back as absent.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let fingerprint = fingerprint(key);
        let _write_guard = self.lock.write();
        self.segments.append(fingerprint, key, value)?;
        Ok(())
    }

    /// Get the value stored for a key
    ///
    /// Tombstoned, mismatched and corrupt records all read as `None`.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let fingerprint = fingerprint(key);
        let location = {
            let _read_guard = self.lock.read();
            self.segments.lookup(fingerprint)?
        };

        match self.read_live_value(location, key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    segment_id = location.segment_id,
                    offset = location.offset,
                    error = %e,
                    "unreadable record treated as missing"
                );
                None
            }
        }
    }

    /// Tombstone the newest record for a key by rewriting its flag byte
    ///
    /// Returns `true` if a record for the key was found, even if it was
    /// already a tombstone.
    pub fn erase(&self, key: &[u8]) -> Result<bool> {
        let fingerprint = fingerprint(key);
        let _write_guard = self.lock.write();

        let Some(location) = self.segments.lookup(fingerprint) else {
            return Ok(false);
        };

        let path = segment_log_path(&self.dir, location.segment_id);
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let record = match Self::read_record(&mut file, location) {
            Ok(record) => record,
            Err(KvError::Corruption(msg)) => {
                tracing::warn!(
                    segment_id = location.segment_id,
                    offset = location.offset,
                    "cannot erase corrupt record: {}",
                    msg
                );
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if record.key != key {
            // Fingerprint collision; the indexed record belongs to another key
            return Ok(false);
        }
        if record.is_tombstone() {
            return Ok(true);
        }

        file.seek(SeekFrom::Start(location.offset + FLAGS_OFFSET))?;
        file.write_all(&[FLAG_TOMBSTONE])?;
        file.sync_data()?;

        tracing::debug!(
            segment_id = location.segment_id,
            offset = location.offset,
            "record tombstoned"
        );
        Ok(true)
    }

    /// Every live key-value pair, by full scan of every `.kv` log in the
    /// data directory
    ///
    /// Segment logs are read in id order after any other `.kv` files, and
    /// the latest record for each key wins; tombstoned and corrupt records
    /// hide the key. Indexes and filters are not consulted. Pairs come back
    /// sorted by key.
    pub fn get_all(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut latest: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();

        for path in list_log_files(&self.dir)? {
            let records = match RecordIterator::open(&path) {
                Ok(records) => records,
                Err(KvError::Io(e)) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            for item in records {
                let (offset, record) = match item {
                    Ok(item) => item,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "stopping scan of log");
                        break;
                    }
                };

                let value = if record.is_tombstone() {
                    None
                } else if record.verify() {
                    Some(record.value)
                } else {
                    tracing::warn!(path = %path.display(), offset, "checksum mismatch during scan");
                    None
                };
                latest.insert(record.key, value);
            }
        }

        Ok(latest
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect())
    }

    /// Close the engine gracefully
    ///
    /// Writes the active segment's index and filter to disk
    pub fn close(self) -> Result<()> {
        let _write_guard = self.lock.write();
        self.segments.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.dir
    }

    /// Get the number of segments, active included
    pub fn segment_count(&self) -> usize {
        self.segments.segment_count()
    }

    /// Get the id of the segment receiving appends
    pub fn active_segment_id(&self) -> u64 {
        self.segments.active_segment_id()
    }

    /// Get the segment manager
    pub fn segments(&self) -> &SegmentManager {
        &self.segments
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Read, check and decode the record at `location` (no lock held)
    fn read_live_value(&self, location: SegmentOffset, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let path = segment_log_path(&self.dir, location.segment_id);
        let mut file = File::open(&path)?;
        let record = Self::read_record(&mut file, location)?;

        // The checksum predates any erase, so tombstones are decided first
        if record.is_tombstone() {
            return Ok(None);
        }
        if record.key != key {
            return Err(KvError::Corruption(
                "stored key differs from requested key".to_string(),
            ));
        }
        if !record.verify() {
            return Err(KvError::Corruption(format!(
                "checksum mismatch (stored 0x{:08x})",
                record.checksum
            )));
        }

        Ok(Some(record.value))
    }

    /// Decode the record at `location` from an open segment log
    fn read_record(file: &mut File, location: SegmentOffset) -> Result<Record> {
        let len = file.metadata()?.len();
        if location.offset >= len {
            return Err(KvError::Corruption(format!(
                "offset {} beyond end of segment {} ({} bytes)",
                location.offset, location.segment_id, len
            )));
        }

        file.seek(SeekFrom::Start(location.offset))?;
        let mut reader = BufReader::new(file);
        Record::read_from(&mut reader, len - location.offset)?.ok_or_else(|| {
            KvError::Corruption(format!(
                "truncated record at offset {} of segment {}",
                location.offset, location.segment_id
            ))
        })
    }
}
