//! Record encoding
//!
//! Binary layout of a single log record and its CRC32 integrity check.

use std::io::{ErrorKind, Read};

use crate::error::{KvError, Result};

/// Size of the `record_len` prefix
pub const LEN_PREFIX_SIZE: usize = 4;

/// record_len (4) + key_len (4) + val_len (4) + flags (1) + reserved (1)
pub const HEADER_SIZE: usize = 14;

/// Trailing CRC32
pub const CHECKSUM_SIZE: usize = 4;

/// Position of the flags byte relative to the record start
pub const FLAGS_OFFSET: u64 = 12;

/// Bytes counted by `record_len` besides key and value:
/// key_len (4) + val_len (4) + flags (1) + reserved (1) + checksum (4)
pub const FIXED_BODY_SIZE: u64 = 14;

/// Flag value of a live record
pub const FLAG_ALIVE: u8 = 1;

/// Flag value of a tombstoned record
pub const FLAG_TOMBSTONE: u8 = 0;

/// Fixed-size prefix of every record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Length of everything after this field, checksum included
    pub record_len: u32,
    pub key_len: u32,
    pub val_len: u32,
    /// 1 = alive, 0 = tombstone
    pub flags: u8,
    /// Written as 0, carried through untouched
    pub reserved: u8,
}

impl RecordHeader {
    /// Header for a fresh record.
    ///
    /// An empty value is written as a tombstone. Fails if the record body
    /// would not fit in the `u32` length field.
    pub fn new(key_len: u32, val_len: u32) -> Result<Self> {
        let record_len = (FIXED_BODY_SIZE as u32)
            .checked_add(key_len)
            .and_then(|len| len.checked_add(val_len))
            .ok_or_else(|| {
                KvError::Storage(format!(
                    "record too large: key {} bytes, value {} bytes",
                    key_len, val_len
                ))
            })?;

        Ok(Self {
            record_len,
            key_len,
            val_len,
            flags: if val_len == 0 { FLAG_TOMBSTONE } else { FLAG_ALIVE },
            reserved: 0,
        })
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.record_len.to_le_bytes());
        out[4..8].copy_from_slice(&self.key_len.to_le_bytes());
        out[8..12].copy_from_slice(&self.val_len.to_le_bytes());
        out[12] = self.flags;
        out[13] = self.reserved;
        out
    }

    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            record_len: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            key_len: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            val_len: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            flags: bytes[12],
            reserved: bytes[13],
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.flags == FLAG_TOMBSTONE
    }

    /// Check `record_len` against the key and value lengths
    pub fn validate(&self) -> Result<()> {
        let expected = FIXED_BODY_SIZE + self.key_len as u64 + self.val_len as u64;
        if self.record_len as u64 != expected {
            return Err(KvError::Corruption(format!(
                "record_len {} does not match key_len {} + val_len {}",
                self.record_len, self.key_len, self.val_len
            )));
        }
        Ok(())
    }

    /// Bytes the whole record occupies on disk
    pub fn total_size(&self) -> u64 {
        LEN_PREFIX_SIZE as u64 + self.record_len as u64
    }
}

/// A decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: RecordHeader,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Checksum as stored on disk
    pub checksum: u32,
}

impl Record {
    pub fn is_tombstone(&self) -> bool {
        self.header.is_tombstone()
    }

    /// Recompute the checksum and compare it with the stored one.
    ///
    /// Tombstoned records fail this check once their flag has been flipped.
    pub fn verify(&self) -> bool {
        compute_checksum(&self.header, &self.key, &self.value) == self.checksum
    }

    /// Read one record from `reader`, which is positioned at a record start
    /// with `remaining` bytes left in the log.
    ///
    /// Returns `Ok(None)` at end of data, including a torn final record.
    /// A header whose lengths disagree is reported as corruption. The
    /// checksum is not verified here.
    pub fn read_from<R: Read>(reader: &mut R, remaining: u64) -> Result<Option<Self>> {
        if remaining < HEADER_SIZE as u64 {
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_SIZE];
        if !read_full(reader, &mut raw)? {
            return Ok(None);
        }

        let header = RecordHeader::decode(&raw);
        header.validate()?;

        if header.total_size() > remaining {
            return Ok(None);
        }

        let mut key = vec![0u8; header.key_len as usize];
        let mut value = vec![0u8; header.val_len as usize];
        let mut checksum = [0u8; CHECKSUM_SIZE];

        if !read_full(reader, &mut key)?
            || !read_full(reader, &mut value)?
            || !read_full(reader, &mut checksum)?
        {
            return Ok(None);
        }

        Ok(Some(Self {
            header,
            key,
            value,
            checksum: u32::from_le_bytes(checksum),
        }))
    }
}

/// CRC32 over key_len, val_len, flags, reserved, key and value
pub fn compute_checksum(header: &RecordHeader, key: &[u8], value: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header.encode()[LEN_PREFIX_SIZE..]);
    hasher.update(key);
    hasher.update(value);
    hasher.finalize()
}

/// Encode a complete record, ready to be appended in a single write
pub fn encode_record(key: &[u8], value: &[u8]) -> Result<Vec<u8>> {
    let too_large = || {
        KvError::Storage(format!(
            "record too large: key {} bytes, value {} bytes",
            key.len(),
            value.len()
        ))
    };
    let key_len = u32::try_from(key.len()).map_err(|_| too_large())?;
    let val_len = u32::try_from(value.len()).map_err(|_| too_large())?;

    let header = RecordHeader::new(key_len, val_len)?;
    let checksum = compute_checksum(&header, key, value);

    let mut out = Vec::with_capacity(header.total_size() as usize);
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(key);
    out.extend_from_slice(value);
    out.extend_from_slice(&checksum.to_le_bytes());
    Ok(out)
}

/// `read_exact` that reports a short read as `false` instead of an error
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}
