//! Record Iterator
//!
//! Sequential iteration over every record in a segment log.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;

use super::record::Record;

/// Iterator over the records of one `.kv` file, in append order.
///
/// Yields `(offset, record)` pairs. Stops quietly at a torn final record;
/// stops after yielding the error if a header is inconsistent, since record
/// boundaries past that point are unknown.
pub struct RecordIterator<R> {
    reader: R,
    /// Offset of the next record
    offset: u64,
    /// Log length when iteration started
    end: u64,
    done: bool,
}

impl RecordIterator<BufReader<File>> {
    /// Open a segment log for a full scan
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let end = file.metadata()?.len();
        Ok(Self::new(BufReader::new(file), end))
    }
}

impl<R: Read> RecordIterator<R> {
    /// Iterate over `reader`, which holds `end` bytes of log from offset 0
    pub fn new(reader: R, end: u64) -> Self {
        Self {
            reader,
            offset: 0,
            end,
            done: false,
        }
    }

    /// Offset where the next record would start
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<R: Read> Iterator for RecordIterator<R> {
    type Item = Result<(u64, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.end {
            return None;
        }

        match Record::read_from(&mut self.reader, self.end - self.offset) {
            Ok(Some(record)) => {
                let at = self.offset;
                self.offset += record.header.total_size();
                Some(Ok((at, record)))
            }
            Ok(None) => {
                tracing::debug!(
                    offset = self.offset,
                    trailing = self.end - self.offset,
                    "partial record at end of log"
                );
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
