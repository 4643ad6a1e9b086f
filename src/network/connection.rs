//! Connection Handler
//!
//! Serves one client: read a command, execute it, write the response, repeat.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::StorageEngine;
use crate::error::{KvError, Result};
use crate::protocol::{read_command, write_response, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared storage engine
    engine: Arc<StorageEngine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Wrap an accepted stream
    pub fn new(stream: TcpStream, engine: Arc<StorageEngine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Request/response traffic; don't wait to coalesce small writes
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            engine,
            peer_addr,
        })
    }

    /// Configure read and write timeouts; 0 leaves a direction unbounded
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let to_duration = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));
        self.reader
            .get_ref()
            .set_read_timeout(to_duration(read_ms))?;
        self.writer
            .get_ref()
            .set_write_timeout(to_duration(write_ms))?;
        Ok(())
    }

    /// Serve requests until the client goes away
    ///
    /// Disconnects and idle timeouts end the loop with `Ok`. A malformed
    /// frame gets an ERROR response before the connection is dropped, since
    /// the stream position is unknown afterwards.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "connection established");

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(command) => command,
                Err(KvError::Io(ref e)) if ends_session(e.kind()) => {
                    tracing::debug!(peer = %self.peer_addr, reason = ?e.kind(), "client gone");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "bad request");
                    let _ = write_response(&mut self.writer, &Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!(peer = %self.peer_addr, ?command, "received command");
            let response = Response::from_result(self.engine.execute(command));

            match write_response(&mut self.writer, &response) {
                Ok(()) => {}
                Err(KvError::Io(ref e)) if ends_session(e.kind()) => {
                    tracing::debug!(
                        peer = %self.peer_addr,
                        "client disconnected before response could be sent"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "write failed");
                    return Err(e);
                }
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// I/O outcomes that mean the client left or went idle, not that it misbehaved
fn ends_session(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            // Read timeouts surface as WouldBlock on Unix and TimedOut on Windows
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
