//! Protocol codec
//!
//! Framing plus encoding and decoding of commands, responses and scan
//! payloads. Every frame is `type (1) + payload_len (4, BE) + payload`.
//!
//! Scan payloads are a concatenation of
//! ```text
//! ┌─────────────┬─────┬─────────────┬───────┐
//! │ KeyLen (4)  │ Key │ ValLen (4)  │ Value │  ... repeated
//! └─────────────┴─────┴─────────────┴───────┘
//! ```

use std::io::{Read, Write};

use crate::error::{KvError, Result};

use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

fn encode_frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(kind);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Reject payloads the receiving side would refuse to read
fn check_payload_len(len: usize) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE as usize {
        return Err(KvError::Protocol(format!(
            "payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

/// Validate a frame header and return (kind, payload length)
fn parse_header(header: &[u8]) -> Result<(u8, usize)> {
    if header.len() < HEADER_SIZE {
        return Err(KvError::Protocol(format!(
            "incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            header.len()
        )));
    }

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok((header[0], payload_len as usize))
}

/// Split a complete frame into (kind, payload)
fn split_frame(bytes: &[u8]) -> Result<(u8, &[u8])> {
    let (kind, payload_len) = parse_header(bytes)?;
    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(KvError::Protocol(format!(
            "incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }
    Ok((kind, &bytes[HEADER_SIZE..total_len]))
}

/// Read one whole frame from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let (_, payload_len) = parse_header(&header)?;

    let mut frame = vec![0u8; HEADER_SIZE + payload_len];
    frame[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut frame[HEADER_SIZE..])?;
    Ok(frame)
}

/// Read a big-endian length-prefixed byte string starting at `*pos`
fn take_prefixed<'a>(bytes: &'a [u8], pos: &mut usize, what: &str) -> Result<&'a [u8]> {
    let Some(len_bytes) = bytes.get(*pos..*pos + 4) else {
        return Err(KvError::Protocol(format!("{}: missing length", what)));
    };
    let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    let start = *pos + 4;

    let Some(data) = bytes.get(start..start + len) else {
        return Err(KvError::Protocol(format!(
            "{}: incomplete data (expected {}, got {})",
            what,
            len,
            bytes.len() - start
        )));
    };
    *pos = start + len;
    Ok(data)
}

fn put_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = Vec::new();
    match command {
        Command::Get { key } | Command::Delete { key } => {
            put_prefixed(&mut payload, key);
        }
        Command::Put { key, value } => {
            payload.reserve(4 + key.len() + value.len());
            put_prefixed(&mut payload, key);
            payload.extend_from_slice(value);
        }
        Command::Ping | Command::Scan => {}
    }
    encode_frame(command.command_type() as u8, &payload)
}

/// Decode a command from one complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (kind, payload) = split_frame(bytes)?;
    let command_type = CommandType::try_from(kind)?;

    let mut pos = 0;
    match command_type {
        CommandType::Get => {
            let key = take_prefixed(payload, &mut pos, "GET key")?.to_vec();
            Ok(Command::Get { key })
        }
        CommandType::Put => {
            let key = take_prefixed(payload, &mut pos, "PUT key")?.to_vec();
            let value = payload[pos..].to_vec();
            Ok(Command::Put { key, value })
        }
        CommandType::Delete => {
            let key = take_prefixed(payload, &mut pos, "DELETE key")?.to_vec();
            Ok(Command::Delete { key })
        }
        CommandType::Ping | CommandType::Scan => {
            if !payload.is_empty() {
                return Err(KvError::Protocol(format!(
                    "{:?} command: unexpected payload of {} bytes",
                    command_type,
                    payload.len()
                )));
            }
            Ok(if command_type == CommandType::Ping {
                Command::Ping
            } else {
                Command::Scan
            })
        }
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// The length field only holds payloads up to [`MAX_PAYLOAD_SIZE`];
/// [`write_response`] refuses anything larger.
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    encode_frame(response.status as u8, payload)
}

/// Decode a response from one complete frame
///
/// An empty payload decodes as `None`.
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (kind, payload) = split_frame(bytes)?;
    let status = Status::try_from(kind)?;
    let payload = (!payload.is_empty()).then(|| payload.to_vec());
    Ok(Response { status, payload })
}

// =============================================================================
// Scan Payloads
// =============================================================================

/// Encode key-value pairs as a SCAN payload
pub fn encode_pairs(pairs: &[(Vec<u8>, Vec<u8>)]) -> Vec<u8> {
    let size = pairs.iter().map(|(k, v)| 8 + k.len() + v.len()).sum();
    let mut out = Vec::with_capacity(size);
    for (key, value) in pairs {
        put_prefixed(&mut out, key);
        put_prefixed(&mut out, value);
    }
    out
}

/// Decode a SCAN payload
pub fn decode_pairs(bytes: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut pairs = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let key = take_prefixed(bytes, &mut pos, "SCAN key")?.to_vec();
        let value = take_prefixed(bytes, &mut pos, "SCAN value")?.to_vec();
        pairs.push((key, value));
    }
    Ok(pairs)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let frame = encode_command(command);
    check_payload_len(frame.len() - HEADER_SIZE)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
///
/// Fails without writing anything if the payload exceeds [`MAX_PAYLOAD_SIZE`].
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    check_payload_len(response.payload.as_ref().map_or(0, Vec::len))?;
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
