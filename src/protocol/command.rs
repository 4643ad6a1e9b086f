//! Command definitions
//!
//! Requests a client can send to the server.

use crate::error::{KvError, Result};

/// Command type byte as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Put = 0x02,
    Delete = 0x03,
    Ping = 0x04,
    Scan = 0x05,
}

impl TryFrom<u8> for CommandType {
    type Error = KvError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(CommandType::Get),
            0x02 => Ok(CommandType::Put),
            0x03 => Ok(CommandType::Delete),
            0x04 => Ok(CommandType::Ping),
            0x05 => Ok(CommandType::Scan),
            _ => Err(KvError::Protocol(format!(
                "unknown command type: 0x{:02x}",
                byte
            ))),
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Tombstone a key
    Delete { key: Vec<u8> },

    /// Health check
    Ping,

    /// Every live key-value pair
    Scan,
}

impl Command {
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Put { .. } => CommandType::Put,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
            Command::Scan => CommandType::Scan,
        }
    }

    /// Whether the command changes stored data
    pub fn is_write(&self) -> bool {
        matches!(self, Command::Put { .. } | Command::Delete { .. })
    }
}
