//! Protocol Module
//!
//! Binary wire protocol between `segkv-cli` (or any client) and the server.
//!
//! ## Frame Format (lengths big-endian)
//! ```text
//! ┌──────────────┬──────────┬─────────────────────────────┐
//! │ Cmd/Status(1)│ Len (4)  │         Payload             │
//! └──────────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET    - Payload: key_len (4) + key
//! - 0x02: PUT    - Payload: key_len (4) + key + value
//! - 0x03: DELETE - Payload: key_len (4) + key
//! - 0x04: PING   - Payload: empty
//! - 0x05: SCAN   - Payload: empty
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR

mod codec;
mod command;
mod response;

pub use codec::{
    decode_command, decode_pairs, decode_response, encode_command, encode_pairs,
    encode_response, read_command, read_response, write_command, write_response, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType};
pub use response::{Response, Status};
