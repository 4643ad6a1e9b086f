//! SegKV CLI Client
//!
//! Command-line interface for a running segkv-server.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use segkv::protocol::{decode_pairs, read_response, write_command, Command, Response, Status};

/// SegKV CLI
#[derive(Parser, Debug)]
#[command(name = "segkv-cli")]
#[command(about = "CLI for the SegKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    server: String,

    /// Connect and I/O timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List every live key-value pair
    Scan,

    /// Ping the server
    Ping,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Get { key } => Command::Get {
                key: key.into_bytes(),
            },
            Commands::Set { key, value } => Command::Put {
                key: key.into_bytes(),
                value: value.into_bytes(),
            },
            Commands::Del { key } => Command::Delete {
                key: key.into_bytes(),
            },
            Commands::Scan => Command::Scan,
            Commands::Ping => Command::Ping,
        }
    }
}

fn send(server: &str, timeout: Duration, command: &Command) -> segkv::Result<Response> {
    let addr = server
        .parse::<SocketAddr>()
        .map_err(|e| segkv::KvError::Network(format!("invalid server address {}: {}", server, e)))?;
    let stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let mut writer = BufWriter::new(stream.try_clone()?);
    write_command(&mut writer, command)?;
    read_response(&mut BufReader::new(stream))
}

fn print_response(command: &Command, response: &Response) -> segkv::Result<()> {
    match response.status {
        Status::NotFound => println!("(nil)"),
        Status::Error => {
            let message = response.error_message().unwrap_or_default();
            eprintln!("(error) {}", message);
        }
        Status::Ok => match (command, &response.payload) {
            (Command::Scan, payload) => {
                let pairs = decode_pairs(payload.as_deref().unwrap_or(&[]))?;
                if pairs.is_empty() {
                    println!("(empty)");
                }
                for (key, value) in pairs {
                    println!(
                        "{} = {}",
                        String::from_utf8_lossy(&key),
                        String::from_utf8_lossy(&value)
                    );
                }
            }
            (_, Some(payload)) => println!("{}", String::from_utf8_lossy(payload)),
            (_, None) => println!("OK"),
        },
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let timeout = Duration::from_millis(args.timeout_ms);
    let command = Command::from(args.command);

    let result = send(&args.server, timeout, &command)
        .and_then(|response| print_response(&command, &response).map(|()| response.status));

    match result {
        Ok(Status::Error) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("segkv-cli: {}", e);
            ExitCode::FAILURE
        }
    }
}
