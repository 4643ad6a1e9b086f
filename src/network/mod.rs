//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread polling a non-blocking listener
//! - Worker thread pool; one connection occupies one worker until it closes
//! - Commands routed through a shared [`crate::StorageEngine`]

mod connection;
mod pool;
mod server;

pub use connection::Connection;
pub use pool::ThreadPool;
pub use server::Server;
