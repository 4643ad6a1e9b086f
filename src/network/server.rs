//! TCP Server
//!
//! Accepts connections and hands each one to the worker pool.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::engine::StorageEngine;
use crate::error::{KvError, Result};
use crate::protocol::{write_response, Response};

use super::{Connection, ThreadPool};

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for SegKV
///
/// The listener is non-blocking so the accept loop can notice
/// [`Server::shutdown`] between polls.
pub struct Server {
    config: Config,
    engine: Arc<StorageEngine>,
    listener: TcpListener,
    pool: ThreadPool,
    /// Connections currently being served
    active: Arc<AtomicUsize>,
    shutdown: AtomicBool,
}

impl Server {
    /// Bind the listen address from `config` and start the worker pool
    pub fn bind(config: Config, engine: Arc<StorageEngine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            KvError::Network(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        let pool = ThreadPool::new(config.thread_pool_size)?;

        tracing::info!(
            addr = %listener.local_addr()?,
            workers = config.thread_pool_size,
            max_connections = config.max_connections,
            "server listening"
        );

        Ok(Self {
            config,
            engine,
            listener,
            pool,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept clients until [`Server::shutdown`] is called (blocking)
    pub fn run(&self) -> Result<()> {
        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = self.dispatch(stream) {
                        tracing::warn!(peer = %addr, error = %e, "failed to dispatch connection");
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                    return Err(e.into());
                }
            }
        }

        tracing::info!("server stopped accepting connections");
        Ok(())
    }

    /// Ask the accept loop to stop; connections already being served finish
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    fn dispatch(&self, stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;

        if self.active.load(Ordering::Acquire) >= self.config.max_connections {
            tracing::warn!(
                limit = self.config.max_connections,
                "connection limit reached; rejecting client"
            );
            let mut stream = stream;
            write_response(&mut stream, &Response::error("too many connections"))?;
            return Ok(());
        }

        let mut connection = Connection::new(stream, Arc::clone(&self.engine))?;
        connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;

        let active = Arc::clone(&self.active);
        active.fetch_add(1, Ordering::AcqRel);

        let queued = self.pool.execute(move || {
            if let Err(e) = connection.handle() {
                tracing::debug!(peer = %connection.peer_addr(), error = %e, "connection closed with error");
            }
            active.fetch_sub(1, Ordering::AcqRel);
        });

        if queued.is_err() {
            self.active.fetch_sub(1, Ordering::AcqRel);
        }
        queued
    }
}
