//! Worker Pool
//!
//! Fixed set of named threads draining a shared job queue.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::error::{KvError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A pool of worker threads fed through an unbounded channel
///
/// Dropping the pool closes the queue; workers finish every job already
/// queued and are then joined.
pub struct ThreadPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `size` workers named `segkv-worker-<n>`
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(KvError::Config("thread pool size must be > 0".to_string()));
        }

        let (sender, receiver) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for n in 0..size {
            let rx = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("segkv-worker-{}", n))
                .spawn(move || Self::worker_loop(rx))?;
            workers.push(handle);
        }

        tracing::debug!(workers = size, "thread pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Queue a job for the next idle worker
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| KvError::Network("thread pool is shut down".to_string()))?;
        sender
            .send(Box::new(job))
            .map_err(|_| KvError::Network("thread pool workers are gone".to_string()))
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    fn worker_loop(rx: Receiver<Job>) {
        while let Ok(job) = rx.recv() {
            // A panicking job must not take the worker down with it
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                tracing::error!(
                    worker = thread::current().name().unwrap_or("unnamed"),
                    "job panicked"
                );
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("worker thread panicked during shutdown");
            }
        }
        tracing::debug!("thread pool stopped");
    }
}
