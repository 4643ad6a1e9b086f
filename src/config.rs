//! Configuration for SegKV
//!
//! Centralized configuration with sensible defaults, a builder, and a JSON
//! file loader for the server binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{KvError, Result};

/// Main configuration for a SegKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding every segment of the store
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── segment_1.kv     (record log)
    ///     ├── segment_1.idx    (serialized hash index)
    ///     ├── segment_1.bf     (serialized bloom filter)
    ///     └── segment_2.kv ...
    pub data_dir: PathBuf,

    /// Soft size bound of a segment log (in bytes)
    pub segment_size: u64,

    /// Extension of the index companion file, including the leading dot
    pub index_extension: String,

    /// Extension of the bloom filter companion file, including the leading dot
    pub bloom_extension: String,

    /// Number of bits in each segment's bloom filter
    pub bloom_bits: usize,

    /// Number of probe positions per fingerprint
    pub bloom_hashes: usize,

    /// Durability strategy for appended records
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Worker threads serving client connections
    pub thread_pool_size: usize,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// When appended records are forced to stable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every record (safest, slowest)
    EveryWrite,

    /// fsync after N appended records (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./segkv_data"),
            segment_size: 1024 * 1024, // 1 MB
            index_extension: ".idx".to_string(),
            bloom_extension: ".bf".to_string(),
            bloom_bits: 8 * 1024,
            bloom_hashes: 4,
            sync_strategy: SyncStrategy::EveryWrite,
            listen_addr: "127.0.0.1:7878".to_string(),
            thread_pool_size: 4,
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a config from a JSON file.
    ///
    /// Recognised keys: `data_dir`, `segment_size_mb`, `index_extension`,
    /// `bloom_extension`, `bloom_bits_kb`, `bloom_hashes`, `thread_pool_size`.
    /// Only the first two are required.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            KvError::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        if raw.trim().is_empty() {
            return Err(KvError::Config(format!(
                "config file is empty: {}",
                path.display()
            )));
        }

        let file: ConfigFile = serde_json::from_str(&raw)?;
        let config = file.into_config();
        config.validate()?;

        tracing::info!(data_dir = %config.data_dir.display(), "config loaded");
        Ok(config)
    }

    /// Reject values the storage layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.segment_size == 0 {
            return Err(KvError::Config("segment_size must be > 0".to_string()));
        }
        if self.bloom_bits == 0 {
            return Err(KvError::Config("bloom_bits must be > 0".to_string()));
        }
        if self.bloom_hashes == 0 {
            return Err(KvError::Config("bloom_hashes must be > 0".to_string()));
        }
        if self.thread_pool_size == 0 {
            return Err(KvError::Config("thread_pool_size must be > 0".to_string()));
        }
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(KvError::Config("sync count must be > 0".to_string()));
        }
        for ext in [&self.index_extension, &self.bloom_extension] {
            if !ext.starts_with('.') || ext.len() < 2 || ext == ".kv" {
                return Err(KvError::Config(format!(
                    "invalid companion file extension: {:?}",
                    ext
                )));
            }
        }
        if self.index_extension == self.bloom_extension {
            return Err(KvError::Config(
                "index and bloom extensions must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// On-disk shape of the JSON config file
#[derive(Debug, Deserialize)]
struct ConfigFile {
    data_dir: PathBuf,
    segment_size_mb: u64,
    #[serde(default = "default_index_extension")]
    index_extension: String,
    #[serde(default = "default_bloom_extension")]
    bloom_extension: String,
    #[serde(default = "default_bloom_bits_kb")]
    bloom_bits_kb: usize,
    #[serde(default = "default_bloom_hashes")]
    bloom_hashes: usize,
    #[serde(default = "default_thread_pool_size")]
    thread_pool_size: usize,
}

fn default_index_extension() -> String {
    ".idx".to_string()
}

fn default_bloom_extension() -> String {
    ".bf".to_string()
}

fn default_bloom_bits_kb() -> usize {
    8
}

fn default_bloom_hashes() -> usize {
    4
}

fn default_thread_pool_size() -> usize {
    4
}

impl ConfigFile {
    fn into_config(self) -> Config {
        Config::builder()
            .data_dir(self.data_dir)
            .segment_size(self.segment_size_mb * 1024 * 1024)
            .index_extension(self.index_extension)
            .bloom_extension(self.bloom_extension)
            .bloom_bits(self.bloom_bits_kb * 1024)
            .bloom_hashes(self.bloom_hashes)
            .thread_pool_size(self.thread_pool_size)
            .build()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all segments)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the segment rotation threshold (in bytes)
    pub fn segment_size(mut self, size: u64) -> Self {
        self.config.segment_size = size;
        self
    }

    /// Set the index companion file extension
    pub fn index_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.index_extension = ext.into();
        self
    }

    /// Set the bloom filter companion file extension
    pub fn bloom_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.bloom_extension = ext.into();
        self
    }

    /// Set the bloom filter size (in bits)
    pub fn bloom_bits(mut self, bits: usize) -> Self {
        self.config.bloom_bits = bits;
        self
    }

    /// Set the number of bloom filter probes
    pub fn bloom_hashes(mut self, hashes: usize) -> Self {
        self.config.bloom_hashes = hashes;
        self
    }

    /// Set the record sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of connection worker threads
    pub fn thread_pool_size(mut self, size: usize) -> Self {
        self.config.thread_pool_size = size;
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
