//! SegKV Server Binary
//!
//! Opens a store and serves it over TCP.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use segkv::network::Server;
use segkv::{Config, StorageEngine, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// SegKV Server
#[derive(Parser, Debug)]
#[command(name = "segkv-server")]
#[command(about = "Segmented append-only key-value store server")]
#[command(version)]
struct Args {
    /// JSON config file; storage flags below are ignored when set
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(short, long, default_value = "./segkv_data")]
    data_dir: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: String,

    /// Segment rotation threshold in MB
    #[arg(short, long, default_value = "1")]
    segment_mb: u64,

    /// Worker threads serving connections
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// fsync every N records instead of every record
    #[arg(long)]
    sync_every: Option<usize>,
}

impl Args {
    fn into_config(self) -> segkv::Result<Config> {
        let base = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::builder()
                .data_dir(self.data_dir)
                .segment_size(self.segment_mb * 1024 * 1024)
                .thread_pool_size(self.threads)
                .build(),
        };

        let sync_strategy = match self.sync_every {
            Some(count) => SyncStrategy::EveryNEntries { count },
            None => base.sync_strategy,
        };

        Ok(Config {
            listen_addr: self.listen,
            max_connections: self.max_connections,
            sync_strategy,
            ..base
        })
    }
}

fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,segkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("SegKV Server v{}", segkv::VERSION);

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Listen address: {}", config.listen_addr);

    let engine = match StorageEngine::open(config.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!("Failed to open storage engine: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Weak, so the server still drops and joins its pool after run()
    let handle = Arc::downgrade(&server);
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received");
        if let Some(server) = handle.upgrade() {
            server.shutdown();
        }
    }) {
        tracing::error!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    // Workers hold engine clones until the pool is joined
    drop(server);
    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close() {
                tracing::error!("Failed to close storage engine: {}", e);
            }
        }
        Err(_) => tracing::warn!("Engine still shared at exit; relying on drop to persist"),
    }

    tracing::info!("Server stopped");
}
