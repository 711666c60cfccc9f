//! embedkv Emulator Binary
//!
//! Serves an emulated storage owner over TCP.

use std::process;
use std::sync::Arc;

use clap::Parser;
use embedkv::emulator::PreferenceTable;
use embedkv::network::Server;
use embedkv::Config;
use parking_lot::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

/// embedkv storage-owner emulator
#[derive(Parser, Debug)]
#[command(name = "embedkv-emulator")]
#[command(about = "Emulated co-processor preference store served over TCP")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: String,

    /// Snapshot file; the table is volatile without one
    #[arg(short, long)]
    snapshot: Option<String>,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "4")]
    max_connections: usize,

    /// Idle read timeout per connection in milliseconds (0 = none)
    #[arg(long, default_value = "5000")]
    read_timeout_ms: u64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,embedkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("embedkv emulator v{}", embedkv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .read_timeout_ms(args.read_timeout_ms);
    if let Some(path) = &args.snapshot {
        builder = builder.snapshot_path(path);
    }
    let config = builder.build();

    let table = match &config.snapshot_path {
        Some(path) => {
            tracing::info!("Snapshot: {}", path.display());
            match PreferenceTable::open(path) {
                Ok(table) => table,
                Err(e) => {
                    tracing::error!("Failed to load snapshot: {}", e);
                    process::exit(1);
                }
            }
        }
        None => PreferenceTable::new(),
    };

    let server = match Server::bind(config, Arc::new(Mutex::new(table))) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        process::exit(1);
    }
}
