//! Room dashboard TUI entry point.
//!
//! # Usage
//!
//! ```bash
//! # Local backend on the default port
//! roomsync-tui
//!
//! # Remote backend, logs to a file
//! roomsync-tui --server http://10.0.0.5:5000 --log-file roomsync.log --log-level debug
//! ```

use std::{fs::File, path::PathBuf, sync::Mutex, time::Duration};

use clap::Parser;
use roomsync_client::{ClientConfig, DEFAULT_BASE_URL};
use roomsync_tui::{Runtime, TerminalDriver};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Room climate dashboard
#[derive(Parser, Debug)]
#[command(name = "roomsync-tui")]
#[command(about = "Terminal dashboard for room climate control")]
#[command(version)]
struct Args {
    /// Backend base URL
    #[arg(short, long, default_value = DEFAULT_BASE_URL)]
    server: String,

    /// Seconds to wait before reconnecting the update stream
    #[arg(long, default_value_t = 5)]
    reconnect_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write logs to this file
    ///
    /// The terminal is owned by the UI, so without a file nothing is logged.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        },
        None => None,
    };
    tracing_subscriber::registry().with(file_layer).with(filter).init();

    let config = ClientConfig {
        base_url: args.server,
        reconnect_delay: Duration::from_secs(args.reconnect_secs),
    };
    tracing::info!(server = %config.base_url, "room dashboard starting");

    let reconnect_delay = config.reconnect_delay;
    let driver = TerminalDriver::new(config)?;
    let runtime = Runtime::new(driver, reconnect_delay);

    Ok(runtime.run().await?)
}
