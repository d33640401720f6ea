//! chainpulse - most active addresses over the latest Ethereum blocks
//!
//! Fetches a window of recent blocks from a JSON-RPC endpoint and prints
//! the addresses with the most transactions in it.

use chainpulse::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so the listing on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
