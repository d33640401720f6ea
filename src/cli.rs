//! CLI implementation for chainpulse
//!
//! Parses arguments, wires transport, reader, fetcher and tracker
//! together, and prints the ranked listing.

use crate::activity::{fold_blocks, ActivityTracker, AddressActivity, CountingMode};
use crate::chain::ChainReader;
use crate::config::{resolve_endpoint, RunConfig};
use crate::fetcher::{BlockFetcher, FailurePolicy};
use crate::limiter::RateLimiter;
use crate::rpc::{HttpTransport, RpcTransport};
use alloy_primitives::U256;
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Most active addresses over the latest blocks
#[derive(Parser, Debug)]
#[command(name = "chainpulse")]
#[command(about = "Rank the most active addresses over the latest blocks of an Ethereum chain")]
pub struct Cli {
    /// Number of blocks to sample, ending at the chain head
    #[arg(short, long, default_value_t = 100, env = "CHAINPULSE_BLOCKS")]
    pub blocks: usize,

    /// Number of addresses to report
    #[arg(short, long, default_value_t = 5, env = "CHAINPULSE_TOP")]
    pub top: usize,

    /// Which transactions count towards activity
    #[arg(short, long, value_enum, default_value_t = CountingMode::Erc20Only, env = "CHAINPULSE_MODE")]
    pub mode: CountingMode,

    /// Full JSON-RPC endpoint URL (overrides the access token)
    #[arg(long, env = "ETH_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Provider access token
    #[arg(long, env = "ETH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Request rate ceiling, shared by all concurrent fetches
    #[arg(long, default_value_t = 60, env = "CHAINPULSE_RPS")]
    pub rps: u32,

    /// Requests allowed back to back after an idle period
    #[arg(long, default_value_t = 1, env = "CHAINPULSE_BURST")]
    pub burst: u32,

    /// Retries per block after the first attempt
    #[arg(long, default_value_t = 3, env = "CHAINPULSE_MAX_RETRIES")]
    pub max_retries: u32,

    /// Pause between attempts for the same block, in milliseconds
    #[arg(long, default_value_t = 2000, env = "CHAINPULSE_RETRY_DELAY_MS")]
    pub retry_delay_ms: u64,

    /// Blocks fetched at the same time
    #[arg(long, default_value_t = 16, env = "CHAINPULSE_MAX_IN_FLIGHT")]
    pub max_in_flight: usize,

    /// What to do when some blocks cannot be fetched
    #[arg(long, value_enum, default_value_t = FailurePolicy::Strict, env = "CHAINPULSE_POLICY")]
    pub policy: FailurePolicy,

    /// Give up on the whole fetch after this many seconds
    #[arg(long, env = "CHAINPULSE_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 30, env = "CHAINPULSE_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// Print the report as pretty JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            blocks: self.blocks,
            top: self.top,
            mode: self.mode,
            requests_per_second: self.rps,
            burst: self.burst,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_in_flight: self.max_in_flight,
            policy: self.policy,
            timeout: self.timeout_secs.map(Duration::from_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Outcome of one scan.
#[derive(Debug, Serialize)]
pub struct Report {
    pub head: U256,
    pub blocks_requested: usize,
    pub blocks_fetched: usize,
    /// Window slots that could not be fetched (partial policy only)
    pub failed_slots: Vec<usize>,
    pub top: Vec<AddressActivity>,
}

/// Fetch the window and rank its addresses.
pub async fn scan<T: RpcTransport>(fetcher: &BlockFetcher<T>, config: &RunConfig) -> Result<Report> {
    info!("Retrieving latest {} blocks...", config.blocks);
    let window = fetcher
        .fetch_window(config.blocks)
        .await
        .context("Failed to fetch blocks")?;

    let head = window.head;
    let failed_slots: Vec<usize> = window.failures.iter().map(|f| f.index).collect();
    let blocks = window.into_blocks();

    info!("Calculating activity metrics...");
    let mut tracker = ActivityTracker::new(config.mode);
    fold_blocks(&mut tracker, &blocks);
    info!(
        "Counted {} transactions across {} addresses",
        tracker.transactions_counted(),
        tracker.distinct_addresses()
    );

    Ok(Report {
        head,
        blocks_requested: config.blocks,
        blocks_fetched: blocks.len(),
        failed_slots,
        top: tracker.top_addresses(config.top),
    })
}

/// Write the human-readable listing.
pub fn render_text<W: Write>(report: &Report, top: usize, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "Top {} active addresses for last {} blocks:",
        top, report.blocks_requested
    )?;
    for (i, entry) in report.top.iter().enumerate() {
        writeln!(
            out,
            "{}. Address: 0x{:x}, Activity: {}",
            i + 1,
            entry.address,
            entry.activity
        )?;
    }
    if !report.failed_slots.is_empty() {
        writeln!(
            out,
            "({} of {} blocks could not be fetched and were skipped)",
            report.failed_slots.len(),
            report.blocks_requested
        )?;
    }
    Ok(())
}

/// Run a scan against the configured endpoint and print the result.
pub async fn execute<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let config = cli.run_config();
    config.validate()?;

    let endpoint = resolve_endpoint(cli.rpc_url.as_deref(), cli.access_token.as_deref())?;
    let limiter = Arc::new(RateLimiter::new(config.requests_per_second, config.burst));
    let transport = HttpTransport::new(endpoint, limiter, config.request_timeout)
        .context("Failed to build HTTP client")?;
    let fetcher = BlockFetcher::new(ChainReader::new(transport), config.fetch_config());

    let report = scan(&fetcher, &config).await?;

    if cli.json {
        serde_json::to_writer_pretty(&mut *out, &report).context("Failed to write JSON report")?;
        writeln!(out)?;
    } else {
        render_text(&report, config.top, out)?;
    }
    Ok(())
}

/// Entry point used by the binary.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    execute(cli, &mut stdout).await
}
