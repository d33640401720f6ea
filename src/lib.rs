//! chainpulse - Ethereum address activity over a window of recent blocks
//!
//! This library fetches the latest blocks from a JSON-RPC endpoint under a
//! shared rate limit, retrying individual blocks, and ranks addresses by
//! how many transactions they took part in.

pub mod activity;
pub mod chain;
pub mod cli;
pub mod config;
pub mod erc20;
pub mod error;
pub mod fetcher;
pub mod limiter;
pub mod rpc;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export the main types for convenience
pub use activity::{ActivityTracker, AddressActivity, BlockTracker, CountingMode};
pub use chain::ChainReader;
pub use error::{Error, Result};
pub use fetcher::{BlockFetcher, FailurePolicy, FetchConfig, Window};
pub use limiter::RateLimiter;
pub use rpc::{HttpTransport, RpcTransport};
pub use types::{Block, Transaction};
