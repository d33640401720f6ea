//! Error types for the block-retrieval pipeline
//!
//! Transport and decode failures are retried per block by the fetcher;
//! everything that escapes a fetch call is terminal for the run.

use alloy_primitives::U256;
use std::time::Duration;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network failure, non-2xx status or unreadable body.
    #[error("transport error: {0}")]
    Transport(String),

    /// Well-formed JSON-RPC response carrying an `error` object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Malformed or missing result, invalid hex.
    #[error("decode error: {0}")]
    Decode(String),

    /// Input too short to contain the slot being decoded.
    #[error("insufficient data: need {needed} hex chars, got {actual}")]
    InsufficientData { needed: usize, actual: usize },

    #[error("window of {count} blocks exceeds chain height {head}")]
    WindowExceedsChain { count: usize, head: U256 },

    /// A single slot of the window failed after exhausting its retries.
    #[error("block {height} (slot {index}) failed after {attempts} attempts: {source}")]
    BlockFetch {
        index: usize,
        height: U256,
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
