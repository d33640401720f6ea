//! Run configuration
//!
//! Resolves the JSON-RPC endpoint from the environment and validates the
//! knobs of a run before anything touches the network.

use crate::activity::CountingMode;
use crate::fetcher::{FailurePolicy, FetchConfig};
use anyhow::{Context, Result};
use std::time::Duration;

/// Environment variable holding the provider access token.
pub const ACCESS_TOKEN_VAR: &str = "ETH_ACCESS_TOKEN";

/// Environment variable holding a full endpoint URL.
pub const RPC_URL_VAR: &str = "ETH_RPC_URL";

/// Provider base the access token is appended to.
pub const DEFAULT_PROVIDER_BASE: &str = "https://go.getblock.io/";

/// Work out which endpoint to talk to.
///
/// An explicit URL wins. Otherwise the access token is spliced into the
/// default provider base as a path segment.
pub fn resolve_endpoint(rpc_url: Option<&str>, access_token: Option<&str>) -> Result<String> {
    if let Some(url) = rpc_url.map(str::trim).filter(|u| !u.is_empty()) {
        reqwest::Url::parse(url).with_context(|| format!("Invalid RPC URL: {}", url))?;
        return Ok(url.to_string());
    }

    let token = access_token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .with_context(|| {
            format!(
                "Access token not found. Set {} (or {} for a custom endpoint)",
                ACCESS_TOKEN_VAR, RPC_URL_VAR
            )
        })?;

    if token.contains('/') {
        anyhow::bail!("Access token must not contain '/'");
    }
    Ok(format!("{}{}/", DEFAULT_PROVIDER_BASE, token))
}

/// Everything a single run needs besides the endpoint.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of blocks in the window, ending at head
    pub blocks: usize,
    /// Number of addresses to report
    pub top: usize,
    pub mode: CountingMode,
    pub requests_per_second: u32,
    pub burst: u32,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_in_flight: usize,
    pub policy: FailurePolicy,
    /// Deadline for the fetch phase
    pub timeout: Option<Duration>,
    /// Deadline for each HTTP request
    pub request_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        let fetch = FetchConfig::default();
        Self {
            blocks: 100,
            top: 5,
            mode: CountingMode::default(),
            requests_per_second: 60,
            burst: 1,
            max_retries: fetch.max_retries,
            retry_delay: fetch.retry_delay,
            max_in_flight: fetch.max_in_flight,
            policy: fetch.policy,
            timeout: fetch.timeout,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RunConfig {
    /// Reject settings that would stall or make no sense.
    pub fn validate(&self) -> Result<()> {
        if self.requests_per_second == 0 {
            anyhow::bail!("Request rate must be at least 1 per second");
        }
        if self.burst == 0 {
            anyhow::bail!("Burst must be at least 1");
        }
        if self.max_in_flight == 0 {
            anyhow::bail!("Max in-flight fetches must be at least 1");
        }
        if self.request_timeout.is_zero() {
            anyhow::bail!("Request timeout must be non-zero");
        }
        if self.timeout.map_or(false, |t| t.is_zero()) {
            anyhow::bail!("Fetch timeout must be non-zero");
        }
        Ok(())
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            max_in_flight: self.max_in_flight,
            policy: self.policy,
            timeout: self.timeout,
        }
    }
}
