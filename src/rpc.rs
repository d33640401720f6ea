//! JSON-RPC transport for Ethereum nodes
//!
//! Sends one JSON-RPC 2.0 request per call and hands back the raw response
//! body. Every request waits for a permit from the shared rate limiter
//! first. Retrying is left to the caller.

use crate::error::{Error, Result};
use crate::limiter::RateLimiter;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Request id sent with every call. The endpoint echoes it back; nothing
/// correlates on it, so it never changes.
pub const REQUEST_ID: &str = "chainpulse";

/// Build the JSON-RPC 2.0 envelope for a call.
pub fn envelope(method: &str, params: Value) -> Value {
    let params = if params.is_null() { json!([]) } else { params };
    json!({
        "jsonrpc": "2.0",
        "id": REQUEST_ID,
        "method": method,
        "params": params
    })
}

/// Something that can carry a JSON-RPC request to a node.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send one request and return the raw response body.
    async fn send(&self, method: &str, params: Value) -> Result<Vec<u8>>;
}

/// HTTP transport posting JSON-RPC requests to a single endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    limiter: Arc<RateLimiter>,
}

impl HttpTransport {
    /// Create a transport for `url`, throttled by `limiter`.
    pub fn new(url: String, limiter: Arc<RateLimiter>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            url,
            limiter,
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, method: &str, params: Value) -> Result<Vec<u8>> {
        self.limiter.acquire().await;

        let request = envelope(method, params);
        debug!("rpc {} {}", method, request["params"]);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("failed to send {} request: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("failed to read {} response: {}", method, e)))?;
        Ok(body.to_vec())
    }
}
