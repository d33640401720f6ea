//! In-memory JSON-RPC node for tests

use crate::error::{Error, Result};
use crate::rpc::RpcTransport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ADDR_X: &str = "0x1111111111111111111111111111111111111111";
pub const ADDR_Y: &str = "0x2222222222222222222222222222222222222222";
pub const ADDR_Z: &str = "0x3333333333333333333333333333333333333333";
pub const ADDR_W: &str = "0xabababababababababababababababababababab";
pub const TOKEN: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

/// Plain transaction JSON with empty call data.
pub fn plain_tx(from: &str, to: Option<&str>) -> Value {
    json!({
        "hash": format!("0x{}", "ab".repeat(32)),
        "from": from,
        "to": to,
        "value": "0x1",
        "input": "0x"
    })
}

/// ERC-20 `transfer(recipient, amount)` call data for a 40-hex-char recipient.
pub fn transfer_input(recipient: &str) -> String {
    let recipient = recipient.strip_prefix("0x").unwrap_or(recipient);
    format!("0xa9059cbb{}{}{}", "0".repeat(24), recipient, format!("{:064x}", 1_000_000u64))
}

/// Transaction JSON calling `transfer` on `token`.
pub fn erc20_tx(from: &str, token: &str, recipient: &str) -> Value {
    json!({
        "hash": format!("0x{}", "cd".repeat(32)),
        "from": from,
        "to": token,
        "value": "0x0",
        "input": transfer_input(recipient)
    })
}

pub fn block_json(height: u64, transactions: Vec<Value>) -> Value {
    json!({
        "number": format!("0x{:x}", height),
        "hash": format!("0x{:064x}", height + 1),
        "parentHash": format!("0x{:064x}", height),
        "timestamp": format!("0x{:x}", 1_700_000_000u64 + height * 12),
        "transactions": transactions
    })
}

#[derive(Default)]
struct NodeState {
    blocks: HashMap<u64, Value>,
    /// Remaining transient failures per height
    flaky: HashMap<u64, u32>,
    requests: Vec<(String, Value)>,
}

/// Fake node serving `eth_blockNumber` and `eth_getBlockByNumber`.
///
/// Heights without an explicit block get an empty one; heights above the
/// head answer `null`. Each request takes `latency` of (virtual) time.
#[derive(Clone)]
pub struct MockNode {
    head: u64,
    latency: Duration,
    state: Arc<Mutex<NodeState>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockNode {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            latency: Duration::ZERO,
            state: Arc::default(),
            in_flight: Arc::default(),
            peak_in_flight: Arc::default(),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_block(&self, height: u64, block: Value) {
        self.state.lock().unwrap().blocks.insert(height, block);
    }

    /// Fail the next `times` requests for `height` with a transport error.
    pub fn fail_block(&self, height: u64, times: u32) {
        self.state.lock().unwrap().flaky.insert(height, times);
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn block_requests(&self, height: u64) -> usize {
        let tag = json!(format!("0x{:x}", height));
        self.requests()
            .iter()
            .filter(|(method, params)| method == "eth_getBlockByNumber" && params[0] == tag)
            .count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, method: &str, params: &Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.requests.push((method.to_string(), params.clone()));

        match method {
            "eth_blockNumber" => Ok(json!(format!("0x{:x}", self.head))),
            "eth_getBlockByNumber" => {
                assert_eq!(params[1], json!(true), "full transactions must be requested");
                let tag = params[0].as_str().unwrap_or_default();
                let height = u64::from_str_radix(tag.trim_start_matches("0x"), 16)
                    .map_err(|e| Error::Transport(e.to_string()))?;

                if let Some(remaining) = state.flaky.get_mut(&height) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(Error::Transport(format!("connection reset ({})", tag)));
                    }
                }

                if height > self.head {
                    return Ok(Value::Null);
                }
                Ok(state
                    .blocks
                    .get(&height)
                    .cloned()
                    .unwrap_or_else(|| block_json(height, Vec::new())))
            }
            other => Err(Error::Transport(format!("unsupported method {}", other))),
        }
    }
}

#[async_trait]
impl RpcTransport for MockNode {
    async fn send(&self, method: &str, params: Value) -> Result<Vec<u8>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let outcome = self.respond(method, &params);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let result = outcome?;
        Ok(serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": crate::rpc::REQUEST_ID,
            "result": result
        }))?)
    }
}

/// Transport whose every request fails.
pub struct Unreachable;

#[async_trait]
impl RpcTransport for Unreachable {
    async fn send(&self, method: &str, _params: Value) -> Result<Vec<u8>> {
        Err(Error::Transport(format!("{}: connection refused", method)))
    }
}
