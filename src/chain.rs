//! Chain reader
//!
//! Resolves the current head height and fetches individual blocks over an
//! [`RpcTransport`], turning raw JSON-RPC responses into typed blocks.

use crate::error::{Error, Result};
use crate::rpc::RpcTransport;
use crate::types::{parse_hex_quantity, to_hex_quantity, Block};
use alloy_primitives::U256;
use serde_json::{json, Value};

/// Typed read access to a chain behind a JSON-RPC transport.
pub struct ChainReader<T> {
    transport: T,
}

impl<T: RpcTransport> ChainReader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Make a JSON-RPC call and return its `result` (Null when absent).
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = self.transport.send(method, params).await?;
        let mut response: Value = serde_json::from_slice(&body)
            .map_err(|e| Error::decode(format!("{} response is not JSON: {}", method, e)))?;

        // Check for RPC error
        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            return Err(Error::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        Ok(response
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Get the current head height.
    pub async fn latest_height(&self) -> Result<U256> {
        let result = self.call("eth_blockNumber", Value::Null).await?;
        let number = result
            .as_str()
            .ok_or_else(|| Error::decode("eth_blockNumber result is missing or not a string"))?;
        parse_hex_quantity(number)
    }

    /// Get a block by height with full transaction objects.
    ///
    /// A `null` result (height not produced yet) is a decode error.
    pub async fn block_by_number(&self, height: U256) -> Result<Block> {
        let tag = to_hex_quantity(height);
        let result = self
            .call("eth_getBlockByNumber", json!([tag, true]))
            .await?;
        if result.is_null() {
            return Err(Error::decode(format!("block {} not available", tag)));
        }
        serde_json::from_value(result)
            .map_err(|e| Error::decode(format!("invalid block {}: {}", tag, e)))
    }
}
