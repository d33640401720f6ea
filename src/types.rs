//! Ethereum JSON-RPC types
//!
//! Blocks and transactions as returned by `eth_getBlockByNumber` with full
//! transaction objects, plus the hex quantity helpers they are parsed with.

use crate::error::{Error, Result};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Deserializer};

/// Ethereum block with full transaction details.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Block {
    /// Block number (hex string in JSON)
    #[serde(rename = "number", deserialize_with = "deserialize_hex_u256")]
    pub number: U256,

    /// Block hash (hex string in JSON)
    #[serde(rename = "hash", deserialize_with = "deserialize_hex_b256")]
    pub hash: B256,

    #[serde(rename = "parentHash", deserialize_with = "deserialize_hex_b256")]
    pub parent_hash: B256,

    /// Unix timestamp in seconds (hex string in JSON)
    #[serde(rename = "timestamp", deserialize_with = "deserialize_hex_u64")]
    pub timestamp: u64,

    /// Full transaction objects, in block order
    #[serde(rename = "transactions", default)]
    pub transactions: Vec<Transaction>,
}

/// Ethereum transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Transaction {
    #[serde(rename = "hash", deserialize_with = "deserialize_hex_b256")]
    pub hash: B256,

    /// Sender address (hex string in JSON)
    #[serde(rename = "from", deserialize_with = "deserialize_hex_address")]
    pub from: Address,

    /// Recipient address (None for contract creation)
    #[serde(rename = "to", default, deserialize_with = "deserialize_hex_address_opt")]
    pub to: Option<Address>,

    /// Value transferred in wei
    #[serde(rename = "value", deserialize_with = "deserialize_hex_u256_lenient")]
    pub value: U256,

    /// Raw call data, `0x`-prefixed. Kept as text so that a malformed
    /// payload only affects the transaction that carries it.
    #[serde(rename = "input", default = "empty_input")]
    pub input: String,
}

impl Transaction {
    /// Check if this is a contract creation transaction (to is None).
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

fn empty_input() -> String {
    "0x".to_string()
}

/// Pad an odd-length hex string with a leading zero.
fn pad_hex_string(s: &str) -> String {
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Parse a JSON-RPC hex quantity (`0x1b4`, odd length allowed) into a U256.
///
/// An empty digit string is rejected, as is anything wider than 256 bits.
pub fn parse_hex_quantity(raw: &str) -> Result<U256> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Err(Error::decode(format!("empty hex quantity: {:?}", raw)));
    }
    let bytes = hex::decode(pad_hex_string(digits))
        .map_err(|e| Error::decode(format!("invalid hex quantity {:?}: {}", raw, e)))?;

    // Leading zero bytes do not count towards the width
    let significant = match bytes.iter().position(|b| *b != 0) {
        Some(start) => &bytes[start..],
        None => return Ok(U256::ZERO),
    };
    if significant.len() > 32 {
        return Err(Error::decode(format!("hex quantity {:?} exceeds 256 bits", raw)));
    }
    Ok(U256::from_be_slice(significant))
}

/// Format a height the way `eth_getBlockByNumber` expects it.
pub fn to_hex_quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

// Hex deserialization helpers

fn deserialize_hex_u256<'de, D>(deserializer: D) -> std::result::Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_hex_quantity(&s).map_err(serde::de::Error::custom)
}

/// Like `deserialize_hex_u256`, but `0x` reads as zero.
fn deserialize_hex_u256_lenient<'de, D>(deserializer: D) -> std::result::Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.strip_prefix("0x").unwrap_or(&s).is_empty() {
        return Ok(U256::ZERO);
    }
    parse_hex_quantity(&s).map_err(serde::de::Error::custom)
}

fn deserialize_hex_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    u64::from_str_radix(s, 16).map_err(serde::de::Error::custom)
}

fn deserialize_hex_b256<'de, D>(deserializer: D) -> std::result::Result<B256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    let bytes = hex::decode(pad_hex_string(s)).map_err(serde::de::Error::custom)?;
    if bytes.len() != 32 {
        return Err(serde::de::Error::custom(format!(
            "Expected 32 bytes for hash, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Parse a 20-byte address, accepting any letter case.
pub fn parse_address(s: &str) -> Result<Address> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits)
        .map_err(|e| Error::decode(format!("invalid address {:?}: {}", s, e)))?;
    if bytes.len() != 20 {
        return Err(Error::decode(format!(
            "Expected 20 bytes for address, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

fn deserialize_hex_address<'de, D>(deserializer: D) -> std::result::Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_address(&s).map_err(serde::de::Error::custom)
}

fn deserialize_hex_address_opt<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        Some(s) if !s.strip_prefix("0x").unwrap_or(&s).is_empty() => {
            parse_address(&s).map(Some).map_err(serde::de::Error::custom)
        }
        _ => Ok(None),
    }
}
