//! ERC-20 `transfer` call decoding
//!
//! Recognizes `transfer(address,uint256)` call data by its fixed selector
//! and pulls the recipient out of the first ABI slot. Only this one fixed
//! layout is understood; no general ABI decoding happens here.

use crate::error::{Error, Result};
use alloy_primitives::Address;

/// First four bytes of keccak256("transfer(address,uint256)")
pub const TRANSFER_SELECTOR: &str = "0xa9059cbb";

/// `0x` + selector + two 32-byte parameters, in hex characters.
pub const TRANSFER_CALL_MIN_LEN: usize = 2 + 8 + 64 + 64;

/// Start of the recipient inside the call data: `0x`, selector, then the
/// 12 bytes of left padding in front of the 20-byte address.
const RECIPIENT_OFFSET: usize = 2 + 8 + 24;
const ADDRESS_HEX_LEN: usize = 40;

/// Check whether call data looks like an ERC-20 `transfer` call.
///
/// Anything shorter than a full selector plus two parameters never
/// qualifies, whatever it starts with.
pub fn is_transfer_call(input: &str) -> bool {
    if input.len() < TRANSFER_CALL_MIN_LEN {
        return false;
    }
    // `0x` must match exactly; the selector digits may be either case
    let Some(digits) = input.strip_prefix("0x") else {
        return false;
    };
    digits
        .get(..8)
        .map_or(false, |selector| selector.eq_ignore_ascii_case(&TRANSFER_SELECTOR[2..]))
}

/// Decode the recipient of a `transfer(address,uint256)` call.
pub fn decode_transfer_recipient(input: &str) -> Result<Address> {
    if input.len() < TRANSFER_CALL_MIN_LEN {
        return Err(Error::InsufficientData {
            needed: TRANSFER_CALL_MIN_LEN,
            actual: input.len(),
        });
    }

    let slot = input
        .get(RECIPIENT_OFFSET..RECIPIENT_OFFSET + ADDRESS_HEX_LEN)
        .ok_or_else(|| Error::decode("call data is not ASCII hex"))?;
    let bytes = hex::decode(slot)
        .map_err(|e| Error::decode(format!("invalid recipient {:?}: {}", slot, e)))?;
    Ok(Address::from_slice(&bytes))
}
