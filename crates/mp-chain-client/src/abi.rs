//! Minimal Solidity ABI helpers for the sale contract's fixed surface.
//!
//! Only static `uint256` arguments and single-word return values are needed,
//! so this stays far below a general ABI codec.

use serde_json::Value;
use sha3::{Digest, Keccak256};

use crate::error::ProviderError;

const WORD: usize = 32;
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// `0x`-prefixed calldata for `signature` with every argument as a `uint256` word.
pub fn encode_call(signature: &str, args: &[u128]) -> String {
    let mut calldata = Vec::with_capacity(4 + args.len() * WORD);
    calldata.extend_from_slice(&selector(signature));
    for arg in args {
        calldata.extend_from_slice(&[0_u8; 16]);
        calldata.extend_from_slice(&arg.to_be_bytes());
    }
    format!("0x{}", hex::encode(calldata))
}

/// Selector of `0x`-prefixed calldata, if it has one.
pub fn calldata_selector(calldata: &str) -> Option<[u8; 4]> {
    let bytes = decode_hex(calldata).ok()?;
    let head = bytes.get(..4)?;
    Some([head[0], head[1], head[2], head[3]])
}

pub fn decode_u128(raw: &str) -> Result<u128, ProviderError> {
    let bytes = decode_hex(raw)?;
    let word = bytes
        .get(..WORD)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("expected a 32-byte word, got {raw}")))?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(ProviderError::InvalidResponse(format!(
            "uint256 value does not fit in 128 bits: {raw}"
        )));
    }
    let mut low = [0_u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

pub fn decode_bool(raw: &str) -> Result<bool, ProviderError> {
    match decode_u128(raw)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ProviderError::InvalidResponse(format!(
            "expected bool word, got {other}"
        ))),
    }
}

/// Decodes `Error(string)` and `Panic(uint256)` revert payloads.
pub fn decode_revert_reason(raw: &str) -> Option<String> {
    let bytes = decode_hex(raw).ok()?;
    let (head, body) = (bytes.get(..4)?, bytes.get(4..)?);

    if head == ERROR_STRING_SELECTOR {
        let offset = word_as_usize(body.get(..WORD)?)?;
        let len_word = body.get(offset..offset.checked_add(WORD)?)?;
        let len = word_as_usize(len_word)?;
        let start = offset + WORD;
        let text = body.get(start..start.checked_add(len)?)?;
        let reason = String::from_utf8_lossy(text).trim().to_owned();
        return (!reason.is_empty()).then_some(reason);
    }

    if head == PANIC_SELECTOR {
        let code = word_as_usize(body.get(..WORD)?)?;
        return Some(format!("panic code 0x{code:02x}"));
    }

    None
}

/// Hex quantity as used in JSON-RPC (`0x0`, `0x3d090`).
pub fn to_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

pub fn parse_quantity(value: &Value) -> Result<u64, ProviderError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("expected hex quantity, got {value}")))?;
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ProviderError::InvalidResponse(format!("quantity missing 0x prefix: {raw}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|err| ProviderError::InvalidResponse(format!("bad quantity {raw}: {err}")))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, ProviderError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|err| ProviderError::InvalidResponse(format!("bad hex {raw}: {err}")))
}

fn word_as_usize(word: &[u8]) -> Option<usize> {
    if word.len() != WORD || word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0_u8; 8];
    low.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(low)).ok()
}
