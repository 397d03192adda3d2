use std::time::Duration;

use mp_api_types::WalletAddress;
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::abi::{decode_bool, decode_u128, encode_call, parse_quantity, to_quantity};
use crate::{Eip1193, ProviderError};

pub const PRICE: &str = "price()";
pub const TOTAL_MINTED: &str = "totalMinted()";
pub const REMAINING: &str = "remaining()";
pub const SALE_ACTIVE: &str = "saleActive()";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub block_number: u64,
    pub success: bool,
}

/// The sale contract's fixed ABI surface, bound to one address.
#[derive(Debug, Clone)]
pub struct SaleContract {
    address: WalletAddress,
}

impl SaleContract {
    pub fn new(address: WalletAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &WalletAddress {
        &self.address
    }

    pub async fn price(&self, provider: &dyn Eip1193) -> Result<u128, ProviderError> {
        decode_u128(&self.view(provider, PRICE).await?)
    }

    pub async fn total_minted(&self, provider: &dyn Eip1193) -> Result<u128, ProviderError> {
        decode_u128(&self.view(provider, TOTAL_MINTED).await?)
    }

    pub async fn remaining(&self, provider: &dyn Eip1193) -> Result<u128, ProviderError> {
        decode_u128(&self.view(provider, REMAINING).await?)
    }

    pub async fn sale_active(&self, provider: &dyn Eip1193) -> Result<bool, ProviderError> {
        decode_bool(&self.view(provider, SALE_ACTIVE).await?)
    }

    async fn view(&self, provider: &dyn Eip1193, signature: &str) -> Result<String, ProviderError> {
        let call = json!({
            "to": self.address.0,
            "data": encode_call(signature, &[]),
        });
        let result = provider.request("eth_call", json!([call, "latest"])).await?;
        result
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| ProviderError::InvalidResponse(format!("{signature} returned {result}")))
    }

    /// Payable call object for a single-`uint256` entry point.
    pub fn payable_call(
        &self,
        from: &WalletAddress,
        signature: &str,
        quantity: u32,
        value_wei: u128,
        gas_limit: Option<u64>,
    ) -> Value {
        let mut call = json!({
            "from": from.0,
            "to": self.address.0,
            "data": encode_call(signature, &[u128::from(quantity)]),
            "value": to_quantity(value_wei),
        });
        if let Some(gas) = gas_limit {
            call["gas"] = Value::String(to_quantity(u128::from(gas)));
        }
        call
    }

    /// Dry run through `eth_estimateGas`: reverts surface as errors, nothing is spent.
    pub async fn simulate(
        &self,
        provider: &dyn Eip1193,
        from: &WalletAddress,
        signature: &str,
        quantity: u32,
        value_wei: u128,
    ) -> Result<u64, ProviderError> {
        let call = self.payable_call(from, signature, quantity, value_wei, None);
        let estimate = provider.request("eth_estimateGas", json!([call])).await?;
        parse_quantity(&estimate)
    }

    pub async fn submit(
        &self,
        provider: &dyn Eip1193,
        from: &WalletAddress,
        signature: &str,
        quantity: u32,
        value_wei: u128,
        gas_limit: u64,
    ) -> Result<String, ProviderError> {
        let call = self.payable_call(from, signature, quantity, value_wei, Some(gas_limit));
        let hash = provider.request("eth_sendTransaction", json!([call])).await?;
        hash.as_str()
            .filter(|h| h.starts_with("0x"))
            .map(ToOwned::to_owned)
            .ok_or_else(|| ProviderError::InvalidResponse(format!("eth_sendTransaction returned {hash}")))
    }
}

/// Polls until the transaction is included in a block. One inclusion is enough.
///
/// Transport failures while polling are retried until the deadline; the
/// transaction is already submitted and may still be mined.
pub async fn wait_for_receipt(
    provider: &dyn Eip1193,
    tx_hash: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<TxReceipt, ProviderError> {
    let deadline = Instant::now() + timeout;
    loop {
        let receipt = match provider
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await
        {
            Ok(receipt) => receipt,
            Err(ProviderError::Transport(reason)) => {
                warn!(tx_hash, "receipt poll failed, retrying: {}", reason);
                Value::Null
            }
            Err(err) => return Err(err),
        };

        if let Some(block) = receipt.get("blockNumber").filter(|b| !b.is_null()) {
            let block_number = parse_quantity(block)?;
            let success = match receipt.get("status") {
                Some(status) if !status.is_null() => parse_quantity(status)? == 1,
                _ => true,
            };
            return Ok(TxReceipt {
                block_number,
                success,
            });
        }

        if Instant::now() >= deadline {
            return Err(ProviderError::Transport(format!(
                "timed out after {}s waiting for {tx_hash}",
                timeout.as_secs()
            )));
        }

        debug!(tx_hash, "receipt not available yet");
        sleep(poll_interval).await;
    }
}
