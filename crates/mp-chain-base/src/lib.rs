use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use mp_api_types::{ChainDescriptor, ChainId, NativeCurrency, RecentMintRecord, WalletAddress, ZERO_ADDRESS};
use mp_chain_client::MintIndexer;
use mp_chain_client::http::DEFAULT_TIMEOUT;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

pub const BASE_MAINNET: ChainId = ChainId(8453);
pub const BASE_PUBLIC_RPC: &str = "https://mainnet.base.org";
pub const BASE_EXPLORER: &str = "https://basescan.org";

/// Base mainnet as handed to `wallet_addEthereumChain`. An empty `rpc_urls`
/// falls back to the public endpoint.
pub fn base_mainnet(rpc_urls: Vec<String>) -> ChainDescriptor {
    let mut rpc_urls: Vec<String> = rpc_urls
        .into_iter()
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty())
        .collect();
    if rpc_urls.is_empty() {
        rpc_urls.push(BASE_PUBLIC_RPC.to_owned());
    }

    ChainDescriptor {
        chain_id: BASE_MAINNET,
        name: "Base".to_owned(),
        rpc_urls,
        explorer: BASE_EXPLORER.to_owned(),
        native_currency: NativeCurrency {
            name: "ETH".to_owned(),
            symbol: "ETH".to_owned(),
            decimals: 18,
        },
    }
}

/// Recent mints through Alchemy's `alchemy_getAssetTransfers`.
///
/// Without an endpoint the public Base RPC is used, which rejects the method.
pub struct AlchemyTransfersIndexer {
    endpoint: String,
    http: reqwest::Client,
}

impl AlchemyTransfersIndexer {
    pub fn new(endpoint: Option<String>) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Every request is bounded by `timeout`, so a stalled indexer cannot
    /// hold up the sync loop.
    pub fn with_timeout(endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| BASE_PUBLIC_RPC.to_owned());
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for indexer")?;
        Ok(Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            http,
        })
    }
}

pub fn transfers_request(contract: &WalletAddress, count: usize) -> Value {
    json!({
        "id": 1,
        "jsonrpc": "2.0",
        "method": "alchemy_getAssetTransfers",
        "params": [{
            "fromBlock": "0x0",
            "toBlock": "latest",
            "category": ["erc721"],
            "contractAddresses": [contract.0],
            "fromAddress": ZERO_ADDRESS,
            "order": "desc",
            "withMetadata": false,
            "maxCount": format!("0x{count:x}"),
        }]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetTransfer {
    #[serde(default)]
    block_num: Option<String>,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    token_id: Option<String>,
    #[serde(default)]
    erc721_token_id: Option<String>,
}

/// Zero-address transfers only, newest block first, at most `count`.
pub fn parse_recent_mints(payload: &Value, count: usize) -> Result<Vec<RecentMintRecord>> {
    if let Some(error) = payload.get("error") {
        bail!("indexer error: {error}");
    }

    let transfers = payload
        .get("result")
        .and_then(|result| result.get("transfers"))
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let transfers: Vec<AssetTransfer> =
        serde_json::from_value(transfers).context("invalid indexer transfers payload")?;

    let mut mints: Vec<(Option<u64>, RecentMintRecord)> = transfers
        .into_iter()
        .filter(|t| {
            t.from
                .as_deref()
                .is_some_and(|from| from.eq_ignore_ascii_case(ZERO_ADDRESS))
        })
        .filter_map(|t| {
            let raw_id = t.erc721_token_id.as_deref().or(t.token_id.as_deref())?;
            let Some(token_id) = parse_token_id(raw_id) else {
                debug!("skipping transfer {} with unparsable token id {}", t.hash, raw_id);
                return None;
            };
            let block = t.block_num.as_deref().and_then(parse_hex_u64);
            Some((
                block,
                RecentMintRecord {
                    token_id,
                    recipient: WalletAddress(t.to.unwrap_or_default()),
                    tx_hash: t.hash,
                },
            ))
        })
        .collect();

    // Stable: transfers inside one block keep the indexer's order.
    mints.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(mints.into_iter().take(count).map(|(_, record)| record).collect())
}

fn parse_token_id(raw: &str) -> Option<u128> {
    match raw.strip_prefix("0x") {
        Some(digits) => u128::from_str_radix(digits, 16).ok(),
        None => raw.parse().ok(),
    }
}

fn parse_hex_u64(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.strip_prefix("0x")?, 16).ok()
}

#[async_trait]
impl MintIndexer for AlchemyTransfersIndexer {
    async fn recent_mints(
        &self,
        contract: &WalletAddress,
        count: usize,
    ) -> Result<Vec<RecentMintRecord>> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("accept", "application/json")
            .json(&transfers_request(contract, count))
            .send()
            .await
            .context("indexer recent_mints transport")?;

        let status = response.status();
        if !status.is_success() {
            bail!("indexer recent_mints HTTP {status}");
        }

        let payload: Value = response
            .json()
            .await
            .context("indexer recent_mints parse")?;
        parse_recent_mints(&payload, count)
    }
}
