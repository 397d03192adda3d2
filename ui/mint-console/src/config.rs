use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mp_api_types::{ChainDescriptor, WalletAddress};
use mp_chain_base::base_mainnet;
use mp_mint::orchestrator::DEFAULT_GAS_LIMIT;
use mp_mint::{ConfirmationPolicy, MintSettings};
use mp_wallet_core::{InjectedEndpoint, PairingConfig};

use crate::gallery::{BATCH_SIZE, GalleryPaginator, MAX_IMAGES};

pub const DEFAULT_CONTRACT: &str = "0xc9df3da7f53a145b88b88925d380d6071f8d25c3";
pub const DEFAULT_IMAGES_BASE: &str =
    "https://bafybeib4tdoeyajesmm4mz5ykqhilt7s6g3cl2dsixwjwqds2dvbdjmejy.ipfs.w3s.link";

/// Console client for the MintPad sale on Base.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "MINTPAD_CONTRACT", default_value = DEFAULT_CONTRACT)]
    pub contract: String,

    /// Read-only JSON-RPC endpoints; the first one serves reads without a wallet.
    #[arg(long = "rpc-url", env = "MINTPAD_RPC_URLS", value_delimiter = ',')]
    pub rpc_urls: Vec<String>,

    /// Endpoint accepting `alchemy_getAssetTransfers`.
    #[arg(long, env = "MINTPAD_INDEXER_URL")]
    pub indexer_url: Option<String>,

    #[arg(long, env = "MINTPAD_WALLETCONNECT_PROJECT_ID", default_value = "")]
    pub walletconnect_project_id: String,

    /// Injected wallets as `name=url` (or a bare URL), probed on discovery.
    #[arg(
        long = "wallet",
        env = "MINTPAD_INJECTED_WALLETS",
        value_delimiter = ',',
        default_value = "Frame=http://127.0.0.1:1248"
    )]
    pub wallets: Vec<String>,

    #[arg(long, env = "MINTPAD_GAS_LIMIT", default_value_t = DEFAULT_GAS_LIMIT)]
    pub gas_limit: u64,

    #[arg(long, env = "MINTPAD_SYNC_INTERVAL_SECS", default_value_t = 30)]
    pub sync_interval_secs: u64,

    #[arg(long, env = "MINTPAD_RECENT_COUNT", default_value_t = 5)]
    pub recent_count: usize,

    #[arg(long, env = "MINTPAD_IMAGES_BASE", default_value = DEFAULT_IMAGES_BASE)]
    pub images_base: String,

    #[arg(long, env = "MINTPAD_IMAGES_EXT", default_value = "png")]
    pub images_ext: String,

    #[arg(long, env = "MINTPAD_MAX_IMAGES", default_value_t = MAX_IMAGES)]
    pub max_images: u32,

    #[arg(long, env = "MINTPAD_BATCH_SIZE", default_value_t = BATCH_SIZE)]
    pub batch_size: u32,

    #[arg(long, env = "MINTPAD_RECEIPT_POLL_MS", default_value_t = 2_000)]
    pub receipt_poll_ms: u64,

    #[arg(long, env = "MINTPAD_RECEIPT_TIMEOUT_SECS", default_value_t = 600)]
    pub receipt_timeout_secs: u64,
}

impl Config {
    pub fn contract_address(&self) -> Result<WalletAddress> {
        let raw = self.contract.trim();
        let valid = raw.len() == 42
            && raw.starts_with("0x")
            && raw[2..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            anyhow::bail!("contract address must be 0x followed by 40 hex digits, got '{raw}'");
        }
        Ok(WalletAddress(raw.to_owned()))
    }

    pub fn chain(&self) -> ChainDescriptor {
        base_mainnet(self.rpc_urls.clone())
    }

    pub fn injected_endpoints(&self) -> Result<Vec<InjectedEndpoint>> {
        self.wallets
            .iter()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| InjectedEndpoint::parse(raw).with_context(|| format!("invalid wallet endpoint '{raw}'")))
            .collect()
    }

    pub fn pairing(&self, chain: &ChainDescriptor) -> Option<PairingConfig> {
        PairingConfig::for_chain(&self.walletconnect_project_id, chain)
    }

    pub fn mint_settings(&self) -> MintSettings {
        MintSettings {
            gas_limit: self.gas_limit,
            confirmation: ConfirmationPolicy {
                poll_interval: Duration::from_millis(self.receipt_poll_ms.max(1)),
                timeout: Duration::from_secs(self.receipt_timeout_secs),
            },
            ..MintSettings::default()
        }
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn gallery(&self) -> GalleryPaginator {
        GalleryPaginator::new(&self.images_base, &self.images_ext, self.max_images, self.batch_size)
    }
}
