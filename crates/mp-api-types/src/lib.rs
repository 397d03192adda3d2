use serde::{Deserialize, Serialize};
use std::fmt;

pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    pub fn is_zero(&self) -> bool {
        self.0.eq_ignore_ascii_case(ZERO_ADDRESS)
    }

    /// `0x1234…abcd`, the form shown next to recent mints and the connected account.
    pub fn short(&self) -> String {
        short_address(&self.0)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn to_hex(self) -> String {
        format!("0x{:x}", self.0)
    }

    pub fn from_hex(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))?;
        u64::from_str_radix(digits, 16).ok().map(ChainId)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Everything a wallet needs to add an unknown chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_urls: Vec<String>,
    pub explorer: String,
    pub native_currency: NativeCurrency,
}

impl ChainDescriptor {
    pub fn add_chain_params(&self) -> AddEthereumChainParameter {
        AddEthereumChainParameter {
            chain_id: self.chain_id.to_hex(),
            chain_name: self.name.clone(),
            rpc_urls: self.rpc_urls.clone(),
            block_explorer_urls: vec![self.explorer.clone()],
            native_currency: self.native_currency.clone(),
        }
    }

    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.explorer.trim_end_matches('/'), address)
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer.trim_end_matches('/'), tx_hash)
    }
}

/// Parameter object of `wallet_addEthereumChain` (EIP-3085).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddEthereumChainParameter {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
    pub native_currency: NativeCurrency,
}

/// EIP-6963 provider announcement metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderInfo {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub rdns: String,
}

/// Point-in-time read of the sale contract. Replaced wholesale, never patched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub price_wei: u128,
    pub total_minted: u128,
    pub remaining: u128,
    pub sale_active: bool,
}

impl ContractSnapshot {
    pub fn sale_label(&self) -> &'static str {
        if self.sale_active { "Active" } else { "Paused" }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MintStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MintAttempt {
    pub quantity: u32,
    pub value_wei: u128,
    pub entry_point: Option<String>,
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
    pub status: MintStatus,
    pub error: Option<String>,
}

impl MintAttempt {
    pub fn new(quantity: u32) -> Self {
        Self {
            quantity,
            value_wei: 0,
            entry_point: None,
            tx_hash: None,
            block_number: None,
            status: MintStatus::Pending,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != MintStatus::Pending
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = MintStatus::Failed;
        self.error = Some(reason.into());
    }

    pub fn confirm(&mut self, block_number: u64) {
        self.status = MintStatus::Confirmed;
        self.block_number = Some(block_number);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentMintRecord {
    pub token_id: u128,
    pub recipient: WalletAddress,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GalleryImage {
    pub id: u32,
    pub url: String,
}

/// Exact decimal rendering of a wei amount, e.g. `1000000000000000` → `0.001`.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return format!("{whole}.0");
    }
    let digits = format!("{frac:018}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

pub fn short_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_owned();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}
