pub mod abi;
pub mod contract;
pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod reader;

use anyhow::Result;
use async_trait::async_trait;
use mp_api_types::{RecentMintRecord, WalletAddress};
use serde_json::Value;
use tokio::sync::broadcast;

pub use contract::{SaleContract, TxReceipt};
pub use error::ProviderError;
pub use http::JsonRpcHttp;
#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryProvider;
pub use reader::ChainReader;

/// Notifications a wallet pushes outside of any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
    SessionDeleted,
}

/// EIP-1193 style request/response transport.
///
/// Implemented by plain JSON-RPC endpoints (read-only or wallet-backed) and by
/// whatever pairing SDK hands back a signing transport.
#[async_trait]
pub trait Eip1193: Send + Sync {
    fn label(&self) -> &str;

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    fn subscribe(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        None
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Source of historical mint events that does not require scanning the chain.
#[async_trait]
pub trait MintIndexer: Send + Sync {
    async fn recent_mints(
        &self,
        contract: &WalletAddress,
        count: usize,
    ) -> Result<Vec<RecentMintRecord>>;
}
