use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mp_api_types::{ChainDescriptor, ChainId};
use mp_chain_client::{Eip1193, ProviderError};

/// Parameters of a remote (QR) pairing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingConfig {
    pub project_id: String,
    pub chains: Vec<ChainId>,
    pub optional_chains: Vec<ChainId>,
    pub rpc_map: BTreeMap<u64, String>,
    pub show_qr: bool,
}

impl PairingConfig {
    /// `None` when no project id is configured; pairing is then disabled.
    pub fn for_chain(project_id: &str, chain: &ChainDescriptor) -> Option<Self> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return None;
        }
        let rpc_map = chain
            .rpc_urls
            .first()
            .map(|url| BTreeMap::from([(chain.chain_id.0, url.clone())]))
            .unwrap_or_default();
        Some(Self {
            project_id: project_id.to_owned(),
            chains: vec![chain.chain_id],
            optional_chains: vec![chain.chain_id],
            rpc_map,
            show_qr: true,
        })
    }
}

/// Remote pairing SDK seam. Implementations run the QR/approval flow and hand
/// back an enabled signing transport whose events include `SessionDeleted`.
#[async_trait]
pub trait PairingConnector: Send + Sync {
    async fn pair(&self, config: &PairingConfig) -> Result<Arc<dyn Eip1193>, ProviderError>;
}
