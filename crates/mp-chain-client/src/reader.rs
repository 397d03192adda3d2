use mp_api_types::ContractSnapshot;
use tracing::debug;

use crate::{Eip1193, ProviderError, SaleContract};

/// Stateless view reader for the sale contract.
#[derive(Debug, Clone)]
pub struct ChainReader {
    contract: SaleContract,
}

impl ChainReader {
    pub fn new(contract: SaleContract) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &SaleContract {
        &self.contract
    }

    /// Reads price, supply and sale state concurrently and only returns once
    /// every query has resolved. A failing `saleActive()` reads as `false`.
    pub async fn read_snapshot(
        &self,
        provider: &dyn Eip1193,
    ) -> Result<ContractSnapshot, ProviderError> {
        let (price_wei, total_minted, remaining, sale_active) = tokio::join!(
            self.contract.price(provider),
            self.contract.total_minted(provider),
            self.contract.remaining(provider),
            self.sale_active_or_false(provider),
        );

        Ok(ContractSnapshot {
            price_wei: price_wei?,
            total_minted: total_minted?,
            remaining: remaining?,
            sale_active,
        })
    }

    pub async fn sale_active_or_false(&self, provider: &dyn Eip1193) -> bool {
        match self.contract.sale_active(provider).await {
            Ok(active) => active,
            Err(err) => {
                debug!("saleActive() unavailable, treating sale as inactive: {}", err);
                false
            }
        }
    }
}
