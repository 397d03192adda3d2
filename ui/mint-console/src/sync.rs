use std::sync::Arc;

use mp_chain_client::{ChainReader, Eip1193, MintIndexer};
use tracing::{debug, warn};

use crate::state::AppState;

/// Best-effort refresh of supply stats and recent mints. Failures only reach
/// the developer log and the next tick retries.
pub struct SupplySync {
    reader: ChainReader,
    indexer: Arc<dyn MintIndexer>,
    recent_count: usize,
}

impl SupplySync {
    pub fn new(reader: ChainReader, indexer: Arc<dyn MintIndexer>, recent_count: usize) -> Self {
        Self {
            reader,
            indexer,
            recent_count,
        }
    }

    /// Replaces the snapshot only when every query resolved; otherwise the
    /// previous snapshot stays on screen.
    pub async fn refresh_snapshot(&self, provider: &dyn Eip1193, state: &mut AppState) -> bool {
        match self.reader.read_snapshot(provider).await {
            Ok(snapshot) => {
                debug!(
                    total_minted = %snapshot.total_minted,
                    remaining = %snapshot.remaining,
                    "supply refreshed via {}",
                    provider.label()
                );
                state.snapshot = Some(snapshot);
                true
            }
            Err(err) => {
                warn!("Error fetching data: {}", err);
                false
            }
        }
    }

    /// A failed refresh clears the list rather than showing stale mints.
    pub async fn refresh_recent(&self, state: &mut AppState) -> bool {
        let contract = self.reader.contract().address();
        match self.indexer.recent_mints(contract, self.recent_count).await {
            Ok(mut records) => {
                records.truncate(self.recent_count);
                state.recent = records;
                true
            }
            Err(err) => {
                warn!("Recent mints error: {:#}", err);
                state.recent.clear();
                false
            }
        }
    }
}
