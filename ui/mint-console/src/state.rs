//! Everything the console displays, owned by the controller.

use mp_api_types::{ContractSnapshot, MintAttempt, RecentMintRecord};
use mp_mint::ActivityLog;

use crate::gallery::GalleryPaginator;

#[derive(Debug, Clone)]
pub struct AppState {
    /// `None` until the first complete read.
    pub snapshot: Option<ContractSnapshot>,
    pub recent: Vec<RecentMintRecord>,
    pub log: ActivityLog,
    pub gallery: GalleryPaginator,
    pub mint_in_flight: bool,
    pub last_attempt: Option<MintAttempt>,
}

impl AppState {
    pub fn new(gallery: GalleryPaginator) -> Self {
        Self {
            snapshot: None,
            recent: Vec::new(),
            log: ActivityLog::default(),
            gallery,
            mint_in_flight: false,
            last_attempt: None,
        }
    }
}
