pub mod activity;
pub mod error;
pub mod orchestrator;
pub mod strategy;

pub use activity::ActivityLog;
pub use error::MintError;
pub use orchestrator::{ConfirmationPolicy, MintOrchestrator, MintSettings, coerce_quantity, mint_value};
pub use strategy::CallStrategy;
