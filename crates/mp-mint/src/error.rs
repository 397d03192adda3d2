use mp_chain_client::ProviderError;
use mp_wallet_core::WalletError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MintError {
    #[error("Connect a wallet first.")]
    NotConnected,
    #[error("A mint is already in progress.")]
    InFlight,
    #[error("Sale is not active.")]
    SaleInactive,
    #[error(transparent)]
    Network(#[from] WalletError),
    #[error("could not read price: {}", .0.reason())]
    PriceUnavailable(ProviderError),
    #[error("mint value overflows: {quantity} x {price_wei} wei")]
    ValueOverflow { quantity: u32, price_wei: u128 },
    #[error("{0}")]
    SimulationFailed(String),
    #[error("{0}")]
    SubmissionFailed(String),
}
