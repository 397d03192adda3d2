use mp_chain_client::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("No wallet found. Start an EIP-1193 wallet or configure an injected endpoint.")]
    NoWalletFound,
    #[error("{0}")]
    UserRejected(String),
    #[error("WalletConnect project ID not configured")]
    PairingNotConfigured,
    #[error("no pairing connector available")]
    PairingUnavailable,
    #[error("Connect a wallet first.")]
    NotConnected,
    #[error("network switch rejected: {0}")]
    SwitchRejected(String),
    #[error("could not add network: {0}")]
    AddChainFailed(String),
    #[error("{}", .0.reason())]
    Transport(#[from] ProviderError),
}
