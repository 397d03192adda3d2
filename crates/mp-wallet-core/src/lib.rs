pub mod discovery;
pub mod error;
pub mod network;
pub mod pairing;
pub mod session;

pub use discovery::{DiscoveryService, InjectedEndpoint, ProviderDetail, ProviderRegistry};
pub use error::WalletError;
pub use network::NetworkGuard;
pub use pairing::{PairingConfig, PairingConnector};
pub use session::{Session, TransportChoice, TransportKind, WalletSession};
