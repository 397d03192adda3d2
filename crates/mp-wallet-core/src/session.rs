use std::fmt;
use std::sync::Arc;

use mp_api_types::{ChainId, WalletAddress};
use mp_chain_client::{Eip1193, ProviderError, ProviderEvent};
use serde_json::{Value, json};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info};

use crate::discovery::ProviderDetail;
use crate::error::WalletError;
use crate::pairing::{PairingConfig, PairingConnector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Injected,
    RemotePairing,
}

pub enum TransportChoice {
    /// `None` when discovery found nothing to pick.
    Injected(Option<ProviderDetail>),
    RemotePairing,
}

/// A connected, chain-bound signing identity.
#[derive(Clone)]
pub struct Session {
    pub address: WalletAddress,
    pub chain_id: ChainId,
    pub kind: TransportKind,
    pub provider_name: String,
    transport: Arc<dyn Eip1193>,
}

impl Session {
    pub fn transport(&self) -> &Arc<dyn Eip1193> {
        &self.transport
    }

    /// Whether an external event invalidates this session. Our own network
    /// switch echoes back as a `chainChanged` to the current chain, which is
    /// not stale.
    pub fn is_invalidated_by(&self, event: &ProviderEvent) -> bool {
        match event {
            ProviderEvent::AccountsChanged(accounts) => accounts
                .first()
                .is_none_or(|first| !first.eq_ignore_ascii_case(&self.address.0)),
            ProviderEvent::ChainChanged(chain) => ChainId::from_hex(chain) != Some(self.chain_id),
            ProviderEvent::SessionDeleted => true,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("kind", &self.kind)
            .field("provider_name", &self.provider_name)
            .finish()
    }
}

/// Owns the single active session and its event subscription.
pub struct WalletSession {
    session: Option<Session>,
    events: Option<broadcast::Receiver<ProviderEvent>>,
    pairing: Option<Arc<dyn PairingConnector>>,
    pairing_config: Option<PairingConfig>,
}

impl WalletSession {
    pub fn new(
        pairing: Option<Arc<dyn PairingConnector>>,
        pairing_config: Option<PairingConfig>,
    ) -> Self {
        Self {
            session: None,
            events: None,
            pairing,
            pairing_config,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn pairing_enabled(&self) -> bool {
        self.pairing_config.is_some() && self.pairing.is_some()
    }

    pub async fn connect(&mut self, choice: TransportChoice) -> Result<&Session, WalletError> {
        if self.session.is_some() {
            self.disconnect().await;
        }

        let (transport, kind, provider_name) = match choice {
            TransportChoice::Injected(None) => return Err(WalletError::NoWalletFound),
            TransportChoice::Injected(Some(detail)) => {
                (detail.transport, TransportKind::Injected, detail.info.name)
            }
            TransportChoice::RemotePairing => {
                let config = self
                    .pairing_config
                    .as_ref()
                    .ok_or(WalletError::PairingNotConfigured)?;
                let connector = self.pairing.as_ref().ok_or(WalletError::PairingUnavailable)?;
                let transport = connector.pair(config).await.map_err(rejection_or_transport)?;
                let name = transport.label().to_owned();
                (transport, TransportKind::RemotePairing, name)
            }
        };

        let accounts = transport
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(rejection_or_transport)?;
        let address = first_account(&accounts).ok_or(WalletError::NoWalletFound)?;

        let chain_raw = transport.request("eth_chainId", json!([])).await?;
        let chain_id = chain_raw
            .as_str()
            .and_then(ChainId::from_hex)
            .ok_or_else(|| ProviderError::InvalidResponse(format!("eth_chainId returned {chain_raw}")))?;

        info!(address = %address, chain = %chain_id, provider = %provider_name, "wallet connected");

        self.events = transport.subscribe();
        self.session = Some(Session {
            address,
            chain_id,
            kind,
            provider_name,
            transport,
        });
        self.session.as_ref().ok_or(WalletError::NotConnected)
    }

    /// Releases the transport and clears the session. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        self.events = None;
        let Some(session) = self.session.take() else {
            return;
        };
        if session.kind == TransportKind::RemotePairing {
            if let Err(err) = session.transport.disconnect().await {
                debug!("remote session disconnect failed: {}", err);
            }
        }
        info!(address = %session.address, "wallet disconnected");
    }

    /// Drops all session state after an external account/chain change.
    /// Returns whether there was a session to drop.
    pub fn reset_session(&mut self) -> bool {
        self.events = None;
        match self.session.take() {
            Some(session) => {
                info!(address = %session.address, "wallet session reset");
                true
            }
            None => false,
        }
    }

    /// Next pushed wallet event; pends forever while nothing is subscribed.
    pub async fn next_event(&mut self) -> ProviderEvent {
        loop {
            let Some(events) = self.events.as_mut() else {
                return std::future::pending().await;
            };
            match events.recv().await {
                Ok(event) => return event,
                Err(RecvError::Lagged(skipped)) => debug!("skipped {} wallet events", skipped),
                Err(RecvError::Closed) => self.events = None,
            }
        }
    }

    /// Polls the transport for account/chain drift, for wallets that cannot push events.
    pub async fn detect_external_change(&self) -> Result<Option<ProviderEvent>, WalletError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };

        let accounts = session.transport.request("eth_accounts", json!([])).await?;
        let accounts: Vec<String> = accounts
            .as_array()
            .map(|list| list.iter().filter_map(Value::as_str).map(ToOwned::to_owned).collect())
            .unwrap_or_default();
        let event = ProviderEvent::AccountsChanged(accounts);
        if session.is_invalidated_by(&event) {
            return Ok(Some(event));
        }

        let chain = session.transport.request("eth_chainId", json!([])).await?;
        let event = ProviderEvent::ChainChanged(chain.as_str().unwrap_or_default().to_owned());
        if session.is_invalidated_by(&event) {
            return Ok(Some(event));
        }

        Ok(None)
    }
}

fn first_account(accounts: &Value) -> Option<WalletAddress> {
    accounts
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .find(|a| !a.trim().is_empty())
        .map(|a| WalletAddress(a.to_owned()))
}

fn rejection_or_transport(err: ProviderError) -> WalletError {
    if err.is_user_rejected() {
        WalletError::UserRejected(err.reason())
    } else {
        WalletError::Transport(err)
    }
}
