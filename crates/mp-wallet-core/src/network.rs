use mp_api_types::{ChainDescriptor, ChainId};
use mp_chain_client::ProviderError;
use serde_json::json;
use tracing::info;

use crate::error::WalletError;
use crate::session::Session;

/// Keeps the signing session on the sale's chain.
#[derive(Debug, Clone)]
pub struct NetworkGuard {
    target: ChainDescriptor,
}

impl NetworkGuard {
    pub fn new(target: ChainDescriptor) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &ChainDescriptor {
        &self.target
    }

    /// Switches the wallet to the target chain when needed. An unknown chain
    /// (4902) is added from the descriptor and the switch retried.
    pub async fn ensure_chain(&self, session: &mut Session) -> Result<(), WalletError> {
        let transport = session.transport().clone();
        let raw = transport.request("eth_chainId", json!([])).await?;
        let current = raw
            .as_str()
            .and_then(ChainId::from_hex)
            .ok_or_else(|| ProviderError::InvalidResponse(format!("eth_chainId returned {raw}")))?;

        if current == self.target.chain_id {
            session.chain_id = current;
            return Ok(());
        }

        info!(from = %current, to = %self.target.chain_id, "requesting network switch");
        let switch_params = json!([{ "chainId": self.target.chain_id.to_hex() }]);

        match transport
            .request("wallet_switchEthereumChain", switch_params.clone())
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_unrecognized_chain() => {
                info!(chain = %self.target.name, "wallet does not know the chain, adding it");
                transport
                    .request(
                        "wallet_addEthereumChain",
                        json!([self.target.add_chain_params()]),
                    )
                    .await
                    .map_err(|err| WalletError::AddChainFailed(err.reason()))?;
                transport
                    .request("wallet_switchEthereumChain", switch_params)
                    .await
                    .map_err(switch_error)?;
            }
            Err(err) => return Err(switch_error(err)),
        }

        session.chain_id = self.target.chain_id;
        Ok(())
    }
}

fn switch_error(err: ProviderError) -> WalletError {
    if err.is_user_rejected() {
        WalletError::SwitchRejected(err.reason())
    } else {
        WalletError::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProviderDetail;
    use crate::session::{TransportChoice, WalletSession};
    use mp_api_types::{NativeCurrency, ProviderInfo};
    use mp_chain_client::InMemoryProvider;
    use std::sync::Arc;

    fn base() -> ChainDescriptor {
        ChainDescriptor {
            chain_id: ChainId(8453),
            name: "Base".to_owned(),
            rpc_urls: vec!["https://mainnet.base.org".to_owned()],
            explorer: "https://basescan.org".to_owned(),
            native_currency: NativeCurrency {
                name: "ETH".to_owned(),
                symbol: "ETH".to_owned(),
                decimals: 18,
            },
        }
    }

    async fn session_on(provider: Arc<InMemoryProvider>) -> anyhow::Result<Session> {
        let mut wallets = WalletSession::new(None, None);
        let detail = ProviderDetail {
            info: ProviderInfo {
                uuid: "u".to_owned(),
                name: "Test".to_owned(),
                icon: String::new(),
                rdns: "test".to_owned(),
            },
            transport: provider,
        };
        Ok(wallets
            .connect(TransportChoice::Injected(Some(detail)))
            .await?
            .clone())
    }

    fn on_mainnet() -> InMemoryProvider {
        InMemoryProvider::new()
            .on("eth_requestAccounts", Ok(json!(["0x1111111111111111111111111111111111111111"])))
            .on("eth_chainId", Ok(json!("0x1")))
    }

    #[tokio::test]
    async fn already_on_target_is_a_no_op() -> anyhow::Result<()> {
        let provider = Arc::new(on_mainnet().on("eth_chainId", Ok(json!("0x2105"))));
        let mut session = session_on(provider.clone()).await?;

        NetworkGuard::new(base()).ensure_chain(&mut session).await?;
        assert_eq!(provider.calls_for("wallet_switchEthereumChain"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn switches_when_on_other_chain() -> anyhow::Result<()> {
        let provider = Arc::new(on_mainnet().on("wallet_switchEthereumChain", Ok(json!(null))));
        let mut session = session_on(provider.clone()).await?;

        NetworkGuard::new(base()).ensure_chain(&mut session).await?;
        assert_eq!(session.chain_id, ChainId(8453));
        assert_eq!(provider.calls_for("wallet_switchEthereumChain"), 1);
        assert_eq!(provider.calls_for("wallet_addEthereumChain"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_chain_is_added_then_switched() -> anyhow::Result<()> {
        let provider = Arc::new(
            on_mainnet()
                .on_sequence(
                    "wallet_switchEthereumChain",
                    vec![
                        Err(ProviderError::rpc(4902, "Unrecognized chain ID \"0x2105\"")),
                        Ok(json!(null)),
                    ],
                )
                .on("wallet_addEthereumChain", Ok(json!(null))),
        );
        let mut session = session_on(provider.clone()).await?;

        NetworkGuard::new(base()).ensure_chain(&mut session).await?;
        assert_eq!(provider.calls_for("wallet_addEthereumChain"), 1);
        assert_eq!(provider.calls_for("wallet_switchEthereumChain"), 2);

        let add = provider
            .calls()
            .into_iter()
            .find(|(method, _)| method == "wallet_addEthereumChain")
            .map(|(_, params)| params)
            .unwrap_or_default();
        assert_eq!(add[0]["chainId"], "0x2105");
        assert_eq!(add[0]["rpcUrls"][0], "https://mainnet.base.org");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_switch_and_failed_add_are_typed() -> anyhow::Result<()> {
        let rejecting = Arc::new(on_mainnet().on(
            "wallet_switchEthereumChain",
            Err(ProviderError::rpc(4001, "User rejected the request.")),
        ));
        let mut session = session_on(rejecting).await?;
        assert!(matches!(
            NetworkGuard::new(base()).ensure_chain(&mut session).await,
            Err(WalletError::SwitchRejected(_))
        ));

        let add_fails = Arc::new(
            on_mainnet()
                .on("wallet_switchEthereumChain", Err(ProviderError::rpc(4902, "Unrecognized chain")))
                .on("wallet_addEthereumChain", Err(ProviderError::rpc(-32602, "bad rpc url"))),
        );
        let mut session = session_on(add_fails).await?;
        assert!(matches!(
            NetworkGuard::new(base()).ensure_chain(&mut session).await,
            Err(WalletError::AddChainFailed(reason)) if reason == "bad rpc url"
        ));

        let other = Arc::new(
            on_mainnet().on("wallet_switchEthereumChain", Err(ProviderError::rpc(-32603, "internal"))),
        );
        let mut session = session_on(other).await?;
        assert!(matches!(
            NetworkGuard::new(base()).ensure_chain(&mut session).await,
            Err(WalletError::Transport(err)) if err.code() == Some(-32603)
        ));
        Ok(())
    }
}
