use std::sync::Arc;

use anyhow::Result;
use mp_api_types::{ChainDescriptor, MintAttempt, MintStatus, WalletAddress, format_ether};
use mp_chain_base::{AlchemyTransfersIndexer, BASE_PUBLIC_RPC};
use mp_chain_client::{ChainReader, Eip1193, JsonRpcHttp, MintIndexer, ProviderEvent, SaleContract};
use mp_mint::{MintError, MintOrchestrator, MintSettings, coerce_quantity};
use mp_wallet_core::{
    DiscoveryService, NetworkGuard, PairingConfig, PairingConnector, ProviderRegistry, Session,
    TransportChoice, WalletError, WalletSession,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::gallery::GalleryPaginator;
use crate::state::AppState;
use crate::sync::SupplySync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectTarget {
    /// Index into the discovery registry; `None` picks the first wallet.
    Injected(Option<usize>),
    RemotePairing,
}

pub struct AppDeps {
    pub chain: ChainDescriptor,
    pub contract: WalletAddress,
    pub discovery: DiscoveryService,
    pub pairing: Option<Arc<dyn PairingConnector>>,
    pub pairing_config: Option<PairingConfig>,
    pub indexer: Arc<dyn MintIndexer>,
    pub read_endpoint: Arc<dyn Eip1193>,
    pub settings: MintSettings,
    pub gallery: GalleryPaginator,
    pub recent_count: usize,
}

/// Single owner of wallet, chain and display state. Every operation takes
/// `&mut self`, so refreshes and mints never interleave.
pub struct MintApp {
    chain: ChainDescriptor,
    discovery: DiscoveryService,
    registry: ProviderRegistry,
    wallet: WalletSession,
    orchestrator: MintOrchestrator,
    sync: SupplySync,
    read_endpoint: Arc<dyn Eip1193>,
    pub state: AppState,
}

impl MintApp {
    pub fn new(deps: AppDeps) -> Self {
        let reader = ChainReader::new(SaleContract::new(deps.contract));
        Self {
            orchestrator: MintOrchestrator::new(
                reader.clone(),
                NetworkGuard::new(deps.chain.clone()),
                deps.settings,
            ),
            sync: SupplySync::new(reader, deps.indexer, deps.recent_count),
            wallet: WalletSession::new(deps.pairing, deps.pairing_config),
            chain: deps.chain,
            discovery: deps.discovery,
            registry: ProviderRegistry::default(),
            read_endpoint: deps.read_endpoint,
            state: AppState::new(deps.gallery),
        }
    }

    /// Wires the live HTTP transports. No pairing connector ships with the
    /// console, so `connect qr` reports it as unavailable.
    pub fn from_config(config: &Config) -> Result<Self> {
        let chain = config.chain();
        let read_url = chain
            .rpc_urls
            .first()
            .cloned()
            .unwrap_or_else(|| BASE_PUBLIC_RPC.to_owned());

        Ok(Self::new(AppDeps {
            contract: config.contract_address()?,
            discovery: DiscoveryService::from_endpoints(&config.injected_endpoints()?)?,
            pairing: None,
            pairing_config: config.pairing(&chain),
            indexer: Arc::new(AlchemyTransfersIndexer::new(config.indexer_url.clone())?),
            read_endpoint: Arc::new(JsonRpcHttp::with_label("read-only", read_url)?),
            settings: config.mint_settings(),
            gallery: config.gallery(),
            recent_count: config.recent_count,
            chain,
        }))
    }

    pub fn chain(&self) -> &ChainDescriptor {
        &self.chain
    }

    pub fn contract_address(&self) -> &WalletAddress {
        self.orchestrator.reader().contract().address()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn session(&self) -> Option<&Session> {
        self.wallet.current()
    }

    pub fn pairing_enabled(&self) -> bool {
        self.wallet.pairing_enabled()
    }

    pub async fn startup(&mut self) {
        self.discover().await;
        self.sync_supply().await;
        self.refresh_recent().await;
        self.state.gallery.load_more();
    }

    /// Periodic work: wallet drift check, then the supply sync.
    pub async fn tick(&mut self) {
        match self.wallet.detect_external_change().await {
            Ok(Some(event)) => self.handle_wallet_event(event).await,
            Ok(None) => {}
            Err(err) => warn!("wallet poll failed: {}", err),
        }
        self.sync_supply().await;
        self.refresh_recent().await;
    }

    pub async fn discover(&mut self) -> usize {
        let announced = self.discovery.request_providers(&mut self.registry).await;
        if announced > 0 {
            info!(announced, total = self.registry.len(), "wallets announced");
        }
        announced
    }

    pub async fn sync_supply(&mut self) -> bool {
        let provider = self.read_transport();
        self.sync.refresh_snapshot(provider.as_ref(), &mut self.state).await
    }

    pub async fn refresh_recent(&mut self) -> bool {
        self.sync.refresh_recent(&mut self.state).await
    }

    /// The wallet serves reads once it sits on the sale's chain; before that,
    /// and without a wallet, the read-only endpoint does.
    fn read_transport(&self) -> Arc<dyn Eip1193> {
        match self.wallet.current() {
            Some(session) if session.chain_id == self.chain.chain_id => Arc::clone(session.transport()),
            _ => Arc::clone(&self.read_endpoint),
        }
    }

    pub async fn connect(&mut self, target: ConnectTarget) -> Result<(), WalletError> {
        let result = self.try_connect(target).await;
        if let Err(err) = &result {
            self.state.log.failure(err);
        }
        result
    }

    async fn try_connect(&mut self, target: ConnectTarget) -> Result<(), WalletError> {
        let choice = match target {
            ConnectTarget::RemotePairing => TransportChoice::RemotePairing,
            ConnectTarget::Injected(index) => {
                if self.registry.is_empty() {
                    self.discover().await;
                }
                let detail = match index {
                    Some(index) => self.registry.get(index),
                    None => self.registry.first(),
                };
                TransportChoice::Injected(detail.cloned())
            }
        };

        self.wallet.connect(choice).await?;
        let session = self.wallet.current_mut().ok_or(WalletError::NotConnected)?;
        let switched = self.orchestrator.guard().ensure_chain(session).await;
        if let Err(err) = switched {
            // a session off the sale's chain is not a connection
            self.wallet.disconnect().await;
            return Err(err);
        }
        let session = self.wallet.current().ok_or(WalletError::NotConnected)?;

        let address = session.address.short();
        let provider = Arc::clone(session.transport());
        match self.orchestrator.reader().contract().price(provider.as_ref()).await {
            Ok(price_wei) => self.state.log.push(format!(
                "Connected: {address} — price {} ETH",
                format_ether(price_wei)
            )),
            Err(err) => {
                warn!("price unavailable after connect: {}", err);
                self.state.log.push(format!("Connected: {address}"));
            }
        }

        self.sync_supply().await;
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        if self.wallet.is_connected() {
            self.wallet.disconnect().await;
            self.state.log.push("Disconnected.");
        }
    }

    /// Drops the session after an external account or chain change.
    pub async fn reset_session(&mut self) {
        if self.wallet.reset_session() {
            self.state.mint_in_flight = false;
            self.state.log.push("Wallet changed. Session reset, connect again.");
            self.sync_supply().await;
        }
    }

    pub async fn next_wallet_event(&mut self) -> ProviderEvent {
        self.wallet.next_event().await
    }

    pub async fn handle_wallet_event(&mut self, event: ProviderEvent) {
        let stale = self
            .wallet
            .current()
            .is_some_and(|session| session.is_invalidated_by(&event));
        if stale {
            info!(?event, "wallet event invalidated the session");
            self.reset_session().await;
        }
    }

    /// `Err` only when the mint could not start; a started mint always
    /// returns its terminal attempt.
    pub async fn mint(&mut self, raw_quantity: &str) -> Result<MintAttempt, MintError> {
        if self.state.mint_in_flight {
            self.state.log.failure(MintError::InFlight);
            return Err(MintError::InFlight);
        }
        let Some(session) = self.wallet.current_mut() else {
            self.state.log.failure(MintError::NotConnected);
            return Err(MintError::NotConnected);
        };

        let quantity = coerce_quantity(raw_quantity);
        self.state.mint_in_flight = true;
        let attempt = self
            .orchestrator
            .mint(session, quantity, &mut self.state.log)
            .await;
        self.state.mint_in_flight = false;
        self.state.last_attempt = Some(attempt.clone());

        if attempt.status == MintStatus::Confirmed {
            self.sync_supply().await;
            self.refresh_recent().await;
        }
        Ok(attempt)
    }

    pub fn load_more_gallery(&mut self) -> usize {
        self.state.gallery.on_sentinel_visible(true)
    }

    pub async fn shutdown(&mut self) {
        self.wallet.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use mp_api_types::{ChainId, RecentMintRecord};
    use mp_chain_base::base_mainnet;
    use mp_chain_client::contract::{PRICE, REMAINING, SALE_ACTIVE, TOTAL_MINTED};
    use mp_chain_client::{InMemoryProvider, ProviderError};
    use mp_mint::ConfirmationPolicy;
    use mp_mint::strategy::MINT;
    use serde_json::json;
    use std::time::Duration;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";
    const TX: &str = "0x9c0e1f7a3b5d7f9e1c3a5b7d9f1e3c5a7b9d1f3e5c7a9b1d3f5e7c9a1b3d5f7e";

    #[derive(Default)]
    struct FakeIndexer {
        records: Mutex<Vec<RecentMintRecord>>,
        failing: Mutex<bool>,
        calls: AtomicUsize,
    }

    impl FakeIndexer {
        fn with_mints(count: u128) -> Self {
            let records = (1..=count)
                .rev()
                .map(|token_id| RecentMintRecord {
                    token_id,
                    recipient: WalletAddress(ALICE.to_owned()),
                    tx_hash: format!("0x{token_id:064x}"),
                })
                .collect();
            Self {
                records: Mutex::new(records),
                ..Self::default()
            }
        }

        fn fail(&self) {
            *self.failing.lock().unwrap() = true;
        }
    }

    #[async_trait]
    impl MintIndexer for FakeIndexer {
        async fn recent_mints(
            &self,
            _contract: &WalletAddress,
            count: usize,
        ) -> anyhow::Result<Vec<RecentMintRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *self.failing.lock().unwrap() {
                anyhow::bail!("indexer recent_mints HTTP 503 Service Unavailable");
            }
            Ok(self.records.lock().unwrap().iter().take(count).cloned().collect())
        }
    }

    fn views(provider: InMemoryProvider) -> InMemoryProvider {
        provider
            .on_call(PRICE, Ok(InMemoryProvider::word(1_000_000_000_000_000)))
            .on_call(TOTAL_MINTED, Ok(InMemoryProvider::word(1_200)))
            .on_call(REMAINING, Ok(InMemoryProvider::word(5_975)))
            .on_call(SALE_ACTIVE, Ok(InMemoryProvider::word(1)))
    }

    fn read_only() -> Arc<InMemoryProvider> {
        Arc::new(views(InMemoryProvider::new().with_label("read-only")))
    }

    /// Wallet already on Base with a mint that confirms.
    fn frame() -> InMemoryProvider {
        views(InMemoryProvider::new().with_label("Frame"))
            .on("eth_requestAccounts", Ok(json!([ALICE])))
            .on("eth_accounts", Ok(json!([ALICE])))
            .on("eth_chainId", Ok(json!("0x2105")))
            .on_estimate(MINT, Ok(json!("0x1e848")))
            .on("eth_sendTransaction", Ok(json!(TX)))
            .on(
                "eth_getTransactionReceipt",
                Ok(json!({ "blockNumber": "0x1312d00", "status": "0x1" })),
            )
    }

    fn app(
        read_endpoint: Arc<InMemoryProvider>,
        wallet: Option<Arc<InMemoryProvider>>,
        indexer: Arc<FakeIndexer>,
    ) -> MintApp {
        let mut discovery = DiscoveryService::default();
        if let Some(wallet) = wallet {
            discovery.add_candidate("Frame", "sh.frame", wallet);
        }
        MintApp::new(AppDeps {
            chain: base_mainnet(vec!["https://rpc.example".to_owned()]),
            contract: WalletAddress("0xc9df3da7f53a145b88b88925d380d6071f8d25c3".to_owned()),
            discovery,
            pairing: None,
            pairing_config: None,
            indexer,
            read_endpoint,
            settings: MintSettings {
                confirmation: ConfirmationPolicy {
                    poll_interval: Duration::from_millis(1),
                    timeout: Duration::from_secs(5),
                },
                ..MintSettings::default()
            },
            gallery: GalleryPaginator::new("https://img.example", "png", 7175, 60),
            recent_count: 5,
        })
    }

    #[tokio::test]
    async fn startup_reads_through_read_only_endpoint() -> anyhow::Result<()> {
        let read = read_only();
        let indexer = Arc::new(FakeIndexer::with_mints(8));
        let mut app = app(read.clone(), None, indexer);

        app.startup().await;

        let snapshot = app.state.snapshot.ok_or_else(|| anyhow::anyhow!("no snapshot"))?;
        assert_eq!(snapshot.total_minted, 1_200);
        assert_eq!(snapshot.remaining, 5_975);
        assert_eq!(snapshot.sale_label(), "Active");
        assert_eq!(read.calls_for("eth_call"), 4);
        assert_eq!(app.state.recent.len(), 5);
        assert_eq!(app.state.recent[0].token_id, 8);
        assert_eq!(app.state.gallery.loaded(), 60);
        Ok(())
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() -> anyhow::Result<()> {
        let read = read_only();
        let mut app = app(read.clone(), None, Arc::new(FakeIndexer::default()));
        assert!(app.sync_supply().await);
        let before = app.state.snapshot;

        read.set_call(TOTAL_MINTED, Ok(InMemoryProvider::word(1_300)));
        read.set_call(REMAINING, Err(ProviderError::Transport("timeout".to_owned())));
        assert!(!app.sync_supply().await);
        assert_eq!(app.state.snapshot, before);

        // sale flag failing alone still publishes, as paused
        read.set_call(REMAINING, Ok(InMemoryProvider::word(5_875)));
        read.set_call(SALE_ACTIVE, Err(ProviderError::rpc(-32000, "execution reverted")));
        assert!(app.sync_supply().await);
        let after = app.state.snapshot.ok_or_else(|| anyhow::anyhow!("no snapshot"))?;
        assert_eq!((after.total_minted, after.remaining), (1_300, 5_875));
        assert!(!after.sale_active);
        Ok(())
    }

    #[tokio::test]
    async fn failed_recent_refresh_clears_the_list() {
        let indexer = Arc::new(FakeIndexer::with_mints(3));
        let mut app = app(read_only(), None, indexer.clone());
        assert!(app.refresh_recent().await);
        assert_eq!(app.state.recent.len(), 3);

        indexer.fail();
        assert!(!app.refresh_recent().await);
        assert!(app.state.recent.is_empty());
        // failures never reach the activity log
        assert_eq!(app.state.log.render(), "Ready.");
    }

    #[tokio::test]
    async fn connect_switches_network_and_reports_price() -> anyhow::Result<()> {
        // discovery probe, connect, guard; then the wallet reports Base
        let wallet = Arc::new(frame().on_sequence(
            "eth_chainId",
            vec![Ok(json!("0x1")), Ok(json!("0x1")), Ok(json!("0x1")), Ok(json!("0x2105"))],
        ).on("wallet_switchEthereumChain", Ok(json!(null))));
        let mut app = app(read_only(), Some(wallet.clone()), Arc::new(FakeIndexer::default()));

        app.connect(ConnectTarget::Injected(None)).await?;

        let session = app.session().ok_or_else(|| anyhow::anyhow!("not connected"))?;
        assert_eq!(session.chain_id, ChainId(8453));
        assert_eq!(session.provider_name, "Frame");
        assert_eq!(wallet.calls_for("wallet_switchEthereumChain"), 1);
        assert!(app
            .state
            .log
            .render()
            .ends_with("Connected: 0x1111…1111 — price 0.001 ETH"));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_network_switch_leaves_no_session() {
        let wallet = Arc::new(
            frame()
                .on("eth_chainId", Ok(json!("0x1")))
                .on(
                    "wallet_switchEthereumChain",
                    Err(ProviderError::rpc(4001, "User rejected the request.")),
                ),
        );
        let mut app = app(read_only(), Some(wallet.clone()), Arc::new(FakeIndexer::default()));

        let result = app.connect(ConnectTarget::Injected(None)).await;

        assert!(matches!(result, Err(WalletError::SwitchRejected(_))));
        assert!(app.session().is_none());
        assert!(app
            .state
            .log
            .render()
            .ends_with("❌ network switch rejected: User rejected the request."));
        assert!(!app.state.log.render().contains("Connected:"));

        // reads stay on the read-only endpoint
        let wallet_calls = wallet.calls_for("eth_call");
        app.sync_supply().await;
        assert_eq!(wallet.calls_for("eth_call"), wallet_calls);
    }

    #[tokio::test]
    async fn failed_chain_add_leaves_no_session() {
        let wallet = Arc::new(
            frame()
                .on("eth_chainId", Ok(json!("0x1")))
                .on("wallet_switchEthereumChain", Err(ProviderError::rpc(4902, "Unrecognized chain ID")))
                .on("wallet_addEthereumChain", Err(ProviderError::rpc(-32602, "bad rpc url"))),
        );
        let mut app = app(read_only(), Some(wallet), Arc::new(FakeIndexer::default()));

        let result = app.connect(ConnectTarget::Injected(None)).await;
        assert!(matches!(result, Err(WalletError::AddChainFailed(_))));
        assert!(app.session().is_none());
    }

    #[tokio::test]
    async fn connect_without_any_wallet_is_reported() {
        let mut app = app(read_only(), None, Arc::new(FakeIndexer::default()));

        let result = app.connect(ConnectTarget::Injected(None)).await;
        assert!(matches!(result, Err(WalletError::NoWalletFound)));
        assert!(app.state.log.render().contains("❌ No wallet found."));

        let result = app.connect(ConnectTarget::RemotePairing).await;
        assert!(matches!(result, Err(WalletError::PairingNotConfigured)));
        assert!(app.session().is_none());
    }

    #[tokio::test]
    async fn rejected_connection_leaves_no_session() {
        let wallet = Arc::new(frame().on(
            "eth_requestAccounts",
            Err(ProviderError::rpc(4001, "User rejected the request.")),
        ));
        let mut app = app(read_only(), Some(wallet), Arc::new(FakeIndexer::default()));

        let result = app.connect(ConnectTarget::Injected(Some(0))).await;
        assert!(matches!(result, Err(WalletError::UserRejected(_))));
        assert!(app.session().is_none());
        assert!(app.state.log.render().ends_with("❌ User rejected the request."));
    }

    #[tokio::test]
    async fn mint_needs_a_wallet() {
        let mut app = app(read_only(), None, Arc::new(FakeIndexer::default()));
        assert!(matches!(app.mint("1").await, Err(MintError::NotConnected)));
        assert!(app.state.log.render().ends_with("❌ Connect a wallet first."));
    }

    #[tokio::test]
    async fn second_mint_while_pending_is_rejected() -> anyhow::Result<()> {
        let wallet = Arc::new(frame());
        let mut app = app(read_only(), Some(wallet.clone()), Arc::new(FakeIndexer::default()));
        app.connect(ConnectTarget::Injected(Some(0))).await?;

        app.state.mint_in_flight = true;
        assert!(matches!(app.mint("1").await, Err(MintError::InFlight)));
        assert_eq!(wallet.calls_for("eth_sendTransaction"), 0);
        Ok(())
    }

    #[tokio::test]
    async fn confirmed_mint_refreshes_supply_and_recent() -> anyhow::Result<()> {
        let wallet = Arc::new(frame());
        let indexer = Arc::new(FakeIndexer::with_mints(2));
        let mut app = app(read_only(), Some(wallet.clone()), indexer.clone());
        app.startup().await;
        app.connect(ConnectTarget::Injected(Some(0))).await?;
        let indexer_calls = indexer.calls.load(Ordering::SeqCst);

        wallet.set_call(TOTAL_MINTED, Ok(InMemoryProvider::word(1_202)));
        let attempt = app.mint("2").await?;

        assert_eq!(attempt.status, MintStatus::Confirmed);
        assert_eq!(attempt.value_wei, 2_000_000_000_000_000);
        assert!(!app.state.mint_in_flight);
        assert_eq!(app.state.last_attempt.as_ref(), Some(&attempt));
        assert_eq!(app.state.snapshot.map(|s| s.total_minted), Some(1_202));
        assert_eq!(indexer.calls.load(Ordering::SeqCst), indexer_calls + 1);
        Ok(())
    }

    #[tokio::test]
    async fn unparsable_quantity_mints_one() -> anyhow::Result<()> {
        let wallet = Arc::new(frame());
        let mut app = app(read_only(), Some(wallet), Arc::new(FakeIndexer::default()));
        app.connect(ConnectTarget::Injected(None)).await?;

        let attempt = app.mint("zero").await?;
        assert_eq!(attempt.quantity, 1);
        assert_eq!(attempt.value_wei, 1_000_000_000_000_000);
        Ok(())
    }

    #[tokio::test]
    async fn external_account_change_resets_session() -> anyhow::Result<()> {
        let wallet = Arc::new(frame());
        let mut app = app(read_only(), Some(wallet.clone()), Arc::new(FakeIndexer::default()));
        app.connect(ConnectTarget::Injected(None)).await?;

        // our own switch echo is not a change
        app.handle_wallet_event(ProviderEvent::ChainChanged("0x2105".to_owned())).await;
        assert!(app.session().is_some());

        app.handle_wallet_event(ProviderEvent::AccountsChanged(vec![BOB.to_owned()])).await;
        assert!(app.session().is_none());
        assert!(app.state.log.render().contains("Session reset"));
        Ok(())
    }

    #[tokio::test]
    async fn polling_detects_account_drift() -> anyhow::Result<()> {
        let wallet = Arc::new(frame());
        let mut app = app(read_only(), Some(wallet.clone()), Arc::new(FakeIndexer::default()));
        app.connect(ConnectTarget::Injected(None)).await?;

        app.tick().await;
        assert!(app.session().is_some());

        wallet.set("eth_accounts", Ok(json!([BOB])));
        app.tick().await;
        assert!(app.session().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn pushed_event_reaches_the_controller() -> anyhow::Result<()> {
        let wallet = Arc::new(frame());
        let mut app = app(read_only(), Some(wallet.clone()), Arc::new(FakeIndexer::default()));
        app.connect(ConnectTarget::Injected(None)).await?;

        wallet.emit(ProviderEvent::SessionDeleted);
        let event = app.next_wallet_event().await;
        app.handle_wallet_event(event).await;
        assert!(app.session().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() -> anyhow::Result<()> {
        let mut app = app(read_only(), Some(Arc::new(frame())), Arc::new(FakeIndexer::default()));
        app.connect(ConnectTarget::Injected(None)).await?;

        app.disconnect().await;
        app.disconnect().await;
        assert!(app.session().is_none());
        assert_eq!(
            app.state.log.lines().iter().filter(|l| *l == "Disconnected.").count(),
            1
        );
        Ok(())
    }
}
