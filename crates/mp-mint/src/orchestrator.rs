use std::sync::Arc;
use std::time::Duration;

use mp_api_types::{MintAttempt, WalletAddress, format_ether};
use mp_chain_client::contract::wait_for_receipt;
use mp_chain_client::{ChainReader, Eip1193, ProviderError};
use mp_wallet_core::{NetworkGuard, Session};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::activity::ActivityLog;
use crate::error::MintError;
use crate::strategy::CallStrategy;

pub const DEFAULT_GAS_LIMIT: u64 = 250_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MintSettings {
    /// Upper bound sent with every submission, not a measured cost.
    pub gas_limit: u64,
    pub strategies: Vec<CallStrategy>,
    pub confirmation: ConfirmationPolicy,
}

impl Default for MintSettings {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            strategies: CallStrategy::defaults(),
            confirmation: ConfirmationPolicy::default(),
        }
    }
}

/// `price × quantity` in wei; `None` on overflow.
pub fn mint_value(price_wei: u128, quantity: u32) -> Option<u128> {
    price_wei.checked_mul(u128::from(quantity))
}

/// Parses user input the permissive way: leading digits only, anything below
/// one (or unparsable) becomes one.
pub fn coerce_quantity(raw: &str) -> u32 {
    let raw = raw.trim();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 1;
    }
    match digits.parse::<u64>() {
        Ok(0) => 1,
        Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
        // digits only, so this is overflow
        Err(_) => u32::MAX,
    }
}

/// Runs one mint: sale check, value, simulate-then-submit over the candidate
/// entry points, and one-block confirmation.
pub struct MintOrchestrator {
    reader: ChainReader,
    guard: NetworkGuard,
    settings: MintSettings,
    progress: watch::Sender<Option<MintAttempt>>,
}

impl MintOrchestrator {
    pub fn new(reader: ChainReader, guard: NetworkGuard, settings: MintSettings) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            reader,
            guard,
            settings,
            progress,
        }
    }

    pub fn reader(&self) -> &ChainReader {
        &self.reader
    }

    pub fn guard(&self) -> &NetworkGuard {
        &self.guard
    }

    pub fn settings(&self) -> &MintSettings {
        &self.settings
    }

    /// Every transition of the current attempt, starting with the pending tx hash.
    pub fn subscribe(&self) -> watch::Receiver<Option<MintAttempt>> {
        self.progress.subscribe()
    }

    pub async fn mint(
        &self,
        session: &mut Session,
        quantity: u32,
        log: &mut ActivityLog,
    ) -> MintAttempt {
        let mut attempt = MintAttempt::new(quantity.max(1));
        if let Err(err) = self.run(session, &mut attempt, log).await {
            warn!(quantity = attempt.quantity, "mint failed: {}", err);
            log.failure(&err);
            attempt.fail(err.to_string());
        }
        self.publish(&attempt);
        attempt
    }

    async fn run(
        &self,
        session: &mut Session,
        attempt: &mut MintAttempt,
        log: &mut ActivityLog,
    ) -> Result<(), MintError> {
        self.guard.ensure_chain(session).await?;
        let provider = Arc::clone(session.transport());
        let from = session.address.clone();
        let contract = self.reader.contract();

        if !self.reader.sale_active_or_false(provider.as_ref()).await {
            return Err(MintError::SaleInactive);
        }

        let price_wei = contract
            .price(provider.as_ref())
            .await
            .map_err(MintError::PriceUnavailable)?;
        attempt.value_wei = mint_value(price_wei, attempt.quantity).ok_or(MintError::ValueOverflow {
            quantity: attempt.quantity,
            price_wei,
        })?;
        log.push(format!(
            "Minting {} for {} ETH…",
            attempt.quantity,
            format_ether(attempt.value_wei)
        ));

        let strategy = self
            .select_strategy(provider.as_ref(), &from, attempt.quantity, attempt.value_wei)
            .await?;
        attempt.entry_point = Some(strategy.signature.clone());

        let tx_hash = contract
            .submit(
                provider.as_ref(),
                &from,
                &strategy.signature,
                attempt.quantity,
                attempt.value_wei,
                self.settings.gas_limit,
            )
            .await
            .map_err(|err| MintError::SubmissionFailed(err.reason()))?;

        attempt.tx_hash = Some(tx_hash.clone());
        log.push(format!("Tx sent: {tx_hash}"));
        self.publish(attempt);

        let confirmation = self.settings.confirmation;
        let receipt = wait_for_receipt(
            provider.as_ref(),
            &tx_hash,
            confirmation.poll_interval,
            confirmation.timeout,
        )
        .await
        .map_err(|err| MintError::SubmissionFailed(err.reason()))?;

        if !receipt.success {
            attempt.block_number = Some(receipt.block_number);
            return Err(MintError::SubmissionFailed(format!(
                "Transaction reverted in block {}",
                receipt.block_number
            )));
        }

        attempt.confirm(receipt.block_number);
        info!(tx_hash = %tx_hash, block = receipt.block_number, "mint confirmed");
        log.push(format!("✅ Confirmed in block {}", receipt.block_number));
        Ok(())
    }

    /// First candidate whose simulation succeeds. When all fail, the reported
    /// reason is the latest one carrying a nested revert reason, else the
    /// latest message.
    async fn select_strategy(
        &self,
        provider: &dyn Eip1193,
        from: &WalletAddress,
        quantity: u32,
        value_wei: u128,
    ) -> Result<&CallStrategy, MintError> {
        let contract = self.reader.contract();
        let mut failures: Vec<ProviderError> = Vec::new();

        for strategy in &self.settings.strategies {
            match contract
                .simulate(provider, from, &strategy.signature, quantity, value_wei)
                .await
            {
                Ok(estimate) => {
                    if estimate > self.settings.gas_limit {
                        warn!(
                            estimate,
                            ceiling = self.settings.gas_limit,
                            "{} estimate exceeds the configured gas ceiling",
                            strategy.name()
                        );
                    }
                    debug!(estimate, "{} simulation succeeded", strategy.name());
                    return Ok(strategy);
                }
                Err(err) => {
                    debug!("{} simulation failed: {}", strategy.name(), err.reason());
                    failures.push(err);
                }
            }
        }

        let reason = failures
            .iter()
            .rev()
            .find_map(ProviderError::specific_reason)
            .or_else(|| failures.last().map(ProviderError::reason))
            .unwrap_or_else(|| "no mint entry point configured".to_owned());
        Err(MintError::SimulationFailed(reason))
    }

    fn publish(&self, attempt: &MintAttempt) {
        self.progress.send_replace(Some(attempt.clone()));
    }
}
