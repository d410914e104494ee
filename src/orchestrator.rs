//! Transaction orchestrator: `stake` and `restake`.
//!
//! At most one operation is in flight per orchestrator. A second call made while
//! one is outstanding is rejected with [`StakingError::Busy`] before anything is
//! submitted, since two transactions from the same signer would race for a nonce.
//!
//! Restake ordering:
//! 1. obtain bindings
//! 2. convert the amount to raw units
//! 3. read `allowance(signer, stakingContract)`
//! 4. if the allowance is short, `approve(stakingContract, amount)` for exactly the
//!    amount and wait for its confirmation
//! 5. `restake(amount)` and wait for its confirmation
//!
//! A failed step aborts everything after it.

use alloy::primitives::U256;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::instrument;

use crate::contracts::TransactionResult;
use crate::error::StakingError;
use crate::gateway::{ContractBindings, ContractGateway};
use crate::units::parse_amount;

/// Observable orchestrator state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorStatus {
    pub busy: bool,
    /// Message of the last failed operation. Cleared when the next one starts.
    pub last_error: Option<String>,
}

/// Sequences staking transactions against the gateway's bindings.
pub struct TransactionOrchestrator {
    gateway: Arc<ContractGateway>,
    gas_limit: u64,
    busy: AtomicBool,
    status: watch::Sender<OrchestratorStatus>,
}

/// Marks the orchestrator busy until dropped.
struct InFlight<'a> {
    orchestrator: &'a TransactionOrchestrator,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.orchestrator.status.send_modify(|s| s.busy = false);
        self.orchestrator.busy.store(false, Ordering::SeqCst);
    }
}

impl TransactionOrchestrator {
    /// `gas_limit` is the fixed ceiling sent with stake and restake calls.
    pub fn new(gateway: Arc<ContractGateway>, gas_limit: u64) -> Self {
        let (status, _) = watch::channel(OrchestratorStatus::default());
        Self {
            gateway,
            gas_limit,
            busy: AtomicBool::new(false),
            status,
        }
    }

    pub fn status(&self) -> OrchestratorStatus {
        self.status.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Receive every status transition.
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorStatus> {
        self.status.subscribe()
    }

    fn begin(&self, operation: &'static str) -> Result<InFlight<'_>, StakingError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(operation, "rejected: another transaction is in flight");
            return Err(StakingError::Busy);
        }
        self.status.send_modify(|s| {
            s.busy = true;
            s.last_error = None;
        });
        Ok(InFlight { orchestrator: self })
    }

    fn record_failure(&self, operation: &'static str, result: &Result<TransactionResult, StakingError>) {
        if let Err(e) = result {
            tracing::error!(operation, error = %e, "operation failed");
            let message = e.to_string();
            self.status.send_modify(|s| s.last_error = Some(message));
        }
    }

    /// Stake `amount` of the native asset and wait for confirmation.
    #[instrument(skip(self))]
    pub async fn stake(&self, amount: &str) -> Result<TransactionResult, StakingError> {
        let _in_flight = self.begin("stake")?;
        let result = self.execute_stake(amount).await;
        self.record_failure("stake", &result);
        result
    }

    /// Restake `amount` of gm tokens, approving first if the allowance is short.
    #[instrument(skip(self))]
    pub async fn restake(&self, amount: &str) -> Result<TransactionResult, StakingError> {
        let _in_flight = self.begin("restake")?;
        let result = self.execute_restake(amount).await;
        self.record_failure("restake", &result);
        result
    }

    async fn execute_stake(&self, amount: &str) -> Result<TransactionResult, StakingError> {
        let bindings = self.gateway.bindings().await?;
        let value = parse_amount(amount)?;

        tracing::info!(
            amount,
            raw = %value,
            symbol = %bindings.network.native_symbol,
            gas_limit = self.gas_limit,
            "staking"
        );
        let pending = bindings.staking.stake(value, self.gas_limit).await?;
        let tx_hash = pending.tx_hash();
        tracing::debug!(tx = %tx_hash, "stake submitted, awaiting confirmation");
        let result = pending.confirm().await?;
        tracing::info!(tx = %result.transaction_hash, "stake confirmed");
        Ok(result)
    }

    async fn execute_restake(&self, amount: &str) -> Result<TransactionResult, StakingError> {
        let bindings = self.gateway.bindings().await?;
        let value = parse_amount(amount)?;

        self.ensure_allowance(&bindings, value).await?;

        tracing::info!(amount, raw = %value, gas_limit = self.gas_limit, "restaking");
        let pending = bindings.staking.restake(value, self.gas_limit).await?;
        tracing::debug!(tx = %pending.tx_hash(), "restake submitted, awaiting confirmation");
        let result = pending.confirm().await?;
        tracing::info!(tx = %result.transaction_hash, "restake confirmed");
        Ok(result)
    }

    /// Approve exactly `value` when the current allowance is below it. Returns once
    /// the approval is confirmed, or immediately when no approval is needed.
    async fn ensure_allowance(
        &self,
        bindings: &ContractBindings,
        value: U256,
    ) -> Result<(), StakingError> {
        let owner = bindings.signer_address();
        let spender = bindings.network.staking_contract;
        let allowance = bindings.derivative_token.allowance(owner, spender).await?;
        tracing::debug!(%owner, %spender, %allowance, required = %value, "current allowance");

        if allowance >= value {
            return Ok(());
        }

        tracing::info!(%spender, %value, "approving gm tokens");
        let pending = bindings.derivative_token.approve(spender, value).await?;
        tracing::debug!(tx = %pending.tx_hash(), "approval submitted, awaiting confirmation");
        pending.confirm().await?;
        tracing::info!("approval confirmed");
        Ok(())
    }
}
