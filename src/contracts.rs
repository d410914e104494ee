//! Contract interfaces consumed by the gateway, orchestrator and aggregator.
//!
//! The traits mirror the on-chain ABIs one-to-one. Write methods return a
//! [`PendingTransaction`] so callers decide when to wait for confirmation;
//! the alloy-backed implementations live in [`crate::chain::evm`].

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use serde::Serialize;

use crate::error::StakingError;

/// Raw `getPosition(address)` return values, in contract units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawPosition {
    pub staked_amount: U256,
    pub restaked_amount: U256,
    pub estimated_rewards: U256,
    pub last_update_time: U256,
    pub gm_token_balance: U256,
}

/// Terminal outcome of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// A submitted transaction that has not been confirmed yet.
#[async_trait]
pub trait PendingTransaction: Send {
    fn tx_hash(&self) -> TxHash;

    /// Wait until the transaction is mined. A reverted receipt is an error.
    async fn confirm(self: Box<Self>) -> Result<TransactionResult, StakingError>;
}

/// Boxed pending transaction handed out by contract bindings.
pub type Pending = Box<dyn PendingTransaction>;

/// Staking contract: `stake()`, `restake(uint256)`, `getPosition(address)`.
#[async_trait]
pub trait StakingContract: Send + Sync {
    fn address(&self) -> Address;

    /// Submit `stake()` carrying `value` of the native asset.
    async fn stake(&self, value: U256, gas_limit: u64) -> Result<Pending, StakingError>;

    /// Submit `restake(amount)`.
    async fn restake(&self, amount: U256, gas_limit: u64) -> Result<Pending, StakingError>;

    async fn get_position(&self, user: Address) -> Result<RawPosition, StakingError>;
}

/// ERC-20 subset of the gm token.
#[async_trait]
pub trait DerivativeToken: Send + Sync {
    fn address(&self) -> Address;

    async fn approve(&self, spender: Address, value: U256) -> Result<Pending, StakingError>;

    async fn balance_of(&self, account: Address) -> Result<U256, StakingError>;

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, StakingError>;
}
