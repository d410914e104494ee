//! Position aggregator.
//!
//! A [`Position`] is built from two concurrent reads: the staking contract's
//! `getPosition(user)` and the gm token's `balanceOf(user)`. Both must succeed;
//! there is no partial or cached result. Each call is independent, so a caller
//! polling on a timer can drop an in-flight call at any point.

use alloy::primitives::{Address, U256};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::contracts::RawPosition;
use crate::error::StakingError;
use crate::gateway::ContractGateway;
use crate::network::NetworkProfile;
use crate::units::format_amount;

/// Display snapshot of a user's staking position. Amounts are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub staked_amount: String,
    pub restaked_amount: String,
    pub estimated_rewards: String,
    /// Opaque contract timestamp, for display only.
    pub last_update_time: String,
    #[serde(rename = "gmTokenBalance")]
    pub derivative_token_balance: String,
}

impl Position {
    fn from_reads(raw: RawPosition, derivative_token_balance: U256) -> Self {
        Self {
            staked_amount: format_amount(raw.staked_amount),
            restaked_amount: format_amount(raw.restaked_amount),
            estimated_rewards: format_amount(raw.estimated_rewards),
            last_update_time: raw.last_update_time.to_string(),
            derivative_token_balance: format_amount(derivative_token_balance),
        }
    }
}

pub struct PositionAggregator {
    gateway: Arc<ContractGateway>,
}

impl PositionAggregator {
    pub fn new(gateway: Arc<ContractGateway>) -> Self {
        Self { gateway }
    }

    /// Fetch a fresh position for `user`.
    #[instrument(skip(self))]
    pub async fn get_position(&self, user: Address) -> Result<Position, StakingError> {
        let bindings = self.gateway.bindings().await?;
        let (raw, balance) = tokio::try_join!(
            bindings.staking.get_position(user),
            bindings.derivative_token.balance_of(user),
        )?;
        let position = Position::from_reads(raw, balance);
        tracing::debug!(?position, "fetched position");
        Ok(position)
    }

    /// Native symbol of the connected network.
    pub async fn network_symbol(&self) -> Result<String, StakingError> {
        Ok(self.gateway.active_network().await?.native_symbol)
    }

    /// Profile of the connected network.
    pub async fn current_network(&self) -> Result<NetworkProfile, StakingError> {
        self.gateway.active_network().await
    }

    /// Address of the wallet's current signer.
    pub async fn account(&self) -> Result<Address, StakingError> {
        Ok(self.gateway.bindings().await?.signer_address())
    }

    /// Native-asset balance of `account`, as a decimal string.
    pub async fn native_balance(&self, account: Address) -> Result<String, StakingError> {
        let bindings = self.gateway.bindings().await?;
        let balance = bindings.signer.native_balance(account).await?;
        Ok(format_amount(balance))
    }
}
