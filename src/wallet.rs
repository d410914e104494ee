//! Wallet/provider seam.
//!
//! The staking core never talks to a concrete wallet. It is handed a
//! [`WalletProvider`] at construction, asks it for authorization and a
//! [`WalletSigner`], and subscribes to its account/chain change notifications.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::chain::ChainId;
use crate::contracts::{DerivativeToken, StakingContract};
use crate::error::StakingError;

/// Account or chain switch reported by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletChange {
    AccountChanged(Address),
    ChainChanged(ChainId),
}

/// The wallet/provider collaborator.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the wallet for account access. May prompt the user.
    async fn request_authorization(&self) -> Result<(), StakingError>;

    /// The currently selected signer.
    async fn signer(&self) -> Result<Arc<dyn WalletSigner>, StakingError>;

    /// Chain the wallet is currently connected to.
    async fn chain_id(&self) -> Result<ChainId, StakingError>;

    /// Signer and chain id of the same connection.
    ///
    /// Wallets that can switch endpoints override this so a switch between the
    /// two reads cannot pair one endpoint's signer with another's chain id.
    async fn connection(&self) -> Result<(Arc<dyn WalletSigner>, ChainId), StakingError> {
        let signer = self.signer().await?;
        let chain_id = self.chain_id().await?;
        Ok((signer, chain_id))
    }

    /// Subscribe to account and chain switches.
    fn subscribe(&self) -> broadcast::Receiver<WalletChange>;
}

/// An authorized account able to sign, and to bind contracts that sign with it.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Bind the staking contract at `address` to this signer.
    fn bind_staking(&self, address: Address) -> Arc<dyn StakingContract>;

    /// Bind the gm token contract at `address` to this signer.
    fn bind_derivative_token(&self, address: Address) -> Arc<dyn DerivativeToken>;

    /// Native-asset balance of `account` on the signer's chain.
    async fn native_balance(&self, account: Address) -> Result<U256, StakingError>;
}
