//! Alloy-backed EVM implementations of the wallet and contract seams.
//!
//! - [`RpcWallet`]: a local private-key wallet talking to one JSON-RPC endpoint at a
//!   time. Re-pointing it to another network emits a chain change notification.
//! - [`EvmSigner`]: the wallet's signing account, able to bind contracts.
//! - [`EvmStakingContract`] / [`EvmDerivativeToken`]: `sol!` generated instances
//!   behind the [`StakingContract`] / [`DerivativeToken`] traits.
//!
//! Invariants:
//! - Stake and restake carry an explicit gas limit, so the gas filler never estimates them.
//! - Confirmation waits have no timeout of their own; only individual RPC requests do.

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tracing::Instrument;

use crate::chain::ChainId;
use crate::contracts::{
    DerivativeToken, Pending, PendingTransaction, RawPosition, StakingContract, TransactionResult,
};
use crate::error::StakingError;
use crate::network::NetworkProfile;
use crate::wallet::{WalletChange, WalletProvider, WalletSigner};

sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IStaking {
        function stake() external payable;
        function restake(uint256 amount) external;
        function getPosition(address user)
            external
            view
            returns (
                uint256 stakedAmount,
                uint256 restakedAmount,
                uint256 estimatedRewards,
                uint256 lastUpdateTime,
                uint256 gmTokenBalance
            );
    }
}

sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IGmToken {
        function approve(address spender, uint256 value) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
    }
}

/// Capacity of the wallet change broadcast channel.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Submitted transaction awaiting its receipt.
pub struct EvmPendingTransaction {
    inner: PendingTransactionBuilder<Ethereum>,
    context: &'static str,
}

impl EvmPendingTransaction {
    fn boxed(inner: PendingTransactionBuilder<Ethereum>, context: &'static str) -> Pending {
        tracing::info!(tx = %inner.tx_hash(), context, "transaction sent");
        Box::new(Self { inner, context })
    }
}

#[async_trait]
impl PendingTransaction for EvmPendingTransaction {
    fn tx_hash(&self) -> TxHash {
        *self.inner.tx_hash()
    }

    async fn confirm(self: Box<Self>) -> Result<TransactionResult, StakingError> {
        let context = self.context;
        let tx_hash = *self.inner.tx_hash();
        let receipt = self
            .inner
            .get_receipt()
            .instrument(tracing::info_span!("get_receipt", tx = %tx_hash))
            .await
            .map_err(|e| StakingError::from_pending(e, context))?;

        if !receipt.status() {
            tracing::error!(tx = %tx_hash, context, "transaction reverted");
            return Err(StakingError::OnChainRevert(format!(
                "{context}: transaction {tx_hash} reverted"
            )));
        }

        tracing::info!(
            tx = %tx_hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            context,
            "transaction confirmed"
        );
        Ok(TransactionResult {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        })
    }
}

/// Staking contract bound to a signing provider.
pub struct EvmStakingContract {
    instance: IStaking::IStakingInstance<DynProvider>,
}

impl EvmStakingContract {
    pub fn new(address: Address, provider: DynProvider) -> Self {
        Self {
            instance: IStaking::new(address, provider),
        }
    }
}

#[async_trait]
impl StakingContract for EvmStakingContract {
    fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn stake(&self, value: U256, gas_limit: u64) -> Result<Pending, StakingError> {
        let pending = self
            .instance
            .stake()
            .value(value)
            .gas(gas_limit)
            .send()
            .await
            .map_err(|e| StakingError::from_contract(e, "stake"))?;
        Ok(EvmPendingTransaction::boxed(pending, "stake"))
    }

    async fn restake(&self, amount: U256, gas_limit: u64) -> Result<Pending, StakingError> {
        let pending = self
            .instance
            .restake(amount)
            .gas(gas_limit)
            .send()
            .await
            .map_err(|e| StakingError::from_contract(e, "restake"))?;
        Ok(EvmPendingTransaction::boxed(pending, "restake"))
    }

    async fn get_position(&self, user: Address) -> Result<RawPosition, StakingError> {
        let position = self
            .instance
            .getPosition(user)
            .call()
            .await
            .map_err(|e| StakingError::from_contract(e, "getPosition"))?;
        Ok(RawPosition {
            staked_amount: position.stakedAmount,
            restaked_amount: position.restakedAmount,
            estimated_rewards: position.estimatedRewards,
            last_update_time: position.lastUpdateTime,
            gm_token_balance: position.gmTokenBalance,
        })
    }
}

/// gm token bound to a signing provider.
pub struct EvmDerivativeToken {
    instance: IGmToken::IGmTokenInstance<DynProvider>,
}

impl EvmDerivativeToken {
    pub fn new(address: Address, provider: DynProvider) -> Self {
        Self {
            instance: IGmToken::new(address, provider),
        }
    }
}

#[async_trait]
impl DerivativeToken for EvmDerivativeToken {
    fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn approve(&self, spender: Address, value: U256) -> Result<Pending, StakingError> {
        let pending = self
            .instance
            .approve(spender, value)
            .send()
            .await
            .map_err(|e| StakingError::from_contract(e, "approve"))?;
        Ok(EvmPendingTransaction::boxed(pending, "approve"))
    }

    async fn balance_of(&self, account: Address) -> Result<U256, StakingError> {
        self.instance
            .balanceOf(account)
            .call()
            .await
            .map_err(|e| StakingError::from_contract(e, "balanceOf"))
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, StakingError> {
        self.instance
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| StakingError::from_contract(e, "allowance"))
    }
}

/// Signing account of an [`RpcWallet`].
#[derive(Clone)]
pub struct EvmSigner {
    address: Address,
    provider: DynProvider,
}

#[async_trait]
impl WalletSigner for EvmSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn bind_staking(&self, address: Address) -> Arc<dyn StakingContract> {
        Arc::new(EvmStakingContract::new(address, self.provider.clone()))
    }

    fn bind_derivative_token(&self, address: Address) -> Arc<dyn DerivativeToken> {
        Arc::new(EvmDerivativeToken::new(address, self.provider.clone()))
    }

    async fn native_balance(&self, account: Address) -> Result<U256, StakingError> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| StakingError::from_transport(e, "getBalance"))
    }
}

/// Currently connected endpoint.
struct Endpoint {
    rpc_url: String,
    provider: DynProvider,
}

/// Private-key wallet connected to one JSON-RPC endpoint at a time.
pub struct RpcWallet {
    signer: PrivateKeySigner,
    rpc_timeout: Duration,
    endpoint: RwLock<Endpoint>,
    changes: broadcast::Sender<WalletChange>,
}

impl RpcWallet {
    /// Connect `signer` to `rpc_url`. No request is made until first use.
    pub fn new(
        signer: PrivateKeySigner,
        rpc_url: &str,
        rpc_timeout: Duration,
    ) -> Result<Self, StakingError> {
        let provider = connect(&signer, rpc_url, rpc_timeout)?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        tracing::info!(rpc = rpc_url, signer = %signer.address(), "Initialized wallet");

        Ok(Self {
            signer,
            rpc_timeout,
            endpoint: RwLock::new(Endpoint {
                rpc_url: rpc_url.to_string(),
                provider,
            }),
            changes,
        })
    }

    /// Build a wallet from a hex private key and an RPC endpoint.
    ///
    /// Returns `Ok(None)` when either is missing: there is no wallet to talk to.
    pub fn from_credentials(
        private_key: Option<&str>,
        rpc_url: Option<&str>,
        rpc_timeout: Duration,
    ) -> Result<Option<Self>, StakingError> {
        let Some(private_key) = private_key else {
            tracing::warn!("no private key configured, wallet unavailable");
            return Ok(None);
        };
        let Some(rpc_url) = rpc_url else {
            tracing::warn!("no RPC URL configured, wallet unavailable");
            return Ok(None);
        };
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| StakingError::Config(format!("invalid private key: {e}")))?;
        Self::new(signer, rpc_url, rpc_timeout).map(Some)
    }

    /// Endpoint the wallet currently talks to.
    pub async fn rpc_url(&self) -> String {
        self.endpoint.read().await.rpc_url.clone()
    }

    /// Re-point the wallet to `profile`'s RPC endpoint and notify subscribers.
    pub async fn switch_network(&self, profile: &NetworkProfile) -> Result<(), StakingError> {
        let rpc_url = profile.rpc_url.as_deref().ok_or_else(|| {
            StakingError::Config(format!("network '{}' has no rpc_url", profile.key))
        })?;
        let provider = connect(&self.signer, rpc_url, self.rpc_timeout)?;
        {
            let mut endpoint = self.endpoint.write().await;
            *endpoint = Endpoint {
                rpc_url: rpc_url.to_string(),
                provider,
            };
        }

        tracing::info!(network = %profile.key, chain_id = %profile.chain_id, rpc = rpc_url, "switched network");
        // No subscribers is fine.
        let _ = self.changes.send(WalletChange::ChainChanged(profile.chain_id));
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn request_authorization(&self) -> Result<(), StakingError> {
        // A local key is always authorized.
        tracing::debug!(signer = %self.signer.address(), "authorization granted");
        Ok(())
    }

    async fn signer(&self) -> Result<Arc<dyn WalletSigner>, StakingError> {
        let provider = self.endpoint.read().await.provider.clone();
        Ok(Arc::new(EvmSigner {
            address: self.signer.address(),
            provider,
        }))
    }

    async fn chain_id(&self) -> Result<ChainId, StakingError> {
        let provider = self.endpoint.read().await.provider.clone();
        read_chain_id(&provider).await
    }

    async fn connection(&self) -> Result<(Arc<dyn WalletSigner>, ChainId), StakingError> {
        // Both come from one endpoint snapshot.
        let provider = self.endpoint.read().await.provider.clone();
        let chain_id = read_chain_id(&provider).await?;
        let signer = EvmSigner {
            address: self.signer.address(),
            provider,
        };
        Ok((Arc::new(signer), chain_id))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletChange> {
        self.changes.subscribe()
    }
}

async fn read_chain_id(provider: &DynProvider) -> Result<ChainId, StakingError> {
    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| StakingError::from_transport(e, "eth_chainId"))?;
    tracing::debug!(chain_id, "read wallet chain id");
    Ok(ChainId::new(chain_id))
}

/// Build a signing provider for `rpc_url` with a per-request timeout.
fn connect(
    signer: &PrivateKeySigner,
    rpc_url: &str,
    rpc_timeout: Duration,
) -> Result<DynProvider, StakingError> {
    let url = rpc_url.parse::<url::Url>().map_err(|e| {
        tracing::error!("Invalid RPC URL {rpc_url}: {e:?}");
        StakingError::Config(format!("Invalid RPC URL: {rpc_url}"))
    })?;

    let http_client = alloy::transports::http::reqwest::Client::builder()
        .timeout(rpc_timeout)
        .build()
        .map_err(|e| {
            tracing::error!("HTTP client build failed: {e:?}");
            StakingError::RpcFailure(format!("HTTP client initialization failed: {e}"))
        })?;
    let client = RpcClient::builder().http_with_client(http_client, url);

    let wallet = EthereumWallet::from(signer.clone());
    Ok(ProviderBuilder::new()
        .wallet(wallet)
        .connect_client(client)
        .erased())
}
