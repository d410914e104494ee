//! Contract gateway: signer + network profile → bound contract handles.
//!
//! Bindings are cached for one `(chain id, signer address)` pair. When the wallet
//! reports a different pair, or emits an account/chain change notification, the
//! cached pair is discarded and rebuilt. It is never patched in place.
//!
//! Example usage:
//! ```ignore
//! let gateway = ContractGateway::new(Some(wallet), Arc::new(NetworkRegistry::default()));
//! let bindings = gateway.bindings().await?;
//! let position = bindings.staking.get_position(bindings.signer_address()).await?;
//! ```

use alloy::primitives::Address;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{Mutex, RwLock, broadcast};

use crate::chain::ChainId;
use crate::contracts::{DerivativeToken, StakingContract};
use crate::error::StakingError;
use crate::network::{NetworkProfile, NetworkRegistry};
use crate::wallet::{WalletChange, WalletProvider, WalletSigner};

/// Staking and gm token handles bound to one signer on one network.
pub struct ContractBindings {
    pub staking: Arc<dyn StakingContract>,
    pub derivative_token: Arc<dyn DerivativeToken>,
    pub signer: Arc<dyn WalletSigner>,
    pub network: NetworkProfile,
}

impl ContractBindings {
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }
}

impl std::fmt::Debug for ContractBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractBindings")
            .field("network", &self.network.key)
            .field("signer", &self.signer.address())
            .field("staking", &self.staking.address())
            .field("derivative_token", &self.derivative_token.address())
            .finish()
    }
}

/// Cached bindings and the key they were built for.
struct CachedBindings {
    chain_id: ChainId,
    signer: Address,
    bindings: Arc<ContractBindings>,
}

/// Builds and caches [`ContractBindings`] for the wallet's current signer and chain.
pub struct ContractGateway {
    wallet: Option<Arc<dyn WalletProvider>>,
    registry: Arc<NetworkRegistry>,
    cache: RwLock<Option<CachedBindings>>,
    changes: Mutex<Option<broadcast::Receiver<WalletChange>>>,
}

impl ContractGateway {
    /// `wallet` is `None` when no wallet/provider is present; every call then fails
    /// with [`StakingError::NoWalletProvider`].
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>, registry: Arc<NetworkRegistry>) -> Self {
        let changes = wallet.as_ref().map(|w| w.subscribe());
        Self {
            wallet,
            registry,
            cache: RwLock::new(None),
            changes: Mutex::new(changes),
        }
    }

    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    fn wallet(&self) -> Result<&Arc<dyn WalletProvider>, StakingError> {
        self.wallet.as_ref().ok_or(StakingError::NoWalletProvider)
    }

    /// Profile of the chain the wallet is connected to. Does not prompt for authorization.
    pub async fn active_network(&self) -> Result<NetworkProfile, StakingError> {
        let chain_id = self.wallet()?.chain_id().await?;
        self.registry.resolve(chain_id).cloned()
    }

    /// Bindings for the current `(chain id, signer)`, reusing the cached pair when it still matches.
    pub async fn bindings(&self) -> Result<Arc<ContractBindings>, StakingError> {
        let wallet = self.wallet()?;
        self.drain_changes().await;

        wallet.request_authorization().await?;
        let (signer, chain_id) = wallet.connection().await?;
        let network = self.registry.resolve(chain_id)?;
        let signer_address = signer.address();

        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.chain_id == chain_id && cached.signer == signer_address {
                tracing::debug!(%chain_id, signer = %signer_address, "reusing contract bindings");
                return Ok(Arc::clone(&cached.bindings));
            }
        }

        let bindings = Arc::new(ContractBindings {
            staking: signer.bind_staking(network.staking_contract),
            derivative_token: signer.bind_derivative_token(network.derivative_token_contract),
            signer,
            network: network.clone(),
        });

        tracing::info!(
            network = %network.key,
            %chain_id,
            signer = %signer_address,
            staking = %network.staking_contract,
            gm_token = %network.derivative_token_contract,
            "built contract bindings"
        );

        *self.cache.write().await = Some(CachedBindings {
            chain_id,
            signer: signer_address,
            bindings: Arc::clone(&bindings),
        });
        Ok(bindings)
    }

    /// Drop the cached bindings; the next [`Self::bindings`] call rebuilds them.
    pub async fn invalidate(&self) {
        if self.cache.write().await.take().is_some() {
            tracing::debug!("contract bindings invalidated");
        }
    }

    /// Consume pending wallet notifications; any of them invalidates the cache.
    async fn drain_changes(&self) {
        let mut changed = false;
        {
            let mut changes = self.changes.lock().await;
            let Some(rx) = changes.as_mut() else {
                return;
            };
            loop {
                match rx.try_recv() {
                    Ok(change) => {
                        tracing::info!(?change, "wallet changed");
                        changed = true;
                    }
                    Err(TryRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed wallet notifications");
                        changed = true;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Closed) => {
                        *changes = None;
                        break;
                    }
                }
            }
        }
        if changed {
            self.invalidate().await;
        }
    }
}
