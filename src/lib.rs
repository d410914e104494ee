//! Native-asset staking client for the gm staking contracts.
//!
//! The crate resolves the wallet's chain to a configured contract set, binds the
//! staking and gm token contracts against the wallet's signer, sequences the
//! stake and approve-then-restake flows, and aggregates on-chain reads into a
//! single [`Position`].
//!
//! ```ignore
//! let registry = Arc::new(NetworkRegistry::from_config(&StakingConfig::from_env()?)?);
//! let wallet = RpcWallet::from_credentials(Some(key), Some(rpc_url), timeout)?
//!     .map(|w| Arc::new(w) as Arc<dyn WalletProvider>);
//! let gateway = Arc::new(ContractGateway::new(wallet, registry));
//!
//! let orchestrator = TransactionOrchestrator::new(Arc::clone(&gateway), 500_000);
//! let receipt = orchestrator.restake("1.5").await?;
//! ```

pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod gateway;
pub mod network;
pub mod orchestrator;
pub mod poller;
pub mod position;
pub mod sig_down;
pub mod telemetry;
#[cfg(test)]
mod testing;
pub mod units;
pub mod wallet;

pub use chain::{ChainId, RpcWallet};
pub use config::StakingConfig;
pub use contracts::TransactionResult;
pub use error::StakingError;
pub use gateway::{ContractBindings, ContractGateway};
pub use network::{NetworkProfile, NetworkRegistry};
pub use orchestrator::{OrchestratorStatus, TransactionOrchestrator};
pub use poller::{PollState, PositionPoller};
pub use position::{Position, PositionAggregator};
pub use wallet::{WalletChange, WalletProvider, WalletSigner};
