//! Chain identity and the alloy-backed EVM implementations of the wallet and contract seams.

mod chain_id;
pub mod evm;

pub use chain_id::{ChainId, ChainIdParseError};
pub use evm::{EvmDerivativeToken, EvmSigner, EvmStakingContract, RpcWallet};
