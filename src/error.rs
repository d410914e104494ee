//! Error taxonomy for staking operations.
//!
//! Every failure reaching the presentation layer is one [`StakingError`], and its
//! `Display` output is the single message shown to the user. Errors coming out of
//! alloy are classified here so the provider-supplied message wins over a generic one.

use alloy::contract::Error as ContractError;
use alloy::providers::PendingTransactionError;
use alloy::transports::{RpcError, TransportError};

/// EIP-1193 code returned by wallets when the user declines a prompt.
const USER_REJECTED_CODE: i64 = 4001;
/// JSON-RPC code used by execution clients for reverted calls.
const EXECUTION_REVERTED_CODE: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    /// No wallet/provider is available to authorize and sign.
    #[error("No wallet provider found")]
    NoWalletProvider,
    /// The connected chain has no configured network profile.
    #[error("Unsupported network (chain id {0})")]
    UnsupportedNetwork(u64),
    /// The wallet declined an authorization or transaction prompt.
    #[error("{0}")]
    UserRejected(String),
    /// Contract execution reverted. Carries the provider's message when present.
    #[error("{0}")]
    OnChainRevert(String),
    /// Transport failure reaching the chain.
    #[error("{0}")]
    RpcFailure(String),
    /// The amount is not a positive 18-decimal quantity.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    /// Another stake or restake is still in flight.
    #[error("Another transaction is already in progress")]
    Busy,
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StakingError {
    /// Classify an error raised while calling or sending to a contract.
    ///
    /// `context` is only used for the generic fallback message and for logging.
    pub fn from_contract(err: ContractError, context: &str) -> Self {
        match err {
            ContractError::TransportError(e) => Self::from_transport(e, context),
            ContractError::AbiError(e) => {
                tracing::error!(context, error = %e, "failed to decode contract response");
                Self::RpcFailure(format!("{context}: invalid contract response"))
            }
            other => categorize(other, context),
        }
    }

    /// Classify a JSON-RPC transport error, preferring the nested payload message.
    pub fn from_transport(err: TransportError, context: &str) -> Self {
        match err {
            RpcError::ErrorResp(payload) => {
                let message = payload.message.to_string();
                tracing::warn!(context, code = payload.code, %message, "rpc returned an error");
                if payload.code == USER_REJECTED_CODE {
                    Self::UserRejected(message)
                } else if payload.code == EXECUTION_REVERTED_CODE
                    || message.to_lowercase().contains("revert")
                {
                    Self::OnChainRevert(message)
                } else {
                    Self::RpcFailure(message)
                }
            }
            other => categorize(other, context),
        }
    }

    /// Classify a failure while waiting for a transaction receipt.
    pub fn from_pending(err: PendingTransactionError, context: &str) -> Self {
        match err {
            PendingTransactionError::TransportError(e) => Self::from_transport(e, context),
            other => categorize(other, context),
        }
    }

    /// True for errors the wallet raised because the user said no.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected(_))
    }
}

/// Fallback classification by inspecting the error's debug text.
///
/// Connection-level failures become [`StakingError::RpcFailure`], wallet denials
/// become [`StakingError::UserRejected`], anything mentioning a revert becomes
/// [`StakingError::OnChainRevert`].
fn categorize(e: impl std::fmt::Debug + std::fmt::Display, context: &str) -> StakingError {
    let err_str = format!("{e:?}");
    let lowered = err_str.to_lowercase();

    if lowered.contains("user rejected") || lowered.contains("user denied") {
        tracing::warn!("{context}: rejected by wallet: {err_str}");
        StakingError::UserRejected(e.to_string())
    } else if lowered.contains("revert") {
        tracing::error!("{context}: execution reverted: {err_str}");
        StakingError::OnChainRevert(e.to_string())
    } else if lowered.contains("connection refused")
        || lowered.contains("connection reset")
        || lowered.contains("no route to host")
        || lowered.contains("timeout")
        || lowered.contains("dns error")
    {
        tracing::error!("{context}: RPC connection error: {err_str}");
        StakingError::RpcFailure(format!("{context}: connection error"))
    } else {
        tracing::error!("{context}: call failed: {err_str}");
        StakingError::RpcFailure(format!("{context}: {e}"))
    }
}
