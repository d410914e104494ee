//! Supported networks and the chain id → profile resolver.
//!
//! The registry starts from a built-in table and can be extended or overridden by
//! `[networks.<key>]` sections of the configuration file. Addresses in the file may
//! be written as `${ENV_VAR}` and are resolved while the registry is built.

use alloy::primitives::{Address, address};
use std::collections::HashMap;
use std::str::FromStr;

use crate::chain::ChainId;
use crate::config::{NetworkConfig, StakingConfig};
use crate::error::StakingError;

/// Static description of one supported chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    /// Configuration key, e.g. `bob-sepolia`.
    pub key: String,
    pub chain_id: ChainId,
    pub display_name: String,
    /// Symbol of the native asset (`BOB`, `tRBTC`).
    pub native_symbol: String,
    pub staking_contract: Address,
    pub derivative_token_contract: Address,
    /// Default JSON-RPC endpoint, used when no explicit RPC URL is given.
    pub rpc_url: Option<String>,
    /// Block explorer base URL.
    pub explorer_url: Option<String>,
}

impl NetworkProfile {
    /// Display symbol of the derivative token: `gm` + native symbol.
    pub fn derivative_symbol(&self) -> String {
        format!("gm{}", self.native_symbol)
    }

    pub fn hex_chain_id(&self) -> String {
        self.chain_id.to_hex()
    }

    /// Explorer link for a transaction hash, if an explorer is configured.
    pub fn explorer_tx_url(&self, tx_hash: impl std::fmt::Display) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{tx_hash}", base.trim_end_matches('/')))
    }
}

/// Built-in networks.
pub fn default_profiles() -> Vec<NetworkProfile> {
    vec![
        NetworkProfile {
            key: "bob-sepolia".into(),
            chain_id: ChainId::new(808813),
            display_name: "BOB Sepolia".into(),
            native_symbol: "BOB".into(),
            staking_contract: address!("0x6696283e07CE0619F6d88626A77A41978517dd1F"),
            derivative_token_contract: address!("0x5600a56980492570B74C71B16A242544208e4E53"),
            rpc_url: Some("https://bob-sepolia.rpc.gobob.xyz".into()),
            explorer_url: Some("https://bob-sepolia.explorer.gobob.xyz".into()),
        },
        NetworkProfile {
            key: "rootstock-testnet".into(),
            chain_id: ChainId::new(31),
            display_name: "RSK Testnet".into(),
            native_symbol: "tRBTC".into(),
            staking_contract: address!("0xE49B7BBc8c9Dc60754Bf7e3A9ce96230aB348830"),
            derivative_token_contract: address!("0xCbA6179FECC48b7c92BB9292AAee6296d338c99C"),
            rpc_url: Some("https://public-node.testnet.rsk.co".into()),
            explorer_url: Some("https://explorer.testnet.rsk.co".into()),
        },
    ]
}

/// Lookup table of supported networks, keyed by chain id.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    profiles: HashMap<ChainId, NetworkProfile>,
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new(default_profiles()).expect("built-in network table has unique chain ids")
    }
}

impl NetworkRegistry {
    /// Build a registry from profiles. Two profiles sharing a chain id is an error.
    pub fn new(profiles: impl IntoIterator<Item = NetworkProfile>) -> Result<Self, StakingError> {
        let mut by_chain: HashMap<ChainId, NetworkProfile> = HashMap::new();
        for profile in profiles {
            if let Some(existing) = by_chain.get(&profile.chain_id) {
                return Err(StakingError::Config(format!(
                    "network '{}' reuses chain id {} already assigned to '{}'",
                    profile.key, profile.chain_id, existing.key
                )));
            }
            by_chain.insert(profile.chain_id, profile);
        }
        Ok(Self { profiles: by_chain })
    }

    /// Built-in table overlaid with the `[networks]` sections of `config`.
    ///
    /// A configured key equal to a built-in key replaces that network entirely.
    pub fn from_config(config: &StakingConfig) -> Result<Self, StakingError> {
        let mut by_key: HashMap<String, NetworkProfile> = default_profiles()
            .into_iter()
            .map(|p| (p.key.clone(), p))
            .collect();
        for (key, network) in &config.networks {
            let profile = Self::profile_from_config(key, network)?;
            by_key.insert(key.clone(), profile);
        }
        let registry = Self::new(by_key.into_values())?;

        tracing::info!(
            networks = registry.profiles.len(),
            configured = config.networks.len(),
            "Initialized network registry"
        );

        Ok(registry)
    }

    fn profile_from_config(key: &str, network: &NetworkConfig) -> Result<NetworkProfile, StakingError> {
        let staking_contract = resolve_address(&network.staking_contract).ok_or_else(|| {
            StakingError::Config(format!(
                "network '{key}': invalid staking_contract '{}'",
                network.staking_contract
            ))
        })?;
        let derivative_token_contract = resolve_address(&network.derivative_token_contract)
            .ok_or_else(|| {
                StakingError::Config(format!(
                    "network '{key}': invalid derivative_token_contract '{}'",
                    network.derivative_token_contract
                ))
            })?;
        Ok(NetworkProfile {
            key: key.to_string(),
            chain_id: network.chain_id,
            display_name: network.display_name.clone().unwrap_or_else(|| key.to_string()),
            native_symbol: network.native_symbol.clone(),
            staking_contract,
            derivative_token_contract,
            rpc_url: network.rpc_url.clone(),
            explorer_url: network.explorer_url.clone(),
        })
    }

    /// Resolve a chain id to its profile.
    pub fn resolve(&self, chain_id: ChainId) -> Result<&NetworkProfile, StakingError> {
        self.profiles
            .get(&chain_id)
            .ok_or(StakingError::UnsupportedNetwork(chain_id.as_u64()))
    }

    /// Look up a profile by its configuration key.
    pub fn by_key(&self, key: &str) -> Option<&NetworkProfile> {
        self.profiles.values().find(|p| p.key == key)
    }

    /// All profiles, ordered by chain id.
    pub fn profiles(&self) -> Vec<&NetworkProfile> {
        let mut profiles: Vec<_> = self.profiles.values().collect();
        profiles.sort_by_key(|p| p.chain_id);
        profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Resolve an address string with optional env var substitution.
///
/// Supports format: "${ENV_VAR_NAME}" or direct address
fn resolve_address(address_str: &str) -> Option<Address> {
    let resolved = if address_str.starts_with("${") && address_str.ends_with('}') {
        let env_var_name = &address_str[2..address_str.len() - 1];
        match std::env::var(env_var_name) {
            Ok(val) => val,
            Err(_) => {
                tracing::debug!(
                    env_var = env_var_name,
                    "Environment variable not found for contract address"
                );
                return None;
            }
        }
    } else {
        address_str.to_string()
    };

    Address::from_str(resolved.trim()).ok()
}
