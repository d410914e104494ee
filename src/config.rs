//! Configuration file parsing for gm-staking.
//!
//! This module loads the optional `gm-staking.toml` file: transaction gas ceiling,
//! polling interval, RPC timeout, and extra or overriding network definitions.
//!
//! Configuration is optional and every section falls back to defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::chain::ChainId;

/// Default config file name, overridable with `CONFIG_FILE`.
pub const DEFAULT_CONFIG_FILE: &str = "gm-staking.toml";

/// Complete gm-staking configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StakingConfig {
    pub transaction: TransactionConfig,
    pub polling: PollingConfig,
    pub rpc: RpcConfig,
    /// Extra networks, or overrides of built-in ones, keyed by network key.
    pub networks: HashMap<String, NetworkConfig>,
}

impl StakingConfig {
    /// Load configuration from a TOML file.
    ///
    /// If the file doesn't exist, returns the default configuration.
    /// If the file exists but is malformed, returns an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let loaded: Self = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;

        tracing::info!(
            path = ?path,
            gas_limit = loaded.transaction.gas_limit,
            networks = loaded.networks.len(),
            "Loaded configuration"
        );

        Ok(loaded)
    }

    /// Load configuration from environment variable CONFIG_FILE or default path.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_file(config_path)
    }
}

/// Transaction submission settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Fixed gas-limit ceiling sent with stake and restake calls instead of an estimate.
    pub gas_limit: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self { gas_limit: 500_000 }
    }
}

/// Position polling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 15,
        }
    }
}

/// JSON-RPC client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Timeout for individual RPC requests in seconds. Does not bound confirmation waits.
    pub timeout_seconds: u64,
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

/// One `[networks.<key>]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Decimal, `0x` hex or `eip155:<n>`.
    pub chain_id: ChainId,
    #[serde(default)]
    pub display_name: Option<String>,
    pub native_symbol: String,
    /// Address or `${ENV_VAR}`.
    pub staking_contract: String,
    /// Address or `${ENV_VAR}`.
    pub derivative_token_contract: String,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StakingConfig::default();
        assert_eq!(config.transaction.gas_limit, 500_000);
        assert_eq!(config.polling.interval(), Duration::from_secs(15));
        assert_eq!(config.rpc.timeout(), Duration::from_secs(30));
        assert!(config.networks.is_empty());
    }

    #[test]
    fn test_parse_networks() {
        let config_str = r#"
[transaction]
gas_limit = 750000

[networks.anvil]
chain_id = "0x7a69"
native_symbol = "ETH"
staking_contract = "0x1111111111111111111111111111111111111111"
derivative_token_contract = "${ANVIL_GM_TOKEN}"
rpc_url = "http://127.0.0.1:8545"
"#;

        let config: StakingConfig = toml::from_str(config_str).unwrap();
        assert_eq!(config.transaction.gas_limit, 750_000);
        assert_eq!(config.polling.interval_seconds, 15);
        let anvil = config.networks.get("anvil").unwrap();
        assert_eq!(anvil.chain_id, ChainId::new(31337));
        assert_eq!(anvil.derivative_token_contract, "${ANVIL_GM_TOKEN}");
        assert!(anvil.explorer_url.is_none());
    }

    #[test]
    fn test_zero_interval_clamped() {
        let polling = PollingConfig {
            interval_seconds: 0,
        };
        assert_eq!(polling.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = StakingConfig::from_file("/nonexistent/gm-staking.toml").unwrap();
        assert_eq!(config.transaction.gas_limit, 500_000);
    }
}
