//! EVM chain identifier.
//!
//! Wallets and RPC endpoints report the chain id in several shapes: `eth_chainId`
//! returns `0x`-prefixed hex (`"0xC576D"`), provider libraries hand out the decimal
//! number (`808813`), and multi-chain tooling uses CAIP-2 (`"eip155:808813"`).
//! [`ChainId`] accepts all of them and always compares by the numeric value.
//!
//! # Examples
//!
//! ```
//! use gm_staking::chain::ChainId;
//!
//! let bob: ChainId = "0xC576D".parse().unwrap();
//! assert_eq!(bob, ChainId::new(808813));
//! assert_eq!(bob.to_hex(), "0xc576d");
//! assert_eq!("eip155:31".parse::<ChainId>().unwrap(), ChainId::new(31));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Canonical numeric chain identifier (EIP-155).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(u64);

/// Error type for ChainId parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainIdParseError {
    /// The input string is empty.
    #[error("empty chain ID")]
    Empty,
    /// A CAIP-2 identifier outside the `eip155` namespace.
    #[error("unsupported namespace '{0}', expected eip155")]
    UnsupportedNamespace(String),
    /// The numeric part is not a valid decimal or hex integer.
    #[error("invalid chain ID '{0}'")]
    InvalidNumber(String),
}

impl ChainId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Lowercase `0x` hex form, as used by `eth_chainId` and `wallet_addEthereumChain`.
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// CAIP-2 form (`eip155:<id>`).
    pub fn to_caip2(&self) -> String {
        format!("eip155:{}", self.0)
    }

    fn parse_number(s: &str) -> Result<u64, ChainIdParseError> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => s.parse::<u64>(),
        };
        parsed.map_err(|_| ChainIdParseError::InvalidNumber(s.to_string()))
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ChainId> for u64 {
    fn from(value: ChainId) -> Self {
        value.0
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = ChainIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ChainIdParseError::Empty);
        }
        let reference = match s.split_once(':') {
            Some(("eip155", reference)) => reference,
            Some((namespace, _)) => {
                return Err(ChainIdParseError::UnsupportedNamespace(namespace.to_string()));
            }
            None => s,
        };
        Self::parse_number(reference).map(Self)
    }
}

impl Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
