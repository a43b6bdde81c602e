//! Configuration for the membership lock client.
//!
//! The client is driven by a network-id-keyed configuration map, supplied as a
//! JSON file or built programmatically. Endpoint and signer values support
//! `$VAR` / `${VAR}` environment indirection so secrets stay out of config
//! files:
//!
//! ```json
//! {
//!   "networks": {
//!     "137": {
//!       "rpc": [{ "http": "$RPC_URL_POLYGON" }],
//!       "registry": "0x52c6c24a1c82a3895fbd59cbaf866913bb2f2c59",
//!       "native_currency": { "name": "Matic", "symbol": "MATIC", "decimals": 18 }
//!     }
//!   }
//! }
//! ```

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

use crate::error::LockClientError;
use crate::networks;
use crate::types::{ChecksummedAddress, NetworkId};

/// RPC provider configuration for a single endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcConfig {
    /// HTTP URL for the RPC endpoint.
    pub http: LiteralOrEnv<Url>,
    /// Rate limit for requests per second (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
}

/// Native currency metadata for a network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A validated EVM private key (32 bytes).
///
/// Parsed from a 0x-prefixed hex string and converted to a signer when a
/// wallet-capable provider is built.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EvmPrivateKey(B256);

impl EvmPrivateKey {
    /// The raw 32 bytes of the private key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }
}

impl PartialEq for EvmPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl FromStr for EvmPrivateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid evm private key: {}", e))
    }
}

/// Per-network configuration: RPC endpoints, deployed contract addresses, and
/// native currency metadata. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub id: NetworkId,
    pub inner: NetworkConfigInner,
}

impl NetworkConfig {
    /// Builds a config entry programmatically from the minimum viable pieces.
    pub fn new(id: NetworkId, rpc_url: Url, native_currency: NativeCurrency) -> Self {
        Self {
            id,
            inner: NetworkConfigInner {
                name: None,
                rpc: vec![RpcConfig {
                    http: LiteralOrEnv::from_literal(rpc_url),
                    rate_limit: None,
                }],
                registry: None,
                lock_template: None,
                card_sponsor: None,
                spend_token: None,
                native_currency,
                eip1559: network_config_defaults::default_eip1559(),
                confirmation_timeout_secs: network_config_defaults::default_confirmation_timeout(),
                signers: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    /// Human-readable network name: configured value, or the known-network
    /// table, or the bare id.
    pub fn name(&self) -> String {
        self.inner
            .name
            .clone()
            .or_else(|| networks::network_name_by_id(self.id).map(str::to_owned))
            .unwrap_or_else(|| self.id.to_string())
    }

    pub fn rpc(&self) -> &Vec<RpcConfig> {
        &self.inner.rpc
    }

    /// Address of the lock registry (factory) deployment on this network,
    /// falling back to the known-deployment table.
    pub fn registry_address(&self) -> Option<Address> {
        self.inner
            .registry
            .map(Address::from)
            .or_else(|| networks::registry_address_by_id(self.id))
    }

    /// Implementation template cloned by the registry when creating locks.
    pub fn lock_template(&self) -> Option<Address> {
        self.inner.lock_template.map(Address::from)
    }

    /// Sponsor contract consuming card purchase bundles, where deployed.
    pub fn card_sponsor(&self) -> Option<Address> {
        self.inner.card_sponsor.map(Address::from)
    }

    /// Token contract accepted for card-funded spends on this network.
    pub fn spend_token(&self) -> Option<Address> {
        self.inner.spend_token.map(Address::from)
    }

    pub fn native_currency(&self) -> &NativeCurrency {
        &self.inner.native_currency
    }

    pub fn eip1559(&self) -> bool {
        self.inner.eip1559
    }

    pub fn confirmation_timeout_secs(&self) -> u64 {
        self.inner.confirmation_timeout_secs
    }

    pub fn signers(&self) -> &[LiteralOrEnv<EvmPrivateKey>] {
        &self.inner.signers
    }
}

/// The serialized body of a [`NetworkConfig`] (everything but the id, which is
/// the map key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfigInner {
    /// Optional display name; the known-network table is consulted otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// RPC endpoints for this network (required, at least one).
    pub rpc: Vec<RpcConfig>,
    /// Lock registry deployment; defaults to the known-deployment table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<ChecksummedAddress>,
    /// Membership lock implementation template, for pre-deployment address
    /// derivation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_template: Option<ChecksummedAddress>,
    /// Card sponsor contract, where deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_sponsor: Option<ChecksummedAddress>,
    /// Spend token consumed by card purchases, where deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_token: Option<ChecksummedAddress>,
    /// Native currency metadata (required).
    pub native_currency: NativeCurrency,
    /// Whether the network supports EIP-1559 gas pricing.
    #[serde(default = "network_config_defaults::default_eip1559")]
    pub eip1559: bool,
    /// How long to wait for one confirmation before giving up.
    #[serde(default = "network_config_defaults::default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    /// Private keys used to sign transactions (hex literals or env refs).
    #[serde(default)]
    pub signers: Vec<LiteralOrEnv<EvmPrivateKey>>,
}

mod network_config_defaults {
    pub fn default_eip1559() -> bool {
        true
    }
    pub fn default_confirmation_timeout() -> u64 {
        30
    }
}

/// The full network-id-keyed configuration map.
#[derive(Debug, Clone, Default)]
pub struct NetworksConfig(HashMap<NetworkId, NetworkConfig>);

impl NetworksConfig {
    /// Looks up the configuration for a network id.
    ///
    /// # Errors
    ///
    /// [`LockClientError::ConfigMissing`] when the id is absent — fatal,
    /// synchronous, never retried.
    pub fn network(&self, id: NetworkId) -> Result<&NetworkConfig, LockClientError> {
        self.0.get(&id).ok_or(LockClientError::ConfigMissing(id))
    }

    /// All configured networks.
    pub fn iter(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inserts or replaces the entry for a network.
    pub fn insert(&mut self, config: NetworkConfig) {
        self.0.insert(config.id, config);
    }

    /// Loads the configuration from a JSON file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let file: ConfigFile = serde_json::from_str(&content)?;
        Ok(file.networks)
    }

    /// Loads the configuration from an in-memory JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_value(value)?;
        Ok(file.networks)
    }
}

impl<'de> Deserialize<'de> for NetworksConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{MapAccess, Visitor};
        use std::fmt;

        struct NetworksVisitor;

        impl<'de> Visitor<'de> for NetworksVisitor {
            type Value = NetworksConfig;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of network ids to network configurations")
            }

            fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut networks = HashMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(id) = access.next_key::<NetworkId>()? {
                    let inner: NetworkConfigInner = access.next_value()?;
                    networks.insert(id, NetworkConfig { id, inner });
                }
                Ok(NetworksConfig(networks))
            }
        }

        deserializer.deserialize_map(NetworksVisitor)
    }
}

impl Serialize for NetworksConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, config) in &self.0 {
            map.serialize_entry(id, &config.inner)?;
        }
        map.end()
    }
}

/// Top-level config file shape: `{ "networks": { "<id>": { ... } } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    networks: NetworksConfig,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config: {0}")]
    JsonParse(#[from] serde_json::Error),
}

// ============================================================================
// Environment Variable Resolution
// ============================================================================

/// A transparent wrapper that resolves environment variables during
/// deserialization.
///
/// Supports both literal values and environment variable references:
/// - Literal: `"https://rpc.example.org"`
/// - Simple env var: `"$RPC_URL_POLYGON"`
/// - Braced env var: `"${RPC_URL_POLYGON}"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    /// A reference to the inner value.
    pub fn inner(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }

    /// Parse environment variable syntax from a string. Returns the variable
    /// name if the string matches `$VAR` or `${VAR}` syntax.
    fn parse_env_var_syntax(s: &str) -> Option<String> {
        if s.starts_with("${") && s.ends_with('}') {
            Some(s[2..s.len() - 1].to_string())
        } else if s.starts_with('$') && s.len() > 1 {
            let var_name = &s[1..];
            if var_name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                Some(var_name.to_string())
            } else {
                None
            }
        } else {
            None
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for LiteralOrEnv<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let value = if let Some(var_name) = Self::parse_env_var_syntax(&s) {
            std::env::var(&var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "Environment variable '{}' not found (referenced as '{}')",
                    var_name, s
                ))
            })?
        } else {
            s
        };

        let parsed = value
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse value: {}", e)))?;

        Ok(LiteralOrEnv(parsed))
    }
}

impl<T> Serialize for LiteralOrEnv<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    fn fixture() -> serde_json::Value {
        json!({
            "networks": {
                "1": {
                    "rpc": [{ "http": "https://rpc.example.org/mainnet", "rate_limit": 10 }],
                    "registry": "0x7aa12c34e8d86dda591a9b0cb8c1bf6a1c9ed415",
                    "lock_template": "0x2f1a005ea19c1d1c2b9e0f05a1e29fc4fd5bd601",
                    "native_currency": { "name": "Ether", "symbol": "ETH", "decimals": 18 }
                },
                "137": {
                    "rpc": [{ "http": "https://rpc.example.org/polygon" }],
                    "native_currency": { "name": "Matic", "symbol": "MATIC", "decimals": 18 },
                    "eip1559": false,
                    "confirmation_timeout_secs": 60
                }
            }
        })
    }

    #[test]
    fn parses_network_map() {
        let config = NetworksConfig::from_value(fixture()).unwrap();
        assert_eq!(config.len(), 2);

        let mainnet = config.network(NetworkId::new(1)).unwrap();
        assert_eq!(
            mainnet.registry_address(),
            Some(address!("0x7aa12c34e8d86dda591a9b0cb8c1bf6a1c9ed415"))
        );
        assert_eq!(
            mainnet.lock_template(),
            Some(address!("0x2f1a005ea19c1d1c2b9e0f05a1e29fc4fd5bd601"))
        );
        assert_eq!(mainnet.native_currency().symbol, "ETH");
        assert!(mainnet.eip1559());
        assert_eq!(mainnet.rpc()[0].rate_limit, Some(10));

        let polygon = config.network(NetworkId::new(137)).unwrap();
        assert!(!polygon.eip1559());
        assert_eq!(polygon.confirmation_timeout_secs(), 60);
        assert_eq!(polygon.name(), "polygon");
    }

    #[test]
    fn registry_falls_back_to_known_deployments() {
        let config = NetworksConfig::from_value(fixture()).unwrap();
        let polygon = config.network(NetworkId::new(137)).unwrap();
        // No registry in the fixture entry; the known-deployment table fills it.
        assert_eq!(
            polygon.registry_address(),
            crate::networks::registry_address_by_id(NetworkId::new(137))
        );
        assert!(polygon.registry_address().is_some());
    }

    #[test]
    fn missing_network_is_config_missing() {
        let config = NetworksConfig::from_value(fixture()).unwrap();
        let err = config.network(NetworkId::new(424242)).unwrap_err();
        assert!(matches!(err, LockClientError::ConfigMissing(id) if id.inner() == 424242));
    }

    #[test]
    fn env_var_syntax_detection() {
        assert_eq!(
            LiteralOrEnv::<String>::parse_env_var_syntax("$RPC_URL"),
            Some("RPC_URL".to_string())
        );
        assert_eq!(
            LiteralOrEnv::<String>::parse_env_var_syntax("${RPC_URL}"),
            Some("RPC_URL".to_string())
        );
        assert_eq!(
            LiteralOrEnv::<String>::parse_env_var_syntax("https://rpc.example.org"),
            None
        );
    }
}
