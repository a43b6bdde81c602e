//! RPC provider construction and per-network memoization.
//!
//! Providers are built lazily from [`NetworkConfig`] entries and cached one
//! per network id, so repeated service calls against the same network reuse
//! the same transport instead of reconnecting. When a config entry carries
//! signer keys, the provider is wallet-capable and can submit transactions;
//! otherwise it is read-only.

use alloy_network::EthereumWallet;
use alloy_primitives::B256;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_client::RpcClient;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::layers::{FallbackLayer, ThrottleLayer};
use alloy_transport_http::Http;
use dashmap::DashMap;
use std::num::NonZeroUsize;
use tower::ServiceBuilder;

use crate::config::{NetworkConfig, RpcConfig};
use crate::error::LockClientError;
use crate::types::NetworkId;

/// A cache of lazily-built providers keyed by network id.
///
/// Shared mutable state scoped to one service instance; an entry, once built,
/// lives for the instance's lifetime.
#[derive(Debug, Default)]
pub struct ProviderCache {
    providers: DashMap<NetworkId, DynProvider>,
}

impl ProviderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the provider for a network, building and memoizing it on first
    /// use.
    pub fn provider(&self, config: &NetworkConfig) -> Result<DynProvider, LockClientError> {
        if let Some(provider) = self.providers.get(&config.id()) {
            return Ok(provider.clone());
        }
        let provider = build_provider(config)?;
        let entry = self
            .providers
            .entry(config.id())
            .or_insert_with(|| provider);
        Ok(entry.clone())
    }

    /// Installs a pre-built provider for a network, taking the place of lazy
    /// construction. First write wins, like any other cache entry.
    pub fn insert(&self, id: NetworkId, provider: DynProvider) {
        self.providers.entry(id).or_insert(provider);
    }

    /// Number of networks with a built provider.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Assembles the RPC client for a network: one throttled HTTP transport per
/// configured endpoint, combined behind a fallback layer.
pub fn rpc_client(id: NetworkId, rpc: &[RpcConfig]) -> Result<RpcClient, LockClientError> {
    let transports = rpc
        .iter()
        .filter_map(|endpoint| {
            let url = endpoint.http.inner();
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                tracing::warn!(network = %id, url = %url, "Skipping non-HTTP RPC endpoint");
                return None;
            }
            let rate_limit = endpoint.rate_limit.unwrap_or(u32::MAX);
            let service = ServiceBuilder::new()
                .layer(ThrottleLayer::new(rate_limit))
                .service(Http::new(url.clone()));
            Some(service)
        })
        .collect::<Vec<_>>();
    let count = NonZeroUsize::new(transports.len()).ok_or_else(|| {
        LockClientError::Config(format!("no usable RPC endpoint for network {id}"))
    })?;
    let fallback = ServiceBuilder::new()
        .layer(FallbackLayer::default().with_active_transport_count(count))
        .service(transports);
    Ok(RpcClient::new(fallback, false))
}

/// Builds the wallet from the configured signer keys, if any.
fn wallet_from_config(config: &NetworkConfig) -> Result<Option<EthereumWallet>, LockClientError> {
    let signers = config
        .signers()
        .iter()
        .map(|key| B256::from_slice(key.inner().as_bytes()))
        .map(|bytes| {
            PrivateKeySigner::from_bytes(&bytes)
                .map(|s| s.with_chain_id(Some(config.id().inner())))
                .map_err(|e| LockClientError::Config(format!("invalid signer key: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut iter = signers.into_iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut wallet = EthereumWallet::from(first);
    for signer in iter {
        wallet.register_signer(signer);
    }
    Ok(Some(wallet))
}

fn build_provider(config: &NetworkConfig) -> Result<DynProvider, LockClientError> {
    let client = rpc_client(config.id(), config.rpc())?;
    let provider = match wallet_from_config(config)? {
        Some(wallet) => ProviderBuilder::new()
            .wallet(wallet)
            .connect_client(client)
            .erased(),
        None => ProviderBuilder::new().connect_client(client).erased(),
    };
    tracing::info!(
        network = %config.name(),
        endpoints = config.rpc().len(),
        "Initialized provider"
    );
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NativeCurrency, NetworkConfig};

    fn test_config(id: u64) -> NetworkConfig {
        NetworkConfig::new(
            NetworkId::new(id),
            "https://rpc.example.org/test".parse().unwrap(),
            NativeCurrency {
                name: "Ether".into(),
                symbol: "ETH".into(),
                decimals: 18,
            },
        )
    }

    #[test]
    fn memoizes_one_provider_per_network() {
        let cache = ProviderCache::new();
        let config = test_config(1);
        cache.provider(&config).unwrap();
        cache.provider(&config).unwrap();
        assert_eq!(cache.len(), 1);

        cache.provider(&test_config(137)).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn pre_built_provider_takes_the_slot() {
        let cache = ProviderCache::new();
        let provider = ProviderBuilder::new()
            .connect_http("https://rpc.example.org/other".parse().unwrap())
            .erased();
        cache.insert(NetworkId::new(1), provider);
        assert_eq!(cache.len(), 1);
        // Lazy construction is skipped; the installed instance is reused.
        cache.provider(&test_config(1)).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn rejects_config_without_endpoints() {
        let mut config = test_config(1);
        config.inner.rpc.clear();
        let err = ProviderCache::new().provider(&config).unwrap_err();
        assert!(matches!(err, LockClientError::Config(_)));
    }
}
