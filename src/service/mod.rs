//! Contract interaction services.
//!
//! A [`NetworkContext`] owns everything both services share: the network
//! configuration map, the memoized provider cache, the version resolver, and
//! the adapter registry. It is passed by value (behind an `Arc`) into
//! [`ReadOnlyLockService`] and [`TransactionLockService`] — composition, not
//! a shared base class.

pub mod read;
pub mod write;

pub use read::ReadOnlyLockService;
pub use write::{
    CreateLockParams, ExtendKeyParams, GrantKeyParams, PurchaseKeyParams, TransactionCallback,
    TransactionLockService, WithdrawParams,
};

use alloy_primitives::Address;
use alloy_provider::DynProvider;
use std::sync::Arc;

use crate::adapter::builtin::builtin_registry;
use crate::adapter::{AdapterRegistry, OperationArgs, OperationCall, OperationKind, OperationOutput};
use crate::config::{NetworkConfig, NetworksConfig};
use crate::error::LockClientError;
use crate::provider::ProviderCache;
use crate::types::NetworkId;
use crate::version::{ContractFamily, RpcVersionProbe, VersionCache, VersionProbe, VersionResolver};

/// Shared state for one client instance: configuration, providers, version
/// resolution, and dispatch.
pub struct NetworkContext {
    config: NetworksConfig,
    providers: ProviderCache,
    resolver: VersionResolver,
    adapters: AdapterRegistry,
    probe_override: Option<Arc<dyn VersionProbe>>,
}

impl NetworkContext {
    /// A context over the built-in capability tables.
    pub fn new(config: NetworksConfig) -> Self {
        Self::with_adapters(config, builtin_registry())
    }

    /// A context over caller-supplied capability tables, for deployments this
    /// crate does not ship adapters for.
    pub fn with_adapters(config: NetworksConfig, adapters: AdapterRegistry) -> Self {
        Self {
            config,
            providers: ProviderCache::new(),
            resolver: VersionResolver::new(),
            adapters,
            probe_override: None,
        }
    }

    /// Replaces the version probe used for every network. The default probes
    /// over the network's own provider; an override substitutes a different
    /// probing strategy (notably in tests, where it counts round trips).
    pub fn with_version_probe(mut self, probe: Arc<dyn VersionProbe>) -> Self {
        self.probe_override = Some(probe);
        self
    }

    /// Installs a pre-built provider for a network instead of constructing
    /// one from its RPC configuration.
    pub fn with_provider(self, id: NetworkId, provider: DynProvider) -> Self {
        self.providers.insert(id, provider);
        self
    }

    pub fn config(&self) -> &NetworksConfig {
        &self.config
    }

    /// The configuration for a network id.
    pub fn network(&self, id: NetworkId) -> Result<&NetworkConfig, LockClientError> {
        self.config.network(id)
    }

    /// The provider for a network id, built and memoized on first use.
    pub fn provider(&self, id: NetworkId) -> Result<DynProvider, LockClientError> {
        let config = self.network(id)?;
        self.providers.provider(config)
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// The memoized version entries.
    pub fn version_cache(&self) -> &VersionCache {
        self.resolver.cache()
    }

    /// Resolves the deployed version of a contract on a network.
    pub async fn resolve_version(
        &self,
        id: NetworkId,
        address: Address,
        family: ContractFamily,
    ) -> Result<u64, LockClientError> {
        match &self.probe_override {
            Some(probe) => self.resolver.resolve(address, family, probe.as_ref()).await,
            None => {
                let probe = RpcVersionProbe::new(self.provider(id)?);
                self.resolver.resolve(address, family, &probe).await
            }
        }
    }

    /// Resolves the version at `target` and dispatches one operation to the
    /// bound adapter.
    pub(crate) async fn dispatch(
        &self,
        id: NetworkId,
        family: ContractFamily,
        target: Address,
        operation: OperationKind,
        args: OperationArgs,
    ) -> Result<OperationOutput, LockClientError> {
        let provider = self.provider(id)?;
        let version = self.resolve_version(id, target, family).await?;
        let call = OperationCall {
            provider,
            target,
            args,
        };
        self.adapters.dispatch(family, version, operation, call).await
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::{FixedProbe, single_network_config};
    use super::*;
    use crate::adapter::CapabilityTable;
    use alloy_primitives::{B256, U256, address, b256};
    use crate::service::write::PurchaseKeyParams;

    const LOCK: Address = address!("0x00000000000000000000000000000000000000a1");
    const TX: B256 = b256!("0x00000000000000000000000000000000000000000000000000000000000000aa");

    /// The end-to-end fallback scenario: a v2 lock with no extend capability
    /// routes the caller to a full purchase.
    #[tokio::test]
    async fn extend_falls_back_to_purchase_on_old_locks() {
        let mut adapters = AdapterRegistry::new();
        let v2_table = CapabilityTable::new().with_fn(OperationKind::Purchase, |_call| async {
            Ok(OperationOutput::Submitted(TX))
        });
        adapters.register(ContractFamily::Lock, 2, v2_table);

        let probe = Arc::new(FixedProbe::new(2));
        let ctx = Arc::new(
            NetworkContext::with_adapters(single_network_config(1), adapters)
                .with_version_probe(probe.clone()),
        );

        // Version resolves from the probe once, then from cache.
        let network = NetworkId::new(1);
        let version = ctx
            .resolve_version(network, LOCK, ContractFamily::Lock)
            .await
            .unwrap();
        assert_eq!(version, 2);
        ctx.resolve_version(network, LOCK, ContractFamily::Lock)
            .await
            .unwrap();
        assert_eq!(probe.calls(), 1);

        let service = TransactionLockService::new(ctx.clone());
        let extend = service
            .extend_key(
                network,
                crate::service::write::ExtendKeyParams {
                    lock: Some(LOCK),
                    token_id: Some(U256::from(1)),
                    value: U256::ZERO,
                    referrer: None,
                    data: Default::default(),
                    erc20: false,
                },
                None,
            )
            .await;
        assert!(matches!(
            extend.unwrap_err(),
            LockClientError::OperationNotSupportedForVersion {
                operation: OperationKind::Extend,
                version: 2,
                ..
            }
        ));

        // Caller's fallback path: purchase a fresh key instead.
        let hash = service
            .purchase_key(
                network,
                PurchaseKeyParams {
                    lock: Some(LOCK),
                    recipient: Some(address!("0x00000000000000000000000000000000000000b2")),
                    value: U256::ZERO,
                    referrer: None,
                    key_manager: None,
                    data: Default::default(),
                    erc20: false,
                },
                Some(Box::new(|_hash| {})),
            )
            .await
            .unwrap();
        assert_eq!(hash, TX);
        // Still one probe: dispatch reused the cached version.
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_network_is_config_missing() {
        let ctx = NetworkContext::new(single_network_config(1));
        let err = ctx.provider(NetworkId::new(5)).unwrap_err();
        assert!(matches!(err, LockClientError::ConfigMissing(id) if id.inner() == 5));
    }
}
