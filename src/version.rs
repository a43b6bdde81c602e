//! Deployed contract version resolution.
//!
//! The on-chain contracts evolve over time with no central version registry;
//! recent deployments self-report through a version probe method, while the
//! oldest predate it entirely. Resolution is therefore two-tier:
//!
//! 1. Call the family's standardized probe (`registryVersion()` /
//!    `lockVersion()`) and parse the result.
//! 2. On probe failure, fall back: the registry family hashes the deployed
//!    bytecode and compares it against the known hashes of pre-versioning
//!    deployments (yielding 0 or 1); the membership lock family assumes
//!    version 0.
//!
//! Resolved versions are memoized per resolver instance and never evicted.
//! Contracts behind upgradeable proxies can change implementation at the same
//! address after first resolution; that staleness is a documented property of
//! this design, kept as-is so cache-hit behavior stays observable.

use alloy_primitives::{Address, B256, Bytes, b256, keccak256};
use alloy_provider::{DynProvider, Provider};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use crate::bindings::{ILockRegistry, IMembershipLock};
use crate::error::LockClientError;

/// The two managed on-chain contract families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractFamily {
    /// The registry/factory contract that deploys membership locks.
    Registry,
    /// The per-instance membership lock contract.
    Lock,
}

impl Display for ContractFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractFamily::Registry => write!(f, "lock-registry"),
            ContractFamily::Lock => write!(f, "membership-lock"),
        }
    }
}

/// Memoized version entries, keyed by lowercased address.
///
/// First write wins: an entry, once set, is never silently overwritten. A
/// cache miss always re-probes.
#[derive(Debug, Default)]
pub struct VersionCache {
    entries: DashMap<String, u64>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached version for an address, if resolved before.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|v| *v)
    }

    /// Inserts unless present; returns the surviving value either way.
    pub fn insert_if_absent(&self, key: String, version: u64) -> u64 {
        *self.entries.entry(key).or_insert(version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The probing seam between the resolver and the network.
///
/// Production uses [`RpcVersionProbe`]; tests substitute a stub to count
/// round trips.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    /// Calls the family's self-reporting version method. `Ok(None)` means the
    /// deployment does not answer the probe (typically because it predates
    /// the method), which routes resolution to the fallback tier.
    async fn probe_version(
        &self,
        address: Address,
        family: ContractFamily,
    ) -> Result<Option<u64>, LockClientError>;

    /// The deployed bytecode at an address.
    async fn code_at(&self, address: Address) -> Result<Bytes, LockClientError>;
}

/// [`VersionProbe`] over a live JSON-RPC provider.
#[derive(Debug, Clone)]
pub struct RpcVersionProbe {
    provider: DynProvider,
}

impl RpcVersionProbe {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl VersionProbe for RpcVersionProbe {
    async fn probe_version(
        &self,
        address: Address,
        family: ContractFamily,
    ) -> Result<Option<u64>, LockClientError> {
        let probed = match family {
            ContractFamily::Registry => ILockRegistry::new(address, self.provider.clone())
                .registryVersion()
                .call()
                .await
                .map(u64::from),
            ContractFamily::Lock => IMembershipLock::new(address, self.provider.clone())
                .lockVersion()
                .call()
                .await
                .map(u64::from),
        };
        match probed {
            Ok(version) => Ok(Some(version)),
            Err(e) => {
                tracing::debug!(%address, %family, error = %e, "Version probe unanswered");
                Ok(None)
            }
        }
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, LockClientError> {
        let code = self.provider.get_code_at(address).await?;
        Ok(code)
    }
}

/// Bytecode hash of the original registry deployment, before self-reporting.
const EARLY_REGISTRY_V0_CODE_HASH: B256 =
    b256!("0x8e43c1f4bf29d24bb97b5e28b0bf58f783b8c4aaca3d38edb58e722e62f46ab3");
/// Bytecode hash of the first re-deployment, still without self-reporting.
const EARLY_REGISTRY_V1_CODE_HASH: B256 =
    b256!("0xd42c66f5b77aa8e56e2639db9f0e6c4f05e1b4b28c63e62d4450fc9e96fe9a2b");

/// Resolves the deployed version of a contract, memoizing results.
///
/// Owned by a service instance and injected where needed; there is no shared
/// module-level cache. Concurrent first resolutions of the same address are
/// not de-duplicated: redundant probes may occur, and first write wins in the
/// cache. A single-flight guard keyed by normalized address is the documented
/// enhancement if that ever matters.
#[derive(Debug)]
pub struct VersionResolver {
    cache: VersionCache,
    early_registry_hashes: HashMap<B256, u64>,
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionResolver {
    /// A resolver with the built-in pre-versioning bytecode hash table.
    pub fn new() -> Self {
        let mut early_registry_hashes = HashMap::with_capacity(2);
        early_registry_hashes.insert(EARLY_REGISTRY_V0_CODE_HASH, 0);
        early_registry_hashes.insert(EARLY_REGISTRY_V1_CODE_HASH, 1);
        Self {
            cache: VersionCache::new(),
            early_registry_hashes,
        }
    }

    /// A resolver with a caller-supplied pre-versioning hash table.
    pub fn with_code_hashes(early_registry_hashes: HashMap<B256, u64>) -> Self {
        Self {
            cache: VersionCache::new(),
            early_registry_hashes,
        }
    }

    /// The memoized entries.
    pub fn cache(&self) -> &VersionCache {
        &self.cache
    }

    /// Resolves the version deployed at `address`.
    ///
    /// # Errors
    ///
    /// [`LockClientError::ContractNotDeployed`] when the address holds no
    /// code; this outcome is not cached, so a later deployment at the same
    /// address resolves fresh.
    pub async fn resolve(
        &self,
        address: Address,
        family: ContractFamily,
        probe: &dyn VersionProbe,
    ) -> Result<u64, LockClientError> {
        let key = cache_key(address);
        if let Some(version) = self.cache.get(&key) {
            tracing::trace!(%address, %family, version, "Version cache hit");
            return Ok(version);
        }

        if let Some(version) = probe.probe_version(address, family).await? {
            return Ok(self.cache.insert_if_absent(key, version));
        }

        // Probe unanswered: distinguish "old deployment" from "nothing there".
        let code = probe.code_at(address).await?;
        if code.is_empty() {
            return Err(LockClientError::ContractNotDeployed(address));
        }

        let version = match family {
            ContractFamily::Registry => {
                let hash = keccak256(&code);
                self.early_registry_hashes.get(&hash).copied().unwrap_or(0)
            }
            ContractFamily::Lock => 0,
        };
        tracing::debug!(%address, %family, version, "Resolved pre-versioning deployment");
        Ok(self.cache.insert_if_absent(key, version))
    }
}

/// Normalized (lowercased) cache key for an address.
fn cache_key(address: Address) -> String {
    format!("{address:#x}")
}
