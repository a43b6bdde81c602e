//! Mutating lock operations.
//!
//! Every method here validates its required parameters synchronously (raising
//! [`MissingParameter`](LockClientError::MissingParameter) before any network
//! call), resolves the deployed version, dispatches to the bound adapter, and
//! returns the transaction hash.
//!
//! # Completion callbacks
//!
//! Each operation takes an optional callback fired as soon as the hash is
//! known, supporting fire-and-observe UX: with a callback the call returns
//! immediately after submission. Without one, the call blocks until one
//! confirmation is observed (bounded by the network's configured
//! confirmation timeout). There is no resubmission or gas-bump policy;
//! callers own their retry strategy.

use alloy_primitives::{Address, B256, Bytes, TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, Provider};
use rand::{Rng, rng};
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::{OperationArgs, OperationKind};
use crate::deploy;
use crate::error::LockClientError;
use crate::service::NetworkContext;
use crate::types::{ChecksummedAddress, NetworkId};
use crate::version::ContractFamily;

/// Fired once a transaction hash is known (not once confirmed).
pub type TransactionCallback = Box<dyn FnOnce(TxHash) + Send>;

/// Structured signing method variants, tried in order by
/// [`TransactionLockService::unformatted_sign_typed_data`]. Nodes and wallets
/// disagree on which of these they expose.
pub const SIGNING_METHOD_CANDIDATES: [&str; 3] = [
    "eth_signTypedData_v4",
    "eth_signTypedData_v3",
    "eth_signTypedData",
];

/// Parameters for [`TransactionLockService::purchase_key`].
#[derive(Debug, Clone, Default)]
pub struct PurchaseKeyParams {
    pub lock: Option<Address>,
    pub recipient: Option<Address>,
    /// Key price; zero for free locks.
    pub value: U256,
    pub referrer: Option<Address>,
    pub key_manager: Option<Address>,
    pub data: Bytes,
    /// Whether the lock is priced in an ERC-20 token.
    pub erc20: bool,
}

impl PurchaseKeyParams {
    fn validate(self) -> Result<(Address, OperationArgs), LockClientError> {
        let lock = self.lock.ok_or(LockClientError::MissingParameter("lock"))?;
        let recipient = self
            .recipient
            .ok_or(LockClientError::MissingParameter("recipient"))?;
        Ok((
            lock,
            OperationArgs::Purchase {
                values: vec![self.value],
                recipients: vec![recipient],
                referrers: vec![self.referrer.unwrap_or(Address::ZERO)],
                key_managers: vec![self.key_manager.unwrap_or(Address::ZERO)],
                data: vec![self.data],
                erc20: self.erc20,
            },
        ))
    }
}

/// Parameters for [`TransactionLockService::extend_key`].
#[derive(Debug, Clone, Default)]
pub struct ExtendKeyParams {
    pub lock: Option<Address>,
    pub token_id: Option<U256>,
    pub value: U256,
    pub referrer: Option<Address>,
    pub data: Bytes,
    pub erc20: bool,
}

impl ExtendKeyParams {
    fn validate(self) -> Result<(Address, OperationArgs), LockClientError> {
        let lock = self.lock.ok_or(LockClientError::MissingParameter("lock"))?;
        let token_id = self
            .token_id
            .ok_or(LockClientError::MissingParameter("token_id"))?;
        Ok((
            lock,
            OperationArgs::Extend {
                value: self.value,
                token_id,
                referrer: self.referrer.unwrap_or(Address::ZERO),
                data: self.data,
                erc20: self.erc20,
            },
        ))
    }
}

/// Parameters for [`TransactionLockService::grant_keys`].
#[derive(Debug, Clone, Default)]
pub struct GrantKeyParams {
    pub lock: Option<Address>,
    pub recipients: Vec<Address>,
    /// One expiration per recipient.
    pub expirations: Vec<U256>,
    /// One manager per recipient; zero-filled when empty.
    pub key_managers: Vec<Address>,
}

impl GrantKeyParams {
    fn validate(self) -> Result<(Address, OperationArgs), LockClientError> {
        let lock = self.lock.ok_or(LockClientError::MissingParameter("lock"))?;
        if self.recipients.is_empty() {
            return Err(LockClientError::MissingParameter("recipients"));
        }
        if self.expirations.len() != self.recipients.len() {
            return Err(LockClientError::MissingParameter("expirations"));
        }
        let mut key_managers = self.key_managers;
        if key_managers.is_empty() {
            key_managers = vec![Address::ZERO; self.recipients.len()];
        } else if key_managers.len() != self.recipients.len() {
            return Err(LockClientError::MissingParameter("key_managers"));
        }
        Ok((
            lock,
            OperationArgs::Grant {
                recipients: self.recipients,
                expirations: self.expirations,
                key_managers,
            },
        ))
    }
}

/// Parameters for [`TransactionLockService::withdraw_from_lock`].
#[derive(Debug, Clone, Default)]
pub struct WithdrawParams {
    pub lock: Option<Address>,
    /// Token to withdraw; zero address for the native currency.
    pub token: Address,
    pub recipient: Option<Address>,
    /// Amount to withdraw; zero withdraws the full balance.
    pub amount: U256,
}

impl WithdrawParams {
    fn validate(self) -> Result<(Address, OperationArgs), LockClientError> {
        let lock = self.lock.ok_or(LockClientError::MissingParameter("lock"))?;
        let recipient = self
            .recipient
            .ok_or(LockClientError::MissingParameter("recipient"))?;
        Ok((
            lock,
            OperationArgs::Withdraw {
                token: self.token,
                recipient,
                amount: self.amount,
            },
        ))
    }
}

/// Parameters for [`TransactionLockService::create_lock`].
#[derive(Debug, Clone, Default)]
pub struct CreateLockParams {
    pub expiration_duration: Option<U256>,
    /// Pricing token; zero address for the native currency.
    pub token: Address,
    pub key_price: U256,
    /// Defaults to unlimited.
    pub max_keys: Option<U256>,
    pub name: Option<String>,
    /// CREATE2 salt; random when omitted. Keep it to predict the address,
    /// see [`TransactionLockService::predict_lock_address`].
    pub salt: Option<B256>,
}

impl CreateLockParams {
    fn validate(self) -> Result<OperationArgs, LockClientError> {
        let expiration_duration = self
            .expiration_duration
            .ok_or(LockClientError::MissingParameter("expiration_duration"))?;
        let name = self.name.ok_or(LockClientError::MissingParameter("name"))?;
        let salt = self.salt.unwrap_or_else(|| B256::from(rng().random::<[u8; 32]>()));
        Ok(OperationArgs::CreateLock {
            expiration_duration,
            token: self.token,
            key_price: self.key_price,
            max_keys: self.max_keys.unwrap_or(U256::MAX),
            name,
            salt,
        })
    }
}

/// Mutating operations against locks and the registry.
pub struct TransactionLockService {
    ctx: Arc<NetworkContext>,
}

impl TransactionLockService {
    pub fn new(ctx: Arc<NetworkContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &NetworkContext {
        &self.ctx
    }

    /// Purchases a fresh key on a lock.
    ///
    /// Also the documented fallback when [`extend_key`](Self::extend_key)
    /// reports
    /// [`OperationNotSupportedForVersion`](LockClientError::OperationNotSupportedForVersion)
    /// on an old deployment.
    pub async fn purchase_key(
        &self,
        network: NetworkId,
        params: PurchaseKeyParams,
        on_hash: Option<TransactionCallback>,
    ) -> Result<TxHash, LockClientError> {
        let (lock, args) = params.validate()?;
        let hash = self
            .ctx
            .dispatch(network, ContractFamily::Lock, lock, OperationKind::Purchase, args)
            .await?
            .expect_submitted(OperationKind::Purchase)?;
        self.finish(network, hash, on_hash).await
    }

    /// Extends an existing key. Locks older than the extend capability raise
    /// `OperationNotSupportedForVersion`; fall back to
    /// [`purchase_key`](Self::purchase_key).
    pub async fn extend_key(
        &self,
        network: NetworkId,
        params: ExtendKeyParams,
        on_hash: Option<TransactionCallback>,
    ) -> Result<TxHash, LockClientError> {
        let (lock, args) = params.validate()?;
        let hash = self
            .ctx
            .dispatch(network, ContractFamily::Lock, lock, OperationKind::Extend, args)
            .await?
            .expect_submitted(OperationKind::Extend)?;
        self.finish(network, hash, on_hash).await
    }

    /// Grants keys without payment. Requires the key-granter role on the
    /// lock.
    pub async fn grant_keys(
        &self,
        network: NetworkId,
        params: GrantKeyParams,
        on_hash: Option<TransactionCallback>,
    ) -> Result<TxHash, LockClientError> {
        let (lock, args) = params.validate()?;
        let hash = self
            .ctx
            .dispatch(network, ContractFamily::Lock, lock, OperationKind::Grant, args)
            .await?
            .expect_submitted(OperationKind::Grant)?;
        self.finish(network, hash, on_hash).await
    }

    /// Withdraws accumulated purchase proceeds from a lock.
    pub async fn withdraw_from_lock(
        &self,
        network: NetworkId,
        params: WithdrawParams,
        on_hash: Option<TransactionCallback>,
    ) -> Result<TxHash, LockClientError> {
        let (lock, args) = params.validate()?;
        let hash = self
            .ctx
            .dispatch(network, ContractFamily::Lock, lock, OperationKind::Withdraw, args)
            .await?
            .expect_submitted(OperationKind::Withdraw)?;
        self.finish(network, hash, on_hash).await
    }

    /// Creates a lock through the network's registry.
    pub async fn create_lock(
        &self,
        network: NetworkId,
        params: CreateLockParams,
        on_hash: Option<TransactionCallback>,
    ) -> Result<TxHash, LockClientError> {
        let args = params.validate()?;
        let registry = self.registry_address(network)?;
        let hash = self
            .ctx
            .dispatch(
                network,
                ContractFamily::Registry,
                registry,
                OperationKind::CreateLock,
                args,
            )
            .await?
            .expect_submitted(OperationKind::CreateLock)?;
        self.finish(network, hash, on_hash).await
    }

    /// Predicts the address the registry will assign to a lock created by
    /// `deployer` with `salt`, without touching the network.
    pub fn predict_lock_address(
        &self,
        network: NetworkId,
        deployer: Address,
        salt: B256,
    ) -> Result<ChecksummedAddress, LockClientError> {
        let config = self.ctx.network(network)?;
        let registry = self.registry_address(network)?;
        let template = config.lock_template().ok_or_else(|| {
            LockClientError::Config(format!("no lock template configured for network {network}"))
        })?;
        Ok(deploy::predicted_lock_address(
            registry, template, deployer, salt,
        ))
    }

    /// Blocks until `hash` has one confirmation, bounded by the network's
    /// configured timeout.
    pub async fn wait_for_confirmation(
        &self,
        network: NetworkId,
        hash: TxHash,
    ) -> Result<TxHash, LockClientError> {
        let timeout = Duration::from_secs(self.ctx.network(network)?.confirmation_timeout_secs());
        let provider = self.ctx.provider(network)?;
        let watcher = PendingTransactionBuilder::new(provider.root().clone(), hash)
            .with_required_confirmations(1)
            .with_timeout(Some(timeout));
        let confirmed = watcher.watch().await?;
        Ok(confirmed)
    }

    /// Requests a structured-data signature from the node, trying each known
    /// method variant in order and failing only once all are exhausted.
    pub async fn unformatted_sign_typed_data(
        &self,
        network: NetworkId,
        signer: Address,
        typed_data: serde_json::Value,
    ) -> Result<Bytes, LockClientError> {
        let provider = self.ctx.provider(network)?;
        let mut attempted = Vec::with_capacity(SIGNING_METHOD_CANDIDATES.len());
        for method in SIGNING_METHOD_CANDIDATES {
            let response: Result<String, _> = provider
                .raw_request(method.into(), (signer, typed_data.clone()))
                .await;
            match response {
                Ok(signature) => {
                    let raw = hex::decode(signature.trim_start_matches("0x"))
                        .map_err(|e| LockClientError::InvalidSignature(e.to_string()))?;
                    return Ok(Bytes::from(raw));
                }
                Err(e) => {
                    tracing::warn!(method, error = %e, "Structured signing variant rejected");
                    attempted.push(method);
                }
            }
        }
        Err(LockClientError::SigningMethodUnsupported { attempted })
    }

    fn registry_address(&self, network: NetworkId) -> Result<Address, LockClientError> {
        self.ctx
            .network(network)?
            .registry_address()
            .ok_or_else(|| {
                LockClientError::Config(format!("no registry deployed on network {network}"))
            })
    }

    /// Callback provided: fire with the hash and return. Otherwise block for
    /// one confirmation.
    async fn finish(
        &self,
        network: NetworkId,
        hash: TxHash,
        on_hash: Option<TransactionCallback>,
    ) -> Result<TxHash, LockClientError> {
        match on_hash {
            Some(callback) => {
                callback(hash);
                Ok(hash)
            }
            None => self.wait_for_confirmation(network, hash).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterRegistry, CapabilityTable, OperationOutput};
    use crate::service::testutil::{FixedProbe, single_network_config};
    use alloy_primitives::{address, b256};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LOCK: Address = address!("0x00000000000000000000000000000000000000a1");
    const TX: B256 = b256!("0x00000000000000000000000000000000000000000000000000000000000000bb");

    fn service(version: u64, table: CapabilityTable) -> (TransactionLockService, Arc<FixedProbe>) {
        let mut adapters = AdapterRegistry::new();
        adapters.register(ContractFamily::Lock, version, table);
        let probe = Arc::new(FixedProbe::new(version));
        let ctx = NetworkContext::with_adapters(single_network_config(1), adapters)
            .with_version_probe(probe.clone());
        (TransactionLockService::new(Arc::new(ctx)), probe)
    }

    #[tokio::test]
    async fn missing_parameter_fails_before_any_network_call() {
        let (service, probe) = service(12, CapabilityTable::new());

        let err = service
            .purchase_key(NetworkId::new(1), PurchaseKeyParams::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LockClientError::MissingParameter("lock")));

        let err = service
            .purchase_key(
                NetworkId::new(1),
                PurchaseKeyParams {
                    lock: Some(LOCK),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LockClientError::MissingParameter("recipient")));

        // Validation happened synchronously: no version probe was issued.
        assert_eq!(probe.calls(), 0);
    }

    #[tokio::test]
    async fn grant_validates_parallel_arrays() {
        let (service, _probe) = service(12, CapabilityTable::new());
        let err = service
            .grant_keys(
                NetworkId::new(1),
                GrantKeyParams {
                    lock: Some(LOCK),
                    recipients: vec![LOCK, LOCK],
                    expirations: vec![U256::from(1)],
                    key_managers: vec![],
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LockClientError::MissingParameter("expirations")
        ));
    }

    #[tokio::test]
    async fn callback_fires_with_hash_and_returns_without_waiting() {
        let table = CapabilityTable::new().with_fn(OperationKind::Purchase, |_call| async {
            Ok(OperationOutput::Submitted(TX))
        });
        let (service, _probe) = service(12, table);

        let observed: Arc<Mutex<Option<TxHash>>> = Arc::new(Mutex::new(None));
        let sink = observed.clone();
        let hash = service
            .purchase_key(
                NetworkId::new(1),
                PurchaseKeyParams {
                    lock: Some(LOCK),
                    recipient: Some(LOCK),
                    ..Default::default()
                },
                Some(Box::new(move |h| {
                    *sink.lock().unwrap() = Some(h);
                })),
            )
            .await
            .unwrap();

        assert_eq!(hash, TX);
        assert_eq!(*observed.lock().unwrap(), Some(TX));
    }

    #[tokio::test]
    async fn create_lock_requires_duration_and_name() {
        let (service, _probe) = service(12, CapabilityTable::new());
        let err = service
            .create_lock(NetworkId::new(1), CreateLockParams::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LockClientError::MissingParameter("expiration_duration")
        ));
    }

    #[tokio::test]
    async fn create_lock_dispatches_against_registry_family() {
        let dispatched = Arc::new(AtomicUsize::new(0));
        let seen = dispatched.clone();
        let mut adapters = AdapterRegistry::new();
        adapters.register(
            ContractFamily::Registry,
            13,
            CapabilityTable::new().with_fn(OperationKind::CreateLock, move |call| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    // Target is the registry deployment, not a lock.
                    assert_eq!(
                        call.target,
                        crate::networks::registry_address_by_id(NetworkId::new(1)).unwrap()
                    );
                    Ok(OperationOutput::Submitted(TX))
                }
            }),
        );
        let ctx = NetworkContext::with_adapters(single_network_config(1), adapters)
            .with_version_probe(Arc::new(FixedProbe::new(13)));
        let service = TransactionLockService::new(Arc::new(ctx));

        let hash = service
            .create_lock(
                NetworkId::new(1),
                CreateLockParams {
                    expiration_duration: Some(U256::from(30 * 24 * 3600)),
                    name: Some("Crypto Brunch Club".into()),
                    key_price: U256::from(10),
                    ..Default::default()
                },
                Some(Box::new(|_h| {})),
            )
            .await
            .unwrap();
        assert_eq!(hash, TX);
        assert_eq!(dispatched.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn predict_lock_address_needs_template() {
        let (service, _probe) = service(12, CapabilityTable::new());
        // single_network_config has no lock_template configured.
        let err = service
            .predict_lock_address(NetworkId::new(1), LOCK, B256::ZERO)
            .unwrap_err();
        assert!(matches!(err, LockClientError::Config(_)));
    }

    #[test]
    fn signing_method_candidates_order() {
        assert_eq!(
            SIGNING_METHOD_CANDIDATES,
            [
                "eth_signTypedData_v4",
                "eth_signTypedData_v3",
                "eth_signTypedData"
            ]
        );
    }
}
