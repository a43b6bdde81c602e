//! Read-only lock queries.

use alloy_primitives::{Address, U256};
use std::sync::Arc;

use crate::adapter::{OperationArgs, OperationKind};
use crate::error::LockClientError;
use crate::service::NetworkContext;
use crate::types::NetworkId;
use crate::version::ContractFamily;

/// Pure queries against membership locks. Never submits a transaction.
///
/// # Graceful degradation
///
/// The version-dependent getters [`key_expiration_of`](Self::key_expiration_of)
/// and [`token_id_of`](Self::token_id_of) revert on older lock deployments.
/// They return the sentinel `0` in that case instead of propagating the
/// failure; downstream callers rely on the sentinel. Required getters that a
/// family's table omits entirely still raise
/// [`OperationNotSupportedForVersion`](LockClientError::OperationNotSupportedForVersion).
pub struct ReadOnlyLockService {
    ctx: Arc<NetworkContext>,
}

impl ReadOnlyLockService {
    pub fn new(ctx: Arc<NetworkContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &NetworkContext {
        &self.ctx
    }

    /// Number of keys `owner` holds on `lock`.
    pub async fn key_balance_of(
        &self,
        network: NetworkId,
        lock: Address,
        owner: Address,
    ) -> Result<U256, LockClientError> {
        self.ctx
            .dispatch(
                network,
                ContractFamily::Lock,
                lock,
                OperationKind::Balance,
                OperationArgs::Owner { owner },
            )
            .await?
            .expect_uint(OperationKind::Balance)
    }

    /// Whether `owner` holds a currently-valid key.
    pub async fn has_valid_key(
        &self,
        network: NetworkId,
        lock: Address,
        owner: Address,
    ) -> Result<bool, LockClientError> {
        self.ctx
            .dispatch(
                network,
                ContractFamily::Lock,
                lock,
                OperationKind::HasValidKey,
                OperationArgs::Owner { owner },
            )
            .await?
            .expect_bool(OperationKind::HasValidKey)
    }

    /// Expiration timestamp of `owner`'s key, or `0` when the deployed
    /// version cannot answer.
    pub async fn key_expiration_of(
        &self,
        network: NetworkId,
        lock: Address,
        owner: Address,
    ) -> Result<U256, LockClientError> {
        self.optional_uint(
            network,
            lock,
            OperationKind::ExpirationOf,
            OperationArgs::Owner { owner },
        )
        .await
    }

    /// Token id of `owner`'s key, or `0` when the deployed version cannot
    /// answer.
    pub async fn token_id_of(
        &self,
        network: NetworkId,
        lock: Address,
        owner: Address,
    ) -> Result<U256, LockClientError> {
        self.optional_uint(
            network,
            lock,
            OperationKind::TokenIdOf,
            OperationArgs::Owner { owner },
        )
        .await
    }

    /// Whether `account` manages the lock.
    pub async fn is_lock_manager(
        &self,
        network: NetworkId,
        lock: Address,
        account: Address,
    ) -> Result<bool, LockClientError> {
        self.ctx
            .dispatch(
                network,
                ContractFamily::Lock,
                lock,
                OperationKind::IsManager,
                OperationArgs::Account { account },
            )
            .await?
            .expect_bool(OperationKind::IsManager)
    }

    /// Whether `account` may grant keys on the lock.
    pub async fn is_key_granter(
        &self,
        network: NetworkId,
        lock: Address,
        account: Address,
    ) -> Result<bool, LockClientError> {
        self.ctx
            .dispatch(
                network,
                ContractFamily::Lock,
                lock,
                OperationKind::IsGranter,
                OperationArgs::Account { account },
            )
            .await?
            .expect_bool(OperationKind::IsGranter)
    }

    /// Total keys ever minted on the lock.
    pub async fn total_keys(
        &self,
        network: NetworkId,
        lock: Address,
    ) -> Result<U256, LockClientError> {
        self.ctx
            .dispatch(
                network,
                ContractFamily::Lock,
                lock,
                OperationKind::TotalKeys,
                OperationArgs::None,
            )
            .await?
            .expect_uint(OperationKind::TotalKeys)
    }

    /// Current key price, in the lock's pricing token units.
    pub async fn key_price(
        &self,
        network: NetworkId,
        lock: Address,
    ) -> Result<U256, LockClientError> {
        self.ctx
            .dispatch(
                network,
                ContractFamily::Lock,
                lock,
                OperationKind::KeyPrice,
                OperationArgs::None,
            )
            .await?
            .expect_uint(OperationKind::KeyPrice)
    }

    /// Duration a fresh key stays valid, in seconds.
    pub async fn expiration_duration(
        &self,
        network: NetworkId,
        lock: Address,
    ) -> Result<U256, LockClientError> {
        self.ctx
            .dispatch(
                network,
                ContractFamily::Lock,
                lock,
                OperationKind::ExpirationDuration,
                OperationArgs::None,
            )
            .await?
            .expect_uint(OperationKind::ExpirationDuration)
    }

    /// Dispatches an optional getter, mapping on-chain call failures to the
    /// sentinel `0`. Dispatch-level errors (unknown network, unsupported
    /// operation) still propagate.
    async fn optional_uint(
        &self,
        network: NetworkId,
        lock: Address,
        operation: OperationKind,
        args: OperationArgs,
    ) -> Result<U256, LockClientError> {
        match self
            .ctx
            .dispatch(network, ContractFamily::Lock, lock, operation, args)
            .await
        {
            Ok(output) => output.expect_uint(operation),
            Err(e) if e.is_call_failure() => {
                tracing::debug!(%lock, %operation, error = %e, "Optional getter reverted, returning sentinel");
                Ok(U256::ZERO)
            }
            Err(e) => Err(e),
        }
    }
}
