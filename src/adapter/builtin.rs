//! Built-in capability tables for the shipped contract versions.
//!
//! These strategies execute against the bindings in [`crate::bindings`].
//! Version coverage:
//!
//! - Membership lock v4–v8 ("legacy"): single-recipient purchase shape, no
//!   role queries, no token-id lookup, no extend.
//! - Membership lock v9–v14 ("modern"): array purchase shape and the full
//!   read surface; `extend` exists from v10 onward.
//! - Registry v0–v13: lock creation. Pre-versioning registry deployments
//!   (v0/v1) share the modern creation surface.
//!
//! A deployment newer than what ships here needs its table registered by the
//! caller; dispatch reports anything else as unsupported.

use alloy_primitives::U256;
use async_trait::async_trait;
use std::sync::Arc;

use crate::adapter::{
    AdapterRegistry, CapabilityTable, OperationArgs, OperationCall, OperationHandler,
    OperationKind, OperationOutput,
};
use crate::bindings::{ILockRegistry, IMembershipLock};
use crate::error::LockClientError;
use crate::version::ContractFamily;

/// Highest membership lock version with a built-in table.
pub const MAX_LOCK_VERSION: u64 = 14;
/// Highest registry version with a built-in table.
pub const MAX_REGISTRY_VERSION: u64 = 13;

/// Array-shaped purchase, v9+.
struct PurchaseStrategy;

#[async_trait]
impl OperationHandler for PurchaseStrategy {
    async fn execute(&self, call: OperationCall) -> Result<OperationOutput, LockClientError> {
        let OperationArgs::Purchase {
            values,
            recipients,
            referrers,
            key_managers,
            data,
            erc20,
        } = call.args
        else {
            return Err(LockClientError::InvalidArguments {
                operation: OperationKind::Purchase,
                expected: "purchase arguments",
            });
        };
        let total = values.iter().fold(U256::ZERO, |acc, v| acc + v);
        let lock = IMembershipLock::new(call.target, call.provider);
        let mut tx = lock.purchase(values, recipients, referrers, key_managers, data);
        if !erc20 {
            tx = tx.value(total);
        }
        let pending = tx.send().await?;
        Ok(OperationOutput::Submitted(*pending.tx_hash()))
    }
}

/// Single-recipient purchase shape used by pre-v9 locks.
struct LegacyPurchaseStrategy;

#[async_trait]
impl OperationHandler for LegacyPurchaseStrategy {
    async fn execute(&self, call: OperationCall) -> Result<OperationOutput, LockClientError> {
        let OperationArgs::Purchase {
            values,
            recipients,
            erc20,
            ..
        } = call.args
        else {
            return Err(LockClientError::InvalidArguments {
                operation: OperationKind::Purchase,
                expected: "purchase arguments",
            });
        };
        let recipient = recipients
            .first()
            .copied()
            .ok_or(LockClientError::MissingParameter("recipient"))?;
        let value = values.first().copied().unwrap_or(U256::ZERO);
        let lock = IMembershipLock::new(call.target, call.provider);
        let mut tx = lock.purchaseFor(recipient);
        if !erc20 {
            tx = tx.value(value);
        }
        let pending = tx.send().await?;
        Ok(OperationOutput::Submitted(*pending.tx_hash()))
    }
}

/// Key extension, v10+.
struct ExtendStrategy;

#[async_trait]
impl OperationHandler for ExtendStrategy {
    async fn execute(&self, call: OperationCall) -> Result<OperationOutput, LockClientError> {
        let OperationArgs::Extend {
            value,
            token_id,
            referrer,
            data,
            erc20,
        } = call.args
        else {
            return Err(LockClientError::InvalidArguments {
                operation: OperationKind::Extend,
                expected: "extend arguments",
            });
        };
        let lock = IMembershipLock::new(call.target, call.provider);
        let mut tx = lock.extend(value, token_id, referrer, data);
        if !erc20 {
            tx = tx.value(value);
        }
        let pending = tx.send().await?;
        Ok(OperationOutput::Submitted(*pending.tx_hash()))
    }
}

struct GrantStrategy;

#[async_trait]
impl OperationHandler for GrantStrategy {
    async fn execute(&self, call: OperationCall) -> Result<OperationOutput, LockClientError> {
        let OperationArgs::Grant {
            recipients,
            expirations,
            key_managers,
        } = call.args
        else {
            return Err(LockClientError::InvalidArguments {
                operation: OperationKind::Grant,
                expected: "grant arguments",
            });
        };
        let lock = IMembershipLock::new(call.target, call.provider);
        let pending = lock
            .grantKeys(recipients, expirations, key_managers)
            .send()
            .await?;
        Ok(OperationOutput::Submitted(*pending.tx_hash()))
    }
}

struct WithdrawStrategy;

#[async_trait]
impl OperationHandler for WithdrawStrategy {
    async fn execute(&self, call: OperationCall) -> Result<OperationOutput, LockClientError> {
        let OperationArgs::Withdraw {
            token,
            recipient,
            amount,
        } = call.args
        else {
            return Err(LockClientError::InvalidArguments {
                operation: OperationKind::Withdraw,
                expected: "withdraw arguments",
            });
        };
        let lock = IMembershipLock::new(call.target, call.provider);
        let pending = lock.withdraw(token, recipient, amount).send().await?;
        Ok(OperationOutput::Submitted(*pending.tx_hash()))
    }
}

struct CreateLockStrategy;

#[async_trait]
impl OperationHandler for CreateLockStrategy {
    async fn execute(&self, call: OperationCall) -> Result<OperationOutput, LockClientError> {
        let OperationArgs::CreateLock {
            expiration_duration,
            token,
            key_price,
            max_keys,
            name,
            salt,
        } = call.args
        else {
            return Err(LockClientError::InvalidArguments {
                operation: OperationKind::CreateLock,
                expected: "create-lock arguments",
            });
        };
        let registry = ILockRegistry::new(call.target, call.provider);
        let pending = registry
            .createLock(expiration_duration, token, key_price, max_keys, name, salt)
            .send()
            .await?;
        // The deployed address is read from the receipt (or predicted
        // beforehand, see `service::deploy`); dispatch only reports the hash.
        Ok(OperationOutput::Submitted(*pending.tx_hash()))
    }
}

/// Reads shared by every lock version with a built-in table.
fn base_lock_reads(table: CapabilityTable) -> CapabilityTable {
    table
        .with_fn(OperationKind::Balance, |call| async move {
            let OperationArgs::Owner { owner } = call.args else {
                return Err(LockClientError::InvalidArguments {
                    operation: OperationKind::Balance,
                    expected: "owner",
                });
            };
            let balance = IMembershipLock::new(call.target, call.provider)
                .balanceOf(owner)
                .call()
                .await?;
            Ok(OperationOutput::Uint(balance))
        })
        .with_fn(OperationKind::HasValidKey, |call| async move {
            let OperationArgs::Owner { owner } = call.args else {
                return Err(LockClientError::InvalidArguments {
                    operation: OperationKind::HasValidKey,
                    expected: "owner",
                });
            };
            let valid = IMembershipLock::new(call.target, call.provider)
                .getHasValidKey(owner)
                .call()
                .await?;
            Ok(OperationOutput::Bool(valid))
        })
        .with_fn(OperationKind::ExpirationOf, |call| async move {
            let OperationArgs::Owner { owner } = call.args else {
                return Err(LockClientError::InvalidArguments {
                    operation: OperationKind::ExpirationOf,
                    expected: "owner",
                });
            };
            let expiration = IMembershipLock::new(call.target, call.provider)
                .keyExpirationTimestampFor(owner)
                .call()
                .await?;
            Ok(OperationOutput::Uint(expiration))
        })
        .with_fn(OperationKind::TotalKeys, |call| async move {
            let total = IMembershipLock::new(call.target, call.provider)
                .totalSupply()
                .call()
                .await?;
            Ok(OperationOutput::Uint(total))
        })
        .with_fn(OperationKind::KeyPrice, |call| async move {
            let price = IMembershipLock::new(call.target, call.provider)
                .keyPrice()
                .call()
                .await?;
            Ok(OperationOutput::Uint(price))
        })
        .with_fn(OperationKind::ExpirationDuration, |call| async move {
            let duration = IMembershipLock::new(call.target, call.provider)
                .expirationDuration()
                .call()
                .await?;
            Ok(OperationOutput::Uint(duration))
        })
}

/// Reads that only exist on v9+ locks.
fn modern_lock_reads(table: CapabilityTable) -> CapabilityTable {
    table
        .with_fn(OperationKind::TokenIdOf, |call| async move {
            let OperationArgs::Owner { owner } = call.args else {
                return Err(LockClientError::InvalidArguments {
                    operation: OperationKind::TokenIdOf,
                    expected: "owner",
                });
            };
            let token_id = IMembershipLock::new(call.target, call.provider)
                .tokenOfOwnerByIndex(owner, U256::ZERO)
                .call()
                .await?;
            Ok(OperationOutput::Uint(token_id))
        })
        .with_fn(OperationKind::IsManager, |call| async move {
            let OperationArgs::Account { account } = call.args else {
                return Err(LockClientError::InvalidArguments {
                    operation: OperationKind::IsManager,
                    expected: "account",
                });
            };
            let is_manager = IMembershipLock::new(call.target, call.provider)
                .isLockManager(account)
                .call()
                .await?;
            Ok(OperationOutput::Bool(is_manager))
        })
        .with_fn(OperationKind::IsGranter, |call| async move {
            let OperationArgs::Account { account } = call.args else {
                return Err(LockClientError::InvalidArguments {
                    operation: OperationKind::IsGranter,
                    expected: "account",
                });
            };
            let is_granter = IMembershipLock::new(call.target, call.provider)
                .isKeyGranter(account)
                .call()
                .await?;
            Ok(OperationOutput::Bool(is_granter))
        })
}

fn legacy_lock_table() -> CapabilityTable {
    base_lock_reads(CapabilityTable::new())
        .with_op(OperationKind::Purchase, Arc::new(LegacyPurchaseStrategy))
        .with_op(OperationKind::Withdraw, Arc::new(WithdrawStrategy))
}

fn modern_lock_table(version: u64) -> CapabilityTable {
    let table = modern_lock_reads(base_lock_reads(CapabilityTable::new()))
        .with_op(OperationKind::Purchase, Arc::new(PurchaseStrategy))
        .with_op(OperationKind::Grant, Arc::new(GrantStrategy))
        .with_op(OperationKind::Withdraw, Arc::new(WithdrawStrategy));
    if version >= 10 {
        table.with_op(OperationKind::Extend, Arc::new(ExtendStrategy))
    } else {
        table
    }
}

fn registry_table() -> CapabilityTable {
    CapabilityTable::new().with_op(OperationKind::CreateLock, Arc::new(CreateLockStrategy))
}

/// The adapter registry for all shipped contract versions.
pub fn builtin_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    for version in 4..=8 {
        registry.register(ContractFamily::Lock, version, legacy_lock_table());
    }
    for version in 9..=MAX_LOCK_VERSION {
        registry.register(ContractFamily::Lock, version, modern_lock_table(version));
    }
    for version in 0..=MAX_REGISTRY_VERSION {
        registry.register(ContractFamily::Registry, version, registry_table());
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use alloy_provider::{Provider, ProviderBuilder};

    #[test]
    fn legacy_locks_lack_modern_capabilities() {
        let registry = builtin_registry();
        let v8 = registry.lookup(ContractFamily::Lock, 8).unwrap();
        assert!(v8.supports(OperationKind::Purchase));
        assert!(v8.supports(OperationKind::Balance));
        assert!(!v8.supports(OperationKind::Extend));
        assert!(!v8.supports(OperationKind::TokenIdOf));
        assert!(!v8.supports(OperationKind::Grant));
    }

    #[test]
    fn extend_appears_at_v10() {
        let registry = builtin_registry();
        let v9 = registry.lookup(ContractFamily::Lock, 9).unwrap();
        assert!(v9.supports(OperationKind::TokenIdOf));
        assert!(!v9.supports(OperationKind::Extend));

        let v10 = registry.lookup(ContractFamily::Lock, 10).unwrap();
        assert!(v10.supports(OperationKind::Extend));
    }

    #[test]
    fn registry_tables_create_locks_only() {
        let registry = builtin_registry();
        let table = registry
            .lookup(ContractFamily::Registry, MAX_REGISTRY_VERSION)
            .unwrap();
        assert_eq!(table.operations(), vec![OperationKind::CreateLock]);
        assert!(registry
            .lookup(ContractFamily::Registry, MAX_REGISTRY_VERSION + 1)
            .is_none());
    }

    #[tokio::test]
    async fn wrong_argument_shape_is_rejected() {
        let provider = ProviderBuilder::new()
            .connect_http("https://rpc.example.org/test".parse().unwrap())
            .erased();
        let call = OperationCall {
            provider,
            target: address!("0x00000000000000000000000000000000000000a1"),
            args: OperationArgs::None,
        };
        let err = PurchaseStrategy.execute(call).await.unwrap_err();
        assert!(matches!(
            err,
            LockClientError::InvalidArguments {
                operation: OperationKind::Purchase,
                ..
            }
        ));
    }
}
