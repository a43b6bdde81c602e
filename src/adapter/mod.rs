//! Version-keyed capability tables and operation dispatch.
//!
//! Each deployed contract version exposes a fixed vocabulary of operations.
//! A [`CapabilityTable`] maps [`OperationKind`] to a strategy implementing
//! that operation against one version; the [`AdapterRegistry`] holds one
//! table per (family, version) pair and performs dispatch. Operations absent
//! from a table raise
//! [`OperationNotSupportedForVersion`](crate::error::LockClientError::OperationNotSupportedForVersion)
//! so callers can choose an alternate path (e.g. a full purchase when an old
//! lock has no extend capability).
//!
//! Operation names form a closed enum rather than strings, so a table can
//! only ever be keyed by an operation the services know how to call.

pub mod builtin;

use alloy_primitives::{Address, B256, Bytes, TxHash, U256};
use alloy_provider::DynProvider;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::error::LockClientError;
use crate::version::ContractFamily;

/// The closed vocabulary of dispatchable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    // Membership lock reads.
    Balance,
    HasValidKey,
    ExpirationOf,
    TokenIdOf,
    IsManager,
    IsGranter,
    TotalKeys,
    KeyPrice,
    ExpirationDuration,
    // Membership lock writes.
    Purchase,
    Extend,
    Grant,
    Withdraw,
    // Registry writes.
    CreateLock,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::Balance => "balance",
            OperationKind::HasValidKey => "has-valid-key",
            OperationKind::ExpirationOf => "expiration-of",
            OperationKind::TokenIdOf => "token-id-of",
            OperationKind::IsManager => "is-manager",
            OperationKind::IsGranter => "is-granter",
            OperationKind::TotalKeys => "total-keys",
            OperationKind::KeyPrice => "key-price",
            OperationKind::ExpirationDuration => "expiration-duration",
            OperationKind::Purchase => "purchase",
            OperationKind::Extend => "extend",
            OperationKind::Grant => "grant",
            OperationKind::Withdraw => "withdraw",
            OperationKind::CreateLock => "create-lock",
        };
        write!(f, "{name}")
    }
}

/// Arguments for one dispatched operation.
#[derive(Debug, Clone)]
pub enum OperationArgs {
    /// No arguments beyond the target contract.
    None,
    /// A key owner to query.
    Owner { owner: Address },
    /// An account whose role is checked.
    Account { account: Address },
    Purchase {
        values: Vec<U256>,
        recipients: Vec<Address>,
        referrers: Vec<Address>,
        key_managers: Vec<Address>,
        data: Vec<Bytes>,
        /// Whether the lock is priced in an ERC-20 token. Native-currency
        /// locks carry the price as transaction value instead.
        erc20: bool,
    },
    Extend {
        value: U256,
        token_id: U256,
        referrer: Address,
        data: Bytes,
        erc20: bool,
    },
    Grant {
        recipients: Vec<Address>,
        expirations: Vec<U256>,
        key_managers: Vec<Address>,
    },
    Withdraw {
        token: Address,
        recipient: Address,
        amount: U256,
    },
    CreateLock {
        expiration_duration: U256,
        token: Address,
        key_price: U256,
        max_keys: U256,
        name: String,
        salt: B256,
    },
}

/// Output of one dispatched operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    Uint(U256),
    Bool(bool),
    Address(Address),
    /// A submitted transaction, identified by its hash.
    Submitted(TxHash),
}

impl OperationOutput {
    pub fn expect_uint(self, operation: OperationKind) -> Result<U256, LockClientError> {
        match self {
            OperationOutput::Uint(v) => Ok(v),
            _ => Err(LockClientError::UnexpectedOutput {
                operation,
                expected: "uint",
            }),
        }
    }

    pub fn expect_bool(self, operation: OperationKind) -> Result<bool, LockClientError> {
        match self {
            OperationOutput::Bool(v) => Ok(v),
            _ => Err(LockClientError::UnexpectedOutput {
                operation,
                expected: "bool",
            }),
        }
    }

    pub fn expect_address(self, operation: OperationKind) -> Result<Address, LockClientError> {
        match self {
            OperationOutput::Address(v) => Ok(v),
            _ => Err(LockClientError::UnexpectedOutput {
                operation,
                expected: "address",
            }),
        }
    }

    pub fn expect_submitted(self, operation: OperationKind) -> Result<TxHash, LockClientError> {
        match self {
            OperationOutput::Submitted(v) => Ok(v),
            _ => Err(LockClientError::UnexpectedOutput {
                operation,
                expected: "transaction hash",
            }),
        }
    }
}

/// One dispatched call: the provider to execute against, the target contract,
/// and the operation arguments.
#[derive(Debug, Clone)]
pub struct OperationCall {
    pub provider: DynProvider,
    pub target: Address,
    pub args: OperationArgs,
}

/// A version-specific strategy implementing one operation.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn execute(&self, call: OperationCall) -> Result<OperationOutput, LockClientError>;
}

/// Adapter wrapping a plain async closure as an [`OperationHandler`].
///
/// Lets table authors (and tests) register strategies without a named type
/// per operation.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> OperationHandler for FnHandler<F>
where
    F: Fn(OperationCall) -> Fut + Send + Sync,
    Fut: Future<Output = Result<OperationOutput, LockClientError>> + Send,
{
    async fn execute(&self, call: OperationCall) -> Result<OperationOutput, LockClientError> {
        (self.0)(call).await
    }
}

/// The operation vocabulary of one contract version.
#[derive(Clone, Default)]
pub struct CapabilityTable {
    ops: HashMap<OperationKind, Arc<dyn OperationHandler>>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation strategy (builder-style).
    pub fn with_op(mut self, kind: OperationKind, handler: Arc<dyn OperationHandler>) -> Self {
        self.ops.insert(kind, handler);
        self
    }

    /// Adds an operation strategy from an async closure (builder-style).
    pub fn with_fn<F, Fut>(self, kind: OperationKind, f: F) -> Self
    where
        F: Fn(OperationCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OperationOutput, LockClientError>> + Send + 'static,
    {
        self.with_op(kind, Arc::new(FnHandler(f)))
    }

    /// Whether this version advertises the operation.
    pub fn supports(&self, kind: OperationKind) -> bool {
        self.ops.contains_key(&kind)
    }

    /// The advertised operations, sorted for stable display.
    pub fn operations(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<_> = self.ops.keys().copied().collect();
        kinds.sort();
        kinds
    }

    fn get(&self, kind: OperationKind) -> Option<&Arc<dyn OperationHandler>> {
        self.ops.get(&kind)
    }
}

impl std::fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityTable")
            .field("operations", &self.operations())
            .finish()
    }
}

/// Capability tables keyed by (family, version).
///
/// The tables themselves are external inputs: [`builtin::builtin_registry`]
/// wires the shipped versions, and callers can register replacements or
/// additions for versions this crate does not know about.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    tables: HashMap<(ContractFamily, u64), CapabilityTable>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the table for a (family, version) pair.
    pub fn register(&mut self, family: ContractFamily, version: u64, table: CapabilityTable) {
        self.tables.insert((family, version), table);
    }

    /// The capability table for a (family, version) pair, if registered.
    pub fn lookup(&self, family: ContractFamily, version: u64) -> Option<&CapabilityTable> {
        self.tables.get(&(family, version))
    }

    /// Dispatches one operation to the strategy bound for the resolved
    /// version.
    ///
    /// # Errors
    ///
    /// [`LockClientError::OperationNotSupportedForVersion`] when the version
    /// has no table or its table omits the operation. Not retried; callers
    /// fall back to an alternate operation.
    pub async fn dispatch(
        &self,
        family: ContractFamily,
        version: u64,
        operation: OperationKind,
        call: OperationCall,
    ) -> Result<OperationOutput, LockClientError> {
        let handler = self
            .lookup(family, version)
            .and_then(|table| table.get(operation))
            .ok_or(LockClientError::OperationNotSupportedForVersion {
                family,
                version,
                operation,
            })?;
        tracing::trace!(%family, version, %operation, target = %call.target, "Dispatching operation");
        handler.execute(call).await
    }
}
