//! Error types for the membership lock client.

use alloy_primitives::Address;

use crate::adapter::OperationKind;
use crate::types::NetworkId;
use crate::version::ContractFamily;

/// Errors surfaced by the lock client services.
///
/// Deliberately NOT represented here: optional version-dependent getters that
/// revert on older lock deployments. Those return a sentinel `0` from
/// [`ReadOnlyLockService`](crate::service::ReadOnlyLockService) instead of an
/// error, and downstream callers depend on the sentinel.
#[derive(Debug, thiserror::Error)]
pub enum LockClientError {
    /// No network configuration exists for the requested id. Fatal and
    /// synchronous, never retried.
    #[error("No network configuration for network id {0}")]
    ConfigMissing(NetworkId),

    /// The expected address holds no deployed code. Fatal for the call; the
    /// version resolver does not cache this outcome.
    #[error("No contract deployed at {0}")]
    ContractNotDeployed(Address),

    /// The resolved contract version has no implementation for the requested
    /// operation. Callers are expected to fall back to an alternate supported
    /// operation rather than retry.
    #[error("Operation {operation} is not supported by {family} version {version}")]
    OperationNotSupportedForVersion {
        family: ContractFamily,
        version: u64,
        operation: OperationKind,
    },

    /// Local parameter validation failed before any network access.
    #[error("Missing required parameter `{0}`")]
    MissingParameter(&'static str),

    /// Every known structured-signing method variant was attempted and failed.
    #[error("No structured signing method accepted by the node, tried: {}", attempted.join(", "))]
    SigningMethodUnsupported { attempted: Vec<&'static str> },

    /// An adapter produced an output shape the caller did not expect.
    #[error("Operation {operation} produced an unexpected output, expected {expected}")]
    UnexpectedOutput {
        operation: OperationKind,
        expected: &'static str,
    },

    /// An adapter was dispatched with the wrong argument shape.
    #[error("Operation {operation} dispatched with unexpected arguments, expected {expected}")]
    InvalidArguments {
        operation: OperationKind,
        expected: &'static str,
    },

    /// Invalid or unusable configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing failed in the caller-supplied signer.
    #[error("Signing failed: {0}")]
    Signer(String),

    /// Malformed signature bytes handed to recovery.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error(transparent)]
    Transport(#[from] alloy_transport::TransportError),

    #[error(transparent)]
    Contract(#[from] alloy_contract::Error),

    #[error(transparent)]
    PendingTransaction(#[from] alloy_provider::PendingTransactionError),
}

impl LockClientError {
    /// Whether this error came from the on-chain call itself (a revert or a
    /// transport failure), as opposed to local validation or dispatch. The
    /// read service maps these to the documented sentinel for optional
    /// getters.
    pub fn is_call_failure(&self) -> bool {
        matches!(
            self,
            LockClientError::Transport(_) | LockClientError::Contract(_)
        )
    }
}
