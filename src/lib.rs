//! Rust client for versioned on-chain membership lock contracts.
//!
//! This crate mediates between an application and a family of membership
//! contracts deployed across many EVM networks. Two capabilities make it more
//! than a bindings wrapper:
//!
//! - **Version resolution and dispatch**: the deployed contracts evolve over
//!   time with no central version registry beyond best-effort self-reporting.
//!   [`version`] resolves what is actually deployed at an address (memoized,
//!   with a bytecode-hash fallback for pre-versioning deployments) and
//!   [`adapter`] dispatches every high-level operation to the capability
//!   table bound for that version.
//!
//! - **Delegated authorizations**: [`authorization`] produces and verifies
//!   EIP-712 signatures that let a third party execute gated actions (key
//!   transfer, card-funded purchase, token spend) on a user's behalf without
//!   that user broadcasting a transaction. [`card`] bundles a matched pair of
//!   authorizations for the sponsor contract.
//!
//! # Modules
//!
//! - [`adapter`] — Version-keyed capability tables and operation dispatch.
//! - [`authorization`] — EIP-712 domains, message shapes, signing, recovery.
//! - [`bindings`] — Contract bindings for the registry and lock families.
//! - [`card`] — Card purchase orchestration over paired authorizations.
//! - [`config`] — Network-id-keyed configuration with env indirection.
//! - [`deploy`] — Deterministic pre-deployment address derivation (CREATE2
//!   over the minimal-proxy init code).
//! - [`error`] — The [`LockClientError`](error::LockClientError) enum.
//! - [`networks`] — Known networks and canonical registry deployments.
//! - [`provider`] — RPC provider construction, memoized per network.
//! - [`service`] — [`ReadOnlyLockService`](service::ReadOnlyLockService) and
//!   [`TransactionLockService`](service::TransactionLockService) over a
//!   shared [`NetworkContext`](service::NetworkContext).
//! - [`timestamp`] — Unix timestamps for deadlines and expirations.
//! - [`types`] — Network ids and checksummed addresses.
//! - [`version`] — Deployed contract version resolution.
//!
//! # Example
//!
//! ```ignore
//! use memberlock_rs::config::NetworksConfig;
//! use memberlock_rs::service::{NetworkContext, ReadOnlyLockService};
//! use std::sync::Arc;
//!
//! let config = NetworksConfig::load_from_path("networks.json")?;
//! let ctx = Arc::new(NetworkContext::new(config));
//! let reader = ReadOnlyLockService::new(ctx);
//! let balance = reader.key_balance_of(network, lock, owner).await?;
//! ```

pub mod adapter;
pub mod authorization;
pub mod bindings;
pub mod card;
pub mod config;
pub mod deploy;
pub mod error;
pub mod networks;
pub mod provider;
pub mod service;
pub mod timestamp;
pub mod types;
pub mod version;
