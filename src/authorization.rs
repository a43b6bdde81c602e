//! Delegated authorization codec: EIP-712 domains, messages, signing, and
//! signer recovery.
//!
//! A delegated authorization lets a third party execute a gated on-chain
//! action on a user's behalf without the user broadcasting a transaction.
//! Three message shapes are supported:
//!
//! - [`Purchase`] — authorize a card-funded key purchase on a lock.
//! - [`Transfer`] — authorize moving a key to a new owner.
//! - [`TransferWithAuthorization`] — authorize a token spend (the ERC-3009
//!   shape understood by the spend token).
//!
//! The codec does not enforce expiration itself; the on-chain verifier is
//! authoritative. It does guarantee every emitted authorization carries an
//! explicit deadline, applying the default windows below when the caller
//! omits one.

use alloy_primitives::{Address, B256, Bytes, Signature, U256};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain, sol};
use async_trait::async_trait;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::LockClientError;
use crate::timestamp::UnixTimestamp;
use crate::types::NetworkId;

/// Default validity window for purchase authorizations: 1 hour.
pub const PURCHASE_AUTHORIZATION_WINDOW_SECS: u64 = 60 * 60;
/// Default validity window for token-spend authorizations: 24 hours.
pub const TOKEN_SPEND_AUTHORIZATION_WINDOW_SECS: u64 = 24 * 60 * 60;
/// Token spends become valid slightly in the past to absorb clock skew
/// between the signer and the verifying node.
const TOKEN_SPEND_VALID_AFTER_SKEW_SECS: u64 = 10 * 60;

/// The one network whose deployed verifying contract encodes the chain in the
/// EIP-712 `salt` field instead of `chainId`. Signatures for this network
/// MUST be produced against the salted domain or on-chain verification fails.
pub const SALTED_DOMAIN_NETWORK: NetworkId = NetworkId::new(137);

sol! {
    /// Authorization for a card-funded key purchase, verified by the sponsor
    /// contract.
    #[derive(Debug, Serialize, Deserialize)]
    struct Purchase {
        address lock;
        address sender;
        uint256 expiration;
    }

    /// Authorization to move a key out of its owner's wallet.
    #[derive(Debug, Serialize, Deserialize)]
    struct Transfer {
        address lock;
        uint256 token;
        address owner;
        uint256 deadline;
    }

    /// ERC-3009 token-spend authorization. Field-for-field the shape the
    /// spend token's `transferWithAuthorization` expects, so the resulting
    /// signature settles unmodified.
    #[derive(Debug, Serialize, Deserialize)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

/// Parameters identifying one signing domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainParams {
    pub name: String,
    pub version: String,
    pub network: NetworkId,
    pub verifying_contract: Address,
}

/// Builds the EIP-712 domain for a set of [`DomainParams`].
///
/// For [`SALTED_DOMAIN_NETWORK`] the chain id field is omitted and the salt
/// field carries the 32-byte zero-padded big-endian encoding of the network
/// id; every other network uses the numeric chain id and no salt.
pub fn signing_domain(params: &DomainParams) -> Eip712Domain {
    if params.network == SALTED_DOMAIN_NETWORK {
        let salt = B256::from(U256::from(params.network.inner()));
        Eip712Domain::new(
            Some(params.name.clone().into()),
            Some(params.version.clone().into()),
            None,
            Some(params.verifying_contract),
            Some(salt),
        )
    } else {
        eip712_domain! {
            name: params.name.clone(),
            version: params.version.clone(),
            chain_id: params.network.inner(),
            verifying_contract: params.verifying_contract,
        }
    }
}

/// A trait that abstracts signing operations, allowing both owned signers and
/// `Arc`-wrapped signers.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// The address of the signer.
    fn address(&self) -> Address;

    /// Signs the given 32-byte digest.
    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error>;
}

#[async_trait]
impl TypedDataSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        PrivateKeySigner::address(self)
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_hash(self, hash).await
    }
}

#[async_trait]
impl<T: TypedDataSigner + Send + Sync> TypedDataSigner for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_hash(hash).await
    }
}

/// A typed message paired with its domain parameters and signature bytes.
///
/// Ephemeral: constructed per request and handed to the caller; nothing is
/// persisted here. Serialization of the tuple is caller-defined — the serde
/// impls give one canonical JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: serde::de::DeserializeOwned"))]
pub struct SignedAuthorization<T: SolStruct> {
    pub message: T,
    pub domain: DomainParams,
    pub signature: Bytes,
}

impl<T: SolStruct> SignedAuthorization<T> {
    /// Recovers the signer address from the message, domain, and signature.
    pub fn recover(&self) -> Result<Address, LockClientError> {
        recover_signer(&self.domain, &self.message, &self.signature)
    }
}

/// Signs an arbitrary typed struct under a domain. The building block behind
/// the three shape-specific entry points.
pub async fn sign_message<T, S>(
    signer: &S,
    domain_params: &DomainParams,
    message: T,
) -> Result<SignedAuthorization<T>, LockClientError>
where
    T: SolStruct,
    S: TypedDataSigner + ?Sized,
{
    let domain = signing_domain(domain_params);
    let hash = message.eip712_signing_hash(&domain);
    let signature = signer
        .sign_hash(&hash)
        .await
        .map_err(|e| LockClientError::Signer(format!("{e:?}")))?;
    Ok(SignedAuthorization {
        message,
        domain: domain_params.clone(),
        signature: signature.as_bytes().into(),
    })
}

/// Recovers the address that signed `message` under `domain_params`.
///
/// Exists so callers can pre-validate an authorization before spending gas on
/// a transaction that would revert. A signature over different content
/// recovers to a different (not necessarily meaningful) address; compare
/// against the expected signer.
pub fn recover_signer<T: SolStruct>(
    domain_params: &DomainParams,
    message: &T,
    signature: &Bytes,
) -> Result<Address, LockClientError> {
    let domain = signing_domain(domain_params);
    let hash = message.eip712_signing_hash(&domain);
    let signature = Signature::from_raw(signature)
        .map_err(|e| LockClientError::InvalidSignature(e.to_string()))?;
    signature
        .recover_address_from_prehash(&hash)
        .map_err(|e| LockClientError::InvalidSignature(e.to_string()))
}

/// Request body for a purchase authorization.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub lock: Address,
    /// Defaults to the signer's address.
    pub sender: Option<Address>,
    /// Defaults to now + [`PURCHASE_AUTHORIZATION_WINDOW_SECS`].
    pub expiration: Option<UnixTimestamp>,
}

/// Signs a purchase authorization.
pub async fn sign_purchase<S: TypedDataSigner + ?Sized>(
    signer: &S,
    domain_params: &DomainParams,
    request: PurchaseRequest,
) -> Result<SignedAuthorization<Purchase>, LockClientError> {
    let expiration = request
        .expiration
        .unwrap_or_else(|| UnixTimestamp::now() + PURCHASE_AUTHORIZATION_WINDOW_SECS);
    let message = Purchase {
        lock: request.lock,
        sender: request.sender.unwrap_or_else(|| signer.address()),
        expiration: U256::from(expiration.as_secs()),
    };
    sign_message(signer, domain_params, message).await
}

/// Request body for a key transfer authorization. The deadline is explicit:
/// transfers have no default window.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub lock: Address,
    pub token: U256,
    /// Defaults to the signer's address.
    pub owner: Option<Address>,
    pub deadline: UnixTimestamp,
}

/// Signs a key transfer authorization.
pub async fn sign_transfer<S: TypedDataSigner + ?Sized>(
    signer: &S,
    domain_params: &DomainParams,
    request: TransferRequest,
) -> Result<SignedAuthorization<Transfer>, LockClientError> {
    let message = Transfer {
        lock: request.lock,
        token: request.token,
        owner: request.owner.unwrap_or_else(|| signer.address()),
        deadline: U256::from(request.deadline.as_secs()),
    };
    sign_message(signer, domain_params, message).await
}

/// Request body for a token-spend authorization.
#[derive(Debug, Clone)]
pub struct TokenSpendRequest {
    pub to: Address,
    pub value: U256,
    /// Defaults to now minus a small skew allowance, so the spend is
    /// immediately valid.
    pub valid_after: Option<UnixTimestamp>,
    /// Defaults to now + [`TOKEN_SPEND_AUTHORIZATION_WINDOW_SECS`].
    pub valid_before: Option<UnixTimestamp>,
    /// Defaults to a random 32-byte nonce.
    pub nonce: Option<B256>,
}

/// Signs a token-spend (transfer-with-authorization) message.
pub async fn sign_token_spend<S: TypedDataSigner + ?Sized>(
    signer: &S,
    domain_params: &DomainParams,
    request: TokenSpendRequest,
) -> Result<SignedAuthorization<TransferWithAuthorization>, LockClientError> {
    let now = UnixTimestamp::now();
    let valid_after = request
        .valid_after
        .unwrap_or_else(|| now.saturating_sub(TOKEN_SPEND_VALID_AFTER_SKEW_SECS));
    let valid_before = request
        .valid_before
        .unwrap_or(now + TOKEN_SPEND_AUTHORIZATION_WINDOW_SECS);
    let nonce = request.nonce.unwrap_or_else(|| B256::from(rng().random::<[u8; 32]>()));
    let message = TransferWithAuthorization {
        from: signer.address(),
        to: request.to,
        value: request.value,
        validAfter: U256::from(valid_after.as_secs()),
        validBefore: U256::from(valid_before.as_secs()),
        nonce,
    };
    sign_message(signer, domain_params, message).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn domain(network: u64) -> DomainParams {
        DomainParams {
            name: "CardSponsor".into(),
            version: "1".into(),
            network: NetworkId::new(network),
            verifying_contract: address!("0x00000000000000000000000000000000000000c5"),
        }
    }

    const LOCK: Address = address!("0x00000000000000000000000000000000000000a1");

    #[tokio::test]
    async fn purchase_round_trip_recovers_signer() {
        let signer = PrivateKeySigner::random();
        let auth = sign_purchase(
            &signer,
            &domain(1),
            PurchaseRequest {
                lock: LOCK,
                sender: None,
                expiration: Some(UnixTimestamp::from_secs(1_900_000_000)),
            },
        )
        .await
        .unwrap();

        assert_eq!(auth.message.sender, signer.address());
        assert_eq!(auth.recover().unwrap(), signer.address());
    }

    #[tokio::test]
    async fn mutated_message_field_breaks_recovery() {
        let signer = PrivateKeySigner::random();
        let auth = sign_purchase(
            &signer,
            &domain(1),
            PurchaseRequest {
                lock: LOCK,
                sender: None,
                expiration: Some(UnixTimestamp::from_secs(1_900_000_000)),
            },
        )
        .await
        .unwrap();

        let mut tampered = auth.message.clone();
        tampered.expiration = U256::from(1_900_000_001u64);
        let recovered = recover_signer(&auth.domain, &tampered, &auth.signature).unwrap();
        assert_ne!(recovered, signer.address());
    }

    #[tokio::test]
    async fn mutated_domain_chain_breaks_recovery() {
        let signer = PrivateKeySigner::random();
        let auth = sign_purchase(
            &signer,
            &domain(1),
            PurchaseRequest {
                lock: LOCK,
                sender: None,
                expiration: Some(UnixTimestamp::from_secs(1_900_000_000)),
            },
        )
        .await
        .unwrap();

        let recovered = recover_signer(&domain(10), &auth.message, &auth.signature).unwrap();
        assert_ne!(recovered, signer.address());
    }

    #[tokio::test]
    async fn transfer_round_trip_recovers_signer() {
        let signer = PrivateKeySigner::random();
        let auth = sign_transfer(
            &signer,
            &domain(100),
            TransferRequest {
                lock: LOCK,
                token: U256::from(7),
                owner: None,
                deadline: UnixTimestamp::from_secs(1_900_000_000),
            },
        )
        .await
        .unwrap();
        assert_eq!(auth.message.owner, signer.address());
        assert_eq!(auth.recover().unwrap(), signer.address());
    }

    #[test]
    fn salted_network_omits_chain_id() {
        let salted = signing_domain(&domain(137));
        assert!(salted.chain_id.is_none());
        let expected_salt = B256::from(U256::from(137u64));
        assert_eq!(salted.salt, Some(expected_salt));
        // Zero-padded big-endian: every byte but the last two is zero.
        assert!(expected_salt[..30].iter().all(|b| *b == 0));
        assert_eq!(expected_salt[31], 137);

        let plain = signing_domain(&domain(1));
        assert_eq!(plain.chain_id, Some(U256::from(1u64)));
        assert!(plain.salt.is_none());
    }

    #[tokio::test]
    async fn salted_and_plain_domains_sign_differently() {
        let signer = PrivateKeySigner::random();
        let message = Purchase {
            lock: LOCK,
            sender: signer.address(),
            expiration: U256::from(1_900_000_000u64),
        };
        let on_polygon = sign_message(&signer, &domain(137), message.clone())
            .await
            .unwrap();
        let on_mainnet = sign_message(&signer, &domain(1), message).await.unwrap();
        assert_ne!(on_polygon.signature, on_mainnet.signature);
        assert_eq!(on_polygon.recover().unwrap(), signer.address());
    }

    #[tokio::test]
    async fn purchase_default_window_is_one_hour() {
        let signer = PrivateKeySigner::random();
        let before = UnixTimestamp::now();
        let auth = sign_purchase(
            &signer,
            &domain(1),
            PurchaseRequest {
                lock: LOCK,
                sender: None,
                expiration: None,
            },
        )
        .await
        .unwrap();
        let after = UnixTimestamp::now();

        let expiration = auth.message.expiration.to::<u64>();
        assert!(expiration >= before.as_secs() + PURCHASE_AUTHORIZATION_WINDOW_SECS);
        assert!(expiration <= after.as_secs() + PURCHASE_AUTHORIZATION_WINDOW_SECS);
    }

    #[tokio::test]
    async fn token_spend_defaults_and_nonce() {
        let signer = PrivateKeySigner::random();
        let to = address!("0x00000000000000000000000000000000000000b2");
        let before = UnixTimestamp::now();
        let request = TokenSpendRequest {
            to,
            value: U256::from(5_000_000u64),
            valid_after: None,
            valid_before: None,
            nonce: None,
        };
        let first = sign_token_spend(&signer, &domain(1), request.clone())
            .await
            .unwrap();
        let second = sign_token_spend(&signer, &domain(1), request).await.unwrap();

        let valid_before = first.message.validBefore.to::<u64>();
        assert!(valid_before >= before.as_secs() + TOKEN_SPEND_AUTHORIZATION_WINDOW_SECS);
        assert!(first.message.validAfter.to::<u64>() <= before.as_secs() + 1);
        assert_eq!(first.message.from, signer.address());
        // Fresh nonce per authorization.
        assert_ne!(first.message.nonce, second.message.nonce);
        assert_eq!(first.recover().unwrap(), signer.address());
    }
}
