//! Card purchase orchestration.
//!
//! A card-funded purchase needs two authorizations from the same signer: a
//! token spend letting the sponsor contract pull the payment, and a purchase
//! authorization naming the lock the sponsor buys from. The orchestrator
//! produces both and bundles them with an arbitrary call payload. It submits
//! nothing itself; the bundle is handed to whatever submits the sponsor call
//! (typically [`TransactionLockService`](crate::service::TransactionLockService)
//! downstream).

use alloy_primitives::{Address, Bytes, U256};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::authorization::{
    DomainParams, Purchase, PurchaseRequest, SignedAuthorization, TokenSpendRequest,
    TransferWithAuthorization, TypedDataSigner, sign_purchase, sign_token_spend,
};
use crate::config::NetworkConfig;
use crate::error::LockClientError;
use crate::timestamp::UnixTimestamp;

/// EIP-712 domain name of the deployed sponsor contract.
pub const CARD_SPONSOR_DOMAIN_NAME: &str = "CardSponsor";
/// EIP-712 domain version of the deployed sponsor contract.
pub const CARD_SPONSOR_DOMAIN_VERSION: &str = "1";

/// Produces matched (token-spend, purchase) authorization pairs for the
/// sponsor contract of one network.
#[derive(Debug, Clone)]
pub struct CardPurchaseOrchestrator {
    spend_token_domain: DomainParams,
    sponsor_domain: DomainParams,
}

/// Inputs for one card purchase bundle.
#[derive(Debug, Clone)]
pub struct CardPurchaseRequest {
    /// The lock the sponsor purchases from.
    pub lock: Address,
    /// Token amount the sponsor may pull.
    pub value: U256,
    /// Purchase authorization deadline; defaults to the 1-hour window.
    pub expiration: Option<UnixTimestamp>,
    /// Token spend deadline; defaults to the 24-hour window.
    pub valid_before: Option<UnixTimestamp>,
    /// Opaque payload forwarded with the sponsor call.
    pub call_data: Bytes,
}

/// Two signed authorizations plus the call payload, consumed by one sponsor
/// contract call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPurchaseBundle {
    pub token_spend: SignedAuthorization<TransferWithAuthorization>,
    pub purchase: SignedAuthorization<Purchase>,
    pub call_data: Bytes,
}

impl CardPurchaseBundle {
    /// Canonical JSON rendering of the bundle.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Base64 of the JSON rendering, for transport in headers or query
    /// parameters.
    pub fn to_base64(&self) -> Result<String, serde_json::Error> {
        Ok(BASE64.encode(self.to_json()?))
    }
}

impl CardPurchaseOrchestrator {
    /// Builds an orchestrator from explicit domain parameters.
    pub fn new(spend_token_domain: DomainParams, sponsor_domain: DomainParams) -> Self {
        Self {
            spend_token_domain,
            sponsor_domain,
        }
    }

    /// Builds an orchestrator for a configured network. The spend token's
    /// EIP-712 name and version are deployment-specific and supplied by the
    /// caller.
    pub fn for_network(
        config: &NetworkConfig,
        token_name: &str,
        token_version: &str,
    ) -> Result<Self, LockClientError> {
        let sponsor = config.card_sponsor().ok_or_else(|| {
            LockClientError::Config(format!(
                "no card sponsor deployed on network {}",
                config.id()
            ))
        })?;
        let token = config.spend_token().ok_or_else(|| {
            LockClientError::Config(format!("no spend token deployed on network {}", config.id()))
        })?;
        Ok(Self::new(
            DomainParams {
                name: token_name.into(),
                version: token_version.into(),
                network: config.id(),
                verifying_contract: token,
            },
            DomainParams {
                name: CARD_SPONSOR_DOMAIN_NAME.into(),
                version: CARD_SPONSOR_DOMAIN_VERSION.into(),
                network: config.id(),
                verifying_contract: sponsor,
            },
        ))
    }

    /// The sponsor contract consuming the bundles.
    pub fn sponsor_address(&self) -> Address {
        self.sponsor_domain.verifying_contract
    }

    /// Signs both authorizations against the same signer and bundles them.
    pub async fn authorize_purchase<S: TypedDataSigner + ?Sized>(
        &self,
        signer: &S,
        request: CardPurchaseRequest,
    ) -> Result<CardPurchaseBundle, LockClientError> {
        let token_spend = sign_token_spend(
            signer,
            &self.spend_token_domain,
            TokenSpendRequest {
                to: self.sponsor_address(),
                value: request.value,
                valid_after: None,
                valid_before: request.valid_before,
                nonce: None,
            },
        )
        .await?;
        let purchase = sign_purchase(
            signer,
            &self.sponsor_domain,
            PurchaseRequest {
                lock: request.lock,
                sender: None,
                expiration: request.expiration,
            },
        )
        .await?;
        Ok(CardPurchaseBundle {
            token_spend,
            purchase,
            call_data: request.call_data,
        })
    }
}
