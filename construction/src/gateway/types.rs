//! Request and response bodies of the Rosetta endpoints.
//!
//! Response fields the pipeline must check for are `Option`s rather than
//! required fields: a missing `options` or `signed_transaction` is a
//! phase-specific error with its own taxonomy, not a decode failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{BLOCKCHAIN, SIGNATURE_TYPE};
use crate::operation::types::{
    AccountIdentifier, Amount, CoinIdentifier, Metadata, Operation, PublicKey,
};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentifier {
    pub blockchain: String,
    pub network: String,
}

impl NetworkIdentifier {
    pub fn cardano(network: impl Into<String>) -> Self {
        Self {
            blockchain: BLOCKCHAIN.to_string(),
            network: network.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIdentifier {
    pub index: u64,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIdentifier {
    pub hash: String,
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Bytes the gateway wants signed, and by whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_identifier: Option<AccountIdentifier>,
    pub hex_bytes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<String>,
}

impl SigningPayload {
    pub fn address(&self) -> Option<&str> {
        self.account_identifier.as_ref().map(|a| a.address.as_str())
    }
}

/// One witness, order-correlated with the payload it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signing_payload: SigningPayload,
    pub public_key: PublicKey,
    pub signature_type: String,
    pub hex_bytes: String,
}

impl Signature {
    pub fn ed25519(payload: SigningPayload, public_key_hex: String, signature_hex: String) -> Self {
        Self {
            signing_payload: payload,
            public_key: PublicKey::edwards25519(public_key_hex),
            signature_type: SIGNATURE_TYPE.to_string(),
            hex_bytes: signature_hex,
        }
    }
}

// ---------------------------------------------------------------------------
// Construction requests
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PreprocessRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub operations: &'a [Operation],
    pub metadata: &'a Value,
}

#[derive(Debug, Serialize)]
pub struct MetadataRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub options: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<&'a [PublicKey]>,
}

#[derive(Debug, Serialize)]
pub struct PayloadsRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub operations: &'a [Operation],
    pub metadata: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<&'a [PublicKey]>,
}

#[derive(Debug, Serialize)]
pub struct ParseRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub signed: bool,
    pub transaction: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CombineRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub unsigned_transaction: &'a str,
    pub signatures: &'a [Signature],
}

/// Body of both `/construction/hash` and `/construction/submit`.
#[derive(Debug, Serialize)]
pub struct SignedTransactionRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub signed_transaction: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DeriveRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub public_key: &'a PublicKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

// ---------------------------------------------------------------------------
// Construction responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreprocessResponse {
    pub options: Option<Value>,
    #[serde(default)]
    pub required_public_keys: Option<Vec<AccountIdentifier>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataResponse {
    pub metadata: Option<Value>,
    #[serde(default)]
    pub suggested_fee: Option<Vec<Amount>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadsResponse {
    pub unsigned_transaction: Option<String>,
    pub payloads: Option<Vec<SigningPayload>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParseResponse {
    #[serde(default)]
    pub operations: Option<Vec<Operation>>,
    #[serde(default)]
    pub account_identifier_signers: Option<Vec<AccountIdentifier>>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CombineResponse {
    pub signed_transaction: Option<String>,
}

/// Identifier as returned by `/construction/hash` and
/// `/construction/submit`. The hash is optional so its absence reaches the
/// phase that asked for it instead of failing the decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReturnedIdentifier {
    #[serde(default)]
    pub hash: Option<String>,
}

/// Answer of both `/construction/hash` and `/construction/submit`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionIdentifierResponse {
    #[serde(default)]
    pub transaction_identifier: Option<ReturnedIdentifier>,
}

impl TransactionIdentifierResponse {
    /// The returned hash, when the gateway sent a non-empty one.
    pub fn into_hash(self) -> Option<String> {
        self.transaction_identifier
            .and_then(|id| id.hash)
            .filter(|hash| !hash.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeriveResponse {
    pub account_identifier: Option<AccountIdentifier>,
}

// ---------------------------------------------------------------------------
// Data API
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AccountRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub account_identifier: &'a AccountIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_mempool: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SearchTransactionsRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub transaction_identifier: &'a TransactionIdentifier,
}

#[derive(Debug, Serialize)]
pub struct BlockRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub block_identifier: &'a BlockIdentifier,
}

#[derive(Debug, Serialize)]
pub struct BlockTransactionRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
    pub block_identifier: &'a BlockIdentifier,
    pub transaction_identifier: &'a TransactionIdentifier,
}

#[derive(Debug, Serialize)]
pub struct NetworkRequest<'a> {
    pub network_identifier: &'a NetworkIdentifier,
}

/// A transaction as the Data API reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_identifier: TransactionIdentifier,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// One `/search/transactions` hit.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockTransaction {
    #[serde(default)]
    pub block_identifier: Option<BlockIdentifier>,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchTransactionsResponse {
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub block_identifier: BlockIdentifier,
    #[serde(default)]
    pub parent_block_identifier: Option<BlockIdentifier>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockResponse {
    pub block: Option<Block>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockTransactionResponse {
    pub transaction: Option<Transaction>,
}

/// An unspent output held by an account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Coin {
    pub coin_identifier: CoinIdentifier,
    pub amount: Amount,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountCoinsResponse {
    pub block_identifier: BlockIdentifier,
    #[serde(default)]
    pub coins: Vec<Coin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalanceResponse {
    pub block_identifier: BlockIdentifier,
    #[serde(default)]
    pub balances: Vec<Amount>,
}

impl AccountBalanceResponse {
    /// The ADA entry, if the account holds any.
    pub fn ada(&self) -> Option<&Amount> {
        self.balances.iter().find(|b| b.currency.is_ada())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkStatusResponse {
    pub current_block_identifier: BlockIdentifier,
    #[serde(default)]
    pub current_block_timestamp: Option<i64>,
    #[serde(default)]
    pub genesis_block_identifier: Option<BlockIdentifier>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signature_serializes_rosetta_shape() {
        let payload = SigningPayload {
            account_identifier: Some(AccountIdentifier::new("addr_test1x")),
            hex_bytes: "00ff".into(),
            signature_type: Some("ed25519".into()),
        };
        let sig = Signature::ed25519(payload, "aa".into(), "bb".into());
        let value = serde_json::to_value(&sig).unwrap();
        assert_eq!(value["public_key"]["curve_type"], "edwards25519");
        assert_eq!(value["signature_type"], "ed25519");
        assert_eq!(value["signing_payload"]["account_identifier"]["address"], "addr_test1x");
    }

    #[test]
    fn missing_response_fields_decode_as_none() {
        let resp: PayloadsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.unsigned_transaction.is_none());
        assert!(resp.payloads.is_none());
        let hash: TransactionIdentifierResponse = serde_json::from_value(json!({})).unwrap();
        assert!(hash.transaction_identifier.is_none());
    }

    #[test]
    fn identifier_without_hash_decodes_as_missing_hash() {
        let empty: TransactionIdentifierResponse =
            serde_json::from_value(json!({ "transaction_identifier": {} })).unwrap();
        assert_eq!(empty.into_hash(), None);
        let blank: TransactionIdentifierResponse =
            serde_json::from_value(json!({ "transaction_identifier": { "hash": "" } })).unwrap();
        assert_eq!(blank.into_hash(), None);
        let full: TransactionIdentifierResponse =
            serde_json::from_value(json!({ "transaction_identifier": { "hash": "ab12" } })).unwrap();
        assert_eq!(full.into_hash().as_deref(), Some("ab12"));
    }

    #[test]
    fn metadata_request_omits_absent_public_keys() {
        let net = NetworkIdentifier::cardano("preprod");
        let options = json!({"relative_ttl": 1000});
        let body = serde_json::to_value(MetadataRequest {
            network_identifier: &net,
            options: &options,
            public_keys: None,
        })
        .unwrap();
        assert!(body.get("public_keys").is_none());
        assert_eq!(body["network_identifier"]["blockchain"], "cardano");
    }

    #[test]
    fn search_hit_without_block_decodes() {
        let resp: SearchTransactionsResponse = serde_json::from_value(json!({
            "transactions": [{
                "transaction": {"transaction_identifier": {"hash": "h"}, "operations": []}
            }],
            "total_count": 1
        }))
        .unwrap();
        assert!(resp.transactions[0].block_identifier.is_none());
    }
}
