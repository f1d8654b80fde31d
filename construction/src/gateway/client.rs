//! Typed wrapper over a [`Gateway`].
//!
//! Injects the `network_identifier` into every body and decodes responses
//! into the structures in [`super::types`]. Field-presence checks are left
//! to the caller, which knows which error kind a missing field maps to.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use super::types::*;
use super::{Endpoint, Gateway, GatewayError};
use crate::error::Result;
use crate::operation::types::{AccountIdentifier, Operation, PublicKey};

pub struct RosettaClient<G> {
    gateway: G,
    network: NetworkIdentifier,
}

impl<G: Gateway> RosettaClient<G> {
    pub fn new(gateway: G, network: impl Into<String>) -> Self {
        Self {
            gateway,
            network: NetworkIdentifier::cardano(network),
        }
    }

    pub fn network(&self) -> &NetworkIdentifier {
        &self.network
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    async fn call<Req, Resp>(&self, endpoint: Endpoint, request: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_value(request).map_err(|e| GatewayError::Malformed {
            endpoint,
            reason: format!("failed to encode request: {e}"),
        })?;
        trace!(%endpoint, "posting");
        let raw = self.gateway.post(endpoint, body).await?;
        let decoded = serde_json::from_value(raw).map_err(|e| GatewayError::Malformed {
            endpoint,
            reason: e.to_string(),
        })?;
        Ok(decoded)
    }

    // -- Construction API ---------------------------------------------------

    pub async fn preprocess(&self, operations: &[Operation], metadata: &Value) -> Result<PreprocessResponse> {
        let req = PreprocessRequest {
            network_identifier: &self.network,
            operations,
            metadata,
        };
        self.call(Endpoint::Preprocess, &req).await
    }

    pub async fn metadata(
        &self,
        options: &Value,
        public_keys: Option<&[PublicKey]>,
    ) -> Result<MetadataResponse> {
        let req = MetadataRequest {
            network_identifier: &self.network,
            options,
            public_keys,
        };
        self.call(Endpoint::Metadata, &req).await
    }

    pub async fn payloads(
        &self,
        operations: &[Operation],
        metadata: &Value,
        public_keys: Option<&[PublicKey]>,
    ) -> Result<PayloadsResponse> {
        let req = PayloadsRequest {
            network_identifier: &self.network,
            operations,
            metadata,
            public_keys,
        };
        self.call(Endpoint::Payloads, &req).await
    }

    pub async fn parse(&self, signed: bool, transaction: &str) -> Result<ParseResponse> {
        let req = ParseRequest {
            network_identifier: &self.network,
            signed,
            transaction,
        };
        self.call(Endpoint::Parse, &req).await
    }

    pub async fn combine(&self, unsigned_transaction: &str, signatures: &[Signature]) -> Result<CombineResponse> {
        let req = CombineRequest {
            network_identifier: &self.network,
            unsigned_transaction,
            signatures,
        };
        self.call(Endpoint::Combine, &req).await
    }

    pub async fn hash(&self, signed_transaction: &str) -> Result<TransactionIdentifierResponse> {
        let req = SignedTransactionRequest {
            network_identifier: &self.network,
            signed_transaction,
        };
        self.call(Endpoint::Hash, &req).await
    }

    pub async fn submit(&self, signed_transaction: &str) -> Result<TransactionIdentifierResponse> {
        let req = SignedTransactionRequest {
            network_identifier: &self.network,
            signed_transaction,
        };
        self.call(Endpoint::Submit, &req).await
    }

    /// Derives an address from a public key. `address_type` is `Base`,
    /// `Enterprise` or `Reward`; base addresses also need a staking key.
    pub async fn derive(
        &self,
        public_key: &PublicKey,
        address_type: Option<&str>,
        staking_credential: Option<&PublicKey>,
    ) -> Result<DeriveResponse> {
        let mut metadata = serde_json::Map::new();
        if let Some(kind) = address_type {
            metadata.insert("address_type".into(), Value::from(kind));
        }
        if let Some(cred) = staking_credential {
            metadata.insert(
                "staking_credential".into(),
                serde_json::to_value(cred).unwrap_or(Value::Null),
            );
        }
        let req = DeriveRequest {
            network_identifier: &self.network,
            public_key,
            metadata: (!metadata.is_empty()).then_some(Value::Object(metadata)),
        };
        self.call(Endpoint::Derive, &req).await
    }

    // -- Data API -----------------------------------------------------------

    pub async fn network_status(&self) -> Result<NetworkStatusResponse> {
        let req = NetworkRequest {
            network_identifier: &self.network,
        };
        self.call(Endpoint::NetworkStatus, &req).await
    }

    pub async fn account_balance(&self, address: &str) -> Result<AccountBalanceResponse> {
        let account = AccountIdentifier::new(address);
        let req = AccountRequest {
            network_identifier: &self.network,
            account_identifier: &account,
            include_mempool: None,
        };
        self.call(Endpoint::AccountBalance, &req).await
    }

    /// Confirmed coins only; mempool outputs are never offered for spending.
    pub async fn account_coins(&self, address: &str) -> Result<AccountCoinsResponse> {
        let account = AccountIdentifier::new(address);
        let req = AccountRequest {
            network_identifier: &self.network,
            account_identifier: &account,
            include_mempool: Some(false),
        };
        self.call(Endpoint::AccountCoins, &req).await
    }

    pub async fn search_transaction(&self, hash: &str) -> Result<SearchTransactionsResponse> {
        let id = TransactionIdentifier { hash: hash.to_string() };
        let req = SearchTransactionsRequest {
            network_identifier: &self.network,
            transaction_identifier: &id,
        };
        self.call(Endpoint::SearchTransactions, &req).await
    }

    pub async fn block(&self, block: &BlockIdentifier) -> Result<BlockResponse> {
        let req = BlockRequest {
            network_identifier: &self.network,
            block_identifier: block,
        };
        self.call(Endpoint::Block, &req).await
    }

    pub async fn block_transaction(&self, block: &BlockIdentifier, hash: &str) -> Result<BlockTransactionResponse> {
        let id = TransactionIdentifier { hash: hash.to_string() };
        let req = BlockTransactionRequest {
            network_identifier: &self.network,
            block_identifier: block,
            transaction_identifier: &id,
        };
        self.call(Endpoint::BlockTransaction, &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records the last body and answers with a fixed value.
    struct Echo {
        answer: Value,
        last: Mutex<Option<(Endpoint, Value)>>,
    }

    #[async_trait]
    impl Gateway for Echo {
        async fn post(&self, endpoint: Endpoint, body: Value) -> std::result::Result<Value, GatewayError> {
            *self.last.lock().unwrap() = Some((endpoint, body));
            Ok(self.answer.clone())
        }
    }

    fn echo(answer: Value) -> RosettaClient<Echo> {
        RosettaClient::new(
            Echo {
                answer,
                last: Mutex::new(None),
            },
            "preview",
        )
    }

    #[tokio::test]
    async fn every_body_carries_network_identifier() {
        let client = echo(json!({"signed_transaction": "beef"}));
        let resp = client.combine("cafe", &[]).await.unwrap();
        assert_eq!(resp.signed_transaction.as_deref(), Some("beef"));

        let (endpoint, body) = client.gateway().last.lock().unwrap().clone().unwrap();
        assert_eq!(endpoint, Endpoint::Combine);
        assert_eq!(body["network_identifier"], json!({"blockchain": "cardano", "network": "preview"}));
        assert_eq!(body["unsigned_transaction"], "cafe");
    }

    #[tokio::test]
    async fn account_coins_excludes_mempool() {
        let client = echo(json!({"block_identifier": {"index": 1, "hash": "h"}, "coins": []}));
        client.account_coins("addr_test1x").await.unwrap();
        let (_, body) = client.gateway().last.lock().unwrap().clone().unwrap();
        assert_eq!(body["include_mempool"], false);
        assert_eq!(body["account_identifier"]["address"], "addr_test1x");
    }

    #[tokio::test]
    async fn derive_sends_address_type_metadata() {
        let client = echo(json!({"account_identifier": {"address": "addr_test1derived"}}));
        let key = PublicKey::edwards25519("11");
        let resp = client.derive(&key, Some("Enterprise"), None).await.unwrap();
        assert_eq!(resp.account_identifier.unwrap().address, "addr_test1derived");
        let (_, body) = client.gateway().last.lock().unwrap().clone().unwrap();
        assert_eq!(body["metadata"]["address_type"], "Enterprise");
    }

    #[tokio::test]
    async fn wrongly_typed_response_is_a_network_error() {
        let client = echo(json!({"signed_transaction": 42}));
        let err = client.combine("cafe", &[]).await.unwrap_err();
        assert!(matches!(err, crate::ConstructionError::Network(_)), "{err}");
    }
}
