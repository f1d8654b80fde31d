//! Shared fixtures for the integration tests: a scripted in-memory gateway
//! and canned Rosetta responses.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use cardano_construction::gateway::{Endpoint, Gateway, GatewayError};

pub const SENDER: &str = "addr_test1qsender";
pub const STAKE: &str = "stake_test1usender";
pub const CREDENTIAL: &str = "1fd5bab167e2e5e4a3d1c2b0a9f8e7d6c5b4a39281706f5e4d3c2b1a09f8e7d6";
pub const TX_HASH: &str = "5f1e8c1a7b9d6c4e2f0a8b7c6d5e4f3a2b1c0d9e8f7a6b5c4d3e2f1a0b9c8d7e";

type Reply = Result<Value, GatewayError>;

/// Answers each endpoint from a queue of scripted replies, falling back to a
/// sticky default once the queue is drained. Every request is recorded.
#[derive(Default)]
pub struct ScriptedGateway {
    queued: Mutex<HashMap<Endpoint, VecDeque<Reply>>>,
    sticky: Mutex<HashMap<Endpoint, Value>>,
    calls: Mutex<Vec<(Endpoint, Value)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one reply for `endpoint`.
    pub fn reply(self, endpoint: Endpoint, body: Value) -> Self {
        self.queued.lock().entry(endpoint).or_default().push_back(Ok(body));
        self
    }

    /// Queues one failure for `endpoint`.
    pub fn fail(self, endpoint: Endpoint, err: GatewayError) -> Self {
        self.queued.lock().entry(endpoint).or_default().push_back(Err(err));
        self
    }

    /// Reply used whenever the queue for `endpoint` is empty.
    pub fn always(self, endpoint: Endpoint, body: Value) -> Self {
        self.sticky.lock().insert(endpoint, body);
        self
    }

    pub fn calls(&self) -> Vec<(Endpoint, Value)> {
        self.calls.lock().clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.calls.lock().iter().filter(|(e, _)| *e == endpoint).count()
    }

    pub fn bodies(&self, endpoint: Endpoint) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Value, GatewayError> {
        self.calls.lock().push((endpoint, body));
        if let Some(reply) = self.queued.lock().get_mut(&endpoint).and_then(VecDeque::pop_front) {
            return reply;
        }
        if let Some(body) = self.sticky.lock().get(&endpoint) {
            return Ok(body.clone());
        }
        Err(GatewayError::Failed {
            endpoint,
            status: 500,
            code: None,
            message: "no scripted reply".into(),
        })
    }
}

pub fn server_error(endpoint: Endpoint) -> GatewayError {
    GatewayError::Failed {
        endpoint,
        status: 503,
        code: None,
        message: "node unavailable".into(),
    }
}

// ---------------------------------------------------------------------------
// Canned responses
// ---------------------------------------------------------------------------

pub fn ada(value: i64) -> Value {
    json!({ "value": value.to_string(), "currency": { "symbol": "ADA", "decimals": 6 } })
}

pub fn preprocess() -> Value {
    json!({ "options": { "relative_ttl": 1000, "transaction_size": 300 } })
}

pub fn metadata(fee: i64) -> Value {
    json!({ "metadata": { "ttl": "65294", "protocol_parameters": {} }, "suggested_fee": [ada(fee)] })
}

pub fn payloads(addresses: &[&str]) -> Value {
    let payloads: Vec<Value> = addresses
        .iter()
        .map(|a| {
            json!({
                "account_identifier": { "address": a },
                "hex_bytes": "a1b2c3d4e5f6",
                "signature_type": "ed25519"
            })
        })
        .collect();
    json!({ "unsigned_transaction": "84a400unsigned", "payloads": payloads })
}

/// A parse reply echoing `operations` with the given signers.
pub fn parsed(operations: &Value, signers: &[&str]) -> Value {
    let signers: Vec<Value> = signers.iter().map(|s| json!({ "address": s })).collect();
    json!({ "operations": operations, "account_identifier_signers": signers })
}

pub fn combined() -> Value {
    json!({ "signed_transaction": "84a400signed" })
}

pub fn tx_id(hash: &str) -> Value {
    json!({ "transaction_identifier": { "hash": hash } })
}

pub fn block_id(index: u64) -> Value {
    json!({ "index": index, "hash": format!("blockhash{index}") })
}

pub fn search_hit(hash: &str, index: u64) -> Value {
    json!({
        "transactions": [{
            "block_identifier": block_id(index),
            "transaction": { "transaction_identifier": { "hash": hash }, "operations": [] }
        }],
        "total_count": 1
    })
}

pub fn search_miss() -> Value {
    json!({ "transactions": [], "total_count": 0 })
}

pub fn block(index: u64) -> Value {
    json!({ "block": { "block_identifier": block_id(index), "transactions": [] } })
}

pub fn block_transaction(hash: &str, operations: &Value) -> Value {
    json!({ "transaction": { "transaction_identifier": { "hash": hash }, "operations": operations } })
}
