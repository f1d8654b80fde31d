//! # Rosetta Gateway
//!
//! The remote Construction/Data API is reached through exactly one
//! capability: `post(endpoint, payload) -> response-or-error`. Everything
//! above this seam (the typed [`RosettaClient`], the pipeline, the watcher)
//! is transport-agnostic, which is what lets the tests script a gateway in
//! memory.
//!
//! ```text
//!   ConstructionPipeline ──► RosettaClient ──► dyn Gateway::post
//!                                                 │
//!                                    ┌────────────┴────────────┐
//!                                    ▼                         ▼
//!                               HttpGateway              scripted test gateway
//! ```

pub mod client;
pub mod http;
pub mod types;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use client::RosettaClient;
pub use http::HttpGateway;

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Every gateway route the pipeline calls. All are JSON `POST`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    NetworkStatus,
    AccountBalance,
    AccountCoins,
    Block,
    BlockTransaction,
    SearchTransactions,
    Derive,
    Preprocess,
    Metadata,
    Payloads,
    Parse,
    Combine,
    Hash,
    Submit,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::NetworkStatus => "/network/status",
            Self::AccountBalance => "/account/balance",
            Self::AccountCoins => "/account/coins",
            Self::Block => "/block",
            Self::BlockTransaction => "/block/transaction",
            Self::SearchTransactions => "/search/transactions",
            Self::Derive => "/construction/derive",
            Self::Preprocess => "/construction/preprocess",
            Self::Metadata => "/construction/metadata",
            Self::Payloads => "/construction/payloads",
            Self::Parse => "/construction/parse",
            Self::Combine => "/construction/combine",
            Self::Hash => "/construction/hash",
            Self::Submit => "/construction/submit",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

/// Failure of a single gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway answered 4xx: the request itself was wrong.
    #[error("{endpoint} rejected the request (HTTP {status}): {message}")]
    Rejected {
        endpoint: Endpoint,
        status: u16,
        /// Rosetta error code from the envelope, when present.
        code: Option<i64>,
        message: String,
    },

    /// The gateway answered 5xx or anything else that is not success.
    #[error("{endpoint} failed (HTTP {status}): {message}")]
    Failed {
        endpoint: Endpoint,
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// No HTTP answer at all: connect failure, timeout, reset.
    #[error("transport failure calling {endpoint}: {reason}")]
    Transport { endpoint: Endpoint, reason: String },

    /// A 2xx answer whose body is not the JSON we expected.
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: Endpoint, reason: String },
}

impl GatewayError {
    /// 4xx class: the caller must change the request before retrying.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Rejected { endpoint, .. }
            | Self::Failed { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::Malformed { endpoint, .. } => *endpoint,
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Stateless request/response boundary to a Rosetta gateway.
///
/// Implementations must not retry: a retry policy belongs to whoever calls
/// the pipeline, since a rebuilt transaction needs fresh UTXO state.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Value, GatewayError>;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Value, GatewayError> {
        (**self).post(endpoint, body).await
    }
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Box<G> {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Value, GatewayError> {
        (**self).post(endpoint, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_endpoints_share_prefix() {
        for endpoint in [
            Endpoint::Derive,
            Endpoint::Preprocess,
            Endpoint::Metadata,
            Endpoint::Payloads,
            Endpoint::Parse,
            Endpoint::Combine,
            Endpoint::Hash,
            Endpoint::Submit,
        ] {
            assert!(endpoint.path().starts_with("/construction/"), "{endpoint}");
        }
        assert_eq!(Endpoint::BlockTransaction.to_string(), "/block/transaction");
    }

    #[test]
    fn only_rejections_are_client_faults() {
        let rejected = GatewayError::Rejected {
            endpoint: Endpoint::Payloads,
            status: 422,
            code: None,
            message: "bad".into(),
        };
        let malformed = GatewayError::Malformed {
            endpoint: Endpoint::Payloads,
            reason: "eof".into(),
        };
        assert!(rejected.is_client_fault());
        assert!(!malformed.is_client_fault());
        assert_eq!(malformed.endpoint(), Endpoint::Payloads);
    }
}
