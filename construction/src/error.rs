//! Error taxonomy for the construction pipeline.
//!
//! Four kinds, each with a different recovery story for the caller:
//! validation faults are the caller's to fix, network faults may be retried
//! by rebuilding from fresh UTXO state, transaction faults are structural
//! problems in the combine/hash/submit exchange, and a timeout means the
//! transaction may still land and can be re-polled by hash.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors surfaced by every public operation of this crate.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// Malformed caller input, a gateway 4xx, an uncoverable fee or an
    /// on-chain operation mismatch.
    #[error("validation error: {0}")]
    Validation(String),

    /// Gateway 5xx, transport failure or an undecodable response.
    #[error("network error: {0}")]
    Network(String),

    /// A signing, combine, hash or submit step produced no usable result.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Confirmation polling exhausted its budget.
    #[error("transaction {hash} not confirmed within {elapsed_secs} seconds")]
    Timeout {
        /// Hash that was being polled for.
        hash: String,
        /// Seconds spent polling before giving up.
        elapsed_secs: u64,
    },
}

impl ConstructionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// True for errors a caller may reasonably retry by rebuilding.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
    }
}

impl From<GatewayError> for ConstructionError {
    fn from(err: GatewayError) -> Self {
        if err.is_client_fault() {
            Self::Validation(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ConstructionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Endpoint;

    #[test]
    fn client_faults_become_validation_errors() {
        let err: ConstructionError = GatewayError::Rejected {
            endpoint: Endpoint::Preprocess,
            status: 400,
            code: Some(4019),
            message: "invalid operations".into(),
        }
        .into();
        assert!(matches!(err, ConstructionError::Validation(_)));
        assert!(err.to_string().contains("invalid operations"));
    }

    #[test]
    fn server_and_transport_faults_become_network_errors() {
        let server: ConstructionError = GatewayError::Failed {
            endpoint: Endpoint::Submit,
            status: 503,
            code: None,
            message: "node syncing".into(),
        }
        .into();
        let transport: ConstructionError = GatewayError::Transport {
            endpoint: Endpoint::Hash,
            reason: "connection refused".into(),
        }
        .into();
        assert!(matches!(server, ConstructionError::Network(_)));
        assert!(matches!(transport, ConstructionError::Network(_)));
        assert!(server.is_retryable());
    }

    #[test]
    fn timeout_message_names_hash_and_elapsed() {
        let err = ConstructionError::Timeout {
            hash: "abcd".into(),
            elapsed_secs: 180,
        };
        assert_eq!(
            err.to_string(),
            "transaction abcd not confirmed within 180 seconds"
        );
        assert!(!ConstructionError::validation("x").is_retryable());
    }
}
