//! HTTP implementation of [`Gateway`] on top of `reqwest`.
//!
//! One JSON `POST` per call, no retries. Each call gets its own request id,
//! carried in the tracing span and the `X-Request-Id` header, so concurrent
//! pipelines sharing a gateway never interleave their log context.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, Instrument};
use uuid::Uuid;

use super::{Endpoint, Gateway, GatewayError};
use crate::config::DEFAULT_REQUEST_TIMEOUT;

/// Rosetta error envelope returned with non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<ErrorDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetails {
    #[serde(default)]
    message: Option<String>,
}

impl ErrorEnvelope {
    /// Prefers the detailed message, then the summary, then the raw body.
    fn describe(self, raw: &str) -> (Option<i64>, String) {
        let detail = self.details.and_then(|d| d.message);
        let message = match (self.message, detail) {
            (Some(m), Some(d)) => format!("{m}: {d}"),
            (Some(m), None) => m,
            (None, Some(d)) => d,
            (None, None) => raw.trim().to_string(),
        };
        (self.code, message)
    }
}

/// Talks to a gateway at `base_url` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    /// Gateway with the default per-request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport {
                endpoint: Endpoint::NetworkStatus,
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn send(&self, endpoint: Endpoint, body: Value, request_id: &str) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .header("X-Request-Id", request_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport {
                endpoint,
                reason: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| GatewayError::Transport {
            endpoint,
            reason: format!("failed to read response body: {e}"),
        })?;
        debug!(status = status.as_u16(), bytes = text.len(), "gateway responded");

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| GatewayError::Malformed {
                endpoint,
                reason: e.to_string(),
            });
        }

        let envelope: ErrorEnvelope = serde_json::from_str(&text).unwrap_or_default();
        let (code, message) = envelope.describe(&text);
        if status.is_client_error() {
            Err(GatewayError::Rejected {
                endpoint,
                status: status.as_u16(),
                code,
                message,
            })
        } else {
            Err(GatewayError::Failed {
                endpoint,
                status: status.as_u16(),
                code,
                message,
            })
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn post(&self, endpoint: Endpoint, body: Value) -> Result<Value, GatewayError> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::debug_span!("gateway", %endpoint, %request_id);
        self.send(endpoint, body, &request_id).instrument(span).await
    }
}
