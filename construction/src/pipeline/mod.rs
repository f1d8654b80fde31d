//! # Construction Pipeline
//!
//! Drives the Rosetta Construction API through its phases. Two entry points
//! split the flow where the signer takes over:
//!
//! ```text
//!   build_transaction                         sign_and_submit
//!   ─────────────────                         ───────────────
//!   1. /construction/preprocess  → options    1. sign every payload
//!   2. /construction/metadata    → fee        2. /construction/combine
//!   3. fee adjustment (local)                 3. /construction/parse (signed)
//!   4. /construction/payloads    → payloads   4. /construction/hash
//!   5. /construction/parse       (unsigned)   5. /construction/submit
//!                                             6. confirmation (optional)
//! ```
//!
//! Phases run strictly in order on the caller's task; a failing phase
//! aborts everything after it. The two parse phases are governed by
//! [`ParseVerification`]: lenient mode logs and continues, strict mode
//! fails.

mod build;
pub mod fee;
mod submit;
pub mod verify;

use std::time::Duration;

use serde_json::Value;

use crate::config::{ParseVerification, PipelineConfig};
use crate::confirmation::{ConfirmationWatcher, ConfirmedTransaction};
use crate::error::Result;
use crate::gateway::types::SigningPayload;
use crate::gateway::{Gateway, RosettaClient};
use crate::operation::types::{OperationSet, PublicKey};

pub use submit::{check_expected_operations, translate_operation_name};

// ---------------------------------------------------------------------------
// Inputs & outputs
// ---------------------------------------------------------------------------

/// Options for [`ConstructionPipeline::build_transaction`].
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Forwarded to `/construction/metadata` and `/construction/payloads`.
    pub public_keys: Option<Vec<PublicKey>>,
    /// Forwarded as `metadata` to `/construction/preprocess`.
    pub preprocess_metadata: Option<Value>,
    /// The operations already pay their own fee: skip the suggested fee and
    /// the adjustment phase, and report the fee the operations imply.
    pub fixed_fee: bool,
}

impl BuildOptions {
    pub fn with_public_keys(mut self, keys: Vec<PublicKey>) -> Self {
        self.public_keys = Some(keys);
        self
    }

    pub fn with_preprocess_metadata(mut self, metadata: Value) -> Self {
        self.preprocess_metadata = Some(metadata);
        self
    }

    pub fn with_fixed_fee(mut self) -> Self {
        self.fixed_fee = true;
        self
    }
}

/// Result of [`ConstructionPipeline::build_transaction`]. Immutable once
/// returned; [`ConstructionPipeline::submit_draft`] consumes it by reference.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    /// Operations as sent to `/construction/payloads`, fee already applied.
    pub operations: OperationSet,
    pub unsigned_transaction: String,
    pub payloads: Vec<SigningPayload>,
    pub metadata: Value,
    /// Lovelace fee, when one was suggested or implied.
    pub fee: Option<i64>,
}

/// Options for [`ConstructionPipeline::sign_and_submit`].
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub wait_for_confirmation: bool,
    /// Confirmation budget. `None` uses [`PipelineConfig::confirmation_timeout`].
    pub timeout: Option<Duration>,
    /// Certificate operations the confirmed transaction must carry, in
    /// caller vocabulary (`registration`, `delegation`, ...).
    pub expected_operations: Option<Vec<String>>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            wait_for_confirmation: true,
            timeout: None,
            expected_operations: None,
        }
    }
}

impl SubmitOptions {
    pub fn no_wait() -> Self {
        Self {
            wait_for_confirmation: false,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn expecting<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_operations = Some(operations.into_iter().map(Into::into).collect());
        self
    }
}

/// Result of [`ConstructionPipeline::sign_and_submit`].
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// Hash reported by `/construction/submit`.
    pub transaction_hash: String,
    /// On-chain detail, when confirmation was awaited.
    pub confirmed: Option<ConfirmedTransaction>,
}

// ---------------------------------------------------------------------------
// ConstructionPipeline
// ---------------------------------------------------------------------------

/// The orchestrator. Holds no state between invocations besides its
/// configuration, so one pipeline can serve any number of sequential calls.
pub struct ConstructionPipeline<G> {
    client: RosettaClient<G>,
    config: PipelineConfig,
}

impl<G: Gateway> ConstructionPipeline<G> {
    pub fn new(gateway: G, config: PipelineConfig) -> Self {
        let client = RosettaClient::new(gateway, config.network.clone());
        Self { client, config }
    }

    pub fn client(&self) -> &RosettaClient<G> {
        &self.client
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn parse_verification(&self) -> ParseVerification {
        self.config.parse_verification
    }

    /// Polls until `hash` is in a block, or `timeout` (default from config)
    /// elapses.
    pub async fn wait_for_confirmation(
        &self,
        hash: &str,
        timeout: Option<Duration>,
    ) -> Result<ConfirmedTransaction> {
        let mut watcher = ConfirmationWatcher::new(&self.client, self.config.poll_interval);
        watcher
            .wait_for_confirmation(hash, timeout.unwrap_or(self.config.confirmation_timeout))
            .await
    }
}
