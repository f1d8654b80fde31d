//! # Protocol Constants & Pipeline Configuration
//!
//! Every lovelace amount and wire literal the pipeline depends on lives
//! here. Deposit and refund bookkeeping in particular must never be
//! re-literaled at a call site: the builders, the fee accounting and the
//! tests all read the same constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// The `blockchain` half of every `network_identifier`.
pub const BLOCKCHAIN: &str = "cardano";

/// Network used when nothing else is configured.
pub const DEFAULT_NETWORK: &str = "preprod";

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Symbol the gateway uses for the native currency. Suggested fees are
/// looked up by this symbol.
pub const ADA_SYMBOL: &str = "ADA";

/// 1 ADA = 10^6 lovelace.
pub const ADA_DECIMALS: u32 = 6;

/// Lovelace per ADA. Used only for human-readable log output.
pub const LOVELACE_PER_ADA: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Deposits & Floors
// ---------------------------------------------------------------------------

/// Deposit locked by a stake-key registration and returned on deregistration.
pub const STAKE_KEY_DEPOSIT: i64 = 2_000_000;

/// Deposit locked by a fresh stake-pool registration.
pub const POOL_DEPOSIT: i64 = 500_000_000;

/// No sender-owned output may be pushed below this value when the fee is
/// spread across several outputs.
pub const MIN_OUTPUT_LOVELACE: i64 = 1_000_000;

// ---------------------------------------------------------------------------
// Cryptographic Wire Literals
// ---------------------------------------------------------------------------

/// `curve_type` attached to every public key and staking credential.
pub const CURVE_TYPE: &str = "edwards25519";

/// `signature_type` attached to every signature.
pub const SIGNATURE_TYPE: &str = "ed25519";

/// Ed25519 secret key seed length in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Fixed delay between confirmation polls. No backoff.
pub const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Wall-clock budget for a confirmation wait when the caller gives none.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Per-request timeout of the HTTP gateway.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Parse Verification
// ---------------------------------------------------------------------------

/// What the pipeline does when a parse-verify phase finds a discrepancy
/// between the operations it sent and the operations the gateway parsed
/// back out of the transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseVerification {
    /// Log every issue as a warning and keep going. Tolerates gateways that
    /// normalise operations in harmless ways.
    #[default]
    Lenient,
    /// Any issue aborts the pipeline with a validation error.
    Strict,
}

impl std::fmt::Display for ParseVerification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lenient => write!(f, "lenient"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Settings shared by every phase of a [`crate::ConstructionPipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Cardano network name sent in `network_identifier.network`.
    pub network: String,
    /// Strictness of both parse-verify phases.
    pub parse_verification: ParseVerification,
    /// Delay between confirmation polls.
    pub poll_interval: Duration,
    /// Confirmation budget used when [`crate::SubmitOptions`] gives none.
    pub confirmation_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            network: DEFAULT_NETWORK.to_string(),
            parse_verification: ParseVerification::default(),
            poll_interval: CONFIRMATION_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// Default settings for the named network.
    pub fn for_network(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            ..Self::default()
        }
    }

    pub fn with_parse_verification(mut self, mode: ParseVerification) -> Self {
        self.parse_verification = mode;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }
}
