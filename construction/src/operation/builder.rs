//! Operation construction.
//!
//! The free functions build one operation at an explicit index and are the
//! primitive layer. [`OperationSetBuilder`] sits on top and owns index
//! assignment, so a set it produces is always numbered `0..n-1` no matter
//! which order the sub-builders were called in.
//!
//! Nothing here performs I/O, and nothing here applies deposits or fees:
//! the value placed on an output is exactly the value the caller asked for.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::types::{
    AccountIdentifier, Amount, CoinChange, Metadata, Operation, OperationSet, OperationType,
    PublicKey,
};
use crate::error::{ConstructionError, Result};

// ---------------------------------------------------------------------------
// Certificate parameters
// ---------------------------------------------------------------------------

/// Kind of DRep a stake credential delegates its vote to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DRepKind {
    KeyHash,
    ScriptHash,
    Abstain,
    NoConfidence,
}

impl DRepKind {
    /// `key_hash` and `script_hash` name a concrete DRep and need an id.
    pub fn requires_id(self) -> bool {
        matches!(self, Self::KeyHash | Self::ScriptHash)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyHash => "key_hash",
            Self::ScriptHash => "script_hash",
            Self::Abstain => "abstain",
            Self::NoConfidence => "no_confidence",
        }
    }
}

impl std::str::FromStr for DRepKind {
    type Err = ConstructionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "key_hash" => Ok(Self::KeyHash),
            "script_hash" => Ok(Self::ScriptHash),
            "abstain" => Ok(Self::Abstain),
            "no_confidence" => Ok(Self::NoConfidence),
            other => Err(ConstructionError::validation(format!(
                "DRep type must be one of key_hash, script_hash, abstain, no_confidence; got '{other}'"
            ))),
        }
    }
}

/// Vote delegation target, serialized as `metadata.drep`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DRep {
    #[serde(rename = "type")]
    pub kind: DRepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl DRep {
    pub fn new(kind: DRepKind, id: Option<String>) -> Self {
        Self { kind, id }
    }

    fn validate(&self) -> Result<()> {
        match (self.kind.requires_id(), self.id.as_deref()) {
            (true, None) | (true, Some("")) => Err(ConstructionError::validation(format!(
                "DRep id is required for DRep type '{}'",
                self.kind.as_str()
            ))),
            (false, Some(_)) => Err(ConstructionError::validation(format!(
                "DRep type '{}' must not carry an id",
                self.kind.as_str()
            ))),
            _ => Ok(()),
        }
    }
}

/// Type-specific fields for [`build_certificate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateExtra {
    /// Target pool for `stakeDelegation`.
    pub pool_key_hash: Option<String>,
    /// Target DRep for `dRepVoteDelegation`.
    pub drep: Option<DRep>,
    /// Retirement epoch for `poolRetirement`.
    pub epoch: Option<u64>,
}

impl CertificateExtra {
    pub fn pool(pool_key_hash: impl Into<String>) -> Self {
        Self {
            pool_key_hash: Some(pool_key_hash.into()),
            ..Self::default()
        }
    }

    pub fn drep(drep: DRep) -> Self {
        Self {
            drep: Some(drep),
            ..Self::default()
        }
    }

    pub fn epoch(epoch: u64) -> Self {
        Self {
            epoch: Some(epoch),
            ..Self::default()
        }
    }
}

/// Vote cast by a pool operator on a governance action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Yes,
    No,
    Abstain,
}

/// Optional anchor explaining a governance vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRationale {
    pub data_hash: String,
    pub url: String,
}

/// Parameters of a `poolGovernanceVote` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceVote {
    pub pool_credential: PublicKey,
    pub governance_action_hash: String,
    pub vote: Vote,
    pub rationale: Option<VoteRationale>,
}

// ---------------------------------------------------------------------------
// Primitive builders
// ---------------------------------------------------------------------------

fn require_positive(what: &str, amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(ConstructionError::validation(format!(
            "{what} amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConstructionError::validation(format!("{what} must not be empty")));
    }
    Ok(())
}

fn credential_metadata(staking_credential_hex: &str) -> Result<Metadata> {
    if hex::decode(staking_credential_hex).is_err() || staking_credential_hex.is_empty() {
        return Err(ConstructionError::validation(format!(
            "staking credential '{staking_credential_hex}' is not valid hex"
        )));
    }
    let mut metadata = Metadata::new();
    metadata.insert(
        "staking_credential".into(),
        json!(PublicKey::edwards25519(staking_credential_hex)),
    );
    Ok(metadata)
}

fn with_account(mut op: Operation, address: &str) -> Operation {
    op.account = Some(AccountIdentifier::new(address));
    op
}

/// Spends `utxo_id`, worth `amount` lovelace, held at `address`.
pub fn build_input(index: u64, address: &str, amount: i64, utxo_id: &str) -> Result<Operation> {
    require_positive("input", amount)?;
    require_non_empty("utxo id", utxo_id)?;
    let mut op = with_account(Operation::new(index, OperationType::Input), address);
    op.amount = Some(Amount::ada(-amount));
    op.coin_change = Some(CoinChange::spent(utxo_id));
    Ok(op)
}

/// Pays `amount` lovelace to `address`.
pub fn build_output(index: u64, address: &str, amount: i64) -> Result<Operation> {
    require_positive("output", amount)?;
    let mut op = with_account(Operation::new(index, OperationType::Output), address);
    op.amount = Some(Amount::ada(amount));
    Ok(op)
}

/// Builds a stake-credential certificate operation.
///
/// `staking_credential_hex` is mandatory for the stake-key kinds and
/// optional for `poolRetirement`, whose account is the pool cold key.
pub fn build_certificate(
    index: u64,
    kind: OperationType,
    address: &str,
    staking_credential_hex: Option<&str>,
    extra: &CertificateExtra,
) -> Result<Operation> {
    require_non_empty("certificate address", address)?;

    let mut metadata = match (staking_credential_hex, &kind) {
        (Some(hex), _) => credential_metadata(hex)?,
        (None, OperationType::PoolRetirement) => Metadata::new(),
        (None, _) => {
            return Err(ConstructionError::validation(format!(
                "{kind} requires a staking credential"
            )))
        }
    };

    match &kind {
        OperationType::StakeKeyRegistration | OperationType::StakeKeyDeregistration => {}
        OperationType::StakeDelegation => {
            let pool = extra
                .pool_key_hash
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| {
                    ConstructionError::validation("pool id is required for stake delegation")
                })?;
            metadata.insert("pool_key_hash".into(), json!(pool));
        }
        OperationType::DRepVoteDelegation => {
            let drep = extra.drep.as_ref().ok_or_else(|| {
                ConstructionError::validation("DRep is required for vote delegation")
            })?;
            drep.validate()?;
            metadata.insert("drep".into(), json!(drep));
        }
        OperationType::PoolRetirement => {
            let epoch = extra.epoch.ok_or_else(|| {
                ConstructionError::validation("epoch is required for pool retirement")
            })?;
            metadata.insert("epoch".into(), json!(epoch));
        }
        other => {
            return Err(ConstructionError::validation(format!(
                "{other} is not a stake certificate"
            )))
        }
    }

    let mut op = with_account(Operation::new(index, kind), address);
    op.metadata = Some(metadata);
    Ok(op)
}

/// Withdraws `amount` lovelace of rewards from `stake_address`.
pub fn build_withdrawal(
    index: u64,
    stake_address: &str,
    amount: i64,
    staking_credential_hex: &str,
) -> Result<Operation> {
    require_positive("withdrawal", amount)?;
    let mut op = with_account(Operation::new(index, OperationType::Withdrawal), stake_address);
    op.amount = Some(Amount::ada(-amount));
    op.metadata = Some(credential_metadata(staking_credential_hex)?);
    Ok(op)
}

/// Registers a pool from structured registration parameters.
pub fn build_pool_registration(index: u64, pool_address: &str, params: Value) -> Result<Operation> {
    require_non_empty("pool address", pool_address)?;
    if !params.is_object() {
        return Err(ConstructionError::validation(
            "pool registration parameters must be a JSON object",
        ));
    }
    let mut metadata = Metadata::new();
    metadata.insert("poolRegistrationParams".into(), params);
    let mut op = with_account(
        Operation::new(index, OperationType::PoolRegistration),
        pool_address,
    );
    op.metadata = Some(metadata);
    Ok(op)
}

/// Registers or updates a pool from a pre-encoded certificate.
pub fn build_pool_registration_with_cert(
    index: u64,
    pool_address: &str,
    certificate_hex: &str,
) -> Result<Operation> {
    require_non_empty("pool address", pool_address)?;
    if certificate_hex.is_empty() || hex::decode(certificate_hex).is_err() {
        return Err(ConstructionError::validation(
            "pool registration certificate must be non-empty hex",
        ));
    }
    let mut metadata = Metadata::new();
    metadata.insert("poolRegistrationCert".into(), json!(certificate_hex));
    let mut op = with_account(
        Operation::new(index, OperationType::PoolRegistrationWithCert),
        pool_address,
    );
    op.metadata = Some(metadata);
    Ok(op)
}

pub fn build_pool_governance_vote(
    index: u64,
    pool_address: &str,
    vote: &GovernanceVote,
) -> Result<Operation> {
    require_non_empty("pool address", pool_address)?;
    require_non_empty("governance action hash", &vote.governance_action_hash)?;
    let mut metadata = Metadata::new();
    metadata.insert(
        "poolGovernanceVoteParams".into(),
        json!({
            "pool_credential": vote.pool_credential,
            "governance_action_hash": vote.governance_action_hash,
            "vote": vote.vote,
        }),
    );
    if let Some(rationale) = &vote.rationale {
        metadata.insert("vote_rationale".into(), json!(rationale));
    }
    let mut op = with_account(
        Operation::new(index, OperationType::PoolGovernanceVote),
        pool_address,
    );
    op.metadata = Some(metadata);
    Ok(op)
}

// ---------------------------------------------------------------------------
// OperationSetBuilder
// ---------------------------------------------------------------------------

/// Fluent assembly of an [`OperationSet`].
///
/// Each call appends one operation at the next free index. The first
/// validation failure is remembered and returned by [`build`](Self::build);
/// later calls become no-ops so the chain never panics mid-way.
///
/// ```
/// use cardano_construction::operation::OperationSetBuilder;
///
/// let ops = OperationSetBuilder::new()
///     .input("addr_test1sender", 5_000_000, "abc#0")
///     .output("addr_test1recipient", 1_000_000)
///     .output("addr_test1sender", 4_000_000)
///     .build()
///     .unwrap();
/// assert_eq!(ops.len(), 3);
/// assert!(ops.is_contiguous());
/// ```
#[derive(Debug, Default)]
pub struct OperationSetBuilder {
    ops: OperationSet,
    error: Option<ConstructionError>,
}

impl OperationSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_index(&self) -> u64 {
        self.ops.len() as u64
    }

    fn append(mut self, built: impl FnOnce(u64) -> Result<Operation>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match built(self.next_index()) {
            Ok(op) => self.ops.push(op),
            Err(err) => self.error = Some(err),
        }
        self
    }

    pub fn input(self, address: &str, amount: i64, utxo_id: &str) -> Self {
        self.append(|i| build_input(i, address, amount, utxo_id))
    }

    pub fn output(self, address: &str, amount: i64) -> Self {
        self.append(|i| build_output(i, address, amount))
    }

    pub fn certificate(
        self,
        kind: OperationType,
        address: &str,
        staking_credential_hex: Option<&str>,
        extra: &CertificateExtra,
    ) -> Self {
        self.append(|i| build_certificate(i, kind, address, staking_credential_hex, extra))
    }

    pub fn stake_registration(self, stake_address: &str, credential_hex: &str) -> Self {
        self.certificate(
            OperationType::StakeKeyRegistration,
            stake_address,
            Some(credential_hex),
            &CertificateExtra::default(),
        )
    }

    pub fn stake_deregistration(self, stake_address: &str, credential_hex: &str) -> Self {
        self.certificate(
            OperationType::StakeKeyDeregistration,
            stake_address,
            Some(credential_hex),
            &CertificateExtra::default(),
        )
    }

    pub fn stake_delegation(self, stake_address: &str, credential_hex: &str, pool: &str) -> Self {
        self.certificate(
            OperationType::StakeDelegation,
            stake_address,
            Some(credential_hex),
            &CertificateExtra::pool(pool),
        )
    }

    pub fn drep_vote_delegation(self, stake_address: &str, credential_hex: &str, drep: DRep) -> Self {
        self.certificate(
            OperationType::DRepVoteDelegation,
            stake_address,
            Some(credential_hex),
            &CertificateExtra::drep(drep),
        )
    }

    pub fn withdrawal(self, stake_address: &str, amount: i64, credential_hex: &str) -> Self {
        self.append(|i| build_withdrawal(i, stake_address, amount, credential_hex))
    }

    pub fn pool_registration(self, pool_address: &str, params: Value) -> Self {
        self.append(|i| build_pool_registration(i, pool_address, params))
    }

    pub fn pool_registration_with_cert(self, pool_address: &str, certificate_hex: &str) -> Self {
        self.append(|i| build_pool_registration_with_cert(i, pool_address, certificate_hex))
    }

    pub fn pool_governance_vote(self, pool_address: &str, vote: &GovernanceVote) -> Self {
        self.append(|i| build_pool_governance_vote(i, pool_address, vote))
    }

    pub fn pool_retirement(self, pool_address: &str, epoch: u64) -> Self {
        self.certificate(
            OperationType::PoolRetirement,
            pool_address,
            None,
            &CertificateExtra::epoch(epoch),
        )
    }

    /// Appends a pre-built operation, overwriting its index.
    pub fn operation(self, op: Operation) -> Self {
        self.append(|_| Ok(op))
    }

    pub fn build(self) -> Result<OperationSet> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.ops),
        }
    }
}
