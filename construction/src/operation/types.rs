//! Rosetta operation wire types.
//!
//! These mirror the JSON the gateway speaks one-to-one. Amount values stay
//! decimal strings on the wire; [`Amount::lovelace`] and
//! [`Operation::value`] are the only places they become integers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::config::{ADA_DECIMALS, ADA_SYMBOL, CURVE_TYPE};
use crate::error::{ConstructionError, Result};
use crate::signing::KeyRole;

/// Free-form JSON object attached to operations and responses.
pub type Metadata = Map<String, Value>;

// ---------------------------------------------------------------------------
// OperationType
// ---------------------------------------------------------------------------

/// Discriminant carried in an operation's `type` field.
///
/// Unknown strings round-trip through [`OperationType::Other`] so a gateway
/// that reports newer operation kinds does not break response parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationType {
    Input,
    Output,
    StakeKeyRegistration,
    StakeKeyDeregistration,
    StakeDelegation,
    DRepVoteDelegation,
    Withdrawal,
    PoolRegistration,
    PoolRegistrationWithCert,
    PoolRetirement,
    PoolGovernanceVote,
    Other(String),
}

impl OperationType {
    /// Wire name, exactly as the gateway expects it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::StakeKeyRegistration => "stakeKeyRegistration",
            Self::StakeKeyDeregistration => "stakeKeyDeregistration",
            Self::StakeDelegation => "stakeDelegation",
            Self::DRepVoteDelegation => "dRepVoteDelegation",
            Self::Withdrawal => "withdrawal",
            Self::PoolRegistration => "poolRegistration",
            Self::PoolRegistrationWithCert => "poolRegistrationWithCert",
            Self::PoolRetirement => "poolRetirement",
            Self::PoolGovernanceVote => "poolGovernanceVote",
            Self::Other(name) => name,
        }
    }

    /// Anything that is neither an input nor an output.
    pub fn is_certificate(&self) -> bool {
        !matches!(self, Self::Input | Self::Output)
    }

    /// Key roles whose witnesses a transaction carrying this operation needs.
    pub fn required_signers(&self) -> &'static [KeyRole] {
        use KeyRole::*;
        match self {
            Self::Input => &[Payment],
            Self::Output | Self::Other(_) => &[],
            Self::StakeKeyRegistration
            | Self::StakeKeyDeregistration
            | Self::StakeDelegation
            | Self::DRepVoteDelegation
            | Self::Withdrawal => &[Payment, Stake],
            Self::PoolRegistration => &[Payment, Stake, PoolCold],
            Self::PoolRegistrationWithCert | Self::PoolRetirement | Self::PoolGovernanceVote => {
                &[Payment, PoolCold]
            }
        }
    }
}

impl From<&str> for OperationType {
    fn from(s: &str) -> Self {
        match s {
            "input" => Self::Input,
            "output" => Self::Output,
            "stakeKeyRegistration" => Self::StakeKeyRegistration,
            "stakeKeyDeregistration" => Self::StakeKeyDeregistration,
            "stakeDelegation" => Self::StakeDelegation,
            "dRepVoteDelegation" => Self::DRepVoteDelegation,
            "withdrawal" => Self::Withdrawal,
            "poolRegistration" => Self::PoolRegistration,
            "poolRegistrationWithCert" => Self::PoolRegistrationWithCert,
            "poolRetirement" => Self::PoolRetirement,
            "poolGovernanceVote" => Self::PoolGovernanceVote,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OperationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Identifiers & Amounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationIdentifier {
    pub index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentifier {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AccountIdentifier {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Currency {
    pub fn ada() -> Self {
        Self {
            symbol: ADA_SYMBOL.to_string(),
            decimals: ADA_DECIMALS,
            metadata: None,
        }
    }

    pub fn is_ada(&self) -> bool {
        self.symbol == ADA_SYMBOL
    }
}

/// A signed decimal quantity of some currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Amount {
    /// An ADA amount of `lovelace`, sign preserved.
    pub fn ada(lovelace: i64) -> Self {
        Self {
            value: lovelace.to_string(),
            currency: Currency::ada(),
            metadata: None,
        }
    }

    /// Parses the decimal value. Anything that is not a plain integer is a
    /// validation error; lovelace has no fractional part.
    pub fn lovelace(&self) -> Result<i64> {
        self.value.parse::<i64>().map_err(|_| {
            ConstructionError::validation(format!(
                "amount value '{}' is not an integer lovelace quantity",
                self.value
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinIdentifier {
    pub identifier: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinAction {
    CoinSpent,
    CoinCreated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinChange {
    pub coin_identifier: CoinIdentifier,
    pub coin_action: CoinAction,
}

impl CoinChange {
    pub fn spent(utxo_id: impl Into<String>) -> Self {
        Self {
            coin_identifier: CoinIdentifier {
                identifier: utxo_id.into(),
            },
            coin_action: CoinAction::CoinSpent,
        }
    }
}

/// An ed25519 public key as the gateway represents it. Also used for
/// staking and pool credentials inside operation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub hex_bytes: String,
    pub curve_type: String,
}

impl PublicKey {
    pub fn edwards25519(hex_bytes: impl Into<String>) -> Self {
        Self {
            hex_bytes: hex_bytes.into(),
            curve_type: CURVE_TYPE.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// One atomic intent inside a transaction: spend a coin, create an output,
/// attach a certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(rename = "type")]
    pub kind: OperationType,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_change: Option<CoinChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Operation {
    /// A bare operation of `kind` at `index`; builders fill in the rest.
    pub fn new(index: u64, kind: OperationType) -> Self {
        Self {
            operation_identifier: OperationIdentifier { index },
            kind,
            status: String::new(),
            account: None,
            amount: None,
            coin_change: None,
            metadata: None,
        }
    }

    pub fn index(&self) -> u64 {
        self.operation_identifier.index
    }

    pub fn address(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.address.as_str())
    }

    /// Signed lovelace value, `None` when the operation carries no amount.
    pub fn value(&self) -> Result<Option<i64>> {
        self.amount.as_ref().map(Amount::lovelace).transpose()
    }

    /// Overwrites the amount value, keeping the currency.
    pub fn set_value(&mut self, lovelace: i64) {
        match self.amount.as_mut() {
            Some(amount) => amount.value = lovelace.to_string(),
            None => self.amount = Some(Amount::ada(lovelace)),
        }
    }

    pub fn metadata_field(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

// ---------------------------------------------------------------------------
// OperationSet
// ---------------------------------------------------------------------------

/// Ordered operations of one transaction.
///
/// Indices are expected to be `0..n-1` in array order. The builder
/// guarantees it; [`OperationSet::reindex`] restores it for hand-assembled
/// lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationSet(Vec<Operation>);

impl OperationSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Operation] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Operation> {
        self.0
    }

    pub(crate) fn get_mut(&mut self, position: usize) -> Option<&mut Operation> {
        self.0.get_mut(position)
    }

    /// Appends `op`, stamping it with the next index.
    pub fn push(&mut self, mut op: Operation) {
        op.operation_identifier.index = self.0.len() as u64;
        self.0.push(op);
    }

    /// Rewrites every index to its array position.
    pub fn reindex(&mut self) {
        for (position, op) in self.0.iter_mut().enumerate() {
            op.operation_identifier.index = position as u64;
        }
    }

    /// True when indices are exactly `0..n-1` in order.
    pub fn is_contiguous(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(position, op)| op.index() == position as u64)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Operation> {
        self.0.iter().filter(|op| op.kind == OperationType::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Operation> {
        self.0.iter().filter(|op| op.kind == OperationType::Output)
    }

    pub fn certificates(&self) -> impl Iterator<Item = &Operation> {
        self.0.iter().filter(|op| op.kind.is_certificate())
    }

    /// Multiset of operation types, keyed by wire name.
    pub fn type_counts(&self) -> BTreeMap<String, usize> {
        count_types(&self.0)
    }
}

impl From<Vec<Operation>> for OperationSet {
    fn from(ops: Vec<Operation>) -> Self {
        Self(ops)
    }
}

impl<'a> IntoIterator for &'a OperationSet {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Counts operations per wire type name.
pub fn count_types(ops: &[Operation]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for op in ops {
        *counts.entry(op.kind.as_str().to_string()).or_insert(0) += 1;
    }
    counts
}
