//! Ready-made operation sets for common transaction intents.
//!
//! Every intent spends the supplied coins from the payment address, emits
//! one change output back to it, and appends its certificate operations
//! last. The change value already reflects the deposit or refund the
//! certificates imply; the network fee is left for the pipeline's
//! fee-adjustment phase to subtract.

use serde_json::Value;

use super::builder::{DRep, GovernanceVote, OperationSetBuilder};
use super::types::OperationSet;
use crate::config::{POOL_DEPOSIT, STAKE_KEY_DEPOSIT};
use crate::error::{ConstructionError, Result};
use crate::utxo::Utxo;

/// A stake address together with the public key that controls it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeAccount {
    pub address: String,
    pub credential_hex: String,
}

impl StakeAccount {
    pub fn new(address: impl Into<String>, credential_hex: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            credential_hex: credential_hex.into(),
        }
    }
}

fn total_of(utxos: &[Utxo]) -> Result<i64> {
    if utxos.is_empty() {
        return Err(ConstructionError::validation("at least one UTXO is required"));
    }
    Ok(utxos.iter().map(|u| u.lovelace).sum())
}

fn spend_all(payment_address: &str, utxos: &[Utxo]) -> OperationSetBuilder {
    utxos.iter().fold(OperationSetBuilder::new(), |builder, utxo| {
        builder.input(payment_address, utxo.lovelace, &utxo.id)
    })
}

/// Inputs, one change output worth `total + delta`, then `certificates`.
fn with_change(
    payment_address: &str,
    utxos: &[Utxo],
    delta: i64,
    certificates: impl FnOnce(OperationSetBuilder) -> OperationSetBuilder,
) -> Result<OperationSet> {
    let total = total_of(utxos)?;
    let change = total + delta;
    if change <= 0 {
        return Err(ConstructionError::validation(format!(
            "inputs total {total} lovelace cannot cover a {} lovelace deposit",
            -delta
        )));
    }
    certificates(spend_all(payment_address, utxos).output(payment_address, change)).build()
}

/// Pays `amount` to `recipient` and returns the rest to `sender`.
pub fn transfer(sender: &str, recipient: &str, utxos: &[Utxo], amount: i64) -> Result<OperationSet> {
    let total = total_of(utxos)?;
    if total <= amount {
        return Err(ConstructionError::validation(format!(
            "insufficient inputs: {total} <= {amount}"
        )));
    }
    spend_all(sender, utxos)
        .output(recipient, amount)
        .output(sender, total - amount)
        .build()
}

pub fn stake_registration(
    payment_address: &str,
    stake: &StakeAccount,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, -STAKE_KEY_DEPOSIT, |b| {
        b.stake_registration(&stake.address, &stake.credential_hex)
    })
}

pub fn stake_deregistration(
    payment_address: &str,
    stake: &StakeAccount,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, STAKE_KEY_DEPOSIT, |b| {
        b.stake_deregistration(&stake.address, &stake.credential_hex)
    })
}

pub fn stake_delegation(
    payment_address: &str,
    stake: &StakeAccount,
    pool_key_hash: &str,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, 0, |b| {
        b.stake_delegation(&stake.address, &stake.credential_hex, pool_key_hash)
    })
}

/// Registration and delegation in one transaction.
pub fn registration_and_delegation(
    payment_address: &str,
    stake: &StakeAccount,
    pool_key_hash: &str,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, -STAKE_KEY_DEPOSIT, |b| {
        b.stake_registration(&stake.address, &stake.credential_hex)
            .stake_delegation(&stake.address, &stake.credential_hex, pool_key_hash)
    })
}

pub fn drep_vote_delegation(
    payment_address: &str,
    stake: &StakeAccount,
    drep: DRep,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, 0, |b| {
        b.drep_vote_delegation(&stake.address, &stake.credential_hex, drep)
    })
}

/// Moves `amount` of accumulated rewards into the change output.
pub fn reward_withdrawal(
    payment_address: &str,
    stake: &StakeAccount,
    amount: i64,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, amount, |b| {
        b.withdrawal(&stake.address, amount, &stake.credential_hex)
    })
}

pub fn pool_registration(
    payment_address: &str,
    pool_address: &str,
    params: Value,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, -POOL_DEPOSIT, |b| {
        b.pool_registration(pool_address, params)
    })
}

/// Re-registers an existing pool from an encoded certificate. No deposit.
pub fn pool_certificate_update(
    payment_address: &str,
    pool_address: &str,
    certificate_hex: &str,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, 0, |b| {
        b.pool_registration_with_cert(pool_address, certificate_hex)
    })
}

pub fn pool_governance_vote(
    payment_address: &str,
    pool_address: &str,
    vote: &GovernanceVote,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, 0, |b| {
        b.pool_governance_vote(pool_address, vote)
    })
}

/// The deposit comes back later through the reward account, not here.
pub fn pool_retirement(
    payment_address: &str,
    pool_address: &str,
    epoch: u64,
    utxos: &[Utxo],
) -> Result<OperationSet> {
    with_change(payment_address, utxos, 0, |b| b.pool_retirement(pool_address, epoch))
}
