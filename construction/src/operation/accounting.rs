//! Lovelace bookkeeping over an operation list.
//!
//! A balanced Cardano transaction satisfies
//!
//! ```text
//!   inputs + withdrawals + refunds = outputs + deposits + fee
//! ```
//!
//! [`Balance::implied_fee`] solves that for the fee. Deposits and refunds
//! are derived from the certificate operations present, using the
//! constants in [`crate::config`].

use super::types::{Operation, OperationType};
use crate::config::{POOL_DEPOSIT, STAKE_KEY_DEPOSIT};
use crate::error::{ConstructionError, Result};

/// Deposit locked by one operation of `kind`.
///
/// `poolRegistrationWithCert` is treated as a certificate update and carries
/// no deposit; a first-time registration goes through `poolRegistration`.
pub fn deposit_for(kind: &OperationType) -> i64 {
    match kind {
        OperationType::StakeKeyRegistration => STAKE_KEY_DEPOSIT,
        OperationType::PoolRegistration => POOL_DEPOSIT,
        _ => 0,
    }
}

/// Deposit returned to the transaction by one operation of `kind`.
pub fn refund_for(kind: &OperationType) -> i64 {
    match kind {
        OperationType::StakeKeyDeregistration => STAKE_KEY_DEPOSIT,
        _ => 0,
    }
}

fn overflow(what: &str) -> ConstructionError {
    ConstructionError::validation(format!("lovelace {what} overflows"))
}

fn add(total: i64, value: i64, what: &str) -> Result<i64> {
    total.checked_add(value).ok_or_else(|| overflow(what))
}

/// Per-category lovelace totals. Every field is non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    pub inputs: i64,
    pub outputs: i64,
    pub withdrawals: i64,
    pub deposits: i64,
    pub refunds: i64,
}

impl Balance {
    pub fn of(ops: &[Operation]) -> Result<Self> {
        let mut balance = Self::default();
        for op in ops {
            let value = op.value()?.unwrap_or(0);
            let magnitude = value.checked_abs().ok_or_else(|| overflow("amount"))?;
            match op.kind {
                OperationType::Input => balance.inputs = add(balance.inputs, magnitude, "input total")?,
                OperationType::Output => balance.outputs = add(balance.outputs, value, "output total")?,
                OperationType::Withdrawal => {
                    balance.withdrawals = add(balance.withdrawals, magnitude, "withdrawal total")?
                }
                _ => {}
            }
            balance.deposits = add(balance.deposits, deposit_for(&op.kind), "deposit total")?;
            balance.refunds = add(balance.refunds, refund_for(&op.kind), "refund total")?;
        }
        // available() and committed() are plain sums from here on
        add(add(balance.inputs, balance.withdrawals, "available value")?, balance.refunds, "available value")?;
        add(balance.outputs, balance.deposits, "committed value")?;
        Ok(balance)
    }

    /// Value entering the transaction.
    pub fn available(&self) -> i64 {
        self.inputs + self.withdrawals + self.refunds
    }

    /// Value leaving it other than through the fee.
    pub fn committed(&self) -> i64 {
        self.outputs + self.deposits
    }

    /// Deposits minus refunds; negative when the certificates release value.
    pub fn deposit_delta(&self) -> i64 {
        self.deposits - self.refunds
    }

    pub fn implied_fee(&self) -> i64 {
        self.available() - self.committed()
    }
}
