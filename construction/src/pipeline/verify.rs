//! Parse verification.
//!
//! After `/construction/payloads` and again after `/construction/combine`,
//! the pipeline asks the gateway to parse what it built and compares the
//! result with the operations it meant to build. The comparison is a
//! multiset check on operation types plus per-type field checks; values are
//! not compared since the gateway may normalise them.

use std::collections::BTreeMap;

use tracing::warn;

use crate::config::ParseVerification;
use crate::error::{ConstructionError, Result};
use crate::gateway::types::ParseResponse;
use crate::operation::types::{count_types, Operation, OperationType};

/// Findings of one parse verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Mismatches that fail the phase in strict mode.
    pub issues: Vec<String>,
    /// Oddities that are only ever logged.
    pub warnings: Vec<String>,
    /// Addresses reported in `account_identifier_signers`.
    pub signers: Vec<String>,
    pub parsed_counts: BTreeMap<String, usize>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Logs the findings and, in strict mode, turns issues into an error.
    pub fn enforce(self, phase: &str, mode: ParseVerification) -> Result<Self> {
        for warning in &self.warnings {
            warn!(phase, "{warning}");
        }
        if self.issues.is_empty() {
            return Ok(self);
        }
        match mode {
            ParseVerification::Strict => Err(ConstructionError::validation(format!(
                "{phase} parse verification failed: {}",
                self.issues.join("; ")
            ))),
            ParseVerification::Lenient => {
                for issue in &self.issues {
                    warn!(phase, "{issue}");
                }
                warn!(phase, issues = self.issues.len(), "continuing despite parse verification issues");
                Ok(self)
            }
        }
    }
}

/// Compares a parse response against the operations that were sent.
///
/// `expected` may be `None` when the caller no longer has the original
/// operations; only the structural checks run then.
pub fn verify_parsed(expected: Option<&[Operation]>, parsed: &ParseResponse, signed: bool) -> ParseReport {
    let mut report = ParseReport::default();

    let operations = parsed.operations.as_deref().unwrap_or_default();
    if operations.is_empty() {
        report.issues.push("no operations in parsed transaction".into());
        return report;
    }
    report.parsed_counts = count_types(operations);

    if let Some(expected) = expected {
        for (kind, want) in count_types(expected) {
            let got = report.parsed_counts.get(&kind).copied().unwrap_or(0);
            if got < want {
                report.issues.push(format!(
                    "operation type '{kind}' count mismatch: expected at least {want}, got {got}"
                ));
            }
        }
    }

    for op in operations {
        check_fields(op, &mut report);
    }

    report.signers = parsed
        .account_identifier_signers
        .iter()
        .flatten()
        .map(|a| a.address.clone())
        .collect();
    if signed && report.signers.is_empty() {
        report.warnings.push("no signers found in signed transaction".into());
    }

    report
}

fn check_fields(op: &Operation, report: &mut ParseReport) {
    let index = op.index();
    match op.kind {
        OperationType::Input | OperationType::Output => {
            if op.amount.is_none() {
                report.issues.push(format!("{} operation {index} is missing amount", op.kind));
            }
            if op.account.is_none() {
                report.issues.push(format!("{} operation {index} is missing account", op.kind));
            }
        }
        OperationType::StakeKeyRegistration
        | OperationType::StakeKeyDeregistration
        | OperationType::StakeDelegation => {
            if op.metadata.is_none() {
                report.issues.push(format!("{} operation {index} is missing metadata", op.kind));
            } else if op.kind == OperationType::StakeDelegation && op.metadata_field("pool_key_hash").is_none() {
                report
                    .warnings
                    .push(format!("stakeDelegation operation {index} has no pool_key_hash"));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::types::AccountIdentifier;
    use crate::operation::OperationSetBuilder;

    fn registration_ops() -> Vec<Operation> {
        OperationSetBuilder::new()
            .input("addr_test1me", 5_000_000, "t#0")
            .output("addr_test1me", 2_820_000)
            .stake_registration("stake_test1me", "aa")
            .build()
            .unwrap()
            .into_inner()
    }

    fn parsed(ops: Vec<Operation>, signers: &[&str]) -> ParseResponse {
        ParseResponse {
            operations: Some(ops),
            account_identifier_signers: Some(signers.iter().map(|s| AccountIdentifier::new(*s)).collect()),
            metadata: None,
        }
    }

    #[test]
    fn identical_operations_are_clean() {
        let ops = registration_ops();
        let report = verify_parsed(Some(&ops), &parsed(ops.clone(), &["addr_test1me"]), true);
        assert!(report.is_clean(), "{:?}", report.issues);
        assert!(report.warnings.is_empty());
        assert_eq!(report.signers, vec!["addr_test1me".to_string()]);
    }

    #[test]
    fn missing_certificate_is_a_count_mismatch() {
        let ops = registration_ops();
        let report = verify_parsed(Some(&ops), &parsed(ops[..2].to_vec(), &[]), false);
        assert_eq!(
            report.issues,
            vec!["operation type 'stakeKeyRegistration' count mismatch: expected at least 1, got 0".to_string()]
        );
    }

    #[test]
    fn extra_parsed_operations_are_tolerated() {
        let ops = registration_ops();
        let mut more = ops.clone();
        more.push(more[1].clone());
        assert!(verify_parsed(Some(&ops), &parsed(more, &[]), false).is_clean());
    }

    #[test]
    fn empty_parse_is_an_issue() {
        let report = verify_parsed(None, &ParseResponse::default(), false);
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn output_without_amount_is_flagged() {
        let mut ops = registration_ops();
        ops[1].amount = None;
        let report = verify_parsed(None, &parsed(ops, &[]), false);
        assert!(report.issues[0].contains("missing amount"));
    }

    #[test]
    fn signed_parse_without_signers_warns() {
        let ops = registration_ops();
        let report = verify_parsed(Some(&ops), &parsed(ops.clone(), &[]), true);
        assert!(report.is_clean());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn strict_mode_fails_lenient_mode_continues() {
        let report = verify_parsed(None, &ParseResponse::default(), false);
        assert!(report.clone().enforce("unsigned", ParseVerification::Lenient).is_ok());
        let err = report.enforce("unsigned", ParseVerification::Strict).unwrap_err();
        assert!(matches!(err, ConstructionError::Validation(_)));
        assert!(err.to_string().contains("unsigned parse verification failed"));
    }
}
