use std::collections::BTreeMap;

use tracing::{debug, info, info_span, warn, Instrument};

use super::{ConstructionPipeline, SubmitOptions, SubmitOutcome, TransactionDraft};
use crate::error::{ConstructionError, Result};
use crate::gateway::types::{Signature, SigningPayload};
use crate::gateway::Gateway;
use crate::operation::types::{count_types, Operation, OperationSet};
use crate::signing::PayloadSigner;

/// Maps caller vocabulary to the gateway's operation type names. Names
/// without a mapping are taken as already being gateway names.
pub fn translate_operation_name(name: &str) -> &str {
    match name {
        "registration" => "stakeKeyRegistration",
        "deregistration" => "stakeKeyDeregistration",
        "delegation" => "stakeDelegation",
        "drepVoteDelegation" => "dRepVoteDelegation",
        other => other,
    }
}

fn describe(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(kind, n)| if *n == 1 { kind.clone() } else { format!("{kind} x{n}") })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checks that every type named in `expected` appears among the certificate
/// operations found on chain. Repeated names need only one occurrence;
/// inputs and outputs are ignored.
pub fn check_expected_operations(expected: &[String], onchain: &[Operation]) -> Result<()> {
    let wanted: Vec<String> = expected
        .iter()
        .map(|name| translate_operation_name(name).to_string())
        .collect();
    let mut want_counts: BTreeMap<String, usize> = BTreeMap::new();
    for kind in &wanted {
        *want_counts.entry(kind.clone()).or_default() += 1;
    }

    let certificates: Vec<Operation> = onchain
        .iter()
        .filter(|op| op.kind.is_certificate())
        .cloned()
        .collect();
    let found = count_types(&certificates);

    let covered = want_counts.keys().all(|kind| found.contains_key(kind));
    if covered {
        return Ok(());
    }
    Err(ConstructionError::validation(format!(
        "expected {} certificate operations ({}), found {} ({})",
        wanted.len(),
        describe(&want_counts),
        certificates.len(),
        describe(&found)
    )))
}

impl<G: Gateway> ConstructionPipeline<G> {
    /// Signs, combines, verifies, hashes and submits a transaction, then
    /// optionally waits for it to land in a block.
    pub async fn sign_and_submit<P: PayloadSigner + ?Sized>(
        &self,
        unsigned_transaction: &str,
        payloads: &[SigningPayload],
        signer: &P,
        options: &SubmitOptions,
    ) -> Result<SubmitOutcome> {
        let span = info_span!("sign_and_submit", network = %self.config.network, payloads = payloads.len());
        self.submit_inner(unsigned_transaction, payloads, signer, options, None)
            .instrument(span)
            .await
    }

    /// [`Self::sign_and_submit`] for a draft from
    /// [`Self::build_transaction`]; the signed parse is checked against the
    /// draft's operations.
    pub async fn submit_draft<P: PayloadSigner + ?Sized>(
        &self,
        draft: &TransactionDraft,
        signer: &P,
        options: &SubmitOptions,
    ) -> Result<SubmitOutcome> {
        let span = info_span!("sign_and_submit", network = %self.config.network, payloads = draft.payloads.len());
        self.submit_inner(
            &draft.unsigned_transaction,
            &draft.payloads,
            signer,
            options,
            Some(&draft.operations),
        )
        .instrument(span)
        .await
    }

    async fn submit_inner<P: PayloadSigner + ?Sized>(
        &self,
        unsigned_transaction: &str,
        payloads: &[SigningPayload],
        signer: &P,
        options: &SubmitOptions,
        reference: Option<&OperationSet>,
    ) -> Result<SubmitOutcome> {
        // 1. sign
        let signatures = payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| {
                signer.sign_payload(index, payload).map_err(|e| {
                    ConstructionError::transaction(format!("failed to sign payload {index}: {e}"))
                })
            })
            .collect::<Result<Vec<Signature>>>()?;
        debug!(signatures = signatures.len(), "payloads signed");

        // 2. combine
        let signed_transaction = self
            .client
            .combine(unsigned_transaction, &signatures)
            .await?
            .signed_transaction
            .ok_or_else(|| ConstructionError::transaction("combine returned no signed_transaction"))?;

        // 3. parse verification
        self.verify_transaction(reference, &signed_transaction, true).await?;

        // 4. hash
        let local_hash = self
            .client
            .hash(&signed_transaction)
            .await?
            .into_hash()
            .ok_or_else(|| ConstructionError::transaction("hash returned no transaction_identifier.hash"))?;

        // 5. submit
        let transaction_hash = self
            .client
            .submit(&signed_transaction)
            .await?
            .into_hash()
            .ok_or_else(|| ConstructionError::transaction("submit returned no transaction_identifier.hash"))?;
        if transaction_hash != local_hash {
            warn!(%local_hash, %transaction_hash, "submitted hash differs from computed hash");
        }
        info!(%transaction_hash, "transaction submitted");

        if !options.wait_for_confirmation {
            return Ok(SubmitOutcome {
                transaction_hash,
                confirmed: None,
            });
        }

        // 6. confirmation
        let confirmed = self.wait_for_confirmation(&transaction_hash, options.timeout).await?;
        if let Some(expected) = &options.expected_operations {
            check_expected_operations(expected, &confirmed.transaction.operations)?;
        }
        Ok(SubmitOutcome {
            transaction_hash,
            confirmed: Some(confirmed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationSetBuilder;

    fn onchain() -> Vec<Operation> {
        OperationSetBuilder::new()
            .input("addr_test1me", 5_000_000, "t#0")
            .output("addr_test1me", 2_800_000)
            .stake_registration("stake_test1me", "aa")
            .stake_delegation("stake_test1me", "aa", "pool1abc")
            .build()
            .unwrap()
            .into_inner()
    }

    #[test]
    fn caller_names_translate_to_gateway_names() {
        assert_eq!(translate_operation_name("registration"), "stakeKeyRegistration");
        assert_eq!(translate_operation_name("drepVoteDelegation"), "dRepVoteDelegation");
        assert_eq!(translate_operation_name("poolRetirement"), "poolRetirement");
    }

    #[test]
    fn expected_certificates_are_found() {
        let expected = vec!["registration".to_string(), "delegation".to_string()];
        assert!(check_expected_operations(&expected, &onchain()).is_ok());
    }

    #[test]
    fn repeated_expectation_is_met_by_one_certificate() {
        let expected = vec!["delegation".to_string(), "delegation".to_string()];
        assert!(check_expected_operations(&expected, &onchain()).is_ok());
    }

    #[test]
    fn absent_certificate_lists_expected_and_found() {
        let expected = vec!["registration".to_string(), "deregistration".to_string()];
        let err = check_expected_operations(&expected, &onchain()).unwrap_err();
        assert!(matches!(err, ConstructionError::Validation(_)));
        let msg = err.to_string();
        assert!(msg.contains("expected 2 certificate operations"), "{msg}");
        assert!(msg.contains("stakeKeyDeregistration"), "{msg}");
        assert!(msg.contains("found 2"), "{msg}");
    }

    #[test]
    fn inputs_and_outputs_never_satisfy_expectations() {
        let expected = vec!["input".to_string()];
        assert!(check_expected_operations(&expected, &onchain()).is_err());
    }
}
