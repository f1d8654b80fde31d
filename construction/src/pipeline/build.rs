use serde_json::json;
use tracing::{debug, info, info_span, warn, Instrument};

use super::fee::adjust_for_fee;
use super::verify::{verify_parsed, ParseReport};
use super::{BuildOptions, ConstructionPipeline, TransactionDraft};
use crate::error::{ConstructionError, Result};
use crate::gateway::Gateway;
use crate::operation::accounting::Balance;
use crate::operation::types::{Amount, OperationSet};

/// First ADA entry of a `suggested_fee` list, in lovelace.
fn suggested_ada_fee(suggested: Option<&[Amount]>) -> Result<Option<i64>> {
    let Some(amount) = suggested.and_then(|fees| fees.iter().find(|a| a.currency.is_ada())) else {
        return Ok(None);
    };
    let fee = amount.lovelace()?;
    if fee < 0 {
        return Err(ConstructionError::validation(format!(
            "gateway suggested a negative fee ({fee})"
        )));
    }
    Ok(Some(fee))
}

impl<G: Gateway> ConstructionPipeline<G> {
    /// Runs preprocess → metadata → fee adjustment → payloads → parse.
    ///
    /// The returned draft carries the fee-adjusted operations; `operations`
    /// itself is left untouched.
    pub async fn build_transaction(
        &self,
        operations: &OperationSet,
        options: &BuildOptions,
    ) -> Result<TransactionDraft> {
        let span = info_span!("build_transaction", network = %self.config.network, ops = operations.len());
        self.build_inner(operations, options).instrument(span).await
    }

    async fn build_inner(&self, operations: &OperationSet, options: &BuildOptions) -> Result<TransactionDraft> {
        if operations.is_empty() {
            return Err(ConstructionError::validation("cannot build a transaction without operations"));
        }
        if !operations.is_contiguous() {
            return Err(ConstructionError::validation(
                "operation indices must run 0..n-1 in array order",
            ));
        }

        let fixed_fee = if options.fixed_fee {
            let fee = Balance::of(operations.as_slice())?.implied_fee();
            if fee <= 0 {
                return Err(ConstructionError::validation(format!(
                    "operations imply a non-positive fee ({fee})"
                )));
            }
            Some(fee)
        } else {
            None
        };

        // 1. preprocess
        let preprocess_metadata = options.preprocess_metadata.clone().unwrap_or_else(|| json!({}));
        let preprocess = self
            .client
            .preprocess(operations.as_slice(), &preprocess_metadata)
            .await?;
        let preprocess_options = preprocess
            .options
            .ok_or_else(|| ConstructionError::validation("preprocess returned no options"))?;
        debug!("preprocess complete");

        // 2. metadata
        let public_keys = options.public_keys.as_deref();
        let metadata_response = self.client.metadata(&preprocess_options, public_keys).await?;
        let metadata = metadata_response
            .metadata
            .ok_or_else(|| ConstructionError::validation("metadata returned no metadata"))?;
        let suggested_fee = if fixed_fee.is_some() {
            None
        } else {
            suggested_ada_fee(metadata_response.suggested_fee.as_deref())?
        };
        debug!(?suggested_fee, "metadata complete");

        // 3. fee adjustment
        let adjusted = match suggested_fee {
            Some(fee) if fee > 0 => {
                let (adjusted, adjustment) = adjust_for_fee(operations, fee)?;
                debug!(
                    change_position = adjustment.change_position,
                    outputs = adjustment.deductions.len(),
                    "fee applied"
                );
                adjusted
            }
            _ => operations.clone(),
        };

        // 4. payloads
        let payloads_response = self
            .client
            .payloads(adjusted.as_slice(), &metadata, public_keys)
            .await?;
        let unsigned_transaction = payloads_response
            .unsigned_transaction
            .ok_or_else(|| ConstructionError::validation("payloads returned no unsigned_transaction"))?;
        let payloads = payloads_response
            .payloads
            .ok_or_else(|| ConstructionError::validation("payloads returned no payloads"))?;

        // 5. parse verification
        self.verify_transaction(Some(&adjusted), &unsigned_transaction, false)
            .await?;

        let fee = fixed_fee.or(suggested_fee);
        if let (Some(fee), None) = (fee, fixed_fee) {
            let implied = Balance::of(adjusted.as_slice())?.implied_fee();
            if implied != fee {
                warn!(fee, implied, "adjusted operations do not balance to the suggested fee");
            }
        }

        info!(payloads = payloads.len(), ?fee, "transaction built");
        Ok(TransactionDraft {
            operations: adjusted,
            unsigned_transaction,
            payloads,
            metadata,
            fee,
        })
    }

    /// Parses `transaction` through the gateway and checks it against
    /// `expected`. A failing `/construction/parse` call is treated like a
    /// verification issue: logged in lenient mode, fatal in strict mode.
    pub(super) async fn verify_transaction(
        &self,
        expected: Option<&OperationSet>,
        transaction: &str,
        signed: bool,
    ) -> Result<ParseReport> {
        let phase = if signed { "signed" } else { "unsigned" };
        let report = match self.client.parse(signed, transaction).await {
            Ok(parsed) => verify_parsed(expected.map(OperationSet::as_slice), &parsed, signed),
            Err(err) => ParseReport {
                issues: vec![format!("parse call failed: {err}")],
                ..ParseReport::default()
            },
        };
        report.enforce(phase, self.config.parse_verification)
    }
}

