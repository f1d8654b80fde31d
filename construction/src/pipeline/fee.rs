//! Fee adjustment.
//!
//! The gateway suggests a fee after preprocess/metadata; the operations
//! sent to `/construction/payloads` must already pay it. The fee comes out
//! of the change output: the last output owned by the first input's
//! address, or the last output at all when no output matches.
//!
//! When the change output alone cannot pay, and the sender owns several
//! outputs, the fee is spread across all of them in passes. Each pass
//! offers every output that still sits above [`MIN_OUTPUT_LOVELACE`] an
//! equal share of what remains; an output gives at most its share, its
//! headroom above the floor, and the remainder. Passes repeat until the
//! fee is covered or nobody can give more.

use tracing::{debug, warn};

use crate::config::MIN_OUTPUT_LOVELACE;
use crate::error::{ConstructionError, Result};
use crate::operation::accounting::Balance;
use crate::operation::types::{OperationSet, OperationType};

/// How the fee was taken out of the outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeAdjustment {
    /// Array position of the chosen change output.
    pub change_position: usize,
    /// `(position, lovelace deducted)` for every output that paid.
    pub deductions: Vec<(usize, i64)>,
}

impl FeeAdjustment {
    pub fn total(&self) -> i64 {
        self.deductions.iter().map(|(_, d)| d).sum()
    }
}

fn positions_of(ops: &OperationSet, kind: OperationType) -> Vec<usize> {
    ops.iter()
        .enumerate()
        .filter(|(_, op)| op.kind == kind)
        .map(|(position, _)| position)
        .collect()
}

fn value_at(ops: &OperationSet, position: usize) -> Result<i64> {
    Ok(ops.as_slice()[position].value()?.unwrap_or(0))
}

/// Returns a copy of `ops` whose outputs pay `fee` in total.
pub fn adjust_for_fee(ops: &OperationSet, fee: i64) -> Result<(OperationSet, FeeAdjustment)> {
    if fee < 0 {
        return Err(ConstructionError::validation(format!(
            "suggested fee must not be negative, got {fee}"
        )));
    }

    let inputs = positions_of(ops, OperationType::Input);
    let outputs = positions_of(ops, OperationType::Output);
    let (first_input, last_output) = match (inputs.first(), outputs.last()) {
        (Some(i), Some(o)) => (*i, *o),
        _ => {
            return Err(ConstructionError::validation(
                "cannot adjust fee: no input or output operations",
            ))
        }
    };

    let sender = ops.as_slice()[first_input].address();
    let owned_by_sender = |position: &usize| {
        sender.is_some() && ops.as_slice()[*position].address() == sender
    };
    let change_position = outputs
        .iter()
        .rev()
        .copied()
        .find(|p| owned_by_sender(p))
        .unwrap_or(last_output);

    let mut adjusted = ops.clone();
    let change_value = value_at(ops, change_position)?;
    let remaining_change = change_value.checked_sub(fee).ok_or_else(|| {
        ConstructionError::validation(format!("cannot adjust fee: fee {fee} overflows change output"))
    })?;

    if remaining_change >= 0 {
        if let Some(op) = adjusted.get_mut(change_position) {
            op.set_value(remaining_change);
        }
        debug!(change_position, change_value, fee, "fee taken from change output");
        return Ok((
            adjusted,
            FeeAdjustment {
                change_position,
                deductions: vec![(change_position, fee)],
            },
        ));
    }

    let sender_outputs: Vec<usize> = outputs.iter().copied().filter(|p| owned_by_sender(p)).collect();
    if sender_outputs.len() <= 1 {
        return Err(ConstructionError::validation(format!(
            "cannot adjust fee: change would be negative ({remaining_change})"
        )));
    }

    let mut values = sender_outputs
        .iter()
        .map(|p| value_at(ops, *p))
        .collect::<Result<Vec<i64>>>()?;
    let mut deducted = vec![0i64; values.len()];
    let remaining = distribute(&mut values, &mut deducted, fee);

    if remaining > 0 {
        let balance = Balance::of(ops.as_slice())?;
        let (total_in, total_out) = (balance.inputs, balance.outputs);
        warn!(fee, remaining, "fee could not be spread across sender outputs");
        return Err(ConstructionError::validation(format!(
            "insufficient funds for fee. inputs: {total_in}, outputs: {total_out}, fee: {fee}. \
             could not distribute {remaining} of the fee"
        )));
    }

    let mut deductions = Vec::new();
    for ((position, value), taken) in sender_outputs.iter().zip(&values).zip(&deducted) {
        if *taken > 0 {
            if let Some(op) = adjusted.get_mut(*position) {
                op.set_value(*value);
            }
            deductions.push((*position, *taken));
        }
    }
    debug!(fee, outputs = deductions.len(), "fee spread across sender outputs");
    Ok((
        adjusted,
        FeeAdjustment {
            change_position,
            deductions,
        },
    ))
}

/// Spreads `fee` over `values` without pushing any below the floor.
/// Returns what could not be covered.
fn distribute(values: &mut [i64], deducted: &mut [i64], fee: i64) -> i64 {
    let mut remaining = fee;
    while remaining > 0 {
        let absorbers = values.iter().filter(|v| **v > MIN_OUTPUT_LOVELACE).count() as i64;
        if absorbers == 0 {
            break;
        }
        let share = remaining / absorbers + i64::from(remaining % absorbers != 0);
        let mut progressed = false;
        for (value, taken) in values.iter_mut().zip(deducted.iter_mut()) {
            if remaining == 0 {
                break;
            }
            let give = share.min(*value - MIN_OUTPUT_LOVELACE).min(remaining);
            if give > 0 {
                *value -= give;
                *taken += give;
                remaining -= give;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationSetBuilder;

    const ME: &str = "addr_test1sender";
    const YOU: &str = "addr_test1recipient";

    fn values(ops: &OperationSet) -> Vec<i64> {
        ops.outputs().map(|o| o.value().unwrap().unwrap()).collect()
    }

    #[test]
    fn single_change_output_pays_whole_fee() {
        let ops = OperationSetBuilder::new()
            .input(ME, 5_000_000, "t#0")
            .output(ME, 3_000_000)
            .build()
            .unwrap();
        let (adjusted, adj) = adjust_for_fee(&ops, 180_000).unwrap();
        assert_eq!(values(&adjusted), vec![2_820_000]);
        assert_eq!(adj.total(), 180_000);
        assert_eq!(values(&ops), vec![3_000_000], "input set must not be mutated");
    }

    #[test]
    fn fee_of_value_minus_one_leaves_one_lovelace() {
        let ops = OperationSetBuilder::new()
            .input(ME, 2_000_000, "t#0")
            .output(ME, 2_000_000)
            .build()
            .unwrap();
        let (adjusted, _) = adjust_for_fee(&ops, 1_999_999).unwrap();
        assert_eq!(values(&adjusted), vec![1]);
    }

    #[test]
    fn change_is_last_sender_output_scanning_backwards() {
        let ops = OperationSetBuilder::new()
            .input(ME, 10_000_000, "t#0")
            .output(ME, 4_000_000)
            .output(YOU, 1_000_000)
            .output(ME, 5_000_000)
            .build()
            .unwrap();
        let (adjusted, adj) = adjust_for_fee(&ops, 200_000).unwrap();
        assert_eq!(adj.change_position, 3);
        assert_eq!(values(&adjusted), vec![4_000_000, 1_000_000, 4_800_000]);
    }

    #[test]
    fn falls_back_to_last_output_when_no_address_matches() {
        let ops = OperationSetBuilder::new()
            .input(ME, 10_000_000, "t#0")
            .output(YOU, 4_000_000)
            .output("addr_test1third", 6_000_000)
            .build()
            .unwrap();
        let (adjusted, adj) = adjust_for_fee(&ops, 1_000_000).unwrap();
        assert_eq!(adj.change_position, 2);
        assert_eq!(values(&adjusted), vec![4_000_000, 5_000_000]);
    }

    #[test]
    fn single_sender_output_cannot_go_negative() {
        let ops = OperationSetBuilder::new()
            .input(ME, 1_500_000, "t#0")
            .output(ME, 1_500_000)
            .build()
            .unwrap();
        let err = adjust_for_fee(&ops, 2_000_000).unwrap_err();
        assert!(matches!(err, ConstructionError::Validation(_)));
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn two_sender_outputs_share_a_large_fee() {
        let ops = OperationSetBuilder::new()
            .input(ME, 10_000_000, "t#0")
            .output(ME, 2_000_000)
            .output(ME, 5_000_000)
            .build()
            .unwrap();
        let (adjusted, adj) = adjust_for_fee(&ops, 4_000_000).unwrap();
        assert_eq!(adj.total(), 4_000_000);
        assert_eq!(values(&adjusted), vec![1_000_000, 2_000_000]);
        assert_eq!(adj.deductions, vec![(1, 1_000_000), (2, 3_000_000)]);
    }

    #[test]
    fn distribution_respects_floor_across_passes() {
        let mut values = vec![2_000_000, 5_000_000];
        let mut deducted = vec![0, 0];
        let remaining = distribute(&mut values, &mut deducted, 3_000_000);
        assert_eq!(remaining, 0);
        assert_eq!(deducted.iter().sum::<i64>(), 3_000_000);
        assert_eq!(values, vec![1_000_000, 3_000_000]);
    }

    #[test]
    fn uncoverable_fee_reports_shortfall() {
        let ops = OperationSetBuilder::new()
            .input(ME, 4_000_000, "t#0")
            .output(ME, 1_500_000)
            .output(ME, 1_500_000)
            .build()
            .unwrap();
        let err = adjust_for_fee(&ops, 2_000_000).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("insufficient funds for fee"), "{msg}");
        assert!(msg.contains("could not distribute 1000000"), "{msg}");
    }

    #[test]
    fn huge_fee_is_an_error_not_a_panic() {
        let ops = OperationSetBuilder::new()
            .input(ME, 10_000_000, "t#0")
            .output(ME, 2_000_000)
            .output(ME, 5_000_000)
            .build()
            .unwrap();
        let err = adjust_for_fee(&ops, i64::MAX).unwrap_err();
        assert!(matches!(err, ConstructionError::Validation(_)));
        assert!(err.to_string().contains("insufficient funds for fee"), "{err}");
    }

    #[test]
    fn distribution_share_rounds_up_at_the_top_of_the_range() {
        let mut values = vec![i64::MAX, i64::MAX];
        let mut deducted = vec![0, 0];
        assert_eq!(distribute(&mut values, &mut deducted, i64::MAX), 0);
        assert_eq!(deducted, vec![i64::MAX / 2 + 1, i64::MAX / 2]);
    }

    #[test]
    fn no_inputs_is_rejected() {
        let ops = OperationSetBuilder::new().output(ME, 1_000_000).build().unwrap();
        assert!(adjust_for_fee(&ops, 10).is_err());
    }
}
