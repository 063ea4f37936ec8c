//! Prepared-transaction summarizer.
//!
//! Recomputes input/output/fee totals from a transaction intent,
//! independent of signing, so a user can review exactly what will be
//! spent and paid before authorizing the build.

use crate::amount::{from_minor_units, to_minor_units};
use crate::intent::{OutputCategory, TransactionIntent, TransactionSummary};
use crate::EngineError;

/// Summarize a transaction intent's money flows.
///
/// Sums input values, partitions outputs by category, and computes the
/// network fee as `inputs - outputs - service_fee - change`. Amount
/// codec failures propagate unchanged. An intent whose outputs exceed
/// its inputs is rejected with `NegativeNetworkFee`.
///
/// # Arguments
/// * `intent` - The prepared transaction intent.
///
/// # Returns
/// The summary with wire-format decimal amounts.
pub fn summarize(intent: &TransactionIntent) -> Result<TransactionSummary, EngineError> {
    let mut input_sum: u64 = 0;
    for input in &intent.inputs {
        input_sum = input_sum
            .checked_add(to_minor_units(&input.input_value)?)
            .ok_or_else(|| EngineError::AmountOverflow("input total".to_string()))?;
    }

    let mut user_sum: u64 = 0;
    let mut service_fee: u64 = 0;
    let mut change: u64 = 0;
    for output in &intent.outputs {
        let value = to_minor_units(&output.output_value)?;
        let bucket = match output.output_category {
            OutputCategory::ServiceFee => &mut service_fee,
            OutputCategory::Change => &mut change,
            OutputCategory::UserSpecified => &mut user_sum,
        };
        *bucket = bucket
            .checked_add(value)
            .ok_or_else(|| EngineError::AmountOverflow("output total".to_string()))?;
    }

    let spent = user_sum
        .checked_add(service_fee)
        .and_then(|v| v.checked_add(change))
        .ok_or_else(|| EngineError::AmountOverflow("output total".to_string()))?;
    let network_fee = input_sum
        .checked_sub(spent)
        .ok_or(EngineError::NegativeNetworkFee)?;

    Ok(TransactionSummary {
        network: intent.network.clone(),
        network_fee: from_minor_units(network_fee)?,
        service_fee: from_minor_units(service_fee)?,
        total_to_send: from_minor_units(user_sum)?,
    })
}
