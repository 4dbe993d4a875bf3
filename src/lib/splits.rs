use rust_decimal::Decimal;
use thiserror::Error;

use crate::random::RandomSource;
use crate::types::{MemberId, MonetaryAmount, SplitAmount};

/// Upper bound (inclusive) of the integer weights drawn for a randomized split.
const MAX_WEIGHT: u64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("amount {0} is too large to split by weight")]
    AmountTooLarge(MonetaryAmount),
}

const NO_MEMBERS: SplitError =
    SplitError::InvalidArgument("cannot split an expense among zero members");

/// Splits `total` into one share per member, rounded to cents.
///
/// Whatever the rounding leaves over goes to the first member, so the shares always add up to
/// `total` exactly.
pub fn split_equally(
    total: MonetaryAmount,
    member_ids: &[MemberId],
) -> Result<Vec<SplitAmount>, SplitError> {
    let count = member_ids.len();
    let per_person = total.divided_by(count).ok_or(NO_MEMBERS)?.round_cents();
    let remainder = total - per_person.times(count);

    Ok(member_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| {
            let amount = if idx == 0 {
                per_person + remainder
            } else {
                per_person
            };
            SplitAmount::new(id.clone(), amount)
        })
        .collect())
}

/// Splits `total` in proportion to random weights drawn from `source`.
///
/// Each share is rounded to cents and the rounding residual is folded into the largest share
/// (the earliest one on ties), so the shares add up to `total` exactly. Totals so large that
/// weighting them would overflow `Decimal` are refused.
pub fn split_weighted<R: RandomSource>(
    total: MonetaryAmount,
    member_ids: &[MemberId],
    source: &mut R,
) -> Result<Vec<SplitAmount>, SplitError> {
    match member_ids {
        [] => Err(NO_MEMBERS),
        [only] => Ok(vec![SplitAmount::new(only.clone(), total)]),
        _ => {
            // every weighted product below stays under this one
            if total.value().checked_mul(Decimal::from(MAX_WEIGHT)).is_none() {
                return Err(SplitError::AmountTooLarge(total));
            }
            let weights: Vec<u64> = member_ids
                .iter()
                .map(|_| source.next_below(MAX_WEIGHT) + 1)
                .collect();
            let total_weight = Decimal::from(weights.iter().sum::<u64>());

            let mut splits: Vec<SplitAmount> = member_ids
                .iter()
                .zip(&weights)
                .map(|(id, weight)| {
                    let share = total.value() * Decimal::from(*weight) / total_weight;
                    SplitAmount::new(id.clone(), MonetaryAmount::new(share).round_cents())
                })
                .collect();

            let allotted: MonetaryAmount = splits.iter().map(|s| s.amount).sum();
            let residual = total - allotted;
            let largest = splits.iter().enumerate().fold(0, |max_idx, (idx, s)| {
                if s.amount > splits[max_idx].amount {
                    idx
                } else {
                    max_idx
                }
            });
            splits[largest].amount = splits[largest].amount + residual;

            Ok(splits)
        }
    }
}

/// True when `amounts` add up to `total` within the currency tolerance.
pub fn totals_match<I>(total: MonetaryAmount, amounts: I) -> bool
where
    I: IntoIterator<Item = MonetaryAmount>,
{
    total.approx_eq(amounts.into_iter().sum())
}

pub fn validate_splits(total: MonetaryAmount, splits: &[SplitAmount]) -> bool {
    totals_match(total, splits.iter().map(|s| s.amount))
}
