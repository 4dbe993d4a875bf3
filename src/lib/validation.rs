use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::splits::validate_splits;
use crate::types::{Expense, ExpenseSplit, Member, MemberId, MonetaryAmount, SplitAmount};

/// Largest amount a single expense or split may carry.
pub(crate) const MAX_AMOUNT: i64 = 1_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpenseValidationError {
    #[error("payer id is required")]
    MissingPayer,
    #[error("amount is required")]
    MissingAmount,
    #[error("amount must be a valid number")]
    MalformedAmount,
    #[error("amount must be greater than 0")]
    NonPositiveAmount,
    #[error("amount must not exceed 1000000")]
    AmountTooLarge,
    #[error("amount can have at most 2 decimal places")]
    TooManyDecimals,
    #[error("description is required")]
    MissingDescription,
    #[error("date {0:?} is not a valid YYYY-MM-DD date")]
    MalformedDate(String),
    #[error("date {0} is in the future")]
    FutureDate(NaiveDate),
    #[error("at least one split is required")]
    NoSplits,
    #[error("split member id is required")]
    MissingSplitMember,
    #[error("split amount for member {0} must be positive")]
    NonPositiveSplit(MemberId),
    #[error("member {0} has more than one split")]
    DuplicateSplitMember(MemberId),
    #[error("splits sum to {actual} but the expense amount is {expected}")]
    SplitTotalMismatch {
        expected: MonetaryAmount,
        actual: MonetaryAmount,
    },
}

/// An expense as submitted, before ids are assigned and it is stored.
#[derive(Clone, Debug)]
pub struct NewExpense {
    pub payer_id: MemberId,
    pub amount: MonetaryAmount,
    pub description: String,
    pub date: Option<String>,
    pub splits: Vec<SplitAmount>,
}

/// Parses a `YYYY-MM-DD` date, rejecting other layouts and impossible days.
pub fn parse_expense_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, b)| match idx {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Parses a user-entered currency amount.
pub fn parse_amount(text: &str) -> Result<MonetaryAmount, ExpenseValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ExpenseValidationError::MissingAmount);
    }
    let amount: MonetaryAmount = text
        .parse()
        .map_err(|_| ExpenseValidationError::MalformedAmount)?;
    if !amount.is_positive() {
        return Err(ExpenseValidationError::NonPositiveAmount);
    }
    if amount.value() > Decimal::from(MAX_AMOUNT) {
        return Err(ExpenseValidationError::AmountTooLarge);
    }
    if amount.scale_places() > 2 {
        return Err(ExpenseValidationError::TooManyDecimals);
    }
    Ok(amount)
}

fn validate_date(date: &Option<String>, today: NaiveDate) -> Result<(), ExpenseValidationError> {
    match date {
        None => Ok(()),
        Some(text) => match parse_expense_date(text) {
            None => Err(ExpenseValidationError::MalformedDate(text.clone())),
            Some(d) if d > today => Err(ExpenseValidationError::FutureDate(d)),
            Some(_) => Ok(()),
        },
    }
}

fn validate_split_shapes(splits: &[SplitAmount]) -> Result<(), ExpenseValidationError> {
    if splits.is_empty() {
        return Err(ExpenseValidationError::NoSplits);
    }
    let mut seen = HashSet::new();
    for split in splits {
        if split.member_id.value().trim().is_empty() {
            return Err(ExpenseValidationError::MissingSplitMember);
        }
        if !split.amount.is_positive() {
            return Err(ExpenseValidationError::NonPositiveSplit(split.member_id.clone()));
        }
        if !seen.insert(&split.member_id) {
            return Err(ExpenseValidationError::DuplicateSplitMember(
                split.member_id.clone(),
            ));
        }
    }
    Ok(())
}

/// Checks an expense before it is accepted. The first failed rule is reported.
pub fn validate_expense(
    expense: &NewExpense,
    today: NaiveDate,
) -> Result<(), ExpenseValidationError> {
    if expense.payer_id.value().trim().is_empty() {
        return Err(ExpenseValidationError::MissingPayer);
    }
    if !expense.amount.is_positive() {
        return Err(ExpenseValidationError::NonPositiveAmount);
    }
    if expense.description.trim().is_empty() {
        return Err(ExpenseValidationError::MissingDescription);
    }
    validate_date(&expense.date, today)?;
    validate_split_shapes(&expense.splits)?;

    if !validate_splits(expense.amount, &expense.splits) {
        return Err(ExpenseValidationError::SplitTotalMismatch {
            expected: expense.amount,
            actual: expense.splits.iter().map(|s| s.amount).sum(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionCheck {
    Allowed,
    /// Paid for at least one expense.
    IsPayer,
    /// Owes a share of at least one expense.
    HasSplits,
}

impl DeletionCheck {
    pub fn can_delete(&self) -> bool {
        matches!(self, DeletionCheck::Allowed)
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            DeletionCheck::Allowed => None,
            DeletionCheck::IsPayer => Some("Member has paid for expenses"),
            DeletionCheck::HasSplits => Some("Member is part of expense splits"),
        }
    }
}

/// Members referenced by an expense or a split cannot be deleted.
pub fn can_delete_member(
    member_id: &MemberId,
    expenses: &[Expense],
    splits: &[ExpenseSplit],
) -> DeletionCheck {
    if expenses.iter().any(|e| &e.payer_id == member_id) {
        DeletionCheck::IsPayer
    } else if splits.iter().any(|s| &s.member_id == member_id) {
        DeletionCheck::HasSplits
    } else {
        DeletionCheck::Allowed
    }
}

pub fn is_duplicate_member_name(name: &str, members: &[Member]) -> bool {
    let wanted = name.trim().to_lowercase();
    members.iter().any(|m| m.name.trim().to_lowercase() == wanted)
}
