use std::{
    fmt,
    iter::Sum,
    ops::{Add, Neg, Sub},
    str::FromStr,
};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Default, Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default, Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub struct ExpenseId(String);

impl ExpenseId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default, Hash, Eq, PartialEq, Clone, Debug)]
pub struct SplitId(String);

impl SplitId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

/// Number of cents below which two currency values are considered equal.
const TOLERANCE_CENTS: i64 = 1;

/// A currency value with cent semantics. Arithmetic is exact; rounding only happens where a
/// result is presented as a transfer or a share.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MonetaryAmount(Decimal);

impl MonetaryAmount {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The single rounding slack used everywhere currency totals are compared.
    pub fn tolerance() -> Self {
        Self::from_cents(TOLERANCE_CENTS)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn round_cents(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// True when the value is closer to zero than the tolerance.
    pub fn is_negligible(&self) -> bool {
        self.abs() < Self::tolerance()
    }

    pub fn approx_eq(&self, other: MonetaryAmount) -> bool {
        (*self - other).is_negligible()
    }

    pub fn times(&self, count: usize) -> Self {
        Self(self.0 * Decimal::from(count))
    }

    /// Divides by a participant count. Returns `None` for zero participants.
    pub fn divided_by(&self, count: usize) -> Option<Self> {
        self.0.checked_div(Decimal::from(count)).map(Self)
    }

    pub fn scale_places(&self) -> u32 {
        self.0.normalize().scale()
    }
}

impl Add for MonetaryAmount {
    type Output = MonetaryAmount;

    fn add(self, rhs: Self) -> Self::Output {
        MonetaryAmount(self.value() + rhs.value())
    }
}

impl Sub for MonetaryAmount {
    type Output = MonetaryAmount;

    fn sub(self, rhs: Self) -> Self::Output {
        MonetaryAmount(self.value() - rhs.value())
    }
}

impl Neg for MonetaryAmount {
    type Output = MonetaryAmount;

    fn neg(self) -> Self::Output {
        MonetaryAmount(-self.value())
    }
}

impl Sum for MonetaryAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(MonetaryAmount::zero(), |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a MonetaryAmount> for MonetaryAmount {
    fn sum<I: Iterator<Item = &'a MonetaryAmount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for MonetaryAmount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl fmt::Display for MonetaryAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.round_cents().0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

impl Member {
    pub fn new(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn to_ref(&self) -> MemberRef {
        MemberRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// One purchase fronted by a single payer. Its splits say who consumed what share of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: ExpenseId,
    pub payer_id: MemberId,
    pub amount: MonetaryAmount,
    pub description: String,
    pub date: NaiveDate,
}

/// A member's share of a single expense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseSplit {
    pub id: SplitId,
    pub expense_id: ExpenseId,
    pub member_id: MemberId,
    pub amount: MonetaryAmount,
}

/// A proposed share before it is attached to a stored expense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitAmount {
    pub member_id: MemberId,
    pub amount: MonetaryAmount,
}

impl SplitAmount {
    pub fn new(member_id: MemberId, amount: MonetaryAmount) -> Self {
        Self { member_id, amount }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub id: MemberId,
    pub name: String,
}

/// Running totals for one member while expenses and splits are folded in.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct BalanceState {
    pub name: String,
    pub total_paid: MonetaryAmount,
    pub total_owed: MonetaryAmount,
}

impl BalanceState {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn map_paid<F: FnOnce(MonetaryAmount) -> MonetaryAmount>(&self, f: F) -> Self {
        Self {
            total_paid: f(self.total_paid),
            ..self.clone()
        }
    }

    pub fn map_owed<F: FnOnce(MonetaryAmount) -> MonetaryAmount>(&self, f: F) -> Self {
        Self {
            total_owed: f(self.total_owed),
            ..self.clone()
        }
    }
}

/// Net position of a member across the whole group.
///
/// A positive `balance` means the member is owed money, a negative one means they owe money.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberBalance {
    pub member_id: MemberId,
    pub member_name: String,
    pub total_paid: MonetaryAmount,
    pub total_owed: MonetaryAmount,
    pub balance: MonetaryAmount,
}

impl MemberBalance {
    pub fn from_state(id: MemberId, state: BalanceState) -> Self {
        Self {
            member_id: id,
            member_name: state.name,
            total_paid: state.total_paid,
            total_owed: state.total_owed,
            balance: state.total_paid - state.total_owed,
        }
    }

    pub fn member(&self) -> MemberRef {
        MemberRef {
            id: self.member_id.clone(),
            name: self.member_name.clone(),
        }
    }

    pub fn view(&self) -> BalanceView {
        BalanceView {
            member_id: self.member_id.clone(),
            member_name: self.member_name.clone(),
            balance: self.balance,
        }
    }
}

/// The reduced balance shape handed to API consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceView {
    pub member_id: MemberId,
    pub member_name: String,
    pub balance: MonetaryAmount,
}

/// A single transfer from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub from: MemberRef,
    pub to: MemberRef,
    pub amount: MonetaryAmount,
}

/// Everything stored for one group.
#[derive(Clone, Debug, Default)]
pub struct GroupSnapshot {
    pub members: Vec<Member>,
    pub expenses: Vec<Expense>,
    pub splits: Vec<ExpenseSplit>,
}
