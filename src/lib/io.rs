use std::{error::Error, fs::File, io::Read, path::Path};

use ::serde::{de::DeserializeOwned, Deserialize, Serialize, Serializer};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::snapshot::SnapshotIssue;
use crate::types::{
    Expense, ExpenseId, ExpenseSplit, GroupSnapshot, Member, MemberBalance, MemberId,
    MonetaryAmount, Settlement, SplitAmount, SplitId,
};
use crate::validation::{parse_expense_date, MAX_AMOUNT};

pub const BALANCE_HEADERS: &[&str] = &["member_id", "member_name", "balance"];
pub const FULL_BALANCE_HEADERS: &[&str] = &[
    "member_id",
    "member_name",
    "total_paid",
    "total_owed",
    "balance",
];
pub const SETTLEMENT_HEADERS: &[&str] = &[
    "from_member_id",
    "from_member_name",
    "to_member_id",
    "to_member_name",
    "amount",
];
pub const SPLIT_HEADERS: &[&str] = &["member_id", "amount"];
pub const ISSUE_HEADERS: &[&str] = &["kind", "expense_id", "member_id", "detail"];

#[derive(Debug, Error)]
pub enum RowError {
    #[error("expense {id}: date {date:?} is not a valid YYYY-MM-DD date")]
    InvalidDate { id: String, date: String },
    #[error("{kind} {id}: amount {amount} is outside the accepted range")]
    AmountOutOfRange {
        kind: &'static str,
        id: String,
        amount: Decimal,
    },
}

/// Expenses must be positive, split shares may be zero. Neither may exceed the amount limit, which
/// keeps balance sums far from `Decimal` overflow.
fn checked_amount(
    kind: &'static str,
    id: &str,
    amount: Decimal,
    allow_zero: bool,
) -> Result<MonetaryAmount, RowError> {
    let too_small = if allow_zero {
        amount < Decimal::ZERO
    } else {
        amount <= Decimal::ZERO
    };
    if too_small || amount > Decimal::from(MAX_AMOUNT) {
        return Err(RowError::AmountOutOfRange {
            kind,
            id: id.to_string(),
            amount,
        });
    }
    Ok(MonetaryAmount::new(amount))
}

#[derive(Debug, Deserialize)]
pub struct MemberRowEntity {
    pub id: String,
    pub name: String,
}

impl MemberRowEntity {
    fn into_domain(self) -> Member {
        Member::new(MemberId::new(self.id), self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct ExpenseRowEntity {
    pub id: String,
    pub payer_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub description: String,
    pub date: String,
}

impl ExpenseRowEntity {
    fn into_domain(self) -> Result<Expense, RowError> {
        let amount = checked_amount("expense", &self.id, self.amount, false)?;
        let date = parse_expense_date(&self.date).ok_or_else(|| RowError::InvalidDate {
            id: self.id.clone(),
            date: self.date.clone(),
        })?;
        Ok(Expense {
            id: ExpenseId::new(self.id),
            payer_id: MemberId::new(self.payer_id),
            amount,
            description: self.description,
            date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SplitRowEntity {
    pub id: String,
    pub expense_id: String,
    pub member_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

impl SplitRowEntity {
    fn into_domain(self) -> Result<ExpenseSplit, RowError> {
        let amount = checked_amount("split", &self.id, self.amount, true)?;
        Ok(ExpenseSplit {
            id: SplitId::new(self.id),
            expense_id: ExpenseId::new(self.expense_id),
            member_id: MemberId::new(self.member_id),
            amount,
        })
    }
}

fn fixed_width<S: Serializer>(x: &Decimal, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:.2}", x))
}

fn cents(amount: MonetaryAmount) -> Decimal {
    let rounded = amount.round_cents().value();
    // never print "-0.00"
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceEntity {
    member_id: String,
    member_name: String,
    #[serde(serialize_with = "fixed_width")]
    balance: Decimal,
}

impl BalanceEntity {
    pub fn from_balance(balance: &MemberBalance) -> Self {
        let view = balance.view();
        Self {
            member_id: view.member_id.value().to_string(),
            member_name: view.member_name,
            balance: cents(view.balance),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FullBalanceEntity {
    member_id: String,
    member_name: String,
    #[serde(serialize_with = "fixed_width")]
    total_paid: Decimal,
    #[serde(serialize_with = "fixed_width")]
    total_owed: Decimal,
    #[serde(serialize_with = "fixed_width")]
    balance: Decimal,
}

impl FullBalanceEntity {
    pub fn from_balance(balance: &MemberBalance) -> Self {
        Self {
            member_id: balance.member_id.value().to_string(),
            member_name: balance.member_name.clone(),
            total_paid: cents(balance.total_paid),
            total_owed: cents(balance.total_owed),
            balance: cents(balance.balance),
        }
    }
}

/// Flattened settlement row, as handed to API consumers.
#[derive(Debug, Serialize)]
pub struct SettlementEntity {
    from_member_id: String,
    from_member_name: String,
    to_member_id: String,
    to_member_name: String,
    #[serde(serialize_with = "fixed_width")]
    amount: Decimal,
}

impl SettlementEntity {
    pub fn from_settlement(settlement: &Settlement) -> Self {
        Self {
            from_member_id: settlement.from.id.value().to_string(),
            from_member_name: settlement.from.name.clone(),
            to_member_id: settlement.to.id.value().to_string(),
            to_member_name: settlement.to.name.clone(),
            amount: cents(settlement.amount),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SplitAmountEntity {
    member_id: String,
    #[serde(serialize_with = "fixed_width")]
    amount: Decimal,
}

impl SplitAmountEntity {
    pub fn from_split(split: &SplitAmount) -> Self {
        Self {
            member_id: split.member_id.value().to_string(),
            amount: cents(split.amount),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssueEntity {
    kind: &'static str,
    expense_id: String,
    member_id: String,
    detail: String,
}

impl IssueEntity {
    pub fn from_issue(issue: &SnapshotIssue) -> Self {
        Self {
            kind: issue.kind(),
            expense_id: issue.expense_id().value().to_string(),
            member_id: issue
                .member_id()
                .map(|id| id.value().to_string())
                .unwrap_or_default(),
            detail: issue.detail(),
        }
    }
}

fn read_rows<T: DeserializeOwned, R: Read>(source: R) -> Result<Vec<T>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut rows: Vec<T> = Vec::new();
    for row in reader.deserialize::<T>() {
        // fail on the first bad row, a partial group would give wrong balances
        rows.push(row?);
    }

    Ok(rows)
}

pub fn read_members<R: Read>(source: R) -> Result<Vec<Member>, Box<dyn Error>> {
    Ok(read_rows::<MemberRowEntity, R>(source)?
        .into_iter()
        .map(MemberRowEntity::into_domain)
        .collect())
}

pub fn read_expenses<R: Read>(source: R) -> Result<Vec<Expense>, Box<dyn Error>> {
    let mut expenses = Vec::new();
    for row in read_rows::<ExpenseRowEntity, R>(source)? {
        expenses.push(row.into_domain()?);
    }
    Ok(expenses)
}

pub fn read_splits<R: Read>(source: R) -> Result<Vec<ExpenseSplit>, Box<dyn Error>> {
    let mut splits = Vec::new();
    for row in read_rows::<SplitRowEntity, R>(source)? {
        splits.push(row.into_domain()?);
    }
    Ok(splits)
}

pub fn load_snapshot(
    members: &Path,
    expenses: &Path,
    splits: &Path,
) -> Result<GroupSnapshot, Box<dyn Error>> {
    Ok(GroupSnapshot {
        members: read_members(File::open(members)?)?,
        expenses: read_expenses(File::open(expenses)?)?,
        splits: read_splits(File::open(splits)?)?,
    })
}

/// Serializes rows under a header line. The header is written even when there are no rows.
pub fn output_csv<T, I>(headers: &[&str], rows: I) -> Result<String, Box<dyn Error>>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);

    wtr.write_record(headers)?;
    for row in rows {
        wtr.serialize(row)?
    }

    wtr.flush()?;
    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use crate::types::{MemberBalance, MemberId, MemberRef, MonetaryAmount, Settlement};

    use super::{
        output_csv, read_expenses, read_members, read_splits, BalanceEntity, SettlementEntity,
        BALANCE_HEADERS, SETTLEMENT_HEADERS,
    };

    fn money(s: &str) -> MonetaryAmount {
        s.parse().unwrap()
    }

    #[test]
    fn members_are_read_with_whitespace_trimmed() {
        let csv = "id, name\n1, Alice\n2,Bob \n";
        let members = read_members(csv.as_bytes()).unwrap();

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].id, MemberId::new("1"));
        assert_eq!(members[0].name, "Alice");
        assert_eq!(members[1].name, "Bob");
    }

    #[test]
    fn expense_amounts_are_read_exactly() {
        let csv = "id,payer_id,amount,description,date\ne1,1,33.33,Dinner,2024-01-01\n";
        let expenses = read_expenses(csv.as_bytes()).unwrap();

        assert_eq!(expenses[0].amount, money("33.33"));
        assert_eq!(expenses[0].payer_id, MemberId::new("1"));
    }

    #[test]
    fn bad_expense_date_is_an_error() {
        let csv = "id,payer_id,amount,description,date\ne1,1,10,Dinner,01/01/2024\n";
        assert!(read_expenses(csv.as_bytes()).is_err());
    }

    #[test]
    fn malformed_split_amount_is_an_error() {
        let csv = "id,expense_id,member_id,amount\ns1,e1,1,ten\n";
        assert!(read_splits(csv.as_bytes()).is_err());
    }

    #[test]
    fn oversized_expense_amount_is_an_error() {
        let csv = "id,payer_id,amount,description,date\n\
                   e1,1,79228162514264337593543950335,Yacht,2024-01-01\n";
        assert!(read_expenses(csv.as_bytes()).is_err());
    }

    #[test]
    fn non_positive_expense_amount_is_an_error() {
        let zero = "id,payer_id,amount,description,date\ne1,1,0,Nothing,2024-01-01\n";
        let negative = "id,payer_id,amount,description,date\ne1,1,-5,Refund,2024-01-01\n";
        assert!(read_expenses(zero.as_bytes()).is_err());
        assert!(read_expenses(negative.as_bytes()).is_err());
    }

    #[test]
    fn largest_accepted_amount_is_read() {
        let csv = "id,payer_id,amount,description,date\ne1,1,1000000.00,House,2024-01-01\n";
        let expenses = read_expenses(csv.as_bytes()).unwrap();
        assert_eq!(expenses[0].amount, money("1000000"));
    }

    #[test]
    fn split_amounts_are_bounded() {
        let zero = "id,expense_id,member_id,amount\ns1,e1,1,0.00\n";
        let negative = "id,expense_id,member_id,amount\ns1,e1,1,-0.01\n";
        let oversized = "id,expense_id,member_id,amount\ns1,e1,1,1000000.01\n";

        assert_eq!(read_splits(zero.as_bytes()).unwrap()[0].amount, money("0"));
        assert!(read_splits(negative.as_bytes()).is_err());
        assert!(read_splits(oversized.as_bytes()).is_err());
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = "id,expense_id,member_id\ns1,e1,1\n";
        assert!(read_splits(csv.as_bytes()).is_err());
    }

    #[test]
    fn balances_are_written_with_two_decimals() {
        let balance = MemberBalance {
            member_id: MemberId::new("1"),
            member_name: String::from("Alice"),
            total_paid: money("90"),
            total_owed: money("30"),
            balance: money("60"),
        };

        let out = output_csv(BALANCE_HEADERS, [BalanceEntity::from_balance(&balance)]).unwrap();

        assert_eq!(out, "member_id,member_name,balance\n1,Alice,60.00\n");
    }

    #[test]
    fn settlements_are_flattened() {
        let settlement = Settlement {
            from: MemberRef {
                id: MemberId::new("2"),
                name: String::from("Bob"),
            },
            to: MemberRef {
                id: MemberId::new("1"),
                name: String::from("Alice"),
            },
            amount: money("30"),
        };

        let out = output_csv(
            SETTLEMENT_HEADERS,
            [SettlementEntity::from_settlement(&settlement)],
        )
        .unwrap();

        assert_eq!(
            out,
            "from_member_id,from_member_name,to_member_id,to_member_name,amount\n2,Bob,1,Alice,30.00\n"
        );
    }

    #[test]
    fn empty_output_still_has_headers() {
        let out = output_csv(SETTLEMENT_HEADERS, Vec::<SettlementEntity>::new()).unwrap();
        assert_eq!(
            out,
            "from_member_id,from_member_name,to_member_id,to_member_name,amount\n"
        );
    }
}
