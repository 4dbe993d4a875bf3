mod balances;
mod group_code;
mod io;
mod random;
mod settlements;
mod snapshot;
mod splits;
mod types;
mod validation;

use std::{error::Error, path::PathBuf};

use im::HashSet;
use tracing::info;

pub use balances::calculate_balances;
pub use group_code::{
    days_until_expiry, generate_group_code, generate_unique_group_code, is_group_expired,
    is_memorable_code, is_valid_group_code, CODE_LENGTH, GROUP_LIFETIME_DAYS,
};
pub use io::{load_snapshot, read_expenses, read_members, read_splits, RowError};
pub use random::{RandomSource, SeededRandom};
pub use settlements::{apply_settlements, calculate_settlements};
pub use snapshot::{check_snapshot, SnapshotIssue};
pub use splits::{split_equally, split_weighted, totals_match, validate_splits, SplitError};
pub use types::{
    BalanceView, Expense, ExpenseId, ExpenseSplit, GroupSnapshot, Member, MemberBalance,
    MemberId, MemberRef, MonetaryAmount, Settlement, SplitAmount, SplitId,
};
pub use validation::{
    can_delete_member, is_duplicate_member_name, parse_amount, parse_expense_date,
    validate_expense, DeletionCheck, ExpenseValidationError, NewExpense,
};

use io::{
    output_csv, BalanceEntity, FullBalanceEntity, IssueEntity, SettlementEntity,
    SplitAmountEntity, BALANCE_HEADERS, FULL_BALANCE_HEADERS, ISSUE_HEADERS, SETTLEMENT_HEADERS,
    SPLIT_HEADERS,
};

/// Attempts per code before giving up on finding one not already handed out.
const CODE_ATTEMPTS: usize = 10;

/// Locations of the three CSV files that make up a group.
#[derive(Clone, Debug)]
pub struct SnapshotFiles {
    pub members: PathBuf,
    pub expenses: PathBuf,
    pub splits: PathBuf,
}

impl SnapshotFiles {
    pub fn load(&self) -> Result<GroupSnapshot, Box<dyn Error>> {
        load_snapshot(&self.members, &self.expenses, &self.splits)
    }
}

fn render_balances(balances: &[MemberBalance], full: bool) -> Result<String, Box<dyn Error>> {
    if full {
        output_csv(
            FULL_BALANCE_HEADERS,
            balances.iter().map(FullBalanceEntity::from_balance),
        )
    } else {
        output_csv(BALANCE_HEADERS, balances.iter().map(BalanceEntity::from_balance))
    }
}

fn render_settlements(settlements: &[Settlement]) -> Result<String, Box<dyn Error>> {
    output_csv(
        SETTLEMENT_HEADERS,
        settlements.iter().map(SettlementEntity::from_settlement),
    )
}

fn group_balances(snapshot: &GroupSnapshot) -> Vec<MemberBalance> {
    let balances = calculate_balances(&snapshot.members, &snapshot.expenses, &snapshot.splits);
    info!(
        members = snapshot.members.len(),
        expenses = snapshot.expenses.len(),
        splits = snapshot.splits.len(),
        "balances calculated"
    );
    balances
}

fn group_settlements(balances: &[MemberBalance]) -> Vec<Settlement> {
    let settlements = calculate_settlements(balances);
    info!(transfers = settlements.len(), "settlements calculated");
    settlements
}

pub fn balances_report(files: &SnapshotFiles, full: bool) -> Result<String, Box<dyn Error>> {
    let snapshot = files.load()?;
    render_balances(&group_balances(&snapshot), full)
}

pub fn settlements_report(files: &SnapshotFiles) -> Result<String, Box<dyn Error>> {
    let snapshot = files.load()?;
    render_settlements(&group_settlements(&group_balances(&snapshot)))
}

/// Balances, a blank line, then the settlements that clear them.
pub fn group_report(files: &SnapshotFiles) -> Result<String, Box<dyn Error>> {
    let snapshot = files.load()?;
    let balances = group_balances(&snapshot);
    let settlements = group_settlements(&balances);

    Ok(format!(
        "{}\n{}",
        render_balances(&balances, false)?,
        render_settlements(&settlements)?
    ))
}

pub fn check_report(files: &SnapshotFiles) -> Result<String, Box<dyn Error>> {
    let snapshot = files.load()?;
    let issues = check_snapshot(&snapshot.members, &snapshot.expenses, &snapshot.splits);
    info!(issues = issues.len(), "group checked");
    output_csv(ISSUE_HEADERS, issues.iter().map(IssueEntity::from_issue))
}

fn member_ids(ids: &[String]) -> Vec<MemberId> {
    ids.iter().map(|id| MemberId::new(id.trim())).collect()
}

fn render_splits(splits: &[SplitAmount]) -> Result<String, Box<dyn Error>> {
    output_csv(SPLIT_HEADERS, splits.iter().map(SplitAmountEntity::from_split))
}

pub fn equal_split_report(amount: &str, members: &[String]) -> Result<String, Box<dyn Error>> {
    let total = parse_amount(amount)?;
    let splits = split_equally(total, &member_ids(members))?;
    render_splits(&splits)
}

pub fn random_split_report<R: RandomSource>(
    amount: &str,
    members: &[String],
    source: &mut R,
) -> Result<String, Box<dyn Error>> {
    let total = parse_amount(amount)?;
    let splits = split_weighted(total, &member_ids(members), source)?;
    render_splits(&splits)
}

/// `count` distinct group codes, one per line.
pub fn group_codes_report<R: RandomSource>(
    source: &mut R,
    count: usize,
) -> Result<String, Box<dyn Error>> {
    let mut issued: HashSet<String> = HashSet::new();
    let mut lines = String::new();
    for _ in 0..count {
        let code = generate_unique_group_code(source, |c| issued.contains(c), CODE_ATTEMPTS)
            .ok_or("could not find an unused group code")?;
        lines.push_str(&code);
        lines.push('\n');
        issued = issued.update(code);
    }
    Ok(lines)
}
