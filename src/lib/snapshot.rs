use im::{HashMap, HashSet, Vector};
use tracing::warn;

use crate::splits::totals_match;
use crate::types::{Expense, ExpenseId, ExpenseSplit, Member, MemberId, MonetaryAmount};

/// Positions of each expense's splits in the input slice.
type SplitIndex = HashMap<ExpenseId, Vector<usize>>;

fn index_split(index: SplitIndex, (idx, split): (usize, &ExpenseSplit)) -> SplitIndex {
    index.update_with(
        split.expense_id.clone(),
        Vector::unit(idx),
        |mut positions: Vector<usize>, new: Vector<usize>| {
            positions.append(new);
            positions
        },
    )
}

fn record(mut issues: Vector<SnapshotIssue>, issue: SnapshotIssue) -> Vector<SnapshotIssue> {
    issues.push_back(issue);
    issues
}

/// Something in a stored group that would make its balances misleading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotIssue {
    /// The expense is paid by a member outside the group.
    UnknownPayer {
        expense_id: ExpenseId,
        payer_id: MemberId,
    },
    /// A split of the expense is owed by a member outside the group.
    UnknownMember {
        expense_id: ExpenseId,
        member_id: MemberId,
    },
    DuplicateMember {
        expense_id: ExpenseId,
        member_id: MemberId,
    },
    NoSplits { expense_id: ExpenseId },
    TotalMismatch {
        expense_id: ExpenseId,
        expected: MonetaryAmount,
        actual: MonetaryAmount,
    },
    /// A split points at an expense that does not exist.
    UnknownExpense {
        expense_id: ExpenseId,
        member_id: MemberId,
    },
}

impl SnapshotIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            SnapshotIssue::UnknownPayer { .. } => "unknown_payer",
            SnapshotIssue::UnknownMember { .. } => "unknown_member",
            SnapshotIssue::DuplicateMember { .. } => "duplicate_member",
            SnapshotIssue::NoSplits { .. } => "no_splits",
            SnapshotIssue::TotalMismatch { .. } => "total_mismatch",
            SnapshotIssue::UnknownExpense { .. } => "unknown_expense",
        }
    }

    pub fn expense_id(&self) -> &ExpenseId {
        match self {
            SnapshotIssue::UnknownPayer { expense_id, .. }
            | SnapshotIssue::UnknownMember { expense_id, .. }
            | SnapshotIssue::DuplicateMember { expense_id, .. }
            | SnapshotIssue::NoSplits { expense_id }
            | SnapshotIssue::TotalMismatch { expense_id, .. }
            | SnapshotIssue::UnknownExpense { expense_id, .. } => expense_id,
        }
    }

    pub fn member_id(&self) -> Option<&MemberId> {
        match self {
            SnapshotIssue::UnknownPayer { payer_id, .. } => Some(payer_id),
            SnapshotIssue::UnknownMember { member_id, .. }
            | SnapshotIssue::DuplicateMember { member_id, .. }
            | SnapshotIssue::UnknownExpense { member_id, .. } => Some(member_id),
            SnapshotIssue::NoSplits { .. } | SnapshotIssue::TotalMismatch { .. } => None,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            SnapshotIssue::TotalMismatch {
                expected, actual, ..
            } => format!("splits sum to {} but the expense amount is {}", actual, expected),
            _ => String::new(),
        }
    }
}

fn check_expense(
    issues: Vector<SnapshotIssue>,
    expense: &Expense,
    members: &HashSet<MemberId>,
    splits: &[&ExpenseSplit],
) -> Vector<SnapshotIssue> {
    let issues = if members.contains(&expense.payer_id) {
        issues
    } else {
        record(
            issues,
            SnapshotIssue::UnknownPayer {
                expense_id: expense.id.clone(),
                payer_id: expense.payer_id.clone(),
            },
        )
    };

    let (issues, _) = splits
        .iter()
        .fold((issues, HashSet::<MemberId>::new()), |(acc, seen), split| {
            let acc = if members.contains(&split.member_id) {
                acc
            } else {
                record(
                    acc,
                    SnapshotIssue::UnknownMember {
                        expense_id: expense.id.clone(),
                        member_id: split.member_id.clone(),
                    },
                )
            };
            let acc = if seen.contains(&split.member_id) {
                record(
                    acc,
                    SnapshotIssue::DuplicateMember {
                        expense_id: expense.id.clone(),
                        member_id: split.member_id.clone(),
                    },
                )
            } else {
                acc
            };
            (acc, seen.update(split.member_id.clone()))
        });

    if splits.is_empty() {
        return record(
            issues,
            SnapshotIssue::NoSplits {
                expense_id: expense.id.clone(),
            },
        );
    }

    if totals_match(expense.amount, splits.iter().map(|s| s.amount)) {
        issues
    } else {
        record(
            issues,
            SnapshotIssue::TotalMismatch {
                expense_id: expense.id.clone(),
                expected: expense.amount,
                actual: splits.iter().map(|s| s.amount).sum(),
            },
        )
    }
}

/// Looks for referential and arithmetic problems in a group's stored data.
///
/// Issues are reported expense by expense, in the order the expenses were given, followed by
/// splits that belong to no known expense.
pub fn check_snapshot(
    members: &[Member],
    expenses: &[Expense],
    splits: &[ExpenseSplit],
) -> Vec<SnapshotIssue> {
    let member_ids: HashSet<MemberId> = members.iter().map(|m| m.id.clone()).collect();
    let expense_ids: HashSet<ExpenseId> = expenses.iter().map(|e| e.id.clone()).collect();

    let by_expense = splits
        .iter()
        .enumerate()
        .fold(SplitIndex::new(), index_split);

    let issues = expenses.iter().fold(Vector::new(), |acc, expense| {
        let own: Vec<&ExpenseSplit> = by_expense
            .get(&expense.id)
            .map(|positions| positions.iter().map(|idx| &splits[*idx]).collect())
            .unwrap_or_default();
        check_expense(acc, expense, &member_ids, &own)
    });

    let issues = splits
        .iter()
        .filter(|s| !expense_ids.contains(&s.expense_id))
        .fold(issues, |acc, split| {
            record(
                acc,
                SnapshotIssue::UnknownExpense {
                    expense_id: split.expense_id.clone(),
                    member_id: split.member_id.clone(),
                },
            )
        });

    for issue in issues.iter() {
        warn!(
            kind = issue.kind(),
            expense = %issue.expense_id(),
            "inconsistent group data"
        );
    }

    issues.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::types::{
        Expense, ExpenseId, ExpenseSplit, Member, MemberId, MonetaryAmount, SplitId,
    };

    use super::{check_snapshot, SnapshotIssue};

    fn money(s: &str) -> MonetaryAmount {
        s.parse().unwrap()
    }

    fn members() -> Vec<Member> {
        vec![
            Member::new(MemberId::new("1"), "Alice"),
            Member::new(MemberId::new("2"), "Bob"),
        ]
    }

    fn expense(id: &str, payer: &str, amount: &str) -> Expense {
        Expense {
            id: ExpenseId::new(id),
            payer_id: MemberId::new(payer),
            amount: money(amount),
            description: String::from("Lunch"),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    fn split(expense: &str, member: &str, amount: &str) -> ExpenseSplit {
        ExpenseSplit {
            id: SplitId::new(format!("{}-{}", expense, member)),
            expense_id: ExpenseId::new(expense),
            member_id: MemberId::new(member),
            amount: money(amount),
        }
    }

    #[test]
    fn consistent_group_has_no_issues() {
        let expenses = vec![expense("e1", "1", "20")];
        let splits = vec![split("e1", "1", "10"), split("e1", "2", "10")];

        assert!(check_snapshot(&members(), &expenses, &splits).is_empty());
    }

    #[test]
    fn rounding_slack_is_tolerated() {
        let expenses = vec![expense("e1", "1", "10")];
        let splits = vec![split("e1", "1", "3.333"), split("e1", "2", "6.666")];

        assert!(check_snapshot(&members(), &expenses, &splits).is_empty());
    }

    #[test]
    fn unknown_payer_is_reported() {
        let expenses = vec![expense("e1", "9", "20")];
        let splits = vec![split("e1", "1", "20")];

        let issues = check_snapshot(&members(), &expenses, &splits);

        assert_eq!(
            issues,
            vec![SnapshotIssue::UnknownPayer {
                expense_id: ExpenseId::new("e1"),
                payer_id: MemberId::new("9"),
            }]
        );
    }

    #[test]
    fn unknown_and_duplicate_split_members_are_reported() {
        let expenses = vec![expense("e1", "1", "30")];
        let splits = vec![
            split("e1", "1", "10"),
            split("e1", "7", "10"),
            split("e1", "1", "10"),
        ];

        let issues = check_snapshot(&members(), &expenses, &splits);

        let kinds: Vec<&str> = issues.iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec!["unknown_member", "duplicate_member"]);
        assert_eq!(issues[1].member_id(), Some(&MemberId::new("1")));
    }

    #[test]
    fn mismatched_total_is_reported() {
        let expenses = vec![expense("e1", "1", "100")];
        let splits = vec![split("e1", "1", "50"), split("e1", "2", "40")];

        let issues = check_snapshot(&members(), &expenses, &splits);

        assert_eq!(
            issues,
            vec![SnapshotIssue::TotalMismatch {
                expense_id: ExpenseId::new("e1"),
                expected: money("100"),
                actual: money("90"),
            }]
        );
        assert_eq!(
            issues[0].detail(),
            "splits sum to 90.00 but the expense amount is 100.00"
        );
    }

    #[test]
    fn expense_without_splits_is_reported_once() {
        let expenses = vec![expense("e1", "1", "100")];

        let issues = check_snapshot(&members(), &expenses, &[]);

        assert_eq!(
            issues,
            vec![SnapshotIssue::NoSplits {
                expense_id: ExpenseId::new("e1"),
            }]
        );
    }

    #[test]
    fn interleaved_splits_are_grouped_by_expense() {
        let expenses = vec![expense("e1", "1", "20"), expense("e2", "2", "9")];
        let splits = vec![
            split("e2", "1", "4"),
            split("e1", "1", "10"),
            split("e2", "2", "5"),
            split("e1", "2", "10"),
        ];

        assert!(check_snapshot(&members(), &expenses, &splits).is_empty());
    }

    #[test]
    fn orphan_splits_come_last() {
        let expenses = vec![expense("e1", "9", "10")];
        let splits = vec![split("gone", "2", "5"), split("e1", "1", "10")];

        let issues = check_snapshot(&members(), &expenses, &splits);

        let kinds: Vec<&str> = issues.iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec!["unknown_payer", "unknown_expense"]);
        assert_eq!(issues[1].expense_id(), &ExpenseId::new("gone"));
    }
}
