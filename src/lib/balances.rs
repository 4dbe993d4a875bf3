use im::HashMap;
use tracing::debug;

use crate::types::{BalanceState, Expense, ExpenseSplit, Member, MemberBalance, MemberId};

type BalanceLedger = HashMap<MemberId, BalanceState>;

fn credit_payer(ledger: BalanceLedger, expense: &Expense) -> BalanceLedger {
    match ledger.get(&expense.payer_id) {
        Some(state) => {
            let new_state = state.map_paid(|p| p + expense.amount);
            ledger.update(expense.payer_id.clone(), new_state)
        }
        None => {
            debug!(
                expense = %expense.id,
                payer = %expense.payer_id,
                "ignoring expense paid by a member outside the group"
            );
            ledger
        }
    }
}

fn debit_member(ledger: BalanceLedger, split: &ExpenseSplit) -> BalanceLedger {
    match ledger.get(&split.member_id) {
        Some(state) => {
            let new_state = state.map_owed(|o| o + split.amount);
            ledger.update(split.member_id.clone(), new_state)
        }
        None => {
            debug!(
                expense = %split.expense_id,
                member = %split.member_id,
                "ignoring split owed by a member outside the group"
            );
            ledger
        }
    }
}

fn opening_ledger(members: &[Member]) -> BalanceLedger {
    members
        .iter()
        .map(|m| (m.id.clone(), BalanceState::named(&m.name)))
        .collect()
}

/// Folds every expense and split of a group into one balance per member.
///
/// Contributions that reference a member not present in `members` are skipped. Balances are
/// returned in the order the members were given.
pub fn calculate_balances(
    members: &[Member],
    expenses: &[Expense],
    splits: &[ExpenseSplit],
) -> Vec<MemberBalance> {
    let paid = expenses.iter().fold(opening_ledger(members), credit_payer);
    let ledger = splits.iter().fold(paid, debit_member);

    members
        .iter()
        .filter_map(|m| {
            ledger
                .get(&m.id)
                .map(|state| MemberBalance::from_state(m.id.clone(), state.clone()))
        })
        .collect()
}
