use tracing::debug;

use crate::types::{MemberBalance, MemberRef, MonetaryAmount, Settlement};

/// A member still waiting to be settled, with the amount left to send or receive.
struct Outstanding {
    member: MemberRef,
    remaining: MonetaryAmount,
}

fn partition(balances: &[MemberBalance]) -> (Vec<Outstanding>, Vec<Outstanding>) {
    let mut creditors = Vec::new();
    let mut debtors = Vec::new();

    for balance in balances.iter().filter(|b| !b.balance.is_negligible()) {
        let outstanding = Outstanding {
            member: balance.member(),
            remaining: balance.balance.abs(),
        };
        if balance.balance.is_positive() {
            creditors.push(outstanding);
        } else {
            debtors.push(outstanding);
        }
    }

    // sort_by is stable, so equal amounts keep their input order
    creditors.sort_by(|a, b| b.remaining.cmp(&a.remaining));
    debtors.sort_by(|a, b| b.remaining.cmp(&a.remaining));

    (creditors, debtors)
}

/// Greedily pairs the largest remaining debtor with the largest remaining creditor until one
/// side runs out.
///
/// This keeps the number of transfers low for the usual shapes of group debt but is not
/// guaranteed to be the global minimum. Members less than a cent from zero take no part, while a
/// debt of exactly one cent is still paid.
pub fn calculate_settlements(balances: &[MemberBalance]) -> Vec<Settlement> {
    let (mut creditors, mut debtors) = partition(balances);
    let mut settlements = Vec::new();

    let mut creditor_idx = 0;
    let mut debtor_idx = 0;

    while creditor_idx < creditors.len() && debtor_idx < debtors.len() {
        let creditor = &mut creditors[creditor_idx];
        let debtor = &mut debtors[debtor_idx];

        let amount = creditor.remaining.min(debtor.remaining);

        if !amount.is_negligible() {
            let settlement = Settlement {
                from: debtor.member.clone(),
                to: creditor.member.clone(),
                amount: amount.round_cents(),
            };
            debug!(
                from = %settlement.from.id,
                to = %settlement.to.id,
                amount = %settlement.amount,
                "settlement"
            );
            settlements.push(settlement);
        }

        creditor.remaining = creditor.remaining - amount;
        debtor.remaining = debtor.remaining - amount;

        if creditor.remaining.is_negligible() {
            creditor_idx += 1;
        }
        if debtor.remaining.is_negligible() {
            debtor_idx += 1;
        }
    }

    settlements
}

/// Applies transfers to a set of balances: the receiver's balance falls by the amount and the
/// sender's rises by it. A complete settlement leaves every member within a cent of zero.
pub fn apply_settlements(
    balances: &[MemberBalance],
    settlements: &[Settlement],
) -> Vec<MemberBalance> {
    balances
        .iter()
        .map(|b| {
            let received: MonetaryAmount = settlements
                .iter()
                .filter(|s| s.to.id == b.member_id)
                .map(|s| s.amount)
                .sum();
            let sent: MonetaryAmount = settlements
                .iter()
                .filter(|s| s.from.id == b.member_id)
                .map(|s| s.amount)
                .sum();
            MemberBalance {
                balance: b.balance - received + sent,
                ..b.clone()
            }
        })
        .collect()
}
