//! Balance reducer - net positions and simplified debts for a group
//!
//! Net balances are positive for members who are owed money and negative for
//! members who owe. Simplification is a greedy pass that matches debtors to
//! creditors in balance order. It is deterministic and O(debtors x creditors)
//! but does not always find the fewest possible transfers.

use super::group::{Expense, Group, Settlement};
use super::split::ParticipantId;
use super::warnings::Warning;
use crate::money::{self, EPSILON};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;

/// Net position per participant.
///
/// Iteration order is the order participants were first seen: listed members
/// first, then expenses (payer, then shares) and settlements (payer, then
/// payee) in history order. Debts are matched in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetBalances(IndexMap<ParticipantId, Decimal>);

impl NetBalances {
    pub fn new(members: &[ParticipantId]) -> Self {
        NetBalances(members.iter().map(|m| (m.clone(), Decimal::ZERO)).collect())
    }

    fn entry(&mut self, participant: &str) -> &mut Decimal {
        self.0.entry(participant.to_string()).or_insert(Decimal::ZERO)
    }

    pub fn record_expense(&mut self, expense: &Expense) {
        *self.entry(&expense.payer) += expense.total;
        for (participant, share) in expense.allocations.iter() {
            *self.entry(participant) -= share;
        }
    }

    /// Paying someone back moves the payer towards being owed and the payee
    /// towards owing.
    pub fn record_settlement(&mut self, settlement: &Settlement) {
        *self.entry(&settlement.payer) += settlement.amount;
        *self.entry(&settlement.payee) -= settlement.amount;
    }

    pub fn get(&self, participant: &str) -> Decimal {
        self.0.get(participant).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, Decimal)> {
        self.0.iter().map(|(p, b)| (p, *b))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    /// One minor unit of drift allowed per participant
    pub fn tolerance(&self) -> Decimal {
        EPSILON * Decimal::from(self.0.len())
    }

    pub fn check_integrity(&self) -> Option<Warning> {
        let total = self.total();
        let tolerance = self.tolerance();
        (total.abs() > tolerance).then_some(Warning::IntegrityImbalance { total, tolerance })
    }
}

/// Settle-up instruction: `debtor` pays `creditor` `amount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebtEdge {
    pub debtor: ParticipantId,
    pub creditor: ParticipantId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub net: NetBalances,
    pub debts: Vec<DebtEdge>,
    pub warnings: Vec<Warning>,
}

/// Combine the full history into net balances, seeded with `members`.
pub fn net_balances(
    members: &[ParticipantId],
    expenses: &[Expense],
    settlements: &[Settlement],
) -> NetBalances {
    let mut net = NetBalances::new(members);
    for expense in expenses {
        net.record_expense(expense);
    }
    for settlement in settlements {
        net.record_settlement(settlement);
    }
    net
}

/// Reduce net balances to a list of debts.
pub fn simplify(net: &NetBalances) -> Vec<DebtEdge> {
    let mut creditors: Vec<(&ParticipantId, Decimal)> = net
        .iter()
        .filter(|(_, balance)| *balance > EPSILON)
        .map(|(p, balance)| (p, money::round(balance)))
        .collect();
    let debtors: Vec<(&ParticipantId, Decimal)> = net
        .iter()
        .filter(|(_, balance)| *balance < -EPSILON)
        .map(|(p, balance)| (p, money::round(balance.abs())))
        .collect();

    let mut debts = Vec::new();
    for (debtor, debt) in debtors {
        let mut remaining = debt;
        for (creditor, credit) in creditors.iter_mut() {
            if remaining <= EPSILON {
                break;
            }
            let amount = remaining.min(*credit);
            if amount > EPSILON {
                log::debug!("{} pays {} {}", debtor, creditor, amount);
                debts.push(DebtEdge {
                    debtor: debtor.clone(),
                    creditor: creditor.to_string(),
                    amount: money::round(amount),
                });
                remaining -= amount;
                *credit -= amount;
            }
        }
        if remaining > EPSILON {
            log::debug!("{} left with {} unmatched", debtor, remaining);
        }
    }
    debts
}

/// Compute the debts for a group history.
pub fn compute_group_balances(expenses: &[Expense], settlements: &[Settlement]) -> Vec<DebtEdge> {
    reduce_history(&[], expenses, settlements).debts
}

/// Net balances, debts and integrity diagnostics for a group.
pub fn reduce(group: &Group) -> BalanceReport {
    reduce_history(group.members(), group.expenses(), group.settlements())
}

fn reduce_history(
    members: &[ParticipantId],
    expenses: &[Expense],
    settlements: &[Settlement],
) -> BalanceReport {
    let net = net_balances(members, expenses, settlements);
    let mut warnings = Vec::new();
    if let Some(warning) = net.check_integrity() {
        log::warn!("Integrity check failed: {}", warning);
        warnings.push(warning);
    }
    let debts = simplify(&net);
    BalanceReport {
        net,
        debts,
        warnings,
    }
}

/// One member's totals within a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub member: ParticipantId,
    /// Expense totals this member paid
    pub paid: Decimal,
    /// Sum of this member's shares
    pub share: Decimal,
    pub settlements_paid: Decimal,
    pub settlements_received: Decimal,
    pub net: Decimal,
}

pub fn member_summary(group: &Group, member: &str) -> MemberSummary {
    let mut summary = MemberSummary {
        member: member.to_string(),
        ..Default::default()
    };
    for expense in group.expenses() {
        if expense.payer == member {
            summary.paid += expense.total;
        }
        summary.share += expense.allocations.get(member).unwrap_or(Decimal::ZERO);
    }
    for settlement in group.settlements() {
        if settlement.payer == member {
            summary.settlements_paid += settlement.amount;
        }
        if settlement.payee == member {
            summary.settlements_received += settlement.amount;
        }
    }
    summary.net = money::round(
        summary.paid - summary.share + summary.settlements_paid - summary.settlements_received,
    );
    summary
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupPosition {
    pub group: String,
    pub summary: MemberSummary,
}

/// A member's position across several groups
#[derive(Debug, Clone, Serialize)]
pub struct MemberPosition {
    pub member: ParticipantId,
    pub groups: Vec<GroupPosition>,
    /// Sum of positive group balances
    pub total_owed: Decimal,
    /// Sum of negative group balances, as a positive amount
    pub total_owing: Decimal,
    pub net: Decimal,
}

pub fn member_position<'a, I>(groups: I, member: &str) -> MemberPosition
where
    I: IntoIterator<Item = &'a Group>,
{
    let mut total_owed = Decimal::ZERO;
    let mut total_owing = Decimal::ZERO;
    let mut positions = Vec::new();

    for group in groups {
        let summary = member_summary(group, member);
        if summary.net > Decimal::ZERO {
            total_owed += summary.net;
        } else if summary.net < Decimal::ZERO {
            total_owing += summary.net.abs();
        }
        positions.push(GroupPosition {
            group: group.name.clone(),
            summary,
        });
    }

    MemberPosition {
        member: member.to_string(),
        groups: positions,
        total_owed: money::round(total_owed),
        total_owing: money::round(total_owing),
        net: money::round(total_owed - total_owing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::split::SplitInput;
    use chrono::{DateTime, NaiveDate};
    use rust_decimal_macros::dec;

    fn equal_expense(id: &str, payer: &str, total: Decimal, participants: &[&str]) -> Expense {
        Expense::new(
            id,
            payer,
            total,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            SplitInput::Equal {
                participants: participants.iter().map(|p| p.to_string()).collect(),
            },
        )
        .unwrap()
    }

    fn settlement(id: &str, payer: &str, payee: &str, amount: Decimal) -> Settlement {
        Settlement::new(
            id,
            payer,
            payee,
            amount,
            DateTime::parse_from_rfc3339("2024-05-02T12:00:00+00:00").unwrap(),
        )
        .unwrap()
    }

    fn edge(debtor: &str, creditor: &str, amount: Decimal) -> DebtEdge {
        DebtEdge {
            debtor: debtor.to_string(),
            creditor: creditor.to_string(),
            amount,
        }
    }

    fn balances(entries: &[(&str, Decimal)]) -> NetBalances {
        NetBalances(entries.iter().map(|(p, b)| (p.to_string(), *b)).collect())
    }

    #[test]
    fn payer_owed_by_everyone_else() {
        let expenses = vec![equal_expense("e1", "a", dec!(90), &["a", "b", "c"])];

        let debts = compute_group_balances(&expenses, &[]);

        assert_eq!(
            debts,
            vec![edge("b", "a", dec!(30)), edge("c", "a", dec!(30))]
        );
    }

    #[test]
    fn net_balances_combine_history() {
        let expenses = vec![
            equal_expense("e1", "a", dec!(90), &["a", "b", "c"]),
            equal_expense("e2", "b", dec!(30), &["a", "b", "c"]),
        ];
        let settlements = vec![settlement("s1", "c", "a", dec!(15))];

        let net = net_balances(&[], &expenses, &settlements);

        assert_eq!(net.get("a"), dec!(35));
        assert_eq!(net.get("b"), dec!(-10));
        assert_eq!(net.get("c"), dec!(-25));
        assert_eq!(net.total(), Decimal::ZERO);
    }

    #[test]
    fn members_seed_order_and_zero_balances() {
        let members = vec!["z".to_string(), "a".to_string(), "idle".to_string()];
        let expenses = vec![equal_expense("e1", "a", dec!(10), &["a", "z"])];

        let net = net_balances(&members, &expenses, &[]);

        let order: Vec<_> = net.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(order, vec!["z", "a", "idle"]);
        assert_eq!(net.get("idle"), Decimal::ZERO);
    }

    #[test]
    fn greedy_matching_in_balance_order() {
        let net = balances(&[("a", dec!(50)), ("b", dec!(-20)), ("c", dec!(-30))]);
        assert_eq!(
            simplify(&net),
            vec![edge("b", "a", dec!(20)), edge("c", "a", dec!(30))]
        );
    }

    #[test]
    fn debtor_split_across_creditors() {
        let net = balances(&[
            ("a", dec!(10)),
            ("b", dec!(25)),
            ("c", dec!(-30)),
            ("d", dec!(-5)),
        ]);
        assert_eq!(
            simplify(&net),
            vec![
                edge("c", "a", dec!(10)),
                edge("c", "b", dec!(20)),
                edge("d", "b", dec!(5)),
            ]
        );
    }

    #[test]
    fn exhausted_creditors_are_not_reused() {
        let net = balances(&[("a", dec!(10)), ("b", dec!(-10)), ("c", dec!(10)), ("d", dec!(-10))]);
        assert_eq!(
            simplify(&net),
            vec![edge("b", "a", dec!(10)), edge("d", "c", dec!(10))]
        );
    }

    #[test]
    fn cent_level_balances_ignored() {
        let net = balances(&[("a", dec!(0.01)), ("b", dec!(-0.01))]);
        assert!(simplify(&net).is_empty());
    }

    #[test]
    fn settlement_clears_debt() {
        let expenses = vec![equal_expense("e1", "a", dec!(90), &["a", "b", "c"])];
        let before = compute_group_balances(&expenses, &[]);
        let owed = before.iter().find(|d| d.debtor == "b").unwrap().amount;

        let settlements = vec![settlement("s1", "b", "a", owed)];
        let after = compute_group_balances(&expenses, &settlements);

        assert!(after.iter().all(|d| !(d.debtor == "b" && d.creditor == "a")));
        assert_eq!(after, vec![edge("c", "a", dec!(30))]);
    }

    #[test]
    fn reduction_is_deterministic() {
        let expenses = vec![
            equal_expense("e1", "a", dec!(100), &["a", "b", "c"]),
            equal_expense("e2", "c", dec!(45.5), &["b", "c", "d"]),
            equal_expense("e3", "d", dec!(12.01), &["a", "d"]),
        ];
        let settlements = vec![settlement("s1", "b", "c", dec!(7))];

        let first = compute_group_balances(&expenses, &settlements);
        let second = compute_group_balances(&expenses, &settlements);
        assert_eq!(first, second);
    }

    #[test]
    fn settlement_moves_payer_up_and_payee_down() {
        let expenses = vec![equal_expense("e1", "a", dec!(90), &["a", "b", "c"])];
        let settlements = vec![settlement("s1", "b", "a", dec!(10))];

        let net = net_balances(&[], &expenses, &settlements);

        assert_eq!(net.get("a"), dec!(50));
        assert_eq!(net.get("b"), dec!(-20));
        assert_eq!(net.get("c"), dec!(-30));
    }

    /// Deterministic mixed-policy history: every fourth expense uses the
    /// same policy, every third is followed by a settlement.
    fn synthetic_history(seed: u64) -> (Vec<Expense>, Vec<Settlement>) {
        let mut state = seed;
        let mut next = move |bound: u64| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) % bound
        };
        let people = ["a", "b", "c", "d", "e"];
        let mut expenses = Vec::new();
        let mut settlements = Vec::new();

        for i in 0..24 {
            let payer = people[next(5) as usize];
            let count = 2 + next(4) as usize;
            let start = next(5) as usize;
            let participants: Vec<ParticipantId> = (0..count)
                .map(|k| people[(start + k) % people.len()].to_string())
                .collect();
            let total = Decimal::new(next(100_000) as i64 + 1, 2);
            let rest = Decimal::from(count - 1);

            let split = match i % 4 {
                0 => SplitInput::Equal {
                    participants: participants.clone(),
                },
                1 => {
                    let base = money::round(total / Decimal::from(count));
                    let mut amounts: IndexMap<ParticipantId, Decimal> =
                        participants.iter().map(|p| (p.clone(), base)).collect();
                    if let Some(last) = amounts.values_mut().last() {
                        *last = total - base * rest;
                    }
                    SplitInput::Exact { amounts }
                }
                2 => {
                    let base = money::round(dec!(100) / Decimal::from(count));
                    let mut percentages: IndexMap<ParticipantId, Decimal> =
                        participants.iter().map(|p| (p.clone(), base)).collect();
                    if let Some(first) = percentages.values_mut().next() {
                        *first = dec!(100) - base * rest;
                    }
                    SplitInput::Percentage { percentages }
                }
                _ => SplitInput::Shares {
                    weights: participants
                        .iter()
                        .map(|p| (p.clone(), next(5) as u32 + 1))
                        .collect(),
                },
            };
            let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
            expenses.push(Expense::new(format!("e{i}"), payer, total, date, split).unwrap());

            if i % 3 == 0 {
                let from = next(5) as usize;
                let to = (from + 1 + next(4) as usize) % people.len();
                let amount = Decimal::new(next(5_000) as i64 + 1, 2);
                settlements.push(settlement(&format!("s{i}"), people[from], people[to], amount));
            }
        }
        (expenses, settlements)
    }

    #[test]
    fn balances_sum_to_zero_within_tolerance() {
        for seed in 1..=8 {
            let (expenses, settlements) = synthetic_history(seed);
            let net = net_balances(&[], &expenses, &settlements);

            assert!(
                net.total().abs() <= net.tolerance(),
                "seed {}: total {}",
                seed,
                net.total()
            );
            assert!(net.check_integrity().is_none(), "seed {}", seed);
            assert!(expenses.iter().all(|e| e.allocation_mismatch().is_none()));

            for debt in simplify(&net) {
                assert!(debt.amount > EPSILON, "seed {}: {:?}", seed, debt);
                assert_ne!(debt.debtor, debt.creditor);
            }
        }
    }

    #[test]
    fn skewed_history_raises_integrity_warning() {
        let mut expense = equal_expense("e1", "a", dec!(90), &["a", "b", "c"]);
        // shares no longer add up to the total
        expense.total = dec!(120);

        let group_expenses = vec![expense];
        let report = reduce_history(&[], &group_expenses, &[]);

        assert_eq!(
            report.warnings,
            vec![Warning::IntegrityImbalance {
                total: dec!(30),
                tolerance: dec!(0.03),
            }]
        );
        // still produces a best-effort reduction
        assert_eq!(
            report.debts,
            vec![edge("b", "a", dec!(30)), edge("c", "a", dec!(30))]
        );
    }

    #[test]
    fn member_summary_and_position() {
        let mut trip = Group::new("trip", vec![]);
        trip.add_expense(equal_expense("e1", "a", dec!(90), &["a", "b", "c"]))
            .unwrap();
        trip.record_settlement(settlement("s1", "b", "a", dec!(10)))
            .unwrap();

        let mut flat = Group::new("flat", vec![]);
        flat.add_expense(equal_expense("e1", "b", dec!(40), &["a", "b"]))
            .unwrap();

        let summary = member_summary(&trip, "a");
        assert_eq!(summary.paid, dec!(90));
        assert_eq!(summary.share, dec!(30));
        assert_eq!(summary.settlements_received, dec!(10));
        assert_eq!(summary.net, dec!(50));

        let position = member_position([&trip, &flat], "a");
        assert_eq!(position.total_owed, dec!(50));
        assert_eq!(position.total_owing, dec!(20));
        assert_eq!(position.net, dec!(30));
        assert_eq!(position.groups.len(), 2);
        assert_eq!(position.groups[1].group, "flat");
    }

    #[test]
    fn reduce_uses_group_members() {
        let mut group = Group::new("g", vec!["c".to_string(), "b".to_string(), "a".to_string()]);
        group
            .add_expense(equal_expense("e1", "a", dec!(90), &["a", "b", "c"]))
            .unwrap();

        let report = reduce(&group);
        assert!(report.warnings.is_empty());
        assert_eq!(
            report.debts,
            vec![edge("c", "a", dec!(30)), edge("b", "a", dec!(30))]
        );
    }
}
