//! Balance views over the bill collection.
//!
//! These are pure functions, recomputed on demand and never cached. Only
//! unsettled bills contribute; marking a bill paid removes it from both
//! sides of every balance.

use serde::Serialize;

use crate::{identities::UserId, messaging::ConversationId};

use super::{bills::Bill, money::Money};

/// A user's position across the whole ledger.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    /// The gross amount the user fronted on unsettled bills they paid.
    /// The payer's own share is not subtracted.
    pub total_owed: Money,

    /// The sum of the user's shares of unsettled bills that list them as
    /// an ower.
    pub total_owing: Money,
}

impl BalanceSummary {
    /// Positive when the user is owed more than they owe.
    pub fn net(&self) -> Money {
        self.total_owed - self.total_owing
    }
}

/// A user's position within a single conversation's bills.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBalance {
    /// The gross amount the user fronted in this conversation.
    pub paid: Money,

    /// The user's share of this conversation's unsettled bills.
    pub owed: Money,
}

/// Compute a user's owed/owing totals over every unsettled bill.
pub fn balance_summary(bills: &[Bill], user: &UserId) -> BalanceSummary {
    let mut summary = BalanceSummary::default();

    for bill in bills.iter().filter(|bill| !bill.is_paid()) {
        if bill.paid_by == *user {
            summary.total_owed += bill.amount;
        }

        if bill.owed_by.contains(user) {
            if let Some(share) = bill.share_of(user) {
                summary.total_owing += share;
            }
        }
    }

    summary
}

/// Compute a user's paid/owed totals within one conversation.
pub fn group_balance(bills: &[Bill], conversation: &ConversationId, user: &UserId) -> GroupBalance {
    let mut balance = GroupBalance::default();

    let in_conversation = bills
        .iter()
        .filter(|bill| bill.conversation_id == *conversation && !bill.is_paid());

    for bill in in_conversation {
        if bill.paid_by == *user {
            balance.paid += bill.amount;
        }

        if bill.owed_by.contains(user) {
            if let Some(share) = bill.share_of(user) {
                balance.owed += share;
            }
        }
    }

    balance
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use crate::ledger::domain::bills::{BillId, BillStatus};

    use super::*;

    fn bill(minor: i64, paid_by: &str, owed_by: &[&str], conversation: &str) -> Bill {
        let now = Utc::now();

        Bill {
            id: BillId::generate(),
            description: "Test bill".to_owned(),
            amount: Money::from_minor(minor),
            category: "general".to_owned(),
            paid_by: UserId::new(paid_by),
            owed_by: owed_by.iter().map(|id| UserId::new(*id)).collect(),
            conversation_id: ConversationId::new(conversation),
            timestamp: now,
            due_date: now,
            status: BillStatus::Pending,
            paid_date: None,
        }
    }

    #[test]
    fn empty_ledger_is_all_zero() {
        let summary = balance_summary(&[], &UserId::new("1"));

        assert_eq!(BalanceSummary::default(), summary);
        assert_eq!(Money::ZERO, summary.net());
    }

    #[test]
    fn three_way_split_totals() {
        let bills = vec![bill(18_925, "1", &["2", "3"], "g1")];

        let payer = balance_summary(&bills, &UserId::new("1"));
        let ower = balance_summary(&bills, &UserId::new("2"));

        assert_eq!(Money::from_minor(18_925), payer.total_owed);
        assert_eq!(Money::ZERO, payer.total_owing);
        assert_eq!(Money::from_minor(6308), ower.total_owing);
        assert_eq!(Money::ZERO, ower.total_owed);
    }

    #[test]
    fn balances_accumulate_across_bills() {
        let bills = vec![
            bill(5000, "1", &["2"], "g1"),
            bill(3000, "2", &["1"], "g1"),
        ];

        let first = balance_summary(&bills, &UserId::new("1"));

        assert_eq!(Money::from_minor(5000), first.total_owed);
        assert_eq!(Money::from_minor(1500), first.total_owing);
        assert_eq!(Money::from_minor(3500), first.net());
    }

    #[test]
    fn paid_bills_do_not_count() {
        let mut settled = bill(5000, "1", &["2"], "g1");
        settled.status = BillStatus::Paid;
        let bills = vec![settled];

        let payer = balance_summary(&bills, &UserId::new("1"));
        let ower = balance_summary(&bills, &UserId::new("2"));

        assert_eq!(BalanceSummary::default(), payer);
        assert_eq!(BalanceSummary::default(), ower);
    }

    #[test]
    fn solo_expense_has_no_owers() {
        let bills = vec![bill(4200, "1", &[], "g1")];

        let payer = balance_summary(&bills, &UserId::new("1"));

        assert_eq!(Money::from_minor(4200), payer.total_owed);
        assert_eq!(Money::ZERO, payer.total_owing);
    }

    #[test]
    fn group_balance_is_scoped_to_the_conversation() {
        let bills = vec![
            bill(5000, "1", &["2"], "g1"),
            bill(9900, "1", &["2"], "g2"),
        ];

        let balance = group_balance(&bills, &ConversationId::new("g1"), &UserId::new("1"));

        assert_eq!(Money::from_minor(5000), balance.paid);
        assert_eq!(Money::ZERO, balance.owed);
    }

    #[test]
    fn group_balance_counts_the_users_share() {
        let bills = vec![bill(18_925, "1", &["2", "3"], "g1")];

        let balance = group_balance(&bills, &ConversationId::new("g1"), &UserId::new("3"));

        assert_eq!(Money::ZERO, balance.paid);
        assert_eq!(Money::from_minor(6308), balance.owed);
    }
}
