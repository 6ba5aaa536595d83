//! Settlement of recorded bills.

use chrono::Utc;
use tracing::info;

use crate::{
    error::{CoreError, EntityKind},
    ledger::domain::{
        activity::{Activity, ActivityKind},
        bills::{BillId, BillStatus},
    },
    messaging::Message,
    session::Session,
    storage::StorageKey,
};

/// What [`Session::mark_bill_paid`] did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettlementOutcome {
    /// The bill transitioned from pending to paid.
    Settled,

    /// The bill was already paid. Nothing changed.
    AlreadyPaid,
}

impl Session {
    /// Mark a bill as paid.
    ///
    /// The transition happens at most once. Repeated calls for the same
    /// bill succeed with [`SettlementOutcome::AlreadyPaid`] and write
    /// nothing, so a retried settlement cannot duplicate the payment
    /// activity or the chat notice, nor move the original paid date.
    ///
    /// There is no participant check. The ledger is local to one device
    /// and its user settles bills on everyone's behalf.
    pub async fn mark_bill_paid(&mut self, id: &BillId) -> Result<SettlementOutcome, CoreError> {
        let position = self
            .bills()
            .iter()
            .position(|bill| bill.id == *id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Bill, id))?;

        if self.bills()[position].is_paid() {
            return Ok(SettlementOutcome::AlreadyPaid);
        }

        let now = Utc::now();

        let mut bills = self.bills().to_vec();
        bills[position].status = BillStatus::Paid;
        bills[position].paid_date = Some(now);
        let bill = bills[position].clone();

        let payer = self.resolve_user(&bill.paid_by).display_name().to_owned();
        let amount = bill.amount.format_dollars();

        let mut activities = self.activities().to_vec();
        activities.insert(
            0,
            Activity::new(
                ActivityKind::Payment,
                format!("{} paid {} for {}", payer, amount, bill.description),
                bill.conversation_id.clone(),
                now,
            ),
        );

        let mut conversations = self.conversations().clone();
        conversations
            .entry(bill.conversation_id.clone())
            .or_default()
            .push(Message::system(
                format!("{} has paid {} for {}", payer, amount, bill.description),
                now,
            ));

        self.write(StorageKey::PendingBills, &bills).await?;
        self.write(StorageKey::Activities, &activities).await?;
        self.write(StorageKey::Messages, &conversations).await?;

        self.commit_bills(bills);
        self.commit_activities(activities);
        self.commit_conversations(conversations);

        info!(bill_id = %id, amount = %bill.amount, "Marked bill as paid.");

        Ok(SettlementOutcome::Settled)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{
        groups::GroupId,
        identities::UserId,
        ledger::domain::{balance::balance_summary, money::Money},
        messaging::ConversationId,
        storage::MemoryStore,
    };

    use super::*;

    async fn fresh_session() -> Session {
        Session::init(Arc::new(MemoryStore::new()))
            .await
            .expect("init failed")
    }

    #[tokio::test]
    async fn settles_a_pending_bill() {
        let mut session = fresh_session().await;
        let id = BillId::new("2");

        let outcome = session.mark_bill_paid(&id).await.expect("settle failed");

        assert_eq!(SettlementOutcome::Settled, outcome);
        let bill = session.bill(&id).expect("bill missing");
        assert!(bill.is_paid());
        assert!(bill.paid_date.is_some());
    }

    #[tokio::test]
    async fn emits_one_activity_and_one_notice() {
        let mut session = fresh_session().await;
        let conversation = ConversationId::new("3");
        let activities_before = session.activities().len();
        let messages_before = session.messages(&conversation).map_or(0, |m| m.len());

        session
            .mark_bill_paid(&BillId::new("2"))
            .await
            .expect("settle failed");

        assert_eq!(activities_before + 1, session.activities().len());
        let newest = &session.activities()[0];
        assert_eq!(ActivityKind::Payment, newest.kind);
        assert_eq!("John Doe paid $189.25 for Dinner at Ristorante", newest.description);

        let messages = session.messages(&conversation).expect("conversation missing");
        assert_eq!(messages_before + 1, messages.len());
        let notice = messages.last().expect("message missing");
        assert!(notice.is_system());
    }

    #[tokio::test]
    async fn second_call_is_a_noop() {
        let mut session = fresh_session().await;
        let id = BillId::new("2");
        let conversation = ConversationId::new("3");

        session.mark_bill_paid(&id).await.expect("settle failed");
        let want_paid_date = session.bill(&id).expect("bill missing").paid_date;
        let activities_after_first = session.activities().len();
        let messages_after_first = session.messages(&conversation).map_or(0, |m| m.len());

        let outcome = session.mark_bill_paid(&id).await.expect("second call failed");

        assert_eq!(SettlementOutcome::AlreadyPaid, outcome);
        assert_eq!(want_paid_date, session.bill(&id).expect("bill missing").paid_date);
        assert_eq!(activities_after_first, session.activities().len());
        assert_eq!(
            messages_after_first,
            session.messages(&conversation).map_or(0, |m| m.len())
        );
    }

    #[tokio::test]
    async fn unknown_bill_is_not_found() {
        let mut session = fresh_session().await;

        let err = session
            .mark_bill_paid(&BillId::new("no-such-bill"))
            .await
            .expect_err("settle should fail");

        assert!(matches!(
            err,
            CoreError::NotFound {
                kind: EntityKind::Bill,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn settling_removes_the_debt_from_balances() {
        let mut session = fresh_session().await;
        let jane = UserId::new("2");
        let before = balance_summary(session.bills(), &jane).total_owing;

        session
            .mark_bill_paid(&BillId::new("2"))
            .await
            .expect("settle failed");

        let after = balance_summary(session.bills(), &jane).total_owing;
        assert_eq!(before - Money::from_minor(6308), after);
    }

    #[tokio::test]
    async fn settling_never_reduces_the_group_total() {
        let mut session = fresh_session().await;
        let group_id = GroupId::new("3");
        let before = session.group(&group_id).expect("group missing").total_expenses;

        session
            .mark_bill_paid(&BillId::new("2"))
            .await
            .expect("settle failed");

        let after = session.group(&group_id).expect("group missing").total_expenses;
        assert_eq!(before, after);
    }
}
