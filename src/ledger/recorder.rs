//! The write path for new expenses.

use chrono::Utc;
use semval::ValidatedFrom;
use tracing::info;

use crate::{
    error::CoreError,
    ledger::domain::{
        activity::{Activity, ActivityKind},
        bills::{Bill, NewExpense, NewExpenseData},
    },
    messaging::ConversationId,
    session::Session,
    storage::StorageKey,
};

impl Session {
    /// Record a new expense in a conversation.
    ///
    /// The bill starts out pending with payment due a week from now.
    /// When the conversation belongs to a group, the group's lifetime
    /// expense total grows by the amount; settling the bill later never
    /// shrinks it. One expense activity is added to the head of the
    /// feed.
    ///
    /// The caller owns any chat announcement for the new bill; posting a
    /// bill-reference message is the conventional follow-up.
    pub async fn record_expense(
        &mut self,
        conversation: &ConversationId,
        data: NewExpenseData,
    ) -> Result<Bill, CoreError> {
        let expense = NewExpense::validated_from(data)
            .map_err(|(_, context)| CoreError::validation(context))?;

        let payer = self
            .resolve_user(expense.paid_by())
            .display_name()
            .to_owned();

        let now = Utc::now();
        let bill = expense.into_bill(conversation.clone(), now);

        let mut bills = self.bills().to_vec();
        bills.push(bill.clone());

        let mut groups = self.groups().to_vec();
        let target = groups
            .iter_mut()
            .find(|group| ConversationId::for_group(&group.id) == *conversation);
        let group_changed = if let Some(group) = target {
            group.total_expenses += bill.amount;
            true
        } else {
            false
        };

        let description = format!(
            "{} added {} for {}",
            payer,
            bill.amount.format_dollars(),
            bill.description
        );
        let mut activities = self.activities().to_vec();
        activities.insert(
            0,
            Activity::new(
                ActivityKind::Expense,
                description,
                conversation.clone(),
                now,
            ),
        );

        self.write(StorageKey::PendingBills, &bills).await?;
        if group_changed {
            self.write(StorageKey::Groups, &groups).await?;
        }
        self.write(StorageKey::Activities, &activities).await?;

        self.commit_bills(bills);
        if group_changed {
            self.commit_groups(groups);
        }
        self.commit_activities(activities);

        info!(
            bill_id = %bill.id,
            amount = %bill.amount,
            conversation = %conversation,
            "Recorded new expense."
        );

        Ok(bill)
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use chrono::Duration;

    use crate::{
        groups::GroupId,
        identities::UserId,
        ledger::domain::{bills::BillStatus, money::Money},
        storage::{
            DynStorageGateway, MemoryStore, StorageError, StorageGateway, StorageKey,
        },
    };

    use super::*;

    async fn fresh_session() -> Session {
        Session::init(Arc::new(MemoryStore::new()))
            .await
            .expect("init failed")
    }

    fn expense(minor: i64, owed_by: &[&str]) -> NewExpenseData {
        NewExpenseData {
            description: "Team lunch".to_owned(),
            amount: Money::from_minor(minor),
            category: "food".to_owned(),
            paid_by: UserId::new("1"),
            owed_by: owed_by.iter().map(|id| UserId::new(*id)).collect(),
        }
    }

    /// A store that can be armed to reject writes for one key, for
    /// exercising rollback.
    struct FailingStore {
        inner: MemoryStore,
        fail_on: StorageKey,
        armed: AtomicBool,
    }

    #[async_trait]
    impl StorageGateway for FailingStore {
        async fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: StorageKey, payload: String) -> Result<(), StorageError> {
            if self.armed.load(Ordering::SeqCst) && key == self.fail_on {
                return Err(StorageError::Backend(anyhow::anyhow!("write rejected")));
            }

            self.inner.put(key, payload).await
        }
    }

    #[tokio::test]
    async fn records_a_pending_bill_with_the_due_period() {
        let mut session = fresh_session().await;
        let conversation = ConversationId::new("1");

        let bill = session
            .record_expense(&conversation, expense(5000, &["2"]))
            .await
            .expect("record failed");

        assert_eq!(BillStatus::Pending, bill.status);
        assert_eq!(bill.timestamp + Duration::days(7), bill.due_date);
        assert!(session.bill(&bill.id).is_some());
    }

    #[tokio::test]
    async fn increments_the_group_total_exactly_once() {
        let mut session = fresh_session().await;
        let conversation = ConversationId::new("1");
        let group_id = GroupId::new("1");
        let before = session.group(&group_id).expect("group missing").total_expenses;

        session
            .record_expense(&conversation, expense(5000, &["2"]))
            .await
            .expect("record failed");

        let after = session.group(&group_id).expect("group missing").total_expenses;
        assert_eq!(before + Money::from_minor(5000), after);
    }

    #[tokio::test]
    async fn sequential_expenses_accumulate_in_order() {
        let mut session = fresh_session().await;
        let conversation = ConversationId::new("1");
        let group_id = GroupId::new("1");
        let before = session.group(&group_id).expect("group missing").total_expenses;

        session
            .record_expense(&conversation, expense(5000, &["2"]))
            .await
            .expect("record failed");
        session
            .record_expense(&conversation, expense(3000, &["2"]))
            .await
            .expect("record failed");

        let after = session.group(&group_id).expect("group missing").total_expenses;
        assert_eq!(before + Money::from_minor(8000), after);

        let bills = session.bills();
        let last_two: Vec<_> = bills[bills.len() - 2..]
            .iter()
            .map(|bill| bill.amount)
            .collect();
        assert_eq!(vec![Money::from_minor(5000), Money::from_minor(3000)], last_two);
    }

    #[tokio::test]
    async fn direct_conversations_touch_no_group() {
        let mut session = fresh_session().await;
        let conversation = ConversationId::direct(&UserId::new("1"), &UserId::new("2"));
        let totals_before: Vec<_> = session.groups().iter().map(|g| g.total_expenses).collect();

        session
            .record_expense(&conversation, expense(2500, &["2"]))
            .await
            .expect("record failed");

        let totals_after: Vec<_> = session.groups().iter().map(|g| g.total_expenses).collect();
        assert_eq!(totals_before, totals_after);
    }

    #[tokio::test]
    async fn prepends_an_expense_activity() {
        let mut session = fresh_session().await;
        let conversation = ConversationId::new("1");
        let count_before = session.activities().len();

        session
            .record_expense(&conversation, expense(5000, &["2"]))
            .await
            .expect("record failed");

        assert_eq!(count_before + 1, session.activities().len());
        let newest = &session.activities()[0];
        assert_eq!(ActivityKind::Expense, newest.kind);
        assert_eq!("John Doe added $50.00 for Team lunch", newest.description);
    }

    #[tokio::test]
    async fn rejects_invalid_input_without_writing() {
        let mut session = fresh_session().await;
        let conversation = ConversationId::new("1");
        let bills_before = session.bills().len();

        let mut data = expense(5000, &["2"]);
        data.description = "  ".to_owned();
        let err = session
            .record_expense(&conversation, data)
            .await
            .expect_err("blank description should fail");

        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(bills_before, session.bills().len());
    }

    #[tokio::test]
    async fn persists_across_sessions() {
        let storage: DynStorageGateway = Arc::new(MemoryStore::new());
        let mut session = Session::init(Arc::clone(&storage)).await.expect("init failed");

        let bill = session
            .record_expense(&ConversationId::new("1"), expense(5000, &["2"]))
            .await
            .expect("record failed");

        let reloaded = Session::init(storage).await.expect("init failed");
        assert!(reloaded.bill(&bill.id).is_some());
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_unchanged() {
        let store = Arc::new(FailingStore {
            inner: MemoryStore::new(),
            fail_on: StorageKey::Activities,
            armed: AtomicBool::new(false),
        });
        let gateway: DynStorageGateway = store.clone();
        let mut session = Session::init(gateway).await.expect("init failed");

        let bills_before = session.bills().to_vec();
        let activities_before = session.activities().to_vec();
        let totals_before: Vec<_> = session.groups().iter().map(|g| g.total_expenses).collect();

        store.armed.store(true, Ordering::SeqCst);
        let err = session
            .record_expense(&ConversationId::new("1"), expense(5000, &["2"]))
            .await
            .expect_err("activity write should fail");

        assert!(matches!(err, CoreError::Persistence(_)));
        assert_eq!(bills_before, session.bills());
        assert_eq!(activities_before, session.activities());
        let totals_after: Vec<_> = session.groups().iter().map(|g| g.total_expenses).collect();
        assert_eq!(totals_before, totals_after);
    }
}
