use std::fmt;

use chrono::{DateTime, Duration, Utc};
use semval::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{identities::UserId, messaging::ConversationId};

use super::money::Money;

/// How many days after recording an expense its payment is due.
pub const DUE_PERIOD_DAYS: i64 = 7;

/// Identifier for a bill.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BillId(String);

impl BillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The settlement state of a bill.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Paid,
}

/// A shared expense fronted by one participant.
///
/// `owed_by` lists everyone who owes a share and never contains the
/// payer. The split population is the payer plus `owed_by`, so the
/// payer's own share stays out of what others owe.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: BillId,
    pub description: String,
    pub amount: Money,
    pub category: String,
    pub paid_by: UserId,
    pub owed_by: Vec<UserId>,
    pub conversation_id: ConversationId,
    pub timestamp: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: BillStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime<Utc>>,
}

impl Bill {
    /// Everyone with a stake in the bill: the payer first, then each
    /// ower in recorded order.
    pub fn participants(&self) -> Vec<&UserId> {
        std::iter::once(&self.paid_by)
            .chain(self.owed_by.iter())
            .collect()
    }

    /// The exact share one participant is responsible for.
    ///
    /// Shares are an even split over the participants; the payer comes
    /// first, so leftover minor units land on them before anyone else.
    /// Non-participants have no share.
    pub fn share_of(&self, user: &UserId) -> Option<Money> {
        let participants = self.participants();
        let shares = self.amount.split_even(participants.len());

        participants
            .iter()
            .position(|id| *id == user)
            .map(|index| shares[index])
    }

    pub fn is_paid(&self) -> bool {
        matches!(self.status, BillStatus::Paid)
    }
}

/// A validated request to record a new expense.
#[derive(Debug)]
pub struct NewExpense {
    description: String,
    amount: Money,
    category: String,
    paid_by: UserId,
    owed_by: Vec<UserId>,
}

impl NewExpense {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn paid_by(&self) -> &UserId {
        &self.paid_by
    }

    pub fn owed_by(&self) -> &[UserId] {
        &self.owed_by
    }

    /// Materialize the bill this expense describes.
    pub(crate) fn into_bill(self, conversation: ConversationId, now: DateTime<Utc>) -> Bill {
        Bill {
            id: BillId::generate(),
            description: self.description,
            amount: self.amount,
            category: self.category,
            paid_by: self.paid_by,
            owed_by: self.owed_by,
            conversation_id: conversation,
            timestamp: now,
            due_date: now + Duration::days(DUE_PERIOD_DAYS),
            status: BillStatus::Pending,
            paid_date: None,
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum NewExpenseInvalidity {
    /// The description is empty after trimming.
    DescriptionEmpty,

    /// The amount is zero or negative.
    AmountNotPositive,

    /// The payer also appears in the owed-by list.
    PayerAmongOwers,
}

impl Validate for NewExpense {
    type Invalidity = NewExpenseInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(
                self.description.is_empty(),
                NewExpenseInvalidity::DescriptionEmpty,
            )
            .invalidate_if(
                !self.amount.is_positive(),
                NewExpenseInvalidity::AmountNotPositive,
            )
            .invalidate_if(
                self.owed_by.contains(&self.paid_by),
                NewExpenseInvalidity::PayerAmongOwers,
            )
            .into()
    }
}

/// Unvalidated expense input.
///
/// An empty `owed_by` list is legal and records a solo expense: the payer
/// fronted the full amount and nobody owes a share.
#[derive(Clone, Debug)]
pub struct NewExpenseData {
    pub description: String,
    pub amount: Money,
    pub category: String,
    pub paid_by: UserId,
    pub owed_by: Vec<UserId>,
}

impl ValidatedFrom<NewExpenseData> for NewExpense {
    fn validated_from(from: NewExpenseData) -> ValidatedResult<Self> {
        let into = NewExpense {
            description: from.description.trim().to_owned(),
            amount: from.amount,
            category: from.category,
            paid_by: from.paid_by,
            owed_by: from.owed_by,
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}
