use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messaging::ConversationId;

/// Identifier for an activity entry.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
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

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of ledger event an activity entry records.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Payment,
    Expense,
    Reminder,
}

/// One entry in the activity feed.
///
/// The feed is append-only and kept newest first; entries are never
/// mutated or deleted, even when the entities they mention are gone.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// Pre-rendered description, ready for display.
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: ConversationId,
}

impl Activity {
    pub fn new(
        kind: ActivityKind,
        description: impl Into<String>,
        conversation: ConversationId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActivityId::generate(),
            kind,
            description: description.into(),
            timestamp,
            conversation_id: conversation,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_serializes_lowercase() {
        let activity = Activity::new(
            ActivityKind::Expense,
            "John Doe added Dinner for $50.00",
            ConversationId::new("g1"),
            Utc::now(),
        );

        let value = serde_json::to_value(&activity).expect("serialize failed");

        assert_eq!("expense", value["type"]);
        assert_eq!("g1", value["conversationId"]);
    }
}
