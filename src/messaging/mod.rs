//! Conversation threads for groups and direct chats.
//!
//! Messages are append-only. Notices about ledger events (membership
//! changes, settlements) are ordinary messages with the system sender, so
//! readers see them inline with the chat history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::CoreError,
    groups::GroupId,
    identities::UserId,
    ledger::domain::bills::BillId,
    session::Session,
    storage::StorageKey,
};

/// Identifier for a message thread.
///
/// A group's conversation reuses the group id unchanged. A direct
/// conversation joins the two participant ids, lexicographically sorted,
/// with a hyphen, so both participants derive the same id. Both forms
/// appear in stored data and must not change.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn for_group(group: &GroupId) -> Self {
        Self(group.as_str().to_owned())
    }

    pub fn direct(a: &UserId, b: &UserId) -> Self {
        let mut pair = [a.as_str(), b.as_str()];
        pair.sort_unstable();

        Self(pair.join("-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a message.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
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

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const SYSTEM_SENDER: &str = "system";

/// Who sent a message.
///
/// On the wire a sender is a bare id string; the literal `system` marks
/// notices generated by the ledger itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Sender {
    User(UserId),
    System,
}

impl Sender {
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl Serialize for Sender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::User(id) => serializer.serialize_str(id.as_str()),
            Self::System => serializer.serialize_str(SYSTEM_SENDER),
        }
    }
}

impl<'de> Deserialize<'de> for Sender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;

        if raw == SYSTEM_SENDER {
            Ok(Self::System)
        } else {
            Ok(Self::User(UserId::new(raw)))
        }
    }
}

/// The content of a message.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageBody {
    /// Ordinary chat text.
    Text { text: String },

    /// A notice generated by the ledger, such as a membership change.
    SystemNotice { text: String },

    /// A structured pointer to a recorded bill. Readers look the bill up
    /// instead of parsing an announcement string.
    #[serde(rename_all = "camelCase")]
    BillReference { bill_id: BillId },
}

/// One message in a conversation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "senderId")]
    pub sender: Sender,
    #[serde(flatten)]
    pub body: MessageBody,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn from_user(sender: &UserId, body: MessageBody, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            sender: Sender::User(sender.clone()),
            body,
            timestamp,
        }
    }

    pub fn system(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            sender: Sender::System,
            body: MessageBody::SystemNotice { text: text.into() },
            timestamp,
        }
    }

    pub fn is_system(&self) -> bool {
        self.sender.is_system()
    }
}

impl Session {
    /// Ensure a conversation exists, creating an empty one when needed.
    ///
    /// Calling this for an existing conversation changes nothing.
    pub async fn start_conversation(
        &mut self,
        conversation: &ConversationId,
    ) -> Result<(), CoreError> {
        if self.conversations().contains_key(conversation) {
            return Ok(());
        }

        let mut conversations = self.conversations().clone();
        conversations.insert(conversation.clone(), Vec::new());

        self.write(StorageKey::Messages, &conversations).await?;
        self.commit_conversations(conversations);

        debug!(conversation = %conversation, "Started conversation.");

        Ok(())
    }

    /// Append a message from the session user to a conversation.
    ///
    /// The conversation is created on first use.
    pub async fn send_message(
        &mut self,
        conversation: &ConversationId,
        body: MessageBody,
    ) -> Result<Message, CoreError> {
        let message = Message::from_user(&self.user().id, body, Utc::now());

        let mut conversations = self.conversations().clone();
        conversations
            .entry(conversation.clone())
            .or_default()
            .push(message.clone());

        self.write(StorageKey::Messages, &conversations).await?;
        self.commit_conversations(conversations);

        debug!(
            conversation = %conversation,
            message_id = %message.id,
            "Sent message."
        );

        Ok(message)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn direct_conversation_ids_sort_their_participants() {
        let want_id = "3-7";

        let id = ConversationId::direct(&UserId::new("7"), &UserId::new("3"));

        assert_eq!(want_id, id.as_str());
        assert_eq!(id, ConversationId::direct(&UserId::new("3"), &UserId::new("7")));
    }

    #[test]
    fn group_conversation_id_reuses_the_group_id() {
        let id = ConversationId::for_group(&GroupId::new("g42"));

        assert_eq!("g42", id.as_str());
    }

    #[test]
    fn sender_serializes_to_a_bare_id() {
        let sender = Sender::User(UserId::new("abc"));

        let serialized = serde_json::to_string(&sender).expect("serialize failed");

        assert_eq!("\"abc\"", serialized);
    }

    #[test]
    fn system_sender_round_trips() {
        let serialized = serde_json::to_string(&Sender::System).expect("serialize failed");
        assert_eq!("\"system\"", serialized);

        let deserialized: Sender = serde_json::from_str(&serialized).expect("deserialize failed");
        assert!(deserialized.is_system());
    }

    #[test]
    fn bill_reference_body_shape() {
        let message = Message::from_user(
            &UserId::new("1"),
            MessageBody::BillReference {
                bill_id: BillId::new("b9"),
            },
            Utc::now(),
        );

        let value = serde_json::to_value(&message).expect("serialize failed");

        assert_eq!("billReference", value["type"]);
        assert_eq!("b9", value["billId"]);
        assert_eq!("1", value["senderId"]);
    }

    #[test]
    fn system_notice_round_trips() {
        let message = Message::system("Jane has been added to the group", Utc::now());

        let serialized = serde_json::to_string(&message).expect("serialize failed");
        let deserialized: Message = serde_json::from_str(&serialized).expect("deserialize failed");

        assert_eq!(message, deserialized);
    }
}
